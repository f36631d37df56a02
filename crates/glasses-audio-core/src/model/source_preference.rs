use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Which hardware the caller wants a session to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePreference {
    /// Force built-in devices, Bluetooth disallowed.
    Phone,
    /// Prefer the Bluetooth wearable; fall back with a warning.
    Glasses,
    /// Allow Bluetooth opportunistically.
    #[default]
    Auto,
}

impl fmt::Display for SourcePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourcePreference::Phone => "phone",
            SourcePreference::Glasses => "glasses",
            SourcePreference::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for SourcePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phone" => Ok(SourcePreference::Phone),
            "glasses" => Ok(SourcePreference::Glasses),
            "auto" => Ok(SourcePreference::Auto),
            other => Err(format!("unknown source preference: {other}")),
        }
    }
}
