use serde::{Deserialize, Serialize};

/// Host application visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    /// Visible and allowed to use audio freely.
    #[default]
    Foreground,
    /// Backgrounded.
    Background,
    /// Transitioning or obscured.
    Inactive,
}

impl AppLifecycle {
    /// Speech may be played right now.
    pub fn is_foreground(self) -> bool {
        self == AppLifecycle::Foreground
    }
}
