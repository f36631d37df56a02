use crate::{ErrorCode, SourcePreference};

use serde::{Deserialize, Serialize};

/// Non-fatal routing problem surfaced while an operation proceeds on a fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteWarning {
    /// Always a recoverable code, usually `DEVICE_UNAVAILABLE`.
    pub code: ErrorCode,
    /// Preference that could not be honoured.
    pub requested: SourcePreference,
    /// Human-readable detail.
    pub message: String,
}
