use std::fmt;

/// Whether a hook is backed by the live store or running on fallback data
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncMode {
    #[default]
    Live,
    /// Configuration is missing or the store could not be reached
    Degraded { reason: String },
}

impl SyncMode {
    pub fn degraded(reason: impl Into<String>) -> Self {
        SyncMode::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncMode::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SyncMode::Live => None,
            SyncMode::Degraded { reason } => Some(reason),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Live => f.write_str("live"),
            SyncMode::Degraded { reason } => write!(f, "degraded ({})", reason),
        }
    }
}
