use serde::{Deserialize, Serialize};

/// Where the delivery distance currently stands.
///
/// `Unknown` and `Calculating` both mean there is no distance yet; they are
/// kept apart so the form can show a spinner only while a lookup is running.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DistanceStatus {
    #[default]
    Unknown,
    Calculating,
    Resolved { miles: f64 },
}

impl DistanceStatus {
    pub fn miles(&self) -> Option<f64> {
        match self {
            DistanceStatus::Resolved { miles } => Some(*miles),
            _ => None,
        }
    }

    pub fn is_calculating(&self) -> bool {
        matches!(self, DistanceStatus::Calculating)
    }
}
