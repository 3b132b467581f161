use serde::{Deserialize, Serialize};

/// Per-deployment switches for the step rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Step 5 also demands a drawn signature for new enrollments.
    pub require_signature: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_signature: true,
        }
    }
}
