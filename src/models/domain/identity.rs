use serde::{Deserialize, Serialize};

/// An authenticated participant or test owner.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub key: String,
    pub display_label: String,
}

impl Identity {
    pub fn new(key: &str, display_label: &str) -> Self {
        Identity {
            key: key.to_string(),
            display_label: display_label.to_string(),
        }
    }
}
