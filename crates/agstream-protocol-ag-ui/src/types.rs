use serde::{Deserialize, Serialize};

/// Message author role on the wire. Runs only ever carry assistant
/// messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Assistant,
}
