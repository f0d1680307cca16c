use serde::{Deserialize, Serialize};

/// One of the two fixed conversational participants. The wire names match
/// the server's role identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ai_left")]
    AiLeft,
    #[serde(rename = "ai_right")]
    AiRight,
}

impl Role {
    /// The other participant.
    pub fn opposite(&self) -> Role {
        match self {
            Role::AiLeft => Role::AiRight,
            Role::AiRight => Role::AiLeft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AiLeft => "ai_left",
            Role::AiRight => "ai_right",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
