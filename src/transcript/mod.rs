pub mod alternate;
pub mod detect;
pub mod labels;
pub mod speaker;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn swapped(self) -> Self {
        match self {
            Role::User => Role::Assistant,
            Role::Assistant => Role::User,
        }
    }
}

/// How the entries of an import were recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DetectedMode {
    Speaker,
    Alternate,
    /// Roles came straight from a vendor payload.
    Direct,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModeOverride {
    #[default]
    Auto,
    Speaker,
    Alternate,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SplitMode {
    #[default]
    Line,
    Paragraph,
}

/// One recovered turn before roles are assigned.
///
/// Vendor decoders fill `role`, the speaker parser fills `speaker`, and the
/// alternating parser leaves both empty so the role follows from position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub text: String,
}

impl ProvisionalEntry {
    pub fn spoken_by(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            role: None,
            text: text.into(),
        }
    }

    pub fn with_role(role: Role, text: impl Into<String>) -> Self {
        Self {
            speaker: None,
            role: Some(role),
            text: text.into(),
        }
    }

    pub fn unlabeled(text: impl Into<String>) -> Self {
        Self {
            speaker: None,
            role: None,
            text: text.into(),
        }
    }
}

/// Output of either text parser, with enough bookkeeping to account for every line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextParse {
    pub entries: Vec<ProvisionalEntry>,
    /// Speakers ranked by how many entries they own; ties keep first-seen order.
    pub speakers: Vec<String>,
    pub ignored: usize,
    pub consumed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_swap_is_an_involution() {
        for role in [Role::User, Role::Assistant] {
            assert_ne!(role.swapped(), role);
            assert_eq!(role.swapped().swapped(), role);
        }
    }

    #[test]
    fn options_parse_from_lowercase() {
        assert_eq!(ModeOverride::from_str("alternate").unwrap(), ModeOverride::Alternate);
        assert_eq!(SplitMode::from_str("paragraph").unwrap(), SplitMode::Paragraph);
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
        assert_eq!(DetectedMode::Direct.to_string(), "direct");
    }
}
