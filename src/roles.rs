use serde::{Deserialize, Serialize};

use crate::transcript::{DetectedMode, ProvisionalEntry, Role};

/// The user's role decisions. Changing any of them is a pure re-map of an
/// already parsed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChoice {
    /// Speaker-mode name that maps to `user`; the top-ranked speaker when unset.
    pub self_speaker: Option<String>,
    /// Alternate-mode role of the first entry.
    pub first_role: Role,
    /// Inverts every assigned role.
    pub swap: bool,
}

impl Default for RoleChoice {
    fn default() -> Self {
        Self {
            self_speaker: None,
            first_role: Role::User,
            swap: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

pub fn assign(
    mode: DetectedMode,
    entries: &[ProvisionalEntry],
    speakers: &[String],
    choice: &RoleChoice,
) -> Vec<Turn> {
    let self_speaker = choice
        .self_speaker
        .as_deref()
        .or_else(|| speakers.first().map(String::as_str));

    entries
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            let role = match mode {
                DetectedMode::Direct => entry.role.unwrap_or(Role::Assistant),
                DetectedMode::Speaker => {
                    if entry.speaker.is_some() && entry.speaker.as_deref() == self_speaker {
                        Role::User
                    } else {
                        Role::Assistant
                    }
                }
                DetectedMode::Alternate if position % 2 == 0 => choice.first_role,
                DetectedMode::Alternate => choice.first_role.swapped(),
            };
            Turn {
                role: if choice.swap { role.swapped() } else { role },
                text: entry.text.clone(),
            }
        })
        .collect()
}
