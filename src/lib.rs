//! Turns pasted chat transcripts and AI share pages into role-labelled turns.

pub mod assemble;
pub mod cache;
pub mod config;
pub mod normalize;
pub mod proxy;
pub mod roles;
pub mod share;
pub mod transcript;
pub mod vendor;

pub use assemble::{ImportOptions, ImportSession, Importer, ParsedImport, import};
pub use roles::{RoleChoice, Turn};
pub use share::{FetchError, ShareResolver};
pub use transcript::{DetectedMode, ModeOverride, Role, SplitMode};
pub use vendor::Vendor;
