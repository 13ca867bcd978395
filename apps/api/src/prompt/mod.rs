//! Prompt assembly for the candidate report.

use serde::Serialize;

pub mod assembler;
pub mod templates;
pub mod themes;

pub use assembler::assemble;

/// The two parts of the outbound request: system instruction and user content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-text form for previews and copy-paste into another model.
    pub fn render(&self) -> String {
        format!("{}\n\n---\n\n{}", self.system, self.user)
    }
}
