//! Payload validation: settled uploads → `AnalysisPayload`.

pub mod error;
pub mod models;
pub mod records;
pub mod validator;

pub use error::ValidationError;
pub use models::{AnalysisPayload, CandidateRecord};
pub use validator::validate;
