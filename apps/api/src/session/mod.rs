//! Per-user sessions: file set, report and the submission lifecycle around them.

pub mod handlers;
pub mod scheduler;
pub mod store;
pub mod submission;

pub use store::SessionStore;
pub use submission::{Session, SessionStatus, SubmissionError};
