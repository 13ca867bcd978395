pub mod collector;
pub mod models;

pub use collector::{CollectorError, UploadCollector};
