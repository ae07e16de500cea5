pub mod config;
pub mod error;
pub mod git;
pub mod guard;
pub mod metadata;
pub mod source;
pub mod ui;
pub mod version;
pub mod workflow;

pub use error::{Result, TaggerError};
