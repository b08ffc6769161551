//! vox-assistant: a small voice and text assistant for the terminal.

pub mod backends;
pub mod clock;
pub mod config_loader;
pub mod dispatcher;
pub mod ear;
pub mod engine;
pub mod error;
pub mod knowledge;
pub mod notes;
pub mod recognizers;
pub mod session;
pub mod vad;
pub mod web;

pub use error::{Error, Result};
