//! Ask a chat-completion model for code, then run that code in a remote
//! sandbox and report what it printed.

pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod printer;
pub mod prompt;
pub mod sandbox;

pub use error::{Error, Result};
