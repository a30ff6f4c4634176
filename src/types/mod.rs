//! Core types for colloquy.

pub mod agent;
pub mod chat_log;
pub mod message;
pub mod record;
pub mod usage;

pub use agent::*;
pub use chat_log::*;
pub use message::*;
pub use record::{FlatRecord, FlatValue};
pub use usage::*;
