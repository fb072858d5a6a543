#![forbid(unsafe_code)]

pub mod config;
pub mod dialogue;
pub mod errors;
pub mod interpreter;
pub mod models;
pub mod nlu;
pub mod persistence;
pub mod pipeline;
pub mod queue;
pub mod slack;
pub mod tasks;
pub mod transport;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
