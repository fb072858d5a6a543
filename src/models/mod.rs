//! Domain model module declarations.

pub mod command;
pub mod dialogue;
pub mod queue;
