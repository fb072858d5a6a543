//! Per-user dialogue: versioned state storage and the pure transition planner.

pub mod machine;
pub mod store;
