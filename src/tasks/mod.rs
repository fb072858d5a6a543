//! Task store adapters.

pub mod http_executor;
pub mod memory;
