//! Query Handlers 实现

mod pool_handlers;

pub use pool_handlers::*;
