//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：音色池读取

mod pool_queries;

pub mod handlers;

pub use pool_queries::*;
