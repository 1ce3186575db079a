//! Command Handlers 实现

mod assignment_handlers;
mod cache_handlers;
mod speak_handlers;

pub use assignment_handlers::*;
pub use cache_handlers::*;
pub use speak_handlers::*;
