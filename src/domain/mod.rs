//! Core domain types and traits
//!
//! - [`backend`]: storage backend tagged union
//! - [`management`]: management states and lifecycle legality
//! - [`advisory`]: non-fatal advisory notices
//! - [`duration`]: signed text durations
//! - [`ports`]: external capabilities

pub mod advisory;
pub mod backend;
pub mod duration;
pub mod management;
pub mod ports;

pub use advisory::*;
pub use backend::*;
pub use duration::GoDuration;
pub use management::*;
pub use ports::*;
