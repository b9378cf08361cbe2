//! Validation and Normalization
//!
//! Turns raw configuration documents into canonical values:
//! - [`normalizer`]: storage backend selection and deprecated-field migration
//! - [`admission`]: request admission limits
//! - [`validator`]: the composition root and canonical config
//! - [`status`]: status projection after reconciliation
//! - [`secret`]: one-time `httpSecret` generation

pub mod admission;
pub mod normalizer;
pub mod secret;
pub mod status;
pub mod validator;

pub use admission::*;
pub use normalizer::*;
pub use secret::*;
pub use status::*;
pub use validator::*;
