//! Custom Resource Definitions for the image registry
//!
//! This module contains the wire types:
//! - ImageRegistryConfig: the cluster-scoped registry Config resource
//! - ImageRegistryConfigStorage: the storage backend document shared by spec and status

pub mod image_registry;
pub mod storage;

pub use image_registry::*;
pub use storage::*;
