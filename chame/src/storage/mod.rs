//! File providers for bundle sources
//!
//! The bundling pipeline never touches the file system directly; it goes
//! through the [`FileProvider`] trait so that content can come from a local
//! directory ([`LocalFileProvider`]), from memory ([`InMemoryFileProvider`]),
//! or from any custom backend.

pub mod local;
pub mod memory;
pub mod traits;
pub mod types;

pub use local::LocalFileProvider;
pub use memory::InMemoryFileProvider;
pub use traits::FileProvider;
pub use types::{normalize_path, StorageError, StorageResult};

#[cfg(test)]
pub use traits::MockFileProvider;
