//! Binary storage for asset resources.
//!
//! Asset metadata lives in the database; the uploaded bytes live behind a
//! [`StorageBackend`]. Only a local filesystem backend ships with the
//! service, other backends plug in through the same trait.

mod backend;
mod local;

pub use backend::{namespaces, StorageBackend, StorageError, StorageResult};
pub use local::LocalStorage;
