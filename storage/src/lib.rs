// storage/src/lib.rs

pub mod errors;
pub mod store;

pub use errors::{StorageError, StorageResult};
pub use store::PrescriptionStore;
