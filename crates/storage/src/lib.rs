#![forbid(unsafe_code)]

pub mod repository;
pub mod rest;

pub use repository::{
    AuthProvider, AuthSession, InMemoryBackend, MaterialRecord, MaterialRepository, ObjectStore,
    SignedUrl, StateRepository, Storage, StorageError,
};
pub use rest::{RestBackend, RestConfig};
