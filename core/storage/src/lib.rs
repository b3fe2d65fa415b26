//! Remote storage access for Updrift.
//!
//! This crate provides a trait-based interface to the remote storage
//! service (Google Drive), credential acquisition and persistence, and an
//! in-memory mock remote for tests.
//!
//! # Design Principles
//! - Backend isolation: orchestration code only sees the `RemoteStore` trait
//! - Async operations: all network I/O is async
//! - Streaming support: large files are streamed from disk, not buffered
//! - Unified error semantics: consistent error types across backends

pub mod drive;
pub mod memory;
pub mod remote;
pub mod token_store;

pub use drive::auth::{
    AuthorizationSource, Authorizer, ClientDescriptor, Credential, RefreshContext,
    ServiceKeyDescriptor,
};
pub use drive::{ConsentOptions, DriveRemote};
pub use memory::MemoryRemote;
pub use remote::{RemoteFile, RemoteFolder, RemoteStore};
pub use token_store::TokenStore;
