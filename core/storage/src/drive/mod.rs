//! Google Drive remote backend.
//!
//! This module provides the real remote-storage backend:
//! - OAuth2 interactive consent with a single-shot loopback listener
//! - Service-identity (signed assertion) grants
//! - Silent token refresh
//! - Multipart and resumable (streamed) uploads
//! - Post-upload permission grants

pub mod auth;
pub mod client;
pub mod consent;
pub mod identity;
pub mod provider;

pub use auth::{AuthManager, Authorizer, Credential, TokenManager};
pub use client::DriveClient;
pub use consent::{ConsentFlow, ConsentOptions};
pub use provider::DriveRemote;
