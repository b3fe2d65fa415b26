//! Updrift Upload Orchestration Engine
//!
//! This crate composes one upload invocation end to end:
//! - Retry strategy with exponential backoff for transient errors
//! - Create-or-reuse remote folder resolution with memoization
//! - Optional archive bundling of directory subtrees
//! - Upload execution with counted attempts and optional sharing
//! - Plain-text run reports for the invoking host

pub mod archive;
pub mod executor;
pub mod listing;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod retry;

// Re-export main types
pub use archive::{build_archive, StagedArchive};
pub use executor::UploadExecutor;
pub use listing::{list_directory, ListOptions};
pub use orchestrator::{run_for_host, run_host, HostInputs, Orchestrator, UploadRequest};
pub use report::RunReport;
pub use resolver::FolderResolver;
pub use retry::{RetryConfig, RetryExecutor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Verify all main types are accessible
        let _retry_config = RetryConfig::default();
        let _options = ListOptions::default();
        let _inputs = HostInputs::default();
    }
}
