//! Service layer separating domain logic from UI concerns.
//!
//! Services are shared between the CLI and the status server.

pub mod cleanup;
pub mod download;
pub mod scheduler;

pub use cleanup::{CleanupService, SweepReport, SweepStats};
pub use download::{DownloadResult, DownloadService};
pub use scheduler::Scheduler;
