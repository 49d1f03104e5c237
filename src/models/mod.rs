//! Data models for novelacquire.

mod artifact;
mod job;
mod novel;

pub use artifact::{Artifact, OutputFormat};
pub use job::{JobOutcome, JobRun, RunnerHistory};
pub use novel::{Chapter, ChapterImage, CrawlSession, Novel, NovelInfo, SearchResult, Volume};
