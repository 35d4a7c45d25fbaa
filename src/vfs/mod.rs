//! VFS module - Dirty tracking over the sandbox filesystem
//!
//! - fs: load a remote repository and track edits against its baseline
//! - snapshot: baseline/working-copy bookkeeping and the derived diff
//! - skip: paths never loaded into the sandbox

mod fs;
mod skip;
mod snapshot;

pub use fs::{LoadSummary, WorkspaceFs};
pub use skip::{should_skip, SKIP_DIRS, SKIP_FILES};
pub use snapshot::{DirtyFile, DirtyStatus, RepoInfo, RepoSnapshot};
