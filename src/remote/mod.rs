//! Remote repository host
//!
//! The VFS is the only caller: it lists a branch's tree and then fetches
//! file contents one by one, optionally authenticated with a bearer token.

mod http;
mod types;

pub use http::HttpRepoHost;
pub use types::{RemoteEntry, RemoteFile, RemoteTree, RepoHost, RepoRef};
