//! Version-control access for depscan
//!
//! The analyzer talks to repositories only through [`RepositoryProvider`];
//! [`GitBackend`] implements it with libgit2 over a directory holding one
//! clone per repository.

pub mod backend;
pub mod error;
pub mod provider;


pub use backend::GitBackend;
pub use error::{GitError, GitResult};
pub use provider::RepositoryProvider;
