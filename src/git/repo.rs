//! git::repo
//!
//! Repository discovery using git2.
//!
//! Discovery is the only place strata links against libgit2. Everything
//! that reads repository *content* goes through the git executable (see
//! [`super::runner`]), so the engine observes exactly what the user's git
//! reports, including hooks, config includes, and mailmaps.
//!
//! # Example
//!
//! ```ignore
//! use strata::git::Git;
//! use std::path::Path;
//!
//! let info = Git::open(Path::new("."))?.info();
//! println!("metadata dir: {}", info.git_dir.display());
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{ObjectFormat, TypeError};

/// Errors from repository discovery.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// `extensions.objectFormat` names a hash strata does not know.
    #[error("unsupported object format: {0}")]
    ObjectFormat(#[from] TypeError),

    /// Internal git2 error.
    #[error("git error: {0}")]
    Internal(String),
}

impl From<git2::Error> for GitError {
    fn from(e: git2::Error) -> Self {
        GitError::Internal(e.message().to_string())
    }
}

/// Locations and format of a discovered working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    /// Per-worktree metadata directory
    pub git_dir: PathBuf,
    /// Shared metadata directory (equal to `git_dir` outside linked worktrees)
    pub common_dir: PathBuf,
    /// Root of the checked-out tree
    pub work_dir: PathBuf,
    /// Hash algorithm for object ids
    pub object_format: ObjectFormat,
}

/// Handle to a discovered repository.
pub struct Git {
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("git_dir", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Discover the repository containing `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Describe the working copy.
    ///
    /// # Errors
    ///
    /// Fails if the repository declares an unknown object format.
    pub fn info(&self) -> Result<RepoInfo, GitError> {
        let work_dir = self
            .repo
            .workdir()
            .ok_or(GitError::BareRepo)?
            .to_path_buf();

        Ok(RepoInfo {
            git_dir: self.repo.path().to_path_buf(),
            common_dir: self.repo.commondir().to_path_buf(),
            work_dir,
            object_format: self.object_format()?,
        })
    }

    /// Object format from `extensions.objectFormat`, SHA-1 when unset.
    pub fn object_format(&self) -> Result<ObjectFormat, GitError> {
        let config = self.repo.config()?;
        match config.get_string("extensions.objectformat") {
            Ok(name) => Ok(ObjectFormat::from_name(&name)?),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(ObjectFormat::Sha1),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_discovers_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        git2::Repository::init(temp.path()).unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let info = Git::open(&nested).unwrap().info().unwrap();

        assert!(info.git_dir.ends_with(".git"));
        assert_eq!(info.git_dir, info.common_dir);
        assert_eq!(info.object_format, ObjectFormat::Sha1);
        assert_eq!(
            info.work_dir.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn open_outside_repo_fails() {
        let temp = TempDir::new().unwrap();
        let result = Git::open(temp.path());
        assert!(matches!(result, Err(GitError::NotARepo { .. })));
    }

    #[test]
    fn bare_repo_rejected() {
        let temp = TempDir::new().unwrap();
        git2::Repository::init_bare(temp.path()).unwrap();
        let result = Git::open(temp.path());
        assert!(matches!(result, Err(GitError::BareRepo)));
    }
}
