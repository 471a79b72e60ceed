use std::path::Path;

use git2::Repository;
use tempfile::TempDir;
use vigil_core::VigilError;

use crate::provider::{format_clone_url, Credentials};

/// A repository cloned into a temporary directory.
///
/// The directory is removed when the handle is dropped or [`cleanup`] is
/// called, on success and failure paths alike. Source control systems mark
/// some object files read-only, so removal clears read-only bits first.
///
/// [`cleanup`]: ClonedRepo::cleanup
pub struct ClonedRepo {
    dir: Option<TempDir>,
    url: String,
}

impl ClonedRepo {
    /// Clone `repo_url` into a fresh temporary directory.
    ///
    /// Credentials, when given, are embedded percent-encoded in the clone
    /// URL; the error path reports the original URL, never the
    /// credentialed one.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Git`] if the clone fails. Partial on-disk
    /// state is removed before returning.
    pub fn clone(repo_url: &str, credentials: Option<&Credentials>) -> Result<Self, VigilError> {
        let dir = TempDir::new()
            .map_err(|e| VigilError::Git(format!("failed to create temp directory: {e}")))?;
        let clone_url = format_clone_url(repo_url, credentials);

        match Repository::clone(&clone_url, dir.path()) {
            Ok(_) => Ok(Self {
                dir: Some(dir),
                url: repo_url.to_string(),
            }),
            Err(e) => {
                // TempDir drop removes the partial clone.
                Err(VigilError::Git(format!(
                    "failed to clone {repo_url}: {}",
                    e.message()
                )))
            }
        }
    }

    /// Path of the checkout root.
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// The repository URL this checkout came from, without credentials.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the checkout as a git2 repository.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Git`] if the checkout cannot be opened.
    pub fn repository(&self) -> Result<Repository, VigilError> {
        Repository::open(self.path())
            .map_err(|e| VigilError::Git(format!("failed to open clone: {}", e.message())))
    }

    /// Remove the temporary checkout now instead of at drop time.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if removal fails even after clearing
    /// read-only bits.
    pub fn cleanup(mut self) -> Result<(), VigilError> {
        if let Some(dir) = self.dir.take() {
            clear_readonly(dir.path());
            dir.close()?;
        }
        Ok(())
    }
}

impl Drop for ClonedRepo {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            clear_readonly(dir.path());
            // Best effort; TempDir's own drop already logs nothing.
            let _ = dir.close();
        }
    }
}

/// Recursively clear read-only permissions so removal succeeds on
/// platforms where git marks pack files read-only.
fn clear_readonly(path: &Path) {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return;
    };
    let mut perms = metadata.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        let _ = std::fs::set_permissions(path, perms);
    }
    if metadata.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else {
            return;
        };
        for entry in entries.flatten() {
            clear_readonly(&entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_of_unreachable_url_fails_and_cleans_up() {
        let before = std::env::temp_dir();
        let result = ClonedRepo::clone("file:///nonexistent/definitely/missing", None);
        assert!(result.is_err());
        // No stale handle left behind; temp dir root still usable.
        assert!(before.exists());
    }

    #[test]
    fn clone_local_repository_works() {
        // Build a tiny source repo, then clone it via a file:// URL.
        let src = tempfile::tempdir().unwrap();
        let repo = Repository::init(src.path()).unwrap();
        std::fs::write(src.path().join("a.py"), "print('hi')\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("a.py")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("alice", "alice@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        let url = format!("file://{}", src.path().display());
        let cloned = ClonedRepo::clone(&url, None).unwrap();
        assert!(cloned.path().join("a.py").exists());
        assert_eq!(cloned.url(), url);

        let checkout_path = cloned.path().to_path_buf();
        cloned.cleanup().unwrap();
        assert!(!checkout_path.exists());
    }

    #[test]
    fn clear_readonly_unlocks_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("objects");
        std::fs::create_dir(&nested).unwrap();
        let file = nested.join("pack");
        std::fs::write(&file, "data").unwrap();
        let mut perms = std::fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&file, perms).unwrap();

        clear_readonly(dir.path());
        assert!(!std::fs::metadata(&file).unwrap().permissions().readonly());
    }

}
