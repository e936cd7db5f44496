//! Scratch git repositories for tests that shell out to git.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// A temporary git repository with a configured committer.
pub struct GitRepoFixture {
    temp_dir: TempDir,
}

impl GitRepoFixture {
    /// Initialize an empty repository.
    ///
    /// # Panics
    ///
    /// Panics if the temp dir cannot be created or git fails.
    #[must_use]
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        };
        fixture.git(&["init", "-q"]);
        fixture.git(&["config", "user.email", "test@example.com"]);
        fixture.git(&["config", "user.name", "Test User"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);
        fixture
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the repository root, creating parents.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let path = self.path().join(relative_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Delete a tracked file from the working tree.
    ///
    /// # Panics
    ///
    /// Panics if the file does not exist.
    pub fn remove_file(&self, relative_path: &str) {
        std::fs::remove_file(self.path().join(relative_path)).expect("Failed to remove file");
    }

    /// Stage everything and commit.
    pub fn commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// Hash of the current HEAD commit.
    ///
    /// # Panics
    ///
    /// Panics if git fails.
    #[must_use]
    pub fn head(&self) -> String {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(self.path())
            .output()
            .expect("Failed to get commit hash");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn git(&self, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("Failed to run git")
            .status;
        assert!(status.success(), "git {:?} failed", args);
    }
}
