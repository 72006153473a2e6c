//! Artifact store for the two generated source files.
//!
//! The workspace directory holds exactly two generated artifacts under fixed
//! logical names, plus an `env/` subdirectory owned by the sandbox that is
//! provisioning-only state, never an artifact. The store owns an explicit
//! root path injected at construction; nothing reads ambient state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// Logical name of the generated test module.
pub const TEST_MODULE: &str = "test_main.py";
/// Logical name of the generated implementation module (stub or real).
pub const IMPL_MODULE: &str = "main.py";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace directory containing the artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write an artifact, creating the workspace directory lazily.
    pub fn write(&self, name: &str, content: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create workspace {}", self.root.display()))?;
        let path = self.path(name);
        debug!(artifact = name, bytes = content.len(), "writing artifact");
        fs::write(&path, content).with_context(|| format!("write {}", path.display()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Read an artifact back (diagnostics and tests).
    pub fn read(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Delete an artifact. No-op when it does not exist.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(());
        }
        debug!(artifact = name, "deleting artifact");
        fs::remove_file(&path).with_context(|| format!("delete {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_workspace_lazily() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path().join("app"));
        assert!(!store.root().exists());

        store.write(TEST_MODULE, "def test_x(): pass\n").expect("write");
        assert!(store.exists(TEST_MODULE));
        assert_eq!(store.read(TEST_MODULE).expect("read"), "def test_x(): pass\n");
    }

    #[test]
    fn write_overwrites_existing_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path());
        store.write(IMPL_MODULE, "old").expect("write");
        store.write(IMPL_MODULE, "new").expect("rewrite");
        assert_eq!(store.read(IMPL_MODULE).expect("read"), "new");
    }

    #[test]
    fn delete_missing_artifact_is_a_noop() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path());
        store.delete(IMPL_MODULE).expect("delete absent");
    }

    #[test]
    fn delete_removes_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(temp.path());
        store.write(TEST_MODULE, "x").expect("write");
        store.delete(TEST_MODULE).expect("delete");
        assert!(!store.exists(TEST_MODULE));
    }
}
