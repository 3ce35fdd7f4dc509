//! Common test utilities shared across integration and E2E tests

pub mod fake_tools;

pub use fake_tools::*;

use codeops_engine::{CodeOpsEngine, EngineConfig, LockTable};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Setup logging for tests
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("codeops_engine=debug")
        .with_test_writer()
        .try_init();
}

/// Whether `name` resolves to a file somewhere on `PATH`
pub fn tool_available(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}

/// True when every tool is installed; otherwise logs why the test is skipped
pub fn require_tools(tools: &[&str]) -> bool {
    match tools.iter().find(|tool| !tool_available(tool)) {
        Some(missing) => {
            eprintln!("skipping: '{}' is not installed", missing);
            false
        }
        None => true,
    }
}

/// SHA-256 hex computed independently of the engine
pub fn sha256_hex(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Source files and a private scratch directory for one test
pub struct TestWorkspace {
    dir: TempDir,
    scratch: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let scratch = dir.path().join("scratch");
        Self { dir, scratch }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a source file and return its path as a request would carry it
    pub fn write(&self, name: &str, body: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).expect("Failed to write fixture");
        path.to_string_lossy().to_string()
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read fixture")
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::default().with_scratch_dir(&self.scratch)
    }

    pub fn engine(&self) -> CodeOpsEngine {
        CodeOpsEngine::new(self.config())
    }

    pub fn engine_with(&self, config: EngineConfig) -> CodeOpsEngine {
        CodeOpsEngine::with_lock_table(config, LockTable::new())
    }

    /// No temporary content file survived
    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(&self.scratch)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
