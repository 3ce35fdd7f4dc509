//! Stand-in executables installed through the `executables` override

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

/// Scripts shared by every test in the binary. Written once so no test
/// execs a file another thread still has open for writing.
pub struct FakeTools {
    _dir: TempDir,
    /// Sleeps one second, then reports its arguments
    pub slow: PathBuf,
    /// Sleeps far longer than any test timeout
    pub hang: PathBuf,
    /// Exits like pytest when nothing was collected
    pub no_tests: PathBuf,
}

static FAKE_TOOLS: OnceLock<FakeTools> = OnceLock::new();

pub fn fake_tools() -> &'static FakeTools {
    FAKE_TOOLS.get_or_init(|| {
        let dir = tempfile::tempdir().expect("Failed to create fake tool dir");
        let slow = install(dir.path(), "slow-tool", "sleep 1\necho \"done $*\"\n");
        let hang = install(dir.path(), "hang-tool", "sleep 30\n");
        let no_tests = install(
            dir.path(),
            "no-tests-tool",
            "echo 'collected 0 items'\nexit 5\n",
        );
        FakeTools {
            _dir: dir,
            slow,
            hang,
            no_tests,
        }
    })
}

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("Failed to write fake tool");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to mark fake tool executable");
    path
}

/// Path of a fake tool as an override value
pub fn tool_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
