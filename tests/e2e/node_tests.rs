//! End-to-end runs against Node.js

use crate::common::{require_tools, TestWorkspace};
use codeops_common::{Action, OperationRequest};

/// Major version of the installed node, if it can be determined
fn node_major_version() -> Option<u32> {
    let output = std::process::Command::new("node").arg("--version").output().ok()?;
    let version = String::from_utf8_lossy(&output.stdout);
    version.trim().trim_start_matches('v').split('.').next()?.parse().ok()
}

#[tokio::test]
async fn test_run_inline_javascript() {
    if !require_tools(&["node"]) {
        return;
    }
    let workspace = TestWorkspace::new();

    let response = workspace
        .engine()
        .execute(
            OperationRequest::for_content(Action::Run, "console.log(6 * 7);\n")
                .with_language("javascript"),
        )
        .await;

    assert_eq!(response.stdout(), Some("42\n"), "{response:?}");
    assert_eq!(response.exit_code(), Some(0));
}

#[tokio::test]
async fn test_uncaught_exception_is_a_result() {
    if !require_tools(&["node"]) {
        return;
    }
    let workspace = TestWorkspace::new();
    let path = workspace.write("boom.mjs", "throw new Error('boom');\n");

    let response = workspace
        .engine()
        .execute(OperationRequest::for_path(Action::Run, path).with_language("node"))
        .await;

    assert_eq!(response.exit_code(), Some(1), "{response:?}");
}

#[tokio::test]
async fn test_node_test_runner() {
    if !require_tools(&["node"]) || node_major_version().map_or(true, |major| major < 20) {
        return;
    }
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "math.test.js",
        "const test = require('node:test');\nconst assert = require('node:assert');\n\
         test('adds', () => { assert.strictEqual(1 + 1, 2); });\n",
    );

    let response = workspace
        .engine()
        .execute(OperationRequest::for_path(Action::Test, path).with_language("node"))
        .await;

    assert_eq!(response.exit_code(), Some(0), "{response:?}");
    assert!(response.stdout().unwrap().contains("# pass 1"));
}
