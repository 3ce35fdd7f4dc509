//! Contention, timeouts and cleanup with real subprocesses and fake tools

use crate::common::{fake_tools, setup_test_logging, tool_available, tool_path, TestWorkspace};
use codeops_common::{Action, ErrorCode, OperationRequest};
use codeops_engine::{CodeOpsEngine, LockTable};
use std::time::Duration;

#[tokio::test]
async fn test_same_file_rejects_second_format() {
    setup_test_logging();
    let workspace = TestWorkspace::new();
    let shared = workspace.write("shared.py", "x=1\n");
    let config = workspace
        .config()
        .with_executable("black", tool_path(&fake_tools().slow));
    let engine = workspace.engine_with(config);

    let request = OperationRequest::for_path(Action::Format, shared).with_language("python");
    let (first, second) = tokio::join!(engine.execute(request.clone()), engine.execute(request));

    let (winner, loser) = if first.is_ok() { (first, second) } else { (second, first) };
    assert!(winner.is_ok(), "{winner:?}");
    assert!(winner.stdout().unwrap().contains("shared.py"));
    assert_eq!(loser.error_code(), Some(ErrorCode::ConcurrentAccess));
    // Rejected without waiting for the holder
    assert!(loser.duration() < 0.5, "waited {}s", loser.duration());

    assert_eq!(engine.lock_table().stats().active, 0);
}

#[tokio::test]
async fn test_distinct_files_run_in_parallel() {
    let workspace = TestWorkspace::new();
    let a = workspace.write("a.py", "x=1\n");
    let b = workspace.write("b.py", "y=2\n");
    let config = workspace
        .config()
        .with_executable("black", tool_path(&fake_tools().slow));
    let engine = workspace.engine_with(config);

    let (ra, rb) = tokio::join!(
        engine.execute(OperationRequest::for_path(Action::Format, a).with_language("python")),
        engine.execute(OperationRequest::for_path(Action::Format, b).with_language("python")),
    );

    assert!(ra.is_ok(), "{ra:?}");
    assert!(rb.is_ok(), "{rb:?}");
    // Both finished within roughly one tool run, not two
    assert!(ra.duration().max(rb.duration()) < 1.9);
}

#[tokio::test]
async fn test_inline_content_never_contends() {
    let workspace = TestWorkspace::new();
    let config = workspace
        .config()
        .with_executable("flake8", tool_path(&fake_tools().slow));
    let engine = workspace.engine_with(config);

    let requests = (0..4).map(|_| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .execute(OperationRequest::for_content(Action::Lint, "x = 1\n").with_language("python"))
                .await
        })
    });

    for handle in requests.collect::<Vec<_>>() {
        let response = handle.await.unwrap();
        assert!(response.is_ok(), "{response:?}");
        assert!(response.content_hash().is_some());
    }
    assert!(workspace.scratch_is_empty());
}

#[tokio::test]
async fn test_lock_table_shared_between_engines() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("job.sh", "echo job\n");
    let locks = LockTable::new();
    let config = workspace
        .config()
        .with_executable("shellcheck", tool_path(&fake_tools().slow));

    let linting = CodeOpsEngine::with_lock_table(config.clone(), locks.clone());
    let formatting = CodeOpsEngine::with_lock_table(config, locks.clone());

    let lint = OperationRequest::for_path(Action::Lint, path.clone()).with_language("bash");
    let format = OperationRequest::for_path(Action::Format, path).with_language("bash");

    let slow = tokio::spawn(async move { linting.execute(lint).await });
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(locks.holders().len(), 1);

    let rejected = formatting.execute(format).await;
    assert_eq!(rejected.error_code(), Some(ErrorCode::ConcurrentAccess));

    assert!(slow.await.unwrap().is_ok());
    assert!(locks.holders().is_empty());
}

#[tokio::test]
async fn test_timeout_kills_tool_and_releases_lock() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("stuck.py", "x = 1\n");
    let mut config = workspace
        .config()
        .with_executable("flake8", tool_path(&fake_tools().hang));
    config.timeouts.lint = Some(Duration::from_millis(300));
    let engine = workspace.engine_with(config);

    let request = OperationRequest::for_path(Action::Lint, path).with_language("python");
    let response = engine.execute(request.clone()).await;

    assert_eq!(response.error_code(), Some(ErrorCode::ExecutionError));
    assert!(response.duration() < 5.0);
    assert_eq!(engine.lock_table().stats().active, 0);

    // The key is free again: a retry times out instead of contending
    let retry = engine.execute(request).await;
    assert_eq!(retry.error_code(), Some(ErrorCode::ExecutionError));
}

#[tokio::test]
async fn test_exit_code_five_from_pytest_means_no_tests() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("test_empty.py", "VALUE = 1\n");
    let config = workspace
        .config()
        .with_executable("pytest", tool_path(&fake_tools().no_tests));
    let engine = workspace.engine_with(config);

    let response = engine
        .execute(OperationRequest::for_path(Action::Test, path).with_language("python"))
        .await;
    assert_eq!(response.error_code(), Some(ErrorCode::NoTestsFound));
}

#[tokio::test]
async fn test_missing_executable_is_execution_error() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("app.js", "console.log(1)\n");
    let config = workspace
        .config()
        .with_executable("eslint", "/nonexistent/bin/eslint");
    let engine = workspace.engine_with(config);

    let response = engine
        .execute(OperationRequest::for_path(Action::Lint, path).with_language("javascript"))
        .await;
    assert_eq!(response.error_code(), Some(ErrorCode::ExecutionError));
    assert_eq!(engine.lock_table().stats().active, 0);
}

#[tokio::test]
async fn test_repeated_calls_leak_nothing() {
    if !tool_available("echo") {
        return;
    }
    let workspace = TestWorkspace::new();
    let config = workspace.config().with_executable("python3", "echo");
    let engine = workspace.engine_with(config);

    for i in 0..10 {
        let response = engine
            .execute(
                OperationRequest::for_content(Action::Run, format!("print({i})"))
                    .with_language("python")
                    .with_args(["-B"]),
            )
            .await;
        assert!(response.is_ok(), "{response:?}");
        // echo prints the argument vector it was given
        assert!(response.stdout().unwrap().starts_with("-B "));
    }

    let stats = engine.lock_table().stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.total_acquisitions, 10);
    assert_eq!(stats.total_contentions, 0);
    assert!(workspace.scratch_is_empty());
}
