//! Rejections that happen before any lock or subprocess

use crate::common::{setup_test_logging, TestWorkspace};
use assert_matches::assert_matches;
use codeops_common::{Action, ErrorCode, OperationRequest, OperationResponse};

async fn error_code(workspace: &TestWorkspace, request: OperationRequest) -> ErrorCode {
    let response = workspace.engine().execute(request).await;
    assert!(response.duration() >= 0.0);
    response
        .error_code()
        .unwrap_or_else(|| panic!("expected an error, got {response:?}"))
}

#[tokio::test]
async fn test_missing_file_for_existing_file_actions() {
    setup_test_logging();
    let workspace = TestWorkspace::new();
    let missing = workspace.root().join("absent.py").to_string_lossy().to_string();

    for action in [Action::Lint, Action::Test, Action::Format, Action::Explain] {
        let request = OperationRequest::for_path(action, missing.clone()).with_language("python");
        assert_eq!(
            error_code(&workspace, request).await,
            ErrorCode::FileNotFound,
            "{action}"
        );
    }

    // bash has no test recipe; the missing file is still what gets reported
    let missing_script = workspace.root().join("absent.sh").to_string_lossy().to_string();
    let request = OperationRequest::for_path(Action::Test, missing_script).with_language("bash");
    assert_eq!(error_code(&workspace, request).await, ErrorCode::FileNotFound);
}

#[tokio::test]
async fn test_missing_file_for_run_and_fix() {
    let workspace = TestWorkspace::new();
    let missing = workspace.root().join("absent.py").to_string_lossy().to_string();

    for action in [Action::Run, Action::Fix] {
        let request = OperationRequest::for_path(action, missing.clone()).with_language("python");
        assert_eq!(error_code(&workspace, request).await, ErrorCode::FileNotFound);
    }
}

#[tokio::test]
async fn test_oversized_content_beats_valid_path() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("valid.py", "print('ok')\n");

    let mut request = OperationRequest::for_content(Action::Run, "#".repeat(100_001))
        .with_language("python");
    request.path = Some(path);

    assert_eq!(error_code(&workspace, request).await, ErrorCode::InvalidContent);
    assert!(workspace.scratch_is_empty());
}

#[tokio::test]
async fn test_python_syntax_error_is_invalid_content() {
    let workspace = TestWorkspace::new();
    let response = workspace
        .engine()
        .execute(OperationRequest::for_content(Action::Run, "def f(:").with_language("python"))
        .await;

    assert_matches!(
        response,
        OperationResponse::Error { ref error, .. } if error.code == ErrorCode::InvalidContent
            && error.message.contains("syntax")
    );
}

#[tokio::test]
async fn test_shell_injection_in_args() {
    let workspace = TestWorkspace::new();
    let request = OperationRequest::for_content(Action::Run, "echo safe")
        .with_language("bash")
        .with_args(["; rm -rf /"]);

    assert_eq!(error_code(&workspace, request).await, ErrorCode::InvalidArgs);
}

#[tokio::test]
async fn test_args_outside_allowlist() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("app.js", "console.log(1)\n");

    let request = OperationRequest::for_path(Action::Run, path)
        .with_language("node")
        .with_args(["--require=/tmp/evil.js"]);
    assert_eq!(error_code(&workspace, request).await, ErrorCode::InvalidArgs);
}

#[tokio::test]
async fn test_unsupported_languages_and_pairs() {
    let workspace = TestWorkspace::new();

    let ruby = OperationRequest::for_content(Action::Run, "puts 1").with_language("ruby");
    assert_eq!(error_code(&workspace, ruby).await, ErrorCode::UnsupportedLanguage);

    let script = workspace.write("check.sh", "echo 1\n");
    let bash_test = OperationRequest::for_path(Action::Test, script.clone()).with_language("bash");
    assert_eq!(error_code(&workspace, bash_test).await, ErrorCode::UnsupportedLanguage);

    let bash_fix = OperationRequest::for_path(Action::Fix, script).with_language("bash");
    assert_eq!(error_code(&workspace, bash_fix).await, ErrorCode::UnsupportedLanguage);

    let no_language = OperationRequest::for_content(Action::Lint, "x = 1");
    assert_eq!(error_code(&workspace, no_language).await, ErrorCode::UnsupportedLanguage);
}

#[tokio::test]
async fn test_extension_must_match_language() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("script.py", "print(1)\n");

    let request = OperationRequest::for_path(Action::Lint, path).with_language("javascript");
    assert_eq!(error_code(&workspace, request).await, ErrorCode::UnsupportedLanguage);
}

#[tokio::test]
async fn test_source_combinations() {
    let workspace = TestWorkspace::new();

    let mut neither = OperationRequest::for_content(Action::Run, "").with_language("python");
    neither.content = None;
    assert_eq!(error_code(&workspace, neither).await, ErrorCode::InvalidContent);

    let explain_content = OperationRequest::for_content(Action::Explain, "print(1)");
    assert_eq!(error_code(&workspace, explain_content).await, ErrorCode::InvalidContent);

    let binary = OperationRequest::for_content(Action::Run, "echo \0").with_language("bash");
    assert_eq!(error_code(&workspace, binary).await, ErrorCode::InvalidContent);
}

#[tokio::test]
async fn test_malformed_paths() {
    let workspace = TestWorkspace::new();

    for path in [String::new(), "bad\0name.py".to_string(), format!("/{}.py", "x".repeat(5000))] {
        let request = OperationRequest::for_path(Action::Lint, path).with_language("python");
        assert_eq!(error_code(&workspace, request).await, ErrorCode::FileNotFound);
    }

    // Parent components are refused even when they resolve to a real file
    workspace.write("secret.py", "x = 1\n");
    std::fs::create_dir(workspace.root().join("sub")).unwrap();
    let through_parent = workspace
        .root()
        .join("sub/../secret.py")
        .to_string_lossy()
        .to_string();
    for path in [through_parent, "../etc/passwd".to_string()] {
        let request = OperationRequest::for_path(Action::Explain, path.clone());
        let response = workspace.engine().execute(request).await;
        assert_matches!(
            response,
            OperationResponse::Error { ref error, .. }
                if error.code == ErrorCode::FileNotFound && error.message.contains("traversal"),
            "{path}"
        );
    }
}

#[tokio::test]
async fn test_wire_format_of_json_request() {
    let workspace = TestWorkspace::new();
    let request: OperationRequest = serde_json::from_value(serde_json::json!({
        "action": "run",
        "language": "bash",
        "content": "echo hi",
        "args": "-e $(whoami)"
    }))
    .unwrap();

    let response = workspace.engine().execute(request).await;
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["outcome"], "error");
    assert_eq!(json["error"]["code"], "invalid_args");
    assert!(json["error"]["message"].as_str().unwrap().contains("$(whoami)"));
    assert!(json["duration"].as_f64().unwrap() >= 0.0);
    assert!(json.get("exit_code").is_none());
}
