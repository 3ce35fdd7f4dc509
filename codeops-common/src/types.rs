//! Closed vocabularies of the `/code` surface: actions, languages and error codes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the caller wants done with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Run,
    Lint,
    Test,
    Fix,
    Format,
    Explain,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Run,
        Action::Lint,
        Action::Test,
        Action::Fix,
        Action::Format,
        Action::Explain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Run => "run",
            Action::Lint => "lint",
            Action::Test => "test",
            Action::Fix => "fix",
            Action::Format => "format",
            Action::Explain => "explain",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(Action::Run),
            "lint" => Ok(Action::Lint),
            "test" => Ok(Action::Test),
            "fix" => Ok(Action::Fix),
            "format" => Ok(Action::Format),
            "explain" => Ok(Action::Explain),
            other => Err(format!(
                "Invalid action '{}'. Expected one of: run, lint, test, fix, format, explain",
                other
            )),
        }
    }
}

/// Source languages the engine knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Bash,
    Node,
}

impl Language {
    pub const ALL: [Language; 4] = [
        Language::Python,
        Language::JavaScript,
        Language::Bash,
        Language::Node,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Bash => "bash",
            Language::Node => "node",
        }
    }

    /// Extension given to temporary files holding inline content
    pub fn default_extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript | Language::Node => "js",
            Language::Bash => "sh",
        }
    }

    /// All file extensions accepted as belonging to this language
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyw"],
            Language::JavaScript | Language::Node => &["js", "mjs", "cjs"],
            Language::Bash => &["sh", "bash"],
        }
    }

    pub fn accepts_extension(self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.extensions().iter().any(|known| *known == extension)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "javascript" => Ok(Language::JavaScript),
            "bash" => Ok(Language::Bash),
            "node" => Ok(Language::Node),
            other => Err(format!("Unsupported language '{}'", other)),
        }
    }
}

/// Stable error codes surfaced to callers for programmatic branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnsupportedLanguage,
    FileNotFound,
    InvalidArgs,
    InvalidContent,
    ConcurrentAccess,
    ExecutionError,
    NoTestsFound,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnsupportedLanguage => "unsupported_language",
            ErrorCode::FileNotFound => "file_not_found",
            ErrorCode::InvalidArgs => "invalid_args",
            ErrorCode::InvalidContent => "invalid_content",
            ErrorCode::ConcurrentAccess => "concurrent_access",
            ErrorCode::ExecutionError => "execution_error",
            ErrorCode::NoTestsFound => "no_tests_found",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
