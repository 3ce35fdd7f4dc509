//! Request and response payloads exchanged with the code operations engine

use crate::types::{Action, ErrorCode};
use serde::{Deserialize, Deserializer, Serialize};

/// Inbound request to run, lint, test, fix, format or explain a unit of code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRequest {
    pub action: Action,

    /// Declared language. Kept as the raw string so that unknown languages
    /// surface as `unsupported_language` instead of a decoding failure.
    #[serde(default)]
    pub language: Option<String>,

    /// Target file on disk
    #[serde(default)]
    pub path: Option<String>,

    /// Inline source; takes precedence over `path` when both are given
    #[serde(default)]
    pub content: Option<String>,

    /// Extra tool arguments, either a JSON array or a whitespace separated string
    #[serde(default, deserialize_with = "deserialize_args")]
    pub args: Option<Vec<String>>,
}

impl OperationRequest {
    /// Create a request targeting a file on disk
    pub fn for_path(action: Action, path: impl Into<String>) -> Self {
        Self {
            action,
            language: None,
            path: Some(path.into()),
            content: None,
            args: None,
        }
    }

    /// Create a request carrying inline content
    pub fn for_content(action: Action, content: impl Into<String>) -> Self {
        Self {
            action,
            language: None,
            path: None,
            content: Some(content.into()),
            args: None,
        }
    }

    /// Set the declared language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Append tool arguments
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args
            .get_or_insert_with(Vec::new)
            .extend(args.into_iter().map(Into::into));
        self
    }
}

fn deserialize_args<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawArgs {
        List(Vec<String>),
        Line(String),
    }

    Ok(match Option::<RawArgs>::deserialize(deserializer)? {
        None => None,
        Some(RawArgs::List(list)) => Some(list),
        Some(RawArgs::Line(line)) => Some(line.split_whitespace().map(str::to_string).collect()),
    })
}

/// Error payload carried by a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// Outbound response, tagged by `outcome`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum OperationResponse {
    Ok {
        stdout: String,
        stderr: String,
        exit_code: i32,
        /// Elapsed seconds from validation start to response
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_hash: Option<String>,
    },
    Error {
        error: ErrorBody,
        duration: f64,
    },
}

impl OperationResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationResponse::Ok { .. })
    }

    pub fn duration(&self) -> f64 {
        match self {
            OperationResponse::Ok { duration, .. } | OperationResponse::Error { duration, .. } => {
                *duration
            }
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            OperationResponse::Error { error, .. } => Some(error.code),
            OperationResponse::Ok { .. } => None,
        }
    }

    pub fn stdout(&self) -> Option<&str> {
        match self {
            OperationResponse::Ok { stdout, .. } => Some(stdout),
            OperationResponse::Error { .. } => None,
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            OperationResponse::Ok { exit_code, .. } => Some(*exit_code),
            OperationResponse::Error { .. } => None,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        match self {
            OperationResponse::Ok { content_hash, .. } => content_hash.as_deref(),
            OperationResponse::Error { .. } => None,
        }
    }
}
