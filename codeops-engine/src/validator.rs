//! Request validation: source selection, size/syntax checks, language/extension
//! agreement and the argument allowlist. Nothing here touches a process.
//!
//! [`Validator::validate`] runs before the source is materialized.
//! [`Validator::resolve_recipe`] runs after it, so a missing file is reported
//! ahead of an unsupported (language, action) pair or a disallowed flag.

use crate::config::EngineConfig;
use crate::dispatch::{ArgRule, DispatchTable, ExecutionRecipe};
use crate::error::{OperationError, Result};
use codeops_common::{Action, Language, OperationRequest};
use rustpython_parser::{ast, Parse};
use std::path::{Component, Path};

/// Characters that have meaning to a shell. Arguments are never passed
/// through one, but tokens carrying them are still refused outright.
const SHELL_METACHARACTERS: &[char] = &[
    ';', '|', '&', '$', '`', '<', '>', '(', ')', '{', '}', '[', ']', '*', '?', '!', '~', '\\',
    '\'', '"', '#',
];

/// Which source the operation works on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(String),
    Content(String),
}

/// A request that passed every static check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub action: Action,
    /// Always set except for `explain` without a declared language
    pub language: Option<Language>,
    pub source: Source,
    pub args: Vec<String>,
}

/// Validates requests against configured limits and the dispatch table
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    config: &'a EngineConfig,
    dispatch: &'a DispatchTable,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a EngineConfig, dispatch: &'a DispatchTable) -> Self {
        Self { config, dispatch }
    }

    pub fn validate(&self, request: &OperationRequest) -> Result<ValidatedRequest> {
        let action = request.action;

        // Content, when declared, is the active source and is checked first
        let source = match (&request.content, &request.path) {
            (Some(content), _) => {
                if action == Action::Explain {
                    return Err(OperationError::InvalidContent(
                        "Inline content is not supported for 'explain'; provide a path"
                            .to_string(),
                    ));
                }
                self.check_content_shape(content)?;
                Source::Content(content.clone())
            }
            (None, Some(path)) => {
                self.check_path_shape(path)?;
                Source::Path(path.clone())
            }
            (None, None) => {
                return Err(OperationError::InvalidContent(
                    "Either 'path' or 'content' must be provided".to_string(),
                ))
            }
        };

        let language = parse_language(action, request.language.as_deref())?;

        if let Some(language) = language {
            check_extension(language, &source)?;
        }

        if let (Source::Content(content), Some(Language::Python)) = (&source, language) {
            check_python_syntax(content)?;
        }

        let args = request.args.clone().unwrap_or_default();
        for arg in &args {
            check_token(arg)?;
        }

        Ok(ValidatedRequest {
            action,
            language,
            source,
            args,
        })
    }

    /// Find the recipe for a validated request and check its arguments
    /// against the recipe's allowlist. `explain` has no recipe.
    pub fn resolve_recipe(
        &self,
        validated: &ValidatedRequest,
    ) -> Result<Option<&'a ExecutionRecipe>> {
        let recipe = match (validated.action, validated.language) {
            (Action::Explain, _) => None,
            (action, Some(language)) => Some(self.dispatch.lookup(language, action)?),
            (action, None) => {
                return Err(OperationError::UnsupportedLanguage(format!(
                    "A language is required for '{}'",
                    action
                )))
            }
        };
        validate_args(validated.action, recipe, &validated.args)?;
        Ok(recipe)
    }

    fn check_content_shape(&self, content: &str) -> Result<()> {
        let chars = content.chars().count();
        if chars > self.config.max_content_chars {
            return Err(OperationError::InvalidContent(format!(
                "Content is {} characters; the maximum is {}",
                chars, self.config.max_content_chars
            )));
        }
        if content.contains('\0') {
            return Err(OperationError::InvalidContent(
                "Content contains NUL bytes and does not look like source code".to_string(),
            ));
        }
        Ok(())
    }

    fn check_path_shape(&self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(OperationError::FileNotFound(
                "Path is empty".to_string(),
            ));
        }
        if path.contains('\0') {
            return Err(OperationError::FileNotFound(
                "Path contains a NUL byte".to_string(),
            ));
        }
        if path.len() > self.config.max_path_len {
            return Err(OperationError::FileNotFound(format!(
                "Path is {} bytes long; the maximum is {}",
                path.len(),
                self.config.max_path_len
            )));
        }
        if Path::new(path)
            .components()
            .any(|c| c == Component::ParentDir)
        {
            return Err(OperationError::FileNotFound(format!(
                "Path traversal ('..') is not allowed: {}",
                path
            )));
        }
        Ok(())
    }
}

fn parse_language(action: Action, declared: Option<&str>) -> Result<Option<Language>> {
    match declared.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<Language>()
            .map(Some)
            .map_err(OperationError::UnsupportedLanguage),
        None if action == Action::Explain => Ok(None),
        None => Err(OperationError::UnsupportedLanguage(format!(
            "A language is required for '{}'",
            action
        ))),
    }
}

fn check_extension(language: Language, source: &Source) -> Result<()> {
    let extension = match source {
        Source::Path(path) => Path::new(path)
            .extension()
            .map(|ext| ext.to_string_lossy().to_string()),
        Source::Content(_) => Some(language.default_extension().to_string()),
    };

    match extension {
        Some(ext) if language.accepts_extension(&ext) => Ok(()),
        Some(ext) => Err(OperationError::UnsupportedLanguage(format!(
            "File extension '.{}' does not match language '{}' (expected one of: {})",
            ext,
            language,
            language.extensions().join(", ")
        ))),
        None => Err(OperationError::UnsupportedLanguage(format!(
            "File has no extension; language '{}' expects one of: {}",
            language,
            language.extensions().join(", ")
        ))),
    }
}

fn check_python_syntax(content: &str) -> Result<()> {
    ast::Suite::parse(content, "<content>")
        .map(|_| ())
        .map_err(|e| {
            OperationError::InvalidContent(format!(
                "Python syntax error (checked against the Python 3.11 grammar): {}",
                e
            ))
        })
}

/// Check user arguments against the recipe allowlist
pub fn validate_args(
    action: Action,
    recipe: Option<&ExecutionRecipe>,
    args: &[String],
) -> Result<()> {
    if args.is_empty() {
        return Ok(());
    }

    for arg in args {
        check_token(arg)?;
    }

    let recipe = match recipe {
        Some(recipe) if recipe.accepts_user_args => recipe,
        _ => {
            return Err(OperationError::InvalidArgs(format!(
                "Action '{}' does not accept extra arguments",
                action
            )))
        }
    };

    let mut index = 0;
    while index < args.len() {
        let arg = &args[index];
        let mut consumed = 0;

        for rule in &recipe.arg_rules {
            match rule {
                ArgRule::Exact(flag) if arg == flag => consumed = 1,
                ArgRule::Pattern(re) if re.is_match(arg) => consumed = 1,
                ArgRule::FlagWithValue { flag, value } if arg == flag => {
                    match args.get(index + 1) {
                        Some(next) if value.is_match(next) => consumed = 2,
                        Some(next) => {
                            return Err(OperationError::InvalidArgs(format!(
                                "Invalid value '{}' for '{}'",
                                next, flag
                            )))
                        }
                        None => {
                            return Err(OperationError::InvalidArgs(format!(
                                "'{}' requires a value",
                                flag
                            )))
                        }
                    }
                }
                _ => continue,
            }
            break;
        }

        if consumed == 0 {
            return Err(OperationError::InvalidArgs(format!(
                "Argument '{}' is not allowed for '{}'. Allowed: {}",
                arg,
                action,
                recipe.allowed_args_summary()
            )));
        }
        index += consumed;
    }

    Ok(())
}

fn check_token(arg: &str) -> Result<()> {
    if arg.is_empty() {
        return Err(OperationError::InvalidArgs(
            "Empty argument is not allowed".to_string(),
        ));
    }
    if let Some(c) = arg
        .chars()
        .find(|c| SHELL_METACHARACTERS.contains(c) || c.is_whitespace() || c.is_control())
    {
        return Err(OperationError::InvalidArgs(format!(
            "Argument '{}' contains forbidden character {:?}",
            arg.escape_debug(),
            c
        )));
    }
    Ok(())
}
