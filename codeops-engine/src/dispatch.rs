//! Static (language, action) → execution recipe table

use crate::config::EngineConfig;
use crate::error::{OperationError, Result};
use codeops_common::{Action, Language};
use regex::Regex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// One allowlist entry for user-supplied tool arguments
#[derive(Debug, Clone)]
pub enum ArgRule {
    /// Token must equal the flag exactly
    Exact(&'static str),
    /// Token must fully match the pattern (e.g. `--max-line-length=120`)
    Pattern(Regex),
    /// Flag followed by a separate value token that must match the pattern
    FlagWithValue { flag: &'static str, value: Regex },
}

impl ArgRule {
    fn pattern(pattern: &str) -> Self {
        ArgRule::Pattern(anchored(pattern))
    }

    fn flag_with_value(flag: &'static str, value: &str) -> Self {
        ArgRule::FlagWithValue {
            flag,
            value: anchored(value),
        }
    }

    fn describe(&self) -> String {
        match self {
            ArgRule::Exact(flag) => (*flag).to_string(),
            ArgRule::Pattern(re) => re.as_str().to_string(),
            ArgRule::FlagWithValue { flag, value } => format!("{} {}", flag, value.as_str()),
        }
    }
}

// Only called with the built-in literals below.
fn anchored(pattern: &str) -> Regex {
    Regex::new(&format!("^(?:{})$", pattern)).unwrap_or_else(|e| {
        panic!("invalid built-in argument pattern {}: {}", pattern, e)
    })
}

/// How a tool's outcome is interpreted beyond its raw exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSemantics {
    /// Exit code is reported as-is
    Plain,
    /// Test runner that can report "nothing collected" distinctly
    TestRunner {
        no_tests_exit_code: Option<i32>,
        no_tests_marker: Option<&'static str>,
    },
}

impl ExitSemantics {
    /// Whether a finished run means no tests were discovered
    pub fn found_no_tests(&self, exit_code: i32, stdout: &str) -> bool {
        match self {
            ExitSemantics::Plain => false,
            ExitSemantics::TestRunner {
                no_tests_exit_code,
                no_tests_marker,
            } => {
                *no_tests_exit_code == Some(exit_code)
                    || no_tests_marker.is_some_and(|marker| {
                        stdout.lines().any(|line| line.trim() == marker)
                    })
            }
        }
    }
}

/// Immutable invocation recipe for a (language, action) pair
#[derive(Debug, Clone)]
pub struct ExecutionRecipe {
    pub executable: String,
    pub fixed_args: Vec<String>,
    pub accepts_user_args: bool,
    pub timeout: Duration,
    pub arg_rules: Vec<ArgRule>,
    pub exit_semantics: ExitSemantics,
}

impl ExecutionRecipe {
    /// `[executable] + fixed_args + user args (if accepted) + [target]`
    pub fn argv(&self, user_args: &[String], target: &Path) -> Vec<OsString> {
        let mut argv = Vec::with_capacity(2 + self.fixed_args.len() + user_args.len());
        argv.push(OsString::from(&self.executable));
        argv.extend(self.fixed_args.iter().map(OsString::from));
        if self.accepts_user_args {
            argv.extend(user_args.iter().map(OsString::from));
        }
        argv.push(target.as_os_str().to_os_string());
        argv
    }

    /// Human-readable summary of the allowlist, used in error messages
    pub fn allowed_args_summary(&self) -> String {
        self.arg_rules
            .iter()
            .map(ArgRule::describe)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Recipe template before config overrides are applied
struct RecipeSpec {
    tool: &'static str,
    fixed_args: &'static [&'static str],
    arg_rules: Vec<ArgRule>,
    exit_semantics: ExitSemantics,
}

impl RecipeSpec {
    fn new(tool: &'static str) -> Self {
        Self {
            tool,
            fixed_args: &[],
            arg_rules: Vec::new(),
            exit_semantics: ExitSemantics::Plain,
        }
    }

    fn fixed(mut self, args: &'static [&'static str]) -> Self {
        self.fixed_args = args;
        self
    }

    fn exact(mut self, flags: &[&'static str]) -> Self {
        self.arg_rules.extend(flags.iter().copied().map(ArgRule::Exact));
        self
    }

    fn rule(mut self, rule: ArgRule) -> Self {
        self.arg_rules.push(rule);
        self
    }

    fn semantics(mut self, semantics: ExitSemantics) -> Self {
        self.exit_semantics = semantics;
        self
    }

    fn build(self, config: &EngineConfig, action: Action) -> ExecutionRecipe {
        ExecutionRecipe {
            executable: config.executable_for(self.tool).to_string(),
            fixed_args: self.fixed_args.iter().map(|s| s.to_string()).collect(),
            accepts_user_args: !self.arg_rules.is_empty(),
            timeout: config.timeout_for(action),
            arg_rules: self.arg_rules,
            exit_semantics: self.exit_semantics,
        }
    }
}

const FLAKE8_CODES: &str = r"[A-Z]{1,3}[0-9]{0,4}(,[A-Z]{1,3}[0-9]{0,4})*";

fn python_recipe(action: Action) -> Option<RecipeSpec> {
    let spec = match action {
        Action::Run => RecipeSpec::new("python3")
            .exact(&["-B", "-O", "-OO", "-u", "-v", "-q", "-s", "-S", "-E", "-I"])
            .rule(ArgRule::pattern(r"-W(default|error|ignore|always|module|once)"))
            .rule(ArgRule::pattern(r"-X[a-z_]+(=[A-Za-z0-9_.]+)?")),
        Action::Lint => RecipeSpec::new("flake8")
            .exact(&["--show-source", "--statistics", "--count", "-q"])
            .rule(ArgRule::pattern(r"--max-line-length=[0-9]{1,4}"))
            .rule(ArgRule::pattern(r"--max-complexity=[0-9]{1,3}"))
            .rule(ArgRule::pattern(&format!(
                "--(select|ignore|extend-ignore|extend-select)={}",
                FLAKE8_CODES
            ))),
        Action::Test => RecipeSpec::new("pytest")
            .fixed(&["-q", "-p", "no:cacheprovider"])
            .exact(&["-v", "-vv", "-x", "-s", "-q", "--no-header"])
            .rule(ArgRule::pattern(r"--tb=(auto|long|short|line|native|no)"))
            .rule(ArgRule::pattern(r"--maxfail=[0-9]{1,4}"))
            .rule(ArgRule::flag_with_value("-k", r"[A-Za-z0-9_]+"))
            .semantics(ExitSemantics::TestRunner {
                // pytest: "no tests were collected"
                no_tests_exit_code: Some(5),
                no_tests_marker: None,
            }),
        Action::Fix => RecipeSpec::new("autopep8")
            .fixed(&["--in-place"])
            .exact(&["--aggressive", "-a"])
            .rule(ArgRule::pattern(r"--max-line-length=[0-9]{1,4}"))
            .rule(ArgRule::pattern(&format!("--(select|ignore)={}", FLAKE8_CODES))),
        Action::Format => RecipeSpec::new("black")
            .exact(&[
                "--skip-string-normalization",
                "-S",
                "--check",
                "--diff",
                "--quiet",
                "-q",
                "--fast",
            ])
            .rule(ArgRule::pattern(r"--line-length=[0-9]{1,4}"))
            .rule(ArgRule::flag_with_value("-l", r"[0-9]{1,4}"))
            .rule(ArgRule::pattern(r"--target-version=py3[0-9]{1,2}")),
        Action::Explain => return None,
    };
    Some(spec)
}

fn javascript_recipe(action: Action) -> Option<RecipeSpec> {
    let eslint_rules = |spec: RecipeSpec| {
        spec.exact(&["--quiet", "--no-eslintrc", "--no-ignore", "--no-color"])
            .rule(ArgRule::pattern(r"--max-warnings=-?[0-9]{1,5}"))
            .rule(ArgRule::pattern(r"--format=[a-z][a-z-]{0,31}"))
    };

    let spec = match action {
        Action::Run => RecipeSpec::new("node")
            .exact(&[
                "--no-warnings",
                "--trace-warnings",
                "--enable-source-maps",
                "--no-deprecation",
            ])
            .rule(ArgRule::pattern(r"--max-old-space-size=[0-9]{1,6}"))
            .rule(ArgRule::pattern(r"--stack-size=[0-9]{1,6}")),
        Action::Lint => eslint_rules(RecipeSpec::new("eslint")),
        Action::Test => RecipeSpec::new("node")
            .fixed(&["--test", "--test-reporter=tap"])
            .exact(&["--test-only"])
            .rule(ArgRule::pattern(r"--test-name-pattern=[A-Za-z0-9_.-]+"))
            .semantics(ExitSemantics::TestRunner {
                no_tests_exit_code: None,
                // TAP summary line emitted by `node --test`
                no_tests_marker: Some("# tests 0"),
            }),
        Action::Fix => eslint_rules(RecipeSpec::new("eslint").fixed(&["--fix"])),
        Action::Format => RecipeSpec::new("prettier")
            .fixed(&["--write"])
            .exact(&["--single-quote", "--no-semi", "--use-tabs"])
            .rule(ArgRule::pattern(r"--tab-width=[0-9]{1,2}"))
            .rule(ArgRule::pattern(r"--print-width=[0-9]{1,4}"))
            .rule(ArgRule::pattern(r"--trailing-comma=(all|es5|none)")),
        Action::Explain => return None,
    };
    Some(spec)
}

fn bash_recipe(action: Action) -> Option<RecipeSpec> {
    let spec = match action {
        Action::Run => RecipeSpec::new("bash").exact(&["-e", "-u", "-x", "-v", "-n"]),
        Action::Lint => RecipeSpec::new("shellcheck")
            .rule(ArgRule::pattern(r"--severity=(error|warning|info|style)"))
            .rule(ArgRule::flag_with_value("-S", r"error|warning|info|style"))
            .rule(ArgRule::pattern(r"--shell=(bash|sh|dash|ksh)"))
            .rule(ArgRule::pattern(r"--exclude=SC[0-9]{4}(,SC[0-9]{4})*"))
            .rule(ArgRule::pattern(
                r"--format=(tty|gcc|json|json1|checkstyle|diff|quiet)",
            )),
        Action::Format => RecipeSpec::new("shfmt")
            .fixed(&["-w"])
            .exact(&["-bn", "-ci", "-sr", "-s", "-kp"])
            .rule(ArgRule::pattern(r"-i=[0-9]{1,2}")),
        Action::Test | Action::Fix | Action::Explain => return None,
    };
    Some(spec)
}

/// Read-only lookup table built once from configuration
#[derive(Debug, Clone)]
pub struct DispatchTable {
    recipes: HashMap<(Language, Action), ExecutionRecipe>,
}

impl DispatchTable {
    pub fn new(config: &EngineConfig) -> Self {
        let mut recipes = HashMap::new();
        for language in Language::ALL {
            for action in Action::ALL {
                let spec = match language {
                    Language::Python => python_recipe(action),
                    Language::JavaScript | Language::Node => javascript_recipe(action),
                    Language::Bash => bash_recipe(action),
                };
                if let Some(spec) = spec {
                    recipes.insert((language, action), spec.build(config, action));
                }
            }
        }
        Self { recipes }
    }

    pub fn lookup(&self, language: Language, action: Action) -> Result<&ExecutionRecipe> {
        self.recipes.get(&(language, action)).ok_or_else(|| {
            OperationError::UnsupportedLanguage(format!(
                "Action '{}' is not supported for language '{}'",
                action, language
            ))
        })
    }

    pub fn supports(&self, language: Language, action: Action) -> bool {
        self.recipes.contains_key(&(language, action))
    }

    /// All recipes ordered by (language, action)
    pub fn entries(&self) -> Vec<(Language, Action, &ExecutionRecipe)> {
        let mut entries: Vec<_> = self
            .recipes
            .iter()
            .map(|((language, action), recipe)| (*language, *action, recipe))
            .collect();
        entries.sort_by_key(|(language, action, _)| (*language, *action));
        entries
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
