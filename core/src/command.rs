//! Command declarations.
//!
//! A command is declared from a name pattern such as `rm <dir>` or
//! `copy <src> [dest...]`. Leading plain words are the literal name segments
//! the invocation must start with; bracketed words declare positional
//! arguments. A pattern with no literal segments declares the default command.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::DeclarationError;
use crate::option::OptionSpec;

static ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:<([^<>\[\]]*)>|\[([^<>\[\]]*)\])$").expect("static regex must compile")
});

/// A positional argument declared in a command pattern.
///
/// # Examples
///
/// ```
/// use argweave_core::{CommandConfig, CommandSpec};
///
/// let cmd = CommandSpec::parse("copy <src> [dest...]", "", CommandConfig::default()).unwrap();
/// assert_eq!(cmd.args[0].name, "src");
/// assert!(cmd.args[0].required);
/// assert!(cmd.args[1].variadic);
/// assert!(!cmd.args[1].required);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgSpec {
    /// Argument name without brackets or dots.
    pub name: String,
    /// Declared with `<>` rather than `[]`.
    pub required: bool,
    /// Declared with `...`; absorbs the remaining positional tokens.
    pub variadic: bool,
}

impl ArgSpec {
    fn parse(command: &str, segment: &str) -> Result<Self, DeclarationError> {
        let invalid = || DeclarationError::InvalidArgument {
            command: command.to_string(),
            arg: segment.to_string(),
        };
        let caps = ARG_RE.captures(segment).ok_or_else(invalid)?;
        let (inner, required) = match (caps.get(1), caps.get(2)) {
            (Some(inner), _) => (inner.as_str(), true),
            (None, Some(inner)) => (inner.as_str(), false),
            (None, None) => return Err(invalid()),
        };

        let (name, variadic) = if let Some(name) = inner.strip_prefix("...") {
            (name, true)
        } else if let Some(name) = inner.strip_suffix("...") {
            (name, true)
        } else {
            (inner, false)
        };
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            required,
            variadic,
        })
    }
}

/// Per-command behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandConfig {
    /// Skip the unknown-option check when this command matches.
    pub allow_unknown_options: bool,
    /// Do not pre-fill declared defaults when this command matches.
    pub ignore_option_default_value: bool,
}

/// A declared command.
///
/// # Examples
///
/// ```
/// use argweave_core::{CommandConfig, CommandSpec};
///
/// let cmd = CommandSpec::parse("remote add <name> <url>", "Add a remote", CommandConfig::default()).unwrap();
/// assert_eq!(cmd.name, "remote add");
/// assert_eq!(cmd.segments, vec!["remote", "add"]);
/// assert_eq!(cmd.required_arg_count(), 2);
///
/// let default = CommandSpec::parse("[...files]", "", CommandConfig::default()).unwrap();
/// assert!(default.is_default());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    /// The pattern as declared.
    pub raw: String,
    /// Literal name segments.
    pub segments: Vec<String>,
    /// Literal segments joined by a space; empty for the default command.
    pub name: String,
    /// Positional arguments in declaration order.
    pub args: Vec<ArgSpec>,
    /// Alternative literal names.
    pub aliases: Vec<String>,
    /// Human-readable description.
    pub description: String,
    /// Options local to this command.
    pub options: Vec<OptionSpec>,
    /// Behavior switches.
    pub config: CommandConfig,
    /// Custom usage text for help collaborators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Example invocations for help collaborators.
    pub examples: Vec<String>,
}

impl CommandSpec {
    /// Parses a command name pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] when an argument segment is malformed,
    /// a literal word follows an argument, a required argument follows an
    /// optional one, or the variadic argument is repeated or not last.
    pub fn parse(
        raw: &str,
        description: &str,
        config: CommandConfig,
    ) -> Result<Self, DeclarationError> {
        let mut segments = Vec::new();
        let mut args: Vec<ArgSpec> = Vec::new();

        for segment in raw.split_whitespace() {
            if !segment.starts_with('<') && !segment.starts_with('[') {
                if !args.is_empty() {
                    return Err(DeclarationError::InvalidArgument {
                        command: raw.to_string(),
                        arg: segment.to_string(),
                    });
                }
                segments.push(segment.to_string());
                continue;
            }

            let arg = ArgSpec::parse(raw, segment)?;
            if let Some(variadic) = args.iter().find(|a| a.variadic) {
                if arg.variadic {
                    return Err(DeclarationError::MultipleVariadic(raw.to_string()));
                }
                return Err(DeclarationError::VariadicNotLast {
                    command: raw.to_string(),
                    arg: variadic.name.clone(),
                });
            }
            if arg.required && args.iter().any(|a| !a.required) {
                return Err(DeclarationError::RequiredAfterOptional {
                    command: raw.to_string(),
                    arg: arg.name,
                });
            }
            args.push(arg);
        }

        Ok(Self {
            raw: raw.to_string(),
            name: segments.join(" "),
            segments,
            args,
            aliases: Vec::new(),
            description: description.to_string(),
            options: Vec::new(),
            config,
            usage: None,
            examples: Vec::new(),
        })
    }

    /// The distinguished scope holding options that apply to every parse.
    pub(crate) fn global() -> Self {
        Self {
            raw: String::new(),
            segments: Vec::new(),
            name: String::new(),
            args: Vec::new(),
            aliases: Vec::new(),
            description: String::new(),
            options: Vec::new(),
            config: CommandConfig::default(),
            usage: None,
            examples: Vec::new(),
        }
    }

    /// Returns `true` when the pattern has no literal segments.
    pub fn is_default(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every literal form this command answers to: its name, then aliases.
    pub fn forms(&self) -> Vec<Vec<&str>> {
        let primary: Vec<&str> = self.segments.iter().map(String::as_str).collect();
        std::iter::once(primary)
            .chain(
                self.aliases
                    .iter()
                    .map(|alias| alias.split_whitespace().collect::<Vec<_>>()),
            )
            .filter(|form| !form.is_empty())
            .collect()
    }

    /// Returns how many leading positional tokens name this command, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use argweave_core::{CommandConfig, CommandSpec};
    ///
    /// let cmd = CommandSpec::parse("remote add <name>", "", CommandConfig::default()).unwrap();
    /// let tokens: Vec<String> = vec!["remote".into(), "add".into(), "origin".into()];
    /// assert_eq!(cmd.match_prefix(&tokens), Some(2));
    /// assert_eq!(cmd.match_prefix(&tokens[1..]), None);
    /// ```
    pub fn match_prefix(&self, positional: &[String]) -> Option<usize> {
        self.forms()
            .into_iter()
            .find(|form| {
                positional.len() >= form.len()
                    && form.iter().zip(positional).all(|(lit, token)| lit == token)
            })
            .map(|form| form.len())
    }

    /// Looks up an option by any alias. When several options share a name,
    /// the last one declared wins. Dot-path keys match on their first segment.
    pub fn find_option(&self, key: &str) -> Option<&OptionSpec> {
        let head = key.split('.').next().unwrap_or(key);
        self.options.iter().rev().find(|o| o.has_name(head))
    }

    /// Returns `true` if an option with this key is declared here.
    pub fn has_option(&self, key: &str) -> bool {
        self.find_option(key).is_some()
    }

    /// Number of positional tokens that must be supplied. Optional and
    /// variadic arguments do not count.
    pub fn required_arg_count(&self) -> usize {
        self.args.iter().filter(|a| a.required && !a.variadic).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<CommandSpec, DeclarationError> {
        CommandSpec::parse(raw, "", CommandConfig::default())
    }

    #[test]
    fn test_literal_and_args() {
        let cmd = parse("rm <dir>").unwrap();
        assert_eq!(cmd.name, "rm");
        assert_eq!(
            cmd.args,
            vec![ArgSpec {
                name: "dir".to_string(),
                required: true,
                variadic: false,
            }]
        );
    }

    #[test]
    fn test_variadic_forms() {
        let leading = parse("build [...files]").unwrap();
        let trailing = parse("build [files...]").unwrap();
        assert_eq!(leading.args, trailing.args);
        assert!(leading.args[0].variadic);
        assert_eq!(leading.args[0].name, "files");
    }

    #[test]
    fn test_default_command_patterns() {
        assert!(parse("").unwrap().is_default());
        assert!(parse("<file>").unwrap().is_default());
        assert!(!parse("serve [root]").unwrap().is_default());
    }

    #[test]
    fn test_rejects_required_after_optional() {
        assert_eq!(
            parse("cp [src] <dest>").unwrap_err(),
            DeclarationError::RequiredAfterOptional {
                command: "cp [src] <dest>".to_string(),
                arg: "dest".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_multiple_variadic() {
        assert_eq!(
            parse("cat <a...> [b...]").unwrap_err(),
            DeclarationError::MultipleVariadic("cat <a...> [b...]".to_string())
        );
    }

    #[test]
    fn test_rejects_variadic_not_last() {
        assert!(matches!(
            parse("cat [files...] [out]"),
            Err(DeclarationError::VariadicNotLast { arg, .. }) if arg == "files"
        ));
    }

    #[test]
    fn test_rejects_malformed_args() {
        assert!(matches!(
            parse("rm <>"),
            Err(DeclarationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse("rm [...]"),
            Err(DeclarationError::InvalidArgument { .. })
        ));
        assert!(matches!(
            parse("rm <dir> now"),
            Err(DeclarationError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_required_arg_count_skips_variadic() {
        assert_eq!(parse("cp <src> <dest...>").unwrap().required_arg_count(), 1);
        assert_eq!(parse("cp <src> [dest]").unwrap().required_arg_count(), 1);
    }

    #[test]
    fn test_match_prefix_uses_aliases() {
        let mut cmd = parse("install <pkg>").unwrap();
        cmd.aliases.push("i".to_string());
        let tokens = vec!["i".to_string(), "left-pad".to_string()];
        assert_eq!(cmd.match_prefix(&tokens), Some(1));
        assert_eq!(cmd.match_prefix(&["add".to_string()]), None);
    }

    #[test]
    fn test_default_command_never_matches_prefix() {
        let cmd = parse("[...files]").unwrap();
        assert_eq!(cmd.match_prefix(&["a".to_string()]), None);
    }
}
