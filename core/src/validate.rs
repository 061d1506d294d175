//! Invocation validation.
//!
//! Checks a matched command's constraints against the parse result before
//! its handler runs: unknown options, required-value options given without a
//! value, and missing required positional arguments.
//!
//! # Examples
//!
//! ```
//! use argweave_core::{Cli, CliError};
//!
//! let mut cli: Cli = Cli::new("app");
//! cli.command("rm <dir>", "Remove a directory").unwrap();
//!
//! let err = cli.parse((), &["rm"], true).unwrap_err();
//! assert!(matches!(err, CliError::MissingRequiredArgs(_)));
//! ```

use serde_json::Value;

use crate::assign::{Options, PASSTHROUGH_KEY};
use crate::command::CommandSpec;
use crate::error::{CliError, Result};
use crate::option::ValueShape;
use crate::tokenizer::RawOptions;

/// Runs every check in order: unknown options, option values, then
/// required arguments.
///
/// # Errors
///
/// Returns the first failing check's [`CliError`].
pub fn validate_invocation(
    global: &CommandSpec,
    command: &CommandSpec,
    options: &Options,
    raw: &RawOptions,
    args: &[String],
) -> Result<()> {
    check_unknown_options(global, command, options)?;
    check_option_values(global, command, raw)?;
    check_required_args(command, args)
}

/// Fails on the first stored key not declared by the global scope or the
/// command, unless the command allows unknown options.
///
/// # Errors
///
/// Returns [`CliError::UnknownOption`].
pub fn check_unknown_options(
    global: &CommandSpec,
    command: &CommandSpec,
    options: &Options,
) -> Result<()> {
    if command.config.allow_unknown_options {
        return Ok(());
    }
    match options
        .keys()
        .filter(|key| *key != PASSTHROUGH_KEY)
        .find(|key| !command.has_option(key) && !global.has_option(key))
    {
        Some(key) => Err(CliError::unknown_option(key)),
        None => Ok(()),
    }
}

/// Fails when a required-value option was given as a bare flag. A `false`
/// value is accepted only when a negated option shares the name.
///
/// Checks the tokenizer's raw values, so defaults and coercions never mask
/// or fake a missing value.
///
/// # Errors
///
/// Returns [`CliError::MissingOptionValue`] carrying the option's raw spec.
pub fn check_option_values(
    global: &CommandSpec,
    command: &CommandSpec,
    raw: &RawOptions,
) -> Result<()> {
    let declared: Vec<_> = global.options.iter().chain(command.options.iter()).collect();

    for option in declared.iter().filter(|o| o.shape == ValueShape::Required) {
        let head = option.name.split('.').next().unwrap_or(&option.name);
        let has_negated = declared
            .iter()
            .any(|o| o.negated && o.has_name(&option.name));
        let bare = |value: &Value| match value {
            Value::Bool(true) => true,
            Value::Bool(false) => !has_negated,
            _ => false,
        };
        let missing = match raw.get(head) {
            Some(Value::Array(items)) => items.iter().any(bare),
            Some(value) => bare(value),
            None => false,
        };
        if missing {
            return Err(CliError::MissingOptionValue(option.raw.clone()));
        }
    }
    Ok(())
}

/// Fails when fewer positional tokens were supplied than the command
/// requires.
///
/// # Errors
///
/// Returns [`CliError::MissingRequiredArgs`] carrying the command pattern.
pub fn check_required_args(command: &CommandSpec, args: &[String]) -> Result<()> {
    if args.len() < command.required_arg_count() {
        return Err(CliError::MissingRequiredArgs(command.raw.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::assign::assign;
    use crate::command::CommandConfig;
    use crate::option::{OptionConfig, OptionSpec};
    use crate::tokenizer::{OptionSet, tokenize};

    fn command(raw: &str, options: &[&str]) -> CommandSpec {
        let mut spec = CommandSpec::parse(raw, "", CommandConfig::default()).unwrap();
        for option in options {
            spec.options
                .push(OptionSpec::parse(option, "", OptionConfig::default()).unwrap());
        }
        spec
    }

    fn parse(global: &CommandSpec, command: &CommandSpec, argv: &[&str]) -> Options {
        let set = OptionSet::new(global.options.iter().chain(command.options.iter()));
        let tokens = tokenize(argv, &set);
        Options::new(assign(&tokens.raw, &set, false), HashMap::new(), tokens.passthrough)
    }

    fn raw(global: &CommandSpec, command: &CommandSpec, argv: &[&str]) -> RawOptions {
        let set = OptionSet::new(global.options.iter().chain(command.options.iter()));
        tokenize(argv, &set).raw
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let global = command("", &["-h, --help"]);
        let rm = command("rm <dir>", &["-r, --recursive"]);
        let options = parse(&global, &rm, &["--force"]);
        let err = check_unknown_options(&global, &rm, &options).unwrap_err();
        assert_eq!(err.to_string(), "unknown option `--force`");
    }

    #[test]
    fn test_known_options_pass() {
        let global = command("", &["-h, --help"]);
        let rm = command("rm <dir>", &["-r, --recursive"]);
        let options = parse(&global, &rm, &["-r", "-h", "--", "--force"]);
        assert!(check_unknown_options(&global, &rm, &options).is_ok());
    }

    #[test]
    fn test_allow_unknown_options() {
        let global = command("", &[]);
        let mut rm = command("rm <dir>", &[]);
        rm.config.allow_unknown_options = true;
        let options = parse(&global, &rm, &["-x"]);
        assert!(check_unknown_options(&global, &rm, &options).is_ok());
    }

    #[test]
    fn test_short_unknown_option_message() {
        let global = command("", &[]);
        let rm = command("rm", &[]);
        let options = parse(&global, &rm, &["-x"]);
        let err = check_unknown_options(&global, &rm, &options).unwrap_err();
        assert_eq!(err.to_string(), "unknown option `-x`");
    }

    #[test]
    fn test_bare_required_value_is_missing() {
        let global = command("", &[]);
        let build = command("build", &["--out <dir>"]);
        let err = check_option_values(&global, &build, &raw(&global, &build, &["--out"])).unwrap_err();
        assert!(matches!(err, CliError::MissingOptionValue(spec) if spec == "--out <dir>"));

        let supplied = raw(&global, &build, &["--out", "dist"]);
        assert!(check_option_values(&global, &build, &supplied).is_ok());

        let absent = raw(&global, &build, &[]);
        assert!(check_option_values(&global, &build, &absent).is_ok());
    }

    #[test]
    fn test_bare_repeat_of_required_value_is_missing() {
        let global = command("", &[]);
        let build = command("build", &["--out <dir>"]);
        let repeated = raw(&global, &build, &["--out", "a", "--out"]);
        assert!(matches!(
            check_option_values(&global, &build, &repeated),
            Err(CliError::MissingOptionValue(_))
        ));
        let supplied = raw(&global, &build, &["--out", "a", "--out", "b"]);
        assert!(check_option_values(&global, &build, &supplied).is_ok());
    }

    #[test]
    fn test_negated_counterpart_allows_false() {
        let global = command("", &[]);
        let build = command("build", &["--config <path>", "--no-config"]);
        assert!(check_option_values(&global, &build, &raw(&global, &build, &["--no-config"])).is_ok());
        assert!(check_option_values(&global, &build, &raw(&global, &build, &[])).is_ok());

        let plain = command("build", &["--config <path>"]);
        assert!(check_option_values(&global, &plain, &raw(&global, &plain, &["--no-config"])).is_err());
    }

    #[test]
    fn test_default_does_not_count_as_bare_flag() {
        let global = command("", &[]);
        let mut build = command("build", &[]);
        build.options.push(
            OptionSpec::parse("--mode <mode>", "", OptionConfig::default().with_default(true))
                .unwrap(),
        );
        let options = parse(&global, &build, &[]);
        assert_eq!(options.get_bool("mode"), Some(true));
        assert!(check_option_values(&global, &build, &raw(&global, &build, &[])).is_ok());
    }

    #[test]
    fn test_required_args() {
        let rm = command("rm <dir> [more...]", &[]);
        assert!(check_required_args(&rm, &[]).is_err());
        assert!(check_required_args(&rm, &["a".to_string()]).is_ok());
    }
}
