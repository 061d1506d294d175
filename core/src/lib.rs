//! Declarative command-line parsing and dispatch.
//!
//! A program is declared as a [`Cli`]: global options, then commands built
//! from name patterns such as `rm <dir>` or `[...files]`, each with its own
//! options and an optional handler. Parsing an invocation runs a fixed
//! pipeline:
//!
//! - [`tokenize`] splits raw tokens into positional tokens, flag values, and
//!   the passthrough tail after `--`, using the candidate command's options
//!   to decide which flags take values.
//! - [`Cli::match_command`] picks the first named command whose literal
//!   name prefixes the positional tokens, falling back to the default
//!   command.
//! - [`assign`] fills declared defaults, writes flag values along their dot
//!   paths, and applies declared coercions.
//! - Help and version flags short-circuit through a [`Presenter`].
//! - [`validate_invocation`] rejects unknown options, bare required-value
//!   flags, and missing required arguments before the handler runs.
//!
//! # Example
//!
//! ```
//! use argweave_core::*;
//! use serde_json::json;
//!
//! let mut cli: Cli = Cli::new("fs");
//! cli.option("--no-clear-screen", "Keep the screen").unwrap();
//! cli.command("rm <dir>", "Remove a directory")
//!     .unwrap()
//!     .option("-r, --recursive", "Remove recursively")
//!     .unwrap();
//!
//! let ctx = cli.parse((), &["rm", "-r", "tmp"], true).unwrap();
//! assert_eq!(ctx.matched_command_name.as_deref(), Some("rm"));
//! assert_eq!(ctx.args, vec!["tmp"]);
//! assert_eq!(ctx.options.get_bool("r"), Some(true));
//! assert_eq!(ctx.options.get_bool("clearScreen"), Some(true));
//!
//! let ctx = cli.parse((), &["--no-clear-screen"], true).unwrap();
//! assert_eq!(ctx.options.to_value(), json!({"clearScreen": false, "--": []}));
//! ```

mod assign;
mod command;
mod error;
mod option;
mod program;
mod tokenizer;
mod validate;

pub use assign::{Options, PASSTHROUGH_KEY, assign, set_dot_path};
pub use command::{ArgSpec, CommandConfig, CommandSpec};
pub use error::{BoxError, CliError, DeclarationError, Result};
pub use option::{
    Cast, Coercion, OptionConfig, OptionSpec, ValueShape, camelcase_option_name, normalize_key,
};
pub use program::{
    ArgValue, Cli, CommandBuilder, CommandId, Context, DEFAULT_PROGRAM_NAME, Handler,
    HelpRequest, Invocation, Match, MatchEvent, Presenter, expand_args,
};
pub use tokenizer::{OptionSet, RawOptions, Tokens, looks_like_flag, tokenize};
pub use validate::{
    check_option_values, check_required_args, check_unknown_options, validate_invocation,
};
