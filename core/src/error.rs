//! Error types for declaration, parsing, and dispatch.
//!
//! [`DeclarationError`] covers malformed option and command declarations and
//! is raised while registering. [`CliError`] covers everything raised while
//! parsing and dispatching an invocation.

use thiserror::Error;

/// Boxed error returned by command handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Malformed option or command declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// The option spec produced no alias names (e.g. `""` or `"<value>"`).
    #[error("option `{0}` declares no names")]
    EmptyOptionName(String),
    /// None of the option aliases is written in long (`--name`) form.
    #[error("option `{0}` must declare a long form")]
    MissingLongName(String),
    /// A bracketed argument segment is malformed (e.g. `<>` or `[...]`).
    #[error("invalid argument `{arg}` in command `{command}`")]
    InvalidArgument { command: String, arg: String },
    /// A required positional argument follows an optional one.
    #[error("required argument `{arg}` follows an optional argument in command `{command}`")]
    RequiredAfterOptional { command: String, arg: String },
    /// More than one variadic argument was declared.
    #[error("command `{0}` declares more than one variadic argument")]
    MultipleVariadic(String),
    /// The variadic argument is not the last positional argument.
    #[error("variadic argument `{arg}` must be last in command `{command}`")]
    VariadicNotLast { command: String, arg: String },
    /// A second command with no literal name segments was registered.
    #[error("default command already registered: `{0}`")]
    DuplicateDefaultCommand(String),
    /// A command name (or alias) can never match because an earlier command
    /// claims the same leading segments.
    #[error("command `{name}` is shadowed by earlier command `{by}`")]
    ShadowedCommand { name: String, by: String },
    /// A command alias is empty or contains an argument placeholder.
    #[error("invalid alias `{alias}` for command `{command}`")]
    InvalidAlias { command: String, alias: String },
}

/// Errors raised while parsing or dispatching an invocation.
#[derive(Debug, Error)]
pub enum CliError {
    /// A declaration failed while registering.
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    /// An option key is not declared in the matched scope.
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    /// A required-value option was given without a value.
    #[error("option `{0}` value is missing")]
    MissingOptionValue(String),
    /// Fewer positional arguments than the command requires.
    #[error("missing required args for command `{0}`")]
    MissingRequiredArgs(String),
    /// The bound handler returned an error.
    #[error(transparent)]
    Handler(BoxError),
}

impl CliError {
    /// Builds an [`UnknownOption`](CliError::UnknownOption) error for a stored
    /// option key, rendering it the way it would be typed.
    ///
    /// # Examples
    ///
    /// ```
    /// use argweave_core::CliError;
    ///
    /// assert_eq!(CliError::unknown_option("force").to_string(), "unknown option `--force`");
    /// assert_eq!(CliError::unknown_option("f").to_string(), "unknown option `-f`");
    /// ```
    pub fn unknown_option(key: &str) -> Self {
        if key.chars().count() > 1 {
            Self::UnknownOption(format!("--{key}"))
        } else {
            Self::UnknownOption(format!("-{key}"))
        }
    }
}

/// Convenience alias for results with [`CliError`].
pub type Result<T> = std::result::Result<T, CliError>;
