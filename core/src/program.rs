//! Command registry, matching, and dispatch.
//!
//! [`Cli`] owns the global scope and every registered command. Commands are
//! referenced by [`CommandId`]; handlers are stored beside the descriptors so
//! that [`CommandSpec`] stays plain data. [`Cli::parse`] runs the pipeline:
//! match a command, assign options, short-circuit on help/version, validate,
//! and dispatch.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::assign::{Options, assign};
use crate::command::{ArgSpec, CommandConfig, CommandSpec};
use crate::error::{BoxError, CliError, DeclarationError, Result};
use crate::option::{OptionConfig, OptionSpec};
use crate::tokenizer::{OptionSet, RawOptions, Tokens, tokenize};
use crate::validate::validate_invocation;

/// Program name used when none is given.
pub const DEFAULT_PROGRAM_NAME: &str = "cli";

/// Stable handle to a registered command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CommandId(usize);

impl CommandId {
    /// Registration index of the command.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A positional value handed to a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// A single argument; `None` when an optional one was not supplied.
    Single(Option<String>),
    /// The variadic tail.
    Variadic(Vec<String>),
}

/// What a handler receives besides the environment.
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    /// One entry per declared positional argument.
    pub args: Vec<ArgValue>,
    /// The final options mapping.
    pub options: Options,
}

impl Invocation {
    /// Returns the single argument at `index`, if supplied.
    pub fn arg(&self, index: usize) -> Option<&str> {
        match self.args.get(index) {
            Some(ArgValue::Single(value)) => value.as_deref(),
            _ => None,
        }
    }

    /// Returns the variadic tail at `index`, or an empty slice.
    pub fn rest(&self, index: usize) -> &[String] {
        match self.args.get(index) {
            Some(ArgValue::Variadic(values)) => values,
            _ => &[],
        }
    }
}

/// Expands positional tokens against declared arguments: each argument takes
/// one token, and a variadic argument takes the rest.
pub fn expand_args(specs: &[ArgSpec], args: &[String]) -> Vec<ArgValue> {
    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            if spec.variadic {
                ArgValue::Variadic(args.get(index..).unwrap_or(&[]).to_vec())
            } else {
                ArgValue::Single(args.get(index).cloned())
            }
        })
        .collect()
}

/// A bound command handler.
pub type Handler<E, R> = Box<dyn Fn(&E, Invocation) -> std::result::Result<R, BoxError>>;

/// Emitted to observers once matching is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    /// A named command matched under the given typed name.
    Command(String),
    /// The default command matched.
    Default,
    /// Nothing matched but positional tokens were present.
    Unmatched,
}

impl MatchEvent {
    /// Event key: `command:<name>`, `command:!` or `command:*`.
    pub fn key(&self) -> String {
        match self {
            MatchEvent::Command(name) => format!("command:{name}"),
            MatchEvent::Default => "command:!".to_string(),
            MatchEvent::Unmatched => "command:*".to_string(),
        }
    }
}

/// Data handed to a [`Presenter`] when help is requested.
#[derive(Debug, Clone, Copy)]
pub struct HelpRequest<'a> {
    /// Program name.
    pub program: &'a str,
    /// Global scope (options, usage, examples).
    pub global: &'a CommandSpec,
    /// All registered commands.
    pub commands: &'a [CommandSpec],
    /// The command matched before help cleared it.
    pub matched: Option<&'a CommandSpec>,
}

/// Renders help and version output. Formatting is entirely up to the
/// implementor.
pub trait Presenter {
    /// Called when the help flag is set and help is enabled.
    fn show_help(&mut self, request: &HelpRequest<'_>);

    /// Called when the version flag is set, version is enabled, and no named
    /// command matched.
    fn show_version(&mut self, program: &str, version: &str);
}

/// Outcome of command matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The matched command.
    pub command: Option<CommandId>,
    /// The literal name as typed (an alias if one was used). `None` for the
    /// default command and when nothing matched.
    pub command_name: Option<String>,
    /// Tokenizer output with the command name segments removed.
    pub tokens: Tokens,
}

/// Per-parse invocation state.
#[derive(Debug)]
pub struct Context<E, R> {
    /// Caller-supplied value passed through untouched.
    pub env: E,
    /// Tokens as given to [`Cli::parse`].
    pub raw_args: Vec<String>,
    /// Program name.
    pub name: String,
    /// Positional tokens with the command name removed.
    pub args: Vec<String>,
    /// The final options mapping.
    pub options: Options,
    /// Raw flag values before defaults and coercion.
    pub raw_options: RawOptions,
    /// The matched command.
    pub matched_command: Option<CommandId>,
    /// The literal command name as typed.
    pub matched_command_name: Option<String>,
    /// Set when help output replaced dispatch.
    pub help_shown: bool,
    /// Set when version output replaced dispatch.
    pub version_shown: bool,
    /// Whatever the handler returned.
    pub result: Option<R>,
}

/// A command-line program: global scope, commands, handlers, and features.
///
/// # Examples
///
/// ```
/// use argweave_core::Cli;
/// use serde_json::json;
///
/// let mut cli: Cli<(), String> = Cli::new("fs");
/// cli.command("rm <dir>", "Remove a directory")
///     .unwrap()
///     .option("-r, --recursive", "Remove recursively")
///     .unwrap()
///     .action(|_env, inv| Ok(format!("rm {}", inv.arg(0).unwrap_or_default())));
///
/// let ctx = cli.parse((), &["rm", "a/b", "-r"], true).unwrap();
/// assert_eq!(ctx.matched_command_name.as_deref(), Some("rm"));
/// assert_eq!(ctx.args, vec!["a/b"]);
/// assert_eq!(ctx.options.to_value(), json!({"recursive": true, "--": []}));
/// assert_eq!(ctx.result.as_deref(), Some("rm a/b"));
/// ```
pub struct Cli<E = (), R = ()> {
    name: String,
    global: CommandSpec,
    commands: Vec<CommandSpec>,
    handlers: Vec<Option<Handler<E, R>>>,
    help_key: Option<String>,
    version: Option<(String, String)>,
    observers: Vec<Box<dyn FnMut(&MatchEvent)>>,
    presenter: Option<Box<dyn Presenter>>,
}

impl<E, R> fmt::Debug for Cli<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("name", &self.name)
            .field("global", &self.global)
            .field("commands", &self.commands)
            .field("help_key", &self.help_key)
            .field("version", &self.version)
            .field("observers", &self.observers.len())
            .field("presenter", &self.presenter.is_some())
            .finish()
    }
}

impl<E, R> Cli<E, R> {
    /// Creates an empty program. An empty name becomes
    /// [`DEFAULT_PROGRAM_NAME`].
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() {
                DEFAULT_PROGRAM_NAME.to_string()
            } else {
                name
            },
            global: CommandSpec::global(),
            commands: Vec::new(),
            handlers: Vec::new(),
            help_key: None,
            version: None,
            observers: Vec::new(),
            presenter: None,
        }
    }

    /// Program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The global scope.
    pub fn global(&self) -> &CommandSpec {
        &self.global
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Descriptor of a registered command.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different [`Cli`] with fewer commands.
    pub fn command_spec(&self, id: CommandId) -> &CommandSpec {
        &self.commands[id.0]
    }

    /// Finds a command by its literal name or an alias.
    pub fn find_command(&self, name: &str) -> Option<CommandId> {
        let wanted: Vec<&str> = name.split_whitespace().collect();
        self.commands
            .iter()
            .position(|c| c.forms().iter().any(|form| *form == wanted))
            .map(CommandId)
    }

    /// Returns `true` if help short-circuiting is enabled.
    pub fn help_enabled(&self) -> bool {
        self.help_key.is_some()
    }

    /// The version string, if version short-circuiting is enabled.
    pub fn version_string(&self) -> Option<&str> {
        self.version.as_ref().map(|(v, _)| v.as_str())
    }

    /// Declares a global option.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the spec is malformed.
    pub fn option(&mut self, raw: &str, description: &str) -> std::result::Result<&mut Self, DeclarationError> {
        self.option_with(raw, description, OptionConfig::default())
    }

    /// Declares a global option with a default value or coercion.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the spec is malformed.
    pub fn option_with(
        &mut self,
        raw: &str,
        description: &str,
        config: OptionConfig,
    ) -> std::result::Result<&mut Self, DeclarationError> {
        let spec = OptionSpec::parse(raw, description, config)?;
        self.global.options.push(spec);
        Ok(self)
    }

    /// Sets the global usage text.
    pub fn usage(&mut self, text: &str) -> &mut Self {
        self.global.usage = Some(text.to_string());
        self
    }

    /// Adds a global example.
    pub fn example(&mut self, text: &str) -> &mut Self {
        self.global.examples.push(text.to_string());
        self
    }

    /// Suppresses default-filling for every parse.
    pub fn ignore_option_default_value(&mut self) -> &mut Self {
        self.global.config.ignore_option_default_value = true;
        self
    }

    /// Registers `-h, --help` and enables help short-circuiting.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in spec; the signature matches
    /// [`option`](Cli::option).
    pub fn help(&mut self) -> std::result::Result<&mut Self, DeclarationError> {
        self.help_with("-h, --help")
    }

    /// Enables help short-circuiting with custom flags.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the flag spec is malformed.
    pub fn help_with(&mut self, flags: &str) -> std::result::Result<&mut Self, DeclarationError> {
        let spec = OptionSpec::parse(flags, "Display this message", OptionConfig::default())?;
        self.help_key = Some(spec.name.clone());
        self.global.options.push(spec);
        Ok(self)
    }

    /// Registers `-v, --version` and enables version short-circuiting.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in spec; the signature matches
    /// [`option`](Cli::option).
    pub fn version(&mut self, version: &str) -> std::result::Result<&mut Self, DeclarationError> {
        self.version_with(version, "-v, --version")
    }

    /// Enables version short-circuiting with custom flags.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the flag spec is malformed.
    pub fn version_with(
        &mut self,
        version: &str,
        flags: &str,
    ) -> std::result::Result<&mut Self, DeclarationError> {
        let spec = OptionSpec::parse(flags, "Display version number", OptionConfig::default())?;
        self.version = Some((version.to_string(), spec.name.clone()));
        self.global.options.push(spec);
        Ok(self)
    }

    /// Registers an observer called synchronously after each match.
    pub fn on_match(&mut self, observer: impl FnMut(&MatchEvent) + 'static) -> &mut Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Sets the help/version collaborator.
    pub fn set_presenter(&mut self, presenter: impl Presenter + 'static) -> &mut Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the pattern is malformed, a second
    /// default command is registered, or an earlier command would always
    /// match first.
    pub fn command(
        &mut self,
        raw: &str,
        description: &str,
    ) -> std::result::Result<CommandBuilder<'_, E, R>, DeclarationError> {
        self.command_with(raw, description, CommandConfig::default())
    }

    /// Registers a command with explicit behavior switches.
    ///
    /// # Errors
    ///
    /// See [`command`](Cli::command).
    pub fn command_with(
        &mut self,
        raw: &str,
        description: &str,
        config: CommandConfig,
    ) -> std::result::Result<CommandBuilder<'_, E, R>, DeclarationError> {
        let spec = CommandSpec::parse(raw, description, config)?;
        if spec.is_default() {
            if let Some(existing) = self.commands.iter().find(|c| c.is_default()) {
                return Err(DeclarationError::DuplicateDefaultCommand(existing.raw.clone()));
            }
        } else {
            let form: Vec<&str> = spec.segments.iter().map(String::as_str).collect();
            check_shadowing(&self.commands, self.commands.len(), &form)?;
        }

        let id = CommandId(self.commands.len());
        self.commands.push(spec);
        self.handlers.push(None);
        Ok(CommandBuilder { cli: self, id })
    }

    /// Reopens a registered command for further configuration.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different [`Cli`] with fewer commands.
    pub fn configure(&mut self, id: CommandId) -> CommandBuilder<'_, E, R> {
        CommandBuilder { cli: self, id }
    }

    fn option_set<'a>(&'a self, command: Option<&'a CommandSpec>) -> OptionSet<'a> {
        OptionSet::new(
            self.global
                .options
                .iter()
                .chain(command.into_iter().flat_map(|c| c.options.iter())),
        )
    }

    /// Decides which command an invocation targets.
    ///
    /// Named commands are tried in registration order, each with its own
    /// option set; the first whose literal name prefixes the positional
    /// tokens wins. Otherwise the default command matches if registered.
    /// Otherwise nothing matches and global options alone are used.
    pub fn match_command<S: AsRef<str>>(&self, argv: &[S]) -> Match {
        for (index, command) in self.commands.iter().enumerate() {
            if command.is_default() {
                continue;
            }
            let mut tokens = tokenize(argv, &self.option_set(Some(command)));
            if let Some(consumed) = command.match_prefix(&tokens.positional) {
                let typed = tokens.positional.drain(..consumed).collect::<Vec<_>>().join(" ");
                debug!(command = %command.name, typed = %typed, args = ?tokens.positional, "Matched command");
                return Match {
                    command: Some(CommandId(index)),
                    command_name: Some(typed),
                    tokens,
                };
            }
        }

        if let Some(index) = self.commands.iter().position(CommandSpec::is_default) {
            let tokens = tokenize(argv, &self.option_set(Some(&self.commands[index])));
            debug!(args = ?tokens.positional, "Matched default command");
            return Match {
                command: Some(CommandId(index)),
                command_name: None,
                tokens,
            };
        }

        let tokens = tokenize(argv, &self.option_set(None));
        debug!(args = ?tokens.positional, "No command matched");
        Match {
            command: None,
            command_name: None,
            tokens,
        }
    }

    /// Parses an invocation and, when `run` is set, validates and dispatches
    /// the matched command.
    ///
    /// `argv` holds the invocation tokens only (no executable path).
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when validation fails or the handler fails.
    pub fn parse<S: AsRef<str>>(&mut self, env: E, argv: &[S], run: bool) -> Result<Context<E, R>> {
        let matched = self.match_command(argv);
        let event = match (&matched.command, &matched.command_name) {
            (Some(_), Some(name)) => Some(MatchEvent::Command(name.clone())),
            (Some(_), None) => Some(MatchEvent::Default),
            (None, _) if !matched.tokens.positional.is_empty() => Some(MatchEvent::Unmatched),
            (None, _) => None,
        };
        if let Some(event) = event {
            for observer in &mut self.observers {
                observer(&event);
            }
        }

        let command = matched.command.map(|id| &self.commands[id.0]);
        let ignore_defaults = command.is_some_and(|c| c.config.ignore_option_default_value)
            || self.global.config.ignore_option_default_value;
        let set = self.option_set(command);
        let values = assign(&matched.tokens.raw, &set, ignore_defaults);
        let options = Options::new(values, set.alias_table(), matched.tokens.passthrough);

        let mut ctx = Context {
            env,
            raw_args: argv.iter().map(|a| a.as_ref().to_string()).collect(),
            name: self.name.clone(),
            args: matched.tokens.positional,
            options,
            raw_options: matched.tokens.raw,
            matched_command: matched.command,
            matched_command_name: matched.command_name,
            help_shown: false,
            version_shown: false,
            result: None,
        };

        let mut run = run;
        if self.help_key.as_deref().is_some_and(|key| ctx.options.is_set(key)) {
            debug!(command = ?ctx.matched_command_name, "Help requested");
            if let Some(presenter) = self.presenter.as_mut() {
                presenter.show_help(&HelpRequest {
                    program: &self.name,
                    global: &self.global,
                    commands: &self.commands,
                    matched: ctx.matched_command.map(|id| &self.commands[id.0]),
                });
            }
            ctx.help_shown = true;
            run = false;
            ctx.matched_command = None;
            ctx.matched_command_name = None;
        }

        if let Some((version, key)) = &self.version {
            if ctx.options.is_set(key) && ctx.matched_command_name.is_none() {
                debug!(version = %version, "Version requested");
                if let Some(presenter) = self.presenter.as_mut() {
                    presenter.show_version(&self.name, version);
                }
                ctx.version_shown = true;
                run = false;
                ctx.matched_command = None;
                ctx.matched_command_name = None;
            }
        }

        if run && ctx.matched_command.is_some() {
            self.validate(&ctx)?;
            self.dispatch(&mut ctx)?;
        }
        Ok(ctx)
    }

    /// Checks the matched command's constraints. Does nothing when no
    /// command matched.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::UnknownOption`], [`CliError::MissingOptionValue`]
    /// or [`CliError::MissingRequiredArgs`].
    pub fn validate(&self, ctx: &Context<E, R>) -> Result<()> {
        let Some(id) = ctx.matched_command else {
            return Ok(());
        };
        validate_invocation(
            &self.global,
            &self.commands[id.0],
            &ctx.options,
            &ctx.raw_options,
            &ctx.args,
        )
    }

    /// Invokes the matched command's handler and stores its return value.
    /// Does nothing when no command matched or the command has no handler.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Handler`] with the handler's error unchanged.
    pub fn dispatch(&self, ctx: &mut Context<E, R>) -> Result<()> {
        let Some(id) = ctx.matched_command else {
            return Ok(());
        };
        let Some(handler) = self.handlers[id.0].as_ref() else {
            return Ok(());
        };
        let command = &self.commands[id.0];
        let invocation = Invocation {
            args: expand_args(&command.args, &ctx.args),
            options: ctx.options.clone(),
        };
        debug!(command = %command.raw, "Dispatching handler");
        let result = handler(&ctx.env, invocation).map_err(CliError::Handler)?;
        ctx.result = Some(result);
        Ok(())
    }
}

/// Fails if any command other than `skip` has a literal form that prefixes
/// `form` and is registered before `position`, or is prefixed by `form` and
/// registered after it. Either way one of the two could never match.
fn check_shadowing(
    commands: &[CommandSpec],
    position: usize,
    form: &[&str],
) -> std::result::Result<(), DeclarationError> {
    for (index, other) in commands.iter().enumerate() {
        if index == position || other.is_default() {
            continue;
        }
        for other_form in other.forms() {
            let (earlier, later) = if index < position {
                (other_form.as_slice(), form)
            } else {
                (form, other_form.as_slice())
            };
            if later.starts_with(earlier) {
                let (name, by) = if index < position {
                    (form.join(" "), other.name.clone())
                } else {
                    (other.name.clone(), form.join(" "))
                };
                return Err(DeclarationError::ShadowedCommand { name, by });
            }
        }
    }
    Ok(())
}

/// Chained configuration for one registered command.
#[derive(Debug)]
pub struct CommandBuilder<'a, E, R> {
    cli: &'a mut Cli<E, R>,
    id: CommandId,
}

impl<E, R> CommandBuilder<'_, E, R> {
    fn spec(&mut self) -> &mut CommandSpec {
        &mut self.cli.commands[self.id.0]
    }

    /// The command's handle.
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Declares an option local to this command.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the spec is malformed.
    pub fn option(self, raw: &str, description: &str) -> std::result::Result<Self, DeclarationError> {
        self.option_with(raw, description, OptionConfig::default())
    }

    /// Declares a local option with a default value or coercion.
    ///
    /// # Errors
    ///
    /// Returns a [`DeclarationError`] if the spec is malformed.
    pub fn option_with(
        mut self,
        raw: &str,
        description: &str,
        config: OptionConfig,
    ) -> std::result::Result<Self, DeclarationError> {
        let spec = OptionSpec::parse(raw, description, config)?;
        self.spec().options.push(spec);
        Ok(self)
    }

    /// Adds an alternative literal name.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::InvalidAlias`] for an empty alias and
    /// [`DeclarationError::ShadowedCommand`] when the alias collides with
    /// another command's name.
    pub fn alias(mut self, alias: &str) -> std::result::Result<Self, DeclarationError> {
        let form: Vec<&str> = alias.split_whitespace().collect();
        if form.is_empty() || form.iter().any(|w| w.starts_with('<') || w.starts_with('[')) {
            return Err(DeclarationError::InvalidAlias {
                command: self.cli.commands[self.id.0].raw.clone(),
                alias: alias.to_string(),
            });
        }
        check_shadowing(&self.cli.commands, self.id.0, &form)?;
        let normalized = form.join(" ");
        self.spec().aliases.push(normalized);
        Ok(self)
    }

    /// Binds the handler.
    pub fn action(
        self,
        handler: impl Fn(&E, Invocation) -> std::result::Result<R, BoxError> + 'static,
    ) -> Self {
        self.handler(Box::new(handler))
    }

    /// Binds an already boxed handler, replacing any previous one.
    pub fn handler(self, handler: Handler<E, R>) -> Self {
        self.cli.handlers[self.id.0] = Some(handler);
        self
    }

    /// Sets usage text for help collaborators.
    pub fn usage(mut self, text: &str) -> Self {
        self.spec().usage = Some(text.to_string());
        self
    }

    /// Adds an example invocation for help collaborators.
    pub fn example(mut self, text: &str) -> Self {
        self.spec().examples.push(text.to_string());
        self
    }

    /// Disables the unknown-option check for this command.
    pub fn allow_unknown_options(mut self) -> Self {
        self.spec().config.allow_unknown_options = true;
        self
    }

    /// Suppresses default-filling when this command matches.
    pub fn ignore_option_default_value(mut self) -> Self {
        self.spec().config.ignore_option_default_value = true;
        self
    }
}
