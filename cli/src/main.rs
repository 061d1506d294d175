use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use argweave_core::{
    ArgValue, Cli as Program, CommandSpec, Handler, HelpRequest, OptionSpec, Options, Presenter,
};
use argweave_manifest::{CommandEntry, ProgramManifest};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "argweave")]
#[command(about = "Check program manifests and trace invocations through them")]
struct Cli {
    /// Log parsing decisions to stderr (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a manifest and list what it declares.
    Check(CheckArgs),
    /// Run tokens through a manifest's program and print the result.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Manifest file (.yaml, .yml or .json).
    manifest: PathBuf,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Manifest file (.yaml, .yml or .json).
    manifest: PathBuf,
    /// Match and assign only; skip validation and dispatch.
    #[arg(long)]
    no_run: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Invocation tokens, given after `--`.
    #[arg(last = true)]
    tokens: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Parse(args) => run_parse(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let manifest = ProgramManifest::load(&args.manifest).map_err(|e| e.to_string())?;
    let program: Program = manifest.build().map_err(|e| e.to_string())?;

    println!(
        "Manifest `{}` is valid: {} global option(s), {} command(s).",
        program.name(),
        program.global().options.len(),
        program.commands().len()
    );
    for command in program.commands() {
        let label = if command.is_default() {
            format!("{} (default)", command.raw)
        } else {
            command.raw.clone()
        };
        if command.aliases.is_empty() {
            println!("  {label}");
        } else {
            println!("  {label} [aliases: {}]", command.aliases.join(", "));
        }
    }
    Ok(())
}

/// Handler that echoes the command pattern and its expanded arguments.
fn echo_handler(entry: &CommandEntry) -> Option<Handler<(), Value>> {
    let pattern = entry.name.clone();
    let handler: Handler<(), Value> = Box::new(move |_, invocation| {
        let args: Vec<Value> = invocation
            .args
            .iter()
            .map(|arg| match arg {
                ArgValue::Single(value) => json!(value),
                ArgValue::Variadic(values) => json!(values),
            })
            .collect();
        Ok(json!({ "command": pattern, "args": args }))
    });
    Some(handler)
}

#[derive(Debug, Serialize)]
struct ParseReport<'a> {
    program: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command_name: Option<&'a str>,
    args: &'a [String],
    options: &'a Options,
    help_shown: bool,
    version_shown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    output: String,
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let manifest = ProgramManifest::load(&args.manifest).map_err(|e| e.to_string())?;
    let mut program: Program<(), Value> =
        manifest.build_with(echo_handler).map_err(|e| e.to_string())?;

    let output = Rc::new(RefCell::new(String::new()));
    program.set_presenter(TextPresenter {
        out: Rc::clone(&output),
    });
    program.on_match(|event| debug!(event = %event.key(), "Match event"));

    let ctx = program
        .parse((), &args.tokens, !args.no_run)
        .map_err(|e| e.to_string())?;

    let report = ParseReport {
        program: &ctx.name,
        command: ctx
            .matched_command
            .map(|id| program.command_spec(id).raw.as_str()),
        command_name: ctx.matched_command_name.as_deref(),
        args: &ctx.args,
        options: &ctx.options,
        help_shown: ctx.help_shown,
        version_shown: ctx.version_shown,
        result: ctx.result.as_ref(),
        output: output.borrow().clone(),
    };

    match args.format {
        CliOutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to serialize output: {e}"))?;
            println!("{json}");
        }
        CliOutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&report)
                .map_err(|e| format!("Failed to serialize output: {e}"))?;
            print!("{yaml}");
        }
    }
    Ok(())
}

/// Renders help and version text into a shared buffer.
struct TextPresenter {
    out: Rc<RefCell<String>>,
}

impl Presenter for TextPresenter {
    fn show_help(&mut self, request: &HelpRequest<'_>) {
        let mut out = self.out.borrow_mut();
        out.push_str(&format!("{}\n\n", request.program));

        let usage = match request.matched {
            Some(command) => command.usage.clone().unwrap_or_else(|| command.raw.clone()),
            None => request
                .global
                .usage
                .clone()
                .unwrap_or_else(|| "<command> [options]".to_string()),
        };
        out.push_str(&format!("Usage:\n  $ {} {usage}\n", request.program));

        if request.matched.is_none() && !request.commands.is_empty() {
            out.push_str("\nCommands:\n");
            write_rows(
                &mut out,
                request
                    .commands
                    .iter()
                    .map(|c: &CommandSpec| (c.raw.as_str(), c.description.as_str())),
            );
        }

        let mut options: Vec<&OptionSpec> = request.global.options.iter().collect();
        if let Some(command) = request.matched {
            options.extend(command.options.iter());
        }
        if !options.is_empty() {
            out.push_str("\nOptions:\n");
            write_rows(
                &mut out,
                options
                    .iter()
                    .map(|o| (o.raw.as_str(), o.description.as_str())),
            );
        }

        let examples = request
            .matched
            .map_or(&request.global.examples, |c| &c.examples);
        if !examples.is_empty() {
            out.push_str("\nExamples:\n");
            for example in examples {
                out.push_str(&format!("  {example}\n"));
            }
        }
    }

    fn show_version(&mut self, program: &str, version: &str) {
        self.out
            .borrow_mut()
            .push_str(&format!("{program}/{version}\n"));
    }
}

fn write_rows<'a>(out: &mut String, rows: impl Iterator<Item = (&'a str, &'a str)>) {
    let rows: Vec<_> = rows.collect();
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    for (left, right) in rows {
        out.push_str(&format!("  {left:<width$}  {right}\n"));
    }
}
