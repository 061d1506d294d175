//! Program manifests.
//!
//! A [`ProgramManifest`] describes a whole command-line program declaratively:
//! global options, commands with their aliases and local options, and the
//! help/version features. It is stored as YAML or JSON (chosen by file
//! extension) and turned into a live [`Cli`] with
//! [`build`](ProgramManifest::build).
//!
//! # Example YAML
//!
//! ```yaml
//! name: fs
//! version: "1.2.3"
//! help: true
//! options:
//!   - spec: "--no-clear-screen"
//!     description: Keep the screen
//!   - spec: "--type [type]"
//!     default: [js]
//!     type: { cast: string, each: true }
//! commands:
//!   - name: "rm <dir>"
//!     description: Remove a directory
//!     aliases: [remove]
//!     options:
//!       - spec: "-r, --recursive"
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use argweave_core::{Cast, Cli, Coercion, CommandConfig, Handler, OptionConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ManifestError, Result};

/// Serialization format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `.yaml` or `.yml`.
    Yaml,
    /// `.json`.
    Json,
}

impl ManifestFormat {
    /// Detects the format from a path's extension.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::UnsupportedFormat`] for any other extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use argweave_manifest::ManifestFormat;
    ///
    /// assert_eq!(ManifestFormat::from_path("cli.yml").unwrap(), ManifestFormat::Yaml);
    /// assert_eq!(ManifestFormat::from_path("cli.JSON").unwrap(), ManifestFormat::Json);
    /// assert!(ManifestFormat::from_path("cli.toml").is_err());
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            _ => Err(ManifestError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Cast applied to an option's raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastKind {
    /// Keep or convert to a string.
    String,
    /// Parse as a number.
    Number,
    /// Convert by truthiness.
    Boolean,
}

impl From<CastKind> for Cast {
    fn from(kind: CastKind) -> Self {
        match kind {
            CastKind::String => Cast::String,
            CastKind::Number => Cast::Number,
            CastKind::Boolean => Cast::Boolean,
        }
    }
}

/// Declared coercion of an option: a cast, applied to the whole value or to
/// each occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeEntry {
    /// The cast to apply.
    pub cast: CastKind,
    /// Apply per occurrence, always producing an array.
    #[serde(default)]
    pub each: bool,
}

impl TypeEntry {
    /// The coercion strategy this entry selects.
    pub fn coercion(self) -> Coercion {
        if self.each {
            Coercion::Each(self.cast.into())
        } else {
            Coercion::Single(self.cast.into())
        }
    }
}

/// One option declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Raw spec such as `-o, --out-dir <dir>`.
    pub spec: String,
    /// Help text.
    #[serde(default)]
    pub description: String,
    /// Value used when the flag is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Coercion applied after assignment.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<TypeEntry>,
}

impl OptionEntry {
    /// Creates a plain entry with no default or coercion.
    pub fn new(spec: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            description: description.into(),
            default: None,
            value_type: None,
        }
    }

    /// The core configuration for this entry.
    pub fn config(&self) -> OptionConfig {
        let mut config = OptionConfig::default();
        if let Some(default) = &self.default {
            config = config.with_default(default.clone());
        }
        if let Some(value_type) = self.value_type {
            config = config.with_coercion(value_type.coercion());
        }
        config
    }
}

/// One command declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Name pattern such as `rm <dir>`; empty or args-only for the default
    /// command.
    #[serde(default)]
    pub name: String,
    /// Help text.
    #[serde(default)]
    pub description: String,
    /// Alternative literal names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Skip the unknown-option check for this command.
    #[serde(default)]
    pub allow_unknown_options: bool,
    /// Do not fill option defaults when this command matches.
    #[serde(default)]
    pub ignore_option_default_value: bool,
    /// Custom usage line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Example invocations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Options local to this command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
}

/// A declarative description of a command-line program.
///
/// # Examples
///
/// ```
/// use argweave_manifest::ProgramManifest;
///
/// let manifest = ProgramManifest::from_yaml_str(r#"
/// name: fs
/// commands:
///   - name: "rm <dir>"
///     options:
///       - spec: "-r, --recursive"
/// "#).unwrap();
///
/// let mut cli: argweave_core::Cli = manifest.build().unwrap();
/// let ctx = cli.parse((), &["rm", "tmp", "-r"], true).unwrap();
/// assert_eq!(ctx.options.get_bool("recursive"), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramManifest {
    /// Program name.
    pub name: String,
    /// Version string; enables `-v, --version` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Enables `-h, --help`.
    #[serde(default)]
    pub help: bool,
    /// Suppresses default-filling for every parse.
    #[serde(default)]
    pub ignore_option_default_value: bool,
    /// Global usage line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    /// Global examples.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Global options.
    #[serde(default)]
    pub options: Vec<OptionEntry>,
    /// Commands in registration order.
    #[serde(default)]
    pub commands: Vec<CommandEntry>,
}

impl ProgramManifest {
    /// Creates an empty manifest.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses a YAML manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Yaml`](ManifestError::Yaml) if parsing fails.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a JSON manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Json`](ManifestError::Json) if parsing fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a manifest, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](ManifestError::UnsupportedFormat) for an
    /// unknown extension, [`Io`](ManifestError::Io) if the file cannot be
    /// read, or a format error if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ManifestFormat::from_path(path)?;
        let reader = BufReader::new(std::fs::File::open(path)?);
        let manifest: Self = match format {
            ManifestFormat::Yaml => serde_yaml::from_reader(reader)?,
            ManifestFormat::Json => serde_json::from_reader(reader)?,
        };
        debug!(
            path = %path.display(),
            name = %manifest.name,
            commands = manifest.commands.len(),
            "Loaded manifest"
        );
        Ok(manifest)
    }

    /// Saves the manifest, picking the format from the file extension. JSON
    /// is written pretty-printed.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedFormat`](ManifestError::UnsupportedFormat) for an
    /// unknown extension, [`Io`](ManifestError::Io) if the file cannot be
    /// written, or a format error if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let format = ManifestFormat::from_path(path)?;
        let writer = BufWriter::new(std::fs::File::create(path)?);
        match format {
            ManifestFormat::Yaml => serde_yaml::to_writer(writer, self)?,
            ManifestFormat::Json => serde_json::to_writer_pretty(writer, self)?,
        }
        Ok(())
    }

    /// Builds a program with no handlers bound.
    ///
    /// # Errors
    ///
    /// Returns [`Declaration`](ManifestError::Declaration) for the first
    /// malformed option or command entry.
    pub fn build<E, R>(&self) -> Result<Cli<E, R>> {
        self.build_with(|_| None)
    }

    /// Builds a program, asking `bind` for each command's handler.
    ///
    /// # Errors
    ///
    /// Returns [`Declaration`](ManifestError::Declaration) for the first
    /// malformed option or command entry.
    pub fn build_with<E, R>(
        &self,
        mut bind: impl FnMut(&CommandEntry) -> Option<Handler<E, R>>,
    ) -> Result<Cli<E, R>> {
        let mut cli = Cli::new(self.name.as_str());
        for option in &self.options {
            cli.option_with(&option.spec, &option.description, option.config())?;
        }
        if self.help {
            cli.help()?;
        }
        if let Some(version) = &self.version {
            cli.version(version)?;
        }
        if self.ignore_option_default_value {
            cli.ignore_option_default_value();
        }
        if let Some(usage) = &self.usage {
            cli.usage(usage);
        }
        for example in &self.examples {
            cli.example(example);
        }

        for entry in &self.commands {
            let config = CommandConfig {
                allow_unknown_options: entry.allow_unknown_options,
                ignore_option_default_value: entry.ignore_option_default_value,
            };
            let mut command = cli.command_with(&entry.name, &entry.description, config)?;
            for alias in &entry.aliases {
                command = command.alias(alias)?;
            }
            for option in &entry.options {
                command = command.option_with(&option.spec, &option.description, option.config())?;
            }
            if let Some(usage) = &entry.usage {
                command = command.usage(usage);
            }
            for example in &entry.examples {
                command = command.example(example);
            }
            if let Some(handler) = bind(entry) {
                command.handler(handler);
            }
        }

        debug!(
            name = %self.name,
            options = self.options.len(),
            commands = self.commands.len(),
            "Built program from manifest"
        );
        Ok(cli)
    }
}

#[cfg(test)]
mod tests {
    use argweave_core::{CliError, DeclarationError};
    use serde_json::json;

    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
name: fs
version: "1.2.3"
help: true
options:
  - spec: "--no-clear-screen"
    description: Keep the screen
  - spec: "--type [type]"
    type: { cast: string, each: true }
commands:
  - name: "rm <dir>"
    description: Remove a directory
    aliases: [remove]
    usage: "rm <dir> [options]"
    examples: ["fs rm ./dist -r"]
    options:
      - spec: "-r, --recursive"
  - name: "serve [root]"
    ignore_option_default_value: true
    options:
      - spec: "--port <port>"
        default: 3000
  - name: "run [...script]"
    allow_unknown_options: true
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let manifest = ProgramManifest::from_yaml_str(sample_yaml()).unwrap();
        assert_eq!(manifest.name, "fs");
        assert_eq!(manifest.version.as_deref(), Some("1.2.3"));
        assert!(manifest.help);
        assert_eq!(manifest.options.len(), 2);
        assert_eq!(
            manifest.options[1].value_type,
            Some(TypeEntry {
                cast: CastKind::String,
                each: true,
            })
        );
        assert_eq!(manifest.commands[0].aliases, vec!["remove"]);
        assert_eq!(manifest.commands[1].options[0].default, Some(json!(3000)));
        assert!(manifest.commands[2].allow_unknown_options);
    }

    #[test]
    fn test_deserialize_minimal() {
        let manifest = ProgramManifest::from_yaml_str("name: tiny").unwrap();
        assert_eq!(manifest, ProgramManifest::new("tiny"));
    }

    #[test]
    fn test_json_manifest() {
        let manifest = ProgramManifest::from_json_str(
            r#"{"name": "app", "options": [{"spec": "--port <port>", "default": 80}]}"#,
        )
        .unwrap();
        let mut cli: Cli = manifest.build().unwrap();
        let ctx = cli.parse((), &Vec::<&str>::new(), true).unwrap();
        assert_eq!(ctx.options.get("port"), Some(&json!(80)));
    }

    #[test]
    fn test_build_registers_everything() {
        let manifest = ProgramManifest::from_yaml_str(sample_yaml()).unwrap();
        let cli: Cli = manifest.build().unwrap();
        assert_eq!(cli.name(), "fs");
        assert!(cli.help_enabled());
        assert_eq!(cli.version_string(), Some("1.2.3"));
        assert_eq!(cli.commands().len(), 3);

        let rm = cli.command_spec(cli.find_command("remove").unwrap());
        assert_eq!(rm.name, "rm");
        assert_eq!(rm.usage.as_deref(), Some("rm <dir> [options]"));
        assert_eq!(rm.examples, vec!["fs rm ./dist -r"]);
        assert!(rm.has_option("recursive"));
    }

    #[test]
    fn test_built_program_parses() {
        let manifest = ProgramManifest::from_yaml_str(sample_yaml()).unwrap();
        let mut cli: Cli = manifest.build().unwrap();

        let ctx = cli
            .parse((), &["remove", "tmp", "-r", "--type", "7"], true)
            .unwrap();
        assert_eq!(ctx.matched_command_name.as_deref(), Some("remove"));
        assert_eq!(ctx.options.get("type"), Some(&json!(["7"])));
        assert_eq!(ctx.options.get_bool("clearScreen"), Some(true));

        let ctx = cli.parse((), &["serve"], true).unwrap();
        assert_eq!(ctx.options.get("port"), None);

        assert!(cli.parse((), &["run", "--whatever"], true).is_ok());
        assert!(matches!(
            cli.parse((), &["rm", "x", "--whatever"], true),
            Err(CliError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_build_with_binds_handlers() {
        let manifest = ProgramManifest::from_yaml_str(sample_yaml()).unwrap();
        let mut cli: Cli<(), String> = manifest
            .build_with(|entry| {
                let name = entry.name.clone();
                let handler: Handler<(), String> = Box::new(move |_, _| Ok(name.clone()));
                Some(handler)
            })
            .unwrap();
        let ctx = cli.parse((), &["serve", "www"], true).unwrap();
        assert_eq!(ctx.result.as_deref(), Some("serve [root]"));
    }

    #[test]
    fn test_build_surfaces_declaration_errors() {
        let mut manifest = ProgramManifest::new("bad");
        manifest.commands.push(CommandEntry {
            name: "cp [src] <dest>".to_string(),
            ..CommandEntry::default()
        });
        let err = manifest.build::<(), ()>().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Declaration(DeclarationError::RequiredAfterOptional { .. })
        ));
    }

    #[test]
    fn test_single_cast_entry() {
        let entry = OptionEntry {
            value_type: Some(TypeEntry {
                cast: CastKind::Number,
                each: false,
            }),
            ..OptionEntry::new("--level <n>", "")
        };
        assert!(matches!(entry.config().coercion, Coercion::Single(Cast::Number)));
    }
}
