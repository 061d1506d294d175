//! Declarative program manifests for argweave.
//!
//! A manifest describes a command-line program (global options, commands,
//! aliases, defaults, coercions, help/version features) as YAML or JSON and
//! builds it into an [`argweave_core::Cli`].
//!
//! # Quick start
//!
//! ```no_run
//! use argweave_manifest::ProgramManifest;
//!
//! let manifest = ProgramManifest::load("fs.yml").unwrap();
//! let mut cli: argweave_core::Cli = manifest.build().unwrap();
//! let ctx = cli.parse((), &["rm", "tmp"], true).unwrap();
//! println!("matched {:?}", ctx.matched_command_name);
//!
//! // Convert to JSON
//! manifest.save("fs.json").unwrap();
//! ```

mod error;
mod manifest;

pub use error::{ManifestError, Result};
pub use manifest::{
    CastKind, CommandEntry, ManifestFormat, OptionEntry, ProgramManifest, TypeEntry,
};
