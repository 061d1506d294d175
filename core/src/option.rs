//! Option declarations and value coercion.
//!
//! An option is declared from a raw spec such as `-r, --recursive` or
//! `--type <type>`. [`OptionSpec::parse`] turns that spec into a set of alias
//! names, a canonical name, and a [`ValueShape`]. Optional value casts are
//! described by [`Coercion`] and applied by the assignment engine.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DeclarationError;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<\[].*$").expect("static regex must compile"));
static HYPHEN_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])-([a-z])").expect("static regex must compile"));

/// Largest integer magnitude that survives a round-trip through `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Shape of the value an option accepts.
///
/// # Examples
///
/// ```
/// use argweave_core::{OptionConfig, OptionSpec, ValueShape};
///
/// let spec = OptionSpec::parse("--port <port>", "", OptionConfig::default()).unwrap();
/// assert_eq!(spec.shape, ValueShape::Required);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueShape {
    /// No placeholder: the flag is `true` when present.
    Boolean,
    /// `<placeholder>`: a value must follow the flag.
    Required,
    /// `[placeholder]`: the value may be omitted.
    Optional,
}

/// A value cast applied to raw option values.
#[derive(Debug, Clone, Copy)]
pub enum Cast {
    /// Render the value as a string.
    String,
    /// Convert to a number; unparseable input becomes `null`.
    Number,
    /// Convert to a boolean using truthiness.
    Boolean,
    /// Caller-supplied transform.
    Custom(fn(Value) -> Value),
}

impl Cast {
    /// Applies the cast to a single value.
    ///
    /// # Examples
    ///
    /// ```
    /// use argweave_core::Cast;
    /// use serde_json::json;
    ///
    /// assert_eq!(Cast::String.apply(json!(42)), json!("42"));
    /// assert_eq!(Cast::Number.apply(json!("1.5")), json!(1.5));
    /// assert_eq!(Cast::Boolean.apply(json!("")), json!(false));
    /// ```
    pub fn apply(self, value: Value) -> Value {
        match self {
            Cast::String => match value {
                Value::String(_) => value,
                Value::Number(n) => Value::String(n.to_string()),
                Value::Bool(b) => Value::String(b.to_string()),
                Value::Null => Value::String("null".to_string()),
                other => Value::String(other.to_string()),
            },
            Cast::Number => match value {
                Value::Number(_) => value,
                Value::String(s) if s.trim().is_empty() => Value::from(0),
                Value::String(s) => parse_number(s.trim()).unwrap_or(Value::Null),
                Value::Bool(b) => Value::from(u8::from(b)),
                Value::Null => Value::from(0),
                _ => Value::Null,
            },
            Cast::Boolean => match value {
                Value::Bool(_) => value,
                Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
                Value::String(s) => Value::Bool(!s.is_empty()),
                Value::Null => Value::Bool(false),
                _ => Value::Bool(true),
            },
            Cast::Custom(transform) => transform(value),
        }
    }
}

/// How an option's final value is produced from its raw occurrences.
#[derive(Debug, Clone, Copy, Default)]
pub enum Coercion {
    /// Keep the raw value.
    #[default]
    None,
    /// Cast the value (each occurrence, if the flag was repeated).
    Single(Cast),
    /// Collect the value into an array and cast every element.
    Each(Cast),
}

impl Coercion {
    /// Returns `true` when raw values must stay strings instead of being
    /// inferred as numbers by the tokenizer.
    pub fn keeps_raw_strings(&self) -> bool {
        matches!(self, Coercion::Each(_) | Coercion::Single(Cast::String))
    }

    /// Returns `true` if this coercion transforms values at all.
    pub fn is_none(&self) -> bool {
        matches!(self, Coercion::None)
    }

    pub(crate) fn apply(&self, value: Value) -> Value {
        match *self {
            Coercion::None => value,
            Coercion::Single(cast) => match value {
                Value::Array(items) => {
                    Value::Array(items.into_iter().map(|item| cast.apply(item)).collect())
                }
                other => cast.apply(other),
            },
            Coercion::Each(cast) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                Value::Array(items.into_iter().map(|item| cast.apply(item)).collect())
            }
        }
    }
}

/// Declaration-time settings for an option.
///
/// # Examples
///
/// ```
/// use argweave_core::{Cast, Coercion, OptionConfig};
/// use serde_json::json;
///
/// let config = OptionConfig::default()
///     .with_default(json!(["js"]))
///     .with_coercion(Coercion::Each(Cast::String));
/// assert_eq!(config.default, Some(json!(["js"])));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionConfig {
    /// Value used when the flag is absent.
    pub default: Option<Value>,
    /// Cast applied after assignment.
    pub coercion: Coercion,
}

impl OptionConfig {
    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the coercion strategy.
    pub fn with_coercion(mut self, coercion: Coercion) -> Self {
        self.coercion = coercion;
        self
    }
}

/// A declared option.
///
/// Names are stored camelCased with dashes stripped and sorted shortest
/// first; the longest one is the canonical [`name`](OptionSpec::name).
///
/// # Examples
///
/// ```
/// use argweave_core::{OptionConfig, OptionSpec, ValueShape};
/// use serde_json::json;
///
/// let spec = OptionSpec::parse("-r, --recursive", "Remove recursively", OptionConfig::default()).unwrap();
/// assert_eq!(spec.names, vec!["r", "recursive"]);
/// assert_eq!(spec.name, "recursive");
/// assert_eq!(spec.shape, ValueShape::Boolean);
///
/// let negated = OptionSpec::parse("--no-clear-screen", "", OptionConfig::default()).unwrap();
/// assert_eq!(negated.name, "clearScreen");
/// assert!(negated.negated);
/// assert_eq!(negated.default, Some(json!(true)));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct OptionSpec {
    /// The spec as declared (e.g. `-t, --type <type>`).
    pub raw: String,
    /// Alias names, shortest first.
    pub names: Vec<String>,
    /// Canonical (longest) name.
    pub name: String,
    /// Value shape derived from the placeholder.
    pub shape: ValueShape,
    /// Declared with a `--no-` prefix.
    pub negated: bool,
    /// Human-readable description.
    pub description: String,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Cast applied after assignment.
    #[serde(skip)]
    pub coercion: Coercion,
}

impl OptionSpec {
    /// Parses a raw option spec.
    ///
    /// A `.*` suffix (as in `--env.* [value]`) declares a dot-nested option and
    /// is dropped from the name.
    ///
    /// # Errors
    ///
    /// Returns [`DeclarationError::EmptyOptionName`] when the spec yields no
    /// names and [`DeclarationError::MissingLongName`] when no alias is
    /// written as `--name`.
    pub fn parse(
        raw: &str,
        description: &str,
        config: OptionConfig,
    ) -> Result<Self, DeclarationError> {
        let stripped = raw.replace(".*", "");
        let head = PLACEHOLDER_RE.replace(&stripped, "");

        let mut negated = false;
        let mut has_long = false;
        let mut names = Vec::new();
        for token in head.split(',') {
            let token = token.trim();
            let mut name = token.trim_start_matches('-');
            if let Some(rest) = name.strip_prefix("no-") {
                negated = true;
                name = rest;
            }
            if name.is_empty() {
                continue;
            }
            if token.starts_with("--") {
                has_long = true;
            }
            names.push(camelcase_option_name(name));
        }

        let Some(name) = names.iter().max_by_key(|n| n.len()).cloned() else {
            return Err(DeclarationError::EmptyOptionName(raw.to_string()));
        };
        if !has_long {
            return Err(DeclarationError::MissingLongName(raw.to_string()));
        }
        names.sort_by_key(|n| n.len());
        names.dedup();

        let shape = if stripped.contains('<') {
            ValueShape::Required
        } else if stripped.contains('[') {
            ValueShape::Optional
        } else {
            ValueShape::Boolean
        };

        let default = match config.default {
            Some(Value::Null) | None if negated => Some(Value::Bool(true)),
            other => other,
        };

        Ok(Self {
            raw: raw.to_string(),
            name,
            names,
            shape,
            negated,
            description: description.to_string(),
            default,
            coercion: config.coercion,
        })
    }

    /// Returns `true` for options declared without a value placeholder.
    pub fn is_boolean(&self) -> bool {
        self.shape == ValueShape::Boolean
    }

    /// Returns `true` if `name` is one of this option's aliases.
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// camelCases the first dot segment of an option name: `clear-screen` becomes
/// `clearScreen`, while `env.API-KEY` keeps its nested segment verbatim.
///
/// # Examples
///
/// ```
/// use argweave_core::camelcase_option_name;
///
/// assert_eq!(camelcase_option_name("clear-screen"), "clearScreen");
/// assert_eq!(camelcase_option_name("env.some-key"), "env.some-key");
/// ```
pub fn camelcase_option_name(name: &str) -> String {
    match name.split_once('.') {
        Some((head, rest)) => format!("{}.{rest}", camelcase(head)),
        None => camelcase(name),
    }
}

fn camelcase(input: &str) -> String {
    HYPHEN_WORD_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            format!("{}{}", &caps[1], caps[2].to_uppercase())
        })
        .into_owned()
}

/// Strips leading dashes and camelCases a user-facing key so that
/// `--some-flag`, `some-flag` and `someFlag` all address the same entry.
pub fn normalize_key(key: &str) -> String {
    camelcase_option_name(key.trim_start_matches('-'))
}

/// Parses a finite numeric literal. Integral values within the safe range
/// become integers.
pub(crate) fn parse_number(raw: &str) -> Option<Value> {
    let number: f64 = raw.parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    if number.fract() == 0.0 && number.abs() < MAX_SAFE_INTEGER {
        return Some(Value::from(number as i64));
    }
    serde_json::Number::from_f64(number).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(raw: &str) -> OptionSpec {
        OptionSpec::parse(raw, "", OptionConfig::default()).unwrap()
    }

    #[test]
    fn test_value_shapes() {
        assert_eq!(parse("--type <type>").shape, ValueShape::Required);
        assert_eq!(parse("--type [type]").shape, ValueShape::Optional);
        assert_eq!(parse("-f, --force").shape, ValueShape::Boolean);
    }

    #[test]
    fn test_canonical_name_is_longest_alias() {
        let spec = parse("--recursive, -r");
        assert_eq!(spec.names, vec!["r", "recursive"]);
        assert_eq!(spec.name, "recursive");
    }

    #[test]
    fn test_names_are_camelcased() {
        let spec = parse("-c, --clear-screen");
        assert_eq!(spec.name, "clearScreen");
        assert!(spec.has_name("c"));
        assert!(!spec.has_name("clear-screen"));
    }

    #[test]
    fn test_negated_option_defaults_to_true() {
        let spec = parse("--no-clear-screen");
        assert!(spec.negated);
        assert_eq!(spec.name, "clearScreen");
        assert_eq!(spec.default, Some(json!(true)));
        assert!(spec.is_boolean());
    }

    #[test]
    fn test_negated_option_keeps_explicit_default() {
        let spec = OptionSpec::parse(
            "--no-color",
            "",
            OptionConfig::default().with_default(false),
        )
        .unwrap();
        assert_eq!(spec.default, Some(json!(false)));
    }

    #[test]
    fn test_dot_star_is_dropped() {
        let spec = parse("--env.* [value]");
        assert_eq!(spec.name, "env");
        assert_eq!(spec.shape, ValueShape::Optional);
    }

    #[test]
    fn test_empty_spec_is_rejected() {
        assert_eq!(
            OptionSpec::parse("<value>", "", OptionConfig::default()).unwrap_err(),
            DeclarationError::EmptyOptionName("<value>".to_string())
        );
        assert!(matches!(
            OptionSpec::parse(" , ", "", OptionConfig::default()),
            Err(DeclarationError::EmptyOptionName(_))
        ));
    }

    #[test]
    fn test_short_only_spec_is_rejected() {
        assert_eq!(
            OptionSpec::parse("-x", "", OptionConfig::default()).unwrap_err(),
            DeclarationError::MissingLongName("-x".to_string())
        );
    }

    #[test]
    fn test_camelcase_matches_word_pairs() {
        assert_eq!(camelcase_option_name("foo-bar-baz"), "fooBar-baz");
        assert_eq!(camelcase_option_name("foo-1"), "foo-1");
        assert_eq!(normalize_key("--some-flag"), "someFlag");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(json!(42)));
        assert_eq!(parse_number("-3"), Some(json!(-3)));
        assert_eq!(parse_number("1.5"), Some(json!(1.5)));
        assert_eq!(parse_number("1e3"), Some(json!(1000)));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_each_coercion_wraps_scalars() {
        let coercion = Coercion::Each(Cast::String);
        assert_eq!(coercion.apply(json!(1)), json!(["1"]));
        assert_eq!(coercion.apply(json!(["a", 2])), json!(["a", "2"]));
        assert!(coercion.keeps_raw_strings());
    }

    #[test]
    fn test_single_coercion_keeps_scalars() {
        let coercion = Coercion::Single(Cast::Number);
        assert_eq!(coercion.apply(json!("8080")), json!(8080));
        assert_eq!(coercion.apply(json!("x")), Value::Null);
        assert!(!coercion.keeps_raw_strings());
    }

    #[test]
    fn test_custom_cast() {
        fn shout(value: Value) -> Value {
            match value {
                Value::String(s) => Value::String(s.to_uppercase()),
                other => other,
            }
        }
        assert_eq!(Cast::Custom(shout).apply(json!("a")), json!("A"));
    }
}
