//! Low-level argv tokenizer.
//!
//! [`tokenize`] splits a flat token list into positional tokens, raw flag
//! values keyed by option name, and the passthrough tail after a standalone
//! `--`. Flags are classified without requiring a declaration; the
//! [`OptionSet`] only decides whether a flag is boolean, which alias it maps
//! to, and whether its values stay strings.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use crate::option::{OptionSpec, camelcase_option_name, parse_number};

/// The options visible to one tokenizer run: global options followed by the
/// candidate command's own options.
#[derive(Debug, Clone, Default)]
pub struct OptionSet<'a> {
    specs: Vec<&'a OptionSpec>,
    by_name: HashMap<&'a str, usize>,
}

impl<'a> OptionSet<'a> {
    /// Builds a set. When two options share a name, the later one wins.
    pub fn new(specs: impl IntoIterator<Item = &'a OptionSpec>) -> Self {
        let specs: Vec<&'a OptionSpec> = specs.into_iter().collect();
        let mut by_name = HashMap::new();
        for (index, spec) in specs.iter().enumerate() {
            for name in &spec.names {
                by_name.insert(name.as_str(), index);
            }
        }
        Self { specs, by_name }
    }

    /// All options in declaration order.
    pub fn specs(&self) -> &[&'a OptionSpec] {
        &self.specs
    }

    /// Finds the option owning `key`, trying the whole key before its first
    /// dot segment.
    pub fn find(&self, key: &str) -> Option<&'a OptionSpec> {
        let index = self.by_name.get(key).or_else(|| {
            let (head, _) = key.split_once('.')?;
            self.by_name.get(head)
        })?;
        Some(self.specs[*index])
    }

    /// Rewrites an alias (or a dot path rooted at an alias) to the owning
    /// option's canonical name. Unknown keys are returned unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use argweave_core::{OptionConfig, OptionSet, OptionSpec};
    ///
    /// let env = OptionSpec::parse("-e, --env.* [value]", "", OptionConfig::default()).unwrap();
    /// let set = OptionSet::new([&env]);
    /// assert_eq!(set.canonical_key("e"), "env");
    /// assert_eq!(set.canonical_key("e.HOME"), "env.HOME");
    /// assert_eq!(set.canonical_key("other"), "other");
    /// ```
    pub fn canonical_key(&self, key: &str) -> String {
        if let Some(&index) = self.by_name.get(key) {
            return self.specs[index].name.clone();
        }
        match key.split_once('.') {
            Some((head, rest)) => match self.by_name.get(head) {
                Some(&index) => format!("{}.{rest}", self.specs[index].name),
                None => key.to_string(),
            },
            None => key.to_string(),
        }
    }

    /// Alias to canonical-name table, used for lookups on parsed options.
    pub fn alias_table(&self) -> HashMap<String, String> {
        self.by_name
            .iter()
            .map(|(alias, &index)| (alias.to_string(), self.specs[index].name.clone()))
            .collect()
    }
}

/// Raw flag values keyed by option name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions {
    entries: Vec<(String, Value)>,
}

impl RawOptions {
    /// Returns the raw value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates keys and values in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no flags were seen.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records an occurrence. Boolean-shaped options overwrite; every other
    /// repeat accumulates into an array, bare occurrences included.
    fn record(&mut self, key: String, value: Value, boolean: bool) {
        let Some(index) = self.entries.iter().position(|(k, _)| *k == key) else {
            self.entries.push((key, value));
            return;
        };
        let existing = &mut self.entries[index].1;
        if boolean {
            *existing = value;
            return;
        }
        match existing {
            Value::Array(items) => items.push(value),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value]);
            }
        }
    }
}

/// Output of one tokenizer run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokens {
    /// Non-flag tokens in source order.
    pub positional: Vec<String>,
    /// Flag values keyed by canonical (or normalized undeclared) name.
    pub raw: RawOptions,
    /// Tokens after the first standalone `--`, verbatim.
    pub passthrough: Vec<String>,
}

/// Returns `true` if `token` is shaped like a flag: `--name` or `-x` where
/// `x` is a letter. A bare `-` and negative numbers such as `-5` are
/// positional.
pub fn looks_like_flag(token: &str) -> bool {
    if let Some(rest) = token.strip_prefix("--") {
        return rest.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    }
    token
        .strip_prefix('-')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_alphabetic())
}

/// Splits `tokens` into positional tokens, raw flag values, and the
/// passthrough tail.
///
/// # Examples
///
/// ```
/// use argweave_core::{OptionConfig, OptionSet, OptionSpec, tokenize};
/// use serde_json::json;
///
/// let recursive = OptionSpec::parse("-r, --recursive", "", OptionConfig::default()).unwrap();
/// let set = OptionSet::new([&recursive]);
///
/// let tokens = tokenize(&["rm", "-r", "a/b", "--depth", "2", "--", "-x"], &set);
/// assert_eq!(tokens.positional, vec!["rm", "a/b"]);
/// assert_eq!(tokens.raw.get("recursive"), Some(&json!(true)));
/// assert_eq!(tokens.raw.get("depth"), Some(&json!(2)));
/// assert_eq!(tokens.passthrough, vec!["-x"]);
/// ```
pub fn tokenize<S: AsRef<str>>(tokens: &[S], options: &OptionSet<'_>) -> Tokens {
    let split = tokens.iter().position(|t| t.as_ref() == "--");
    let (scan, tail) = match split {
        Some(index) => (&tokens[..index], &tokens[index + 1..]),
        None => (tokens, &tokens[tokens.len()..]),
    };

    let mut out = Tokens {
        passthrough: tail.iter().map(|t| t.as_ref().to_string()).collect(),
        ..Tokens::default()
    };

    let mut cursor = 0;
    while cursor < scan.len() {
        let token = scan[cursor].as_ref();
        cursor += 1;

        if !looks_like_flag(token) {
            out.positional.push(token.to_string());
            continue;
        }

        if let Some(body) = token.strip_prefix("--") {
            let (name, inline) = split_inline(body);
            if let Some(negated) = name.strip_prefix("no-").filter(|n| !n.is_empty()) {
                let key = options.canonical_key(&camelcase_option_name(negated));
                trace!(token, key = %key, "negated flag");
                out.raw.record(key, Value::Bool(false), true);
                continue;
            }
            let key = options.canonical_key(&camelcase_option_name(name));
            let (value, boolean) = flag_value(&key, inline, options, scan, &mut cursor, &mut out);
            trace!(token, key = %key, value = %value, "long flag");
            out.raw.record(key, value, boolean);
            continue;
        }

        let (letters, inline) = split_inline(&token[1..]);
        let letters: Vec<char> = letters.chars().collect();
        for (index, letter) in letters.iter().enumerate() {
            let key = options.canonical_key(&letter.to_string());
            if index + 1 < letters.len() {
                out.raw.record(key, Value::Bool(true), true);
                continue;
            }
            let (value, boolean) = flag_value(&key, inline, options, scan, &mut cursor, &mut out);
            trace!(token, key = %key, value = %value, "short flag");
            out.raw.record(key, value, boolean);
        }
    }

    out
}

fn split_inline(body: &str) -> (&str, Option<&str>) {
    match body.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (body, None),
    }
}

/// Resolves the value for the last flag in a token, consuming the next token
/// when the flag is not boolean and the next token is not itself a flag.
fn flag_value<S: AsRef<str>>(
    key: &str,
    inline: Option<&str>,
    options: &OptionSet<'_>,
    scan: &[S],
    cursor: &mut usize,
    out: &mut Tokens,
) -> (Value, bool) {
    let spec = options.find(key);
    let boolean = spec.is_some_and(OptionSpec::is_boolean);
    let keep_strings = spec.is_some_and(|s| s.coercion.keeps_raw_strings());

    if boolean {
        let value = match inline {
            None | Some("true") => Value::Bool(true),
            Some("false") => Value::Bool(false),
            Some(other) => {
                out.positional.push(other.to_string());
                Value::Bool(true)
            }
        };
        return (value, true);
    }

    if let Some(raw) = inline {
        return (raw_value(raw, keep_strings), false);
    }

    let next: Option<&str> = scan.get(*cursor).map(|t| t.as_ref());
    match next {
        Some(next) if !looks_like_flag(next) => {
            *cursor += 1;
            (raw_value(next, keep_strings), false)
        }
        _ => (Value::Bool(true), false),
    }
}

fn raw_value(raw: &str, keep_strings: bool) -> Value {
    if keep_strings {
        return Value::String(raw.to_string());
    }
    parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}
