//! Option assignment.
//!
//! [`assign`] turns the tokenizer's raw flag values into the final options
//! tree: declared defaults first, then every raw key written along its dot
//! path, then each declared coercion applied once per canonical name.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::option::normalize_key;
use crate::tokenizer::{OptionSet, RawOptions};

/// Reserved options key holding the passthrough tail.
pub const PASSTHROUGH_KEY: &str = "--";

/// Builds the options tree from raw flag values.
///
/// # Examples
///
/// ```
/// use argweave_core::{OptionSet, assign, tokenize};
/// use serde_json::json;
///
/// let tokens = tokenize(&["--a.b=1", "--a.c=2"], &OptionSet::default());
/// let values = assign(&tokens.raw, &OptionSet::default(), false);
/// assert_eq!(json!(values), json!({"a": {"b": 1, "c": 2}}));
/// ```
pub fn assign(raw: &RawOptions, options: &OptionSet<'_>, ignore_defaults: bool) -> Map<String, Value> {
    let mut values = Map::new();

    if !ignore_defaults {
        for spec in options.specs() {
            if let Some(default) = &spec.default {
                set_dot_path(&mut values, &spec.name, default.clone());
            }
        }
    }

    for (key, value) in raw.iter() {
        set_dot_path(&mut values, key, value.clone());
    }

    let mut coerced = HashSet::new();
    for spec in options.specs().iter().rev() {
        if spec.coercion.is_none() || !coerced.insert(spec.name.as_str()) {
            continue;
        }
        if let Some(slot) = dot_path_mut(&mut values, &spec.name) {
            let value = slot.take();
            *slot = spec.coercion.apply(value);
        }
    }

    values
}

/// Writes `value` at a dot-separated path, creating intermediate levels.
/// A numeric segment indexes an array only when it names an existing slot or
/// the next one to append; a missing level becomes an array when that index
/// is `0`. Any other segment is an object key. Scalars found along the path
/// are replaced.
pub fn set_dot_path(target: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments = key.split('.');
    let Some(first) = segments.next() else {
        return;
    };
    let mut slot = target.entry(first.to_string()).or_insert(Value::Null);
    for segment in segments {
        slot = child_slot(slot, segment);
    }
    *slot = value;
}

fn child_slot<'v>(container: &'v mut Value, segment: &str) -> &'v mut Value {
    let index = segment.parse::<usize>().ok().filter(|&index| match &*container {
        Value::Null => index == 0,
        Value::Array(items) => index <= items.len(),
        _ => false,
    });
    if let Some(index) = index {
        match &mut *container {
            Value::Array(items) if items.len() == index => items.push(Value::Null),
            Value::Array(_) => {}
            other => *other = Value::Array(vec![Value::Null]),
        }
        return &mut container[index];
    }
    if !container.is_object() {
        let mut map = Map::new();
        if let Value::Array(items) = container.take() {
            for (i, item) in items.into_iter().enumerate() {
                map.insert(i.to_string(), item);
            }
        }
        *container = Value::Object(map);
    }
    &mut container[segment]
}

fn dot_path<'v>(target: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    let mut segments = key.split('.');
    let mut slot = target.get(segments.next()?)?;
    for segment in segments {
        slot = match slot {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(slot)
}

fn dot_path_mut<'v>(target: &'v mut Map<String, Value>, key: &str) -> Option<&'v mut Value> {
    let mut segments = key.split('.');
    let mut slot = target.get_mut(segments.next()?)?;
    for segment in segments {
        slot = match slot {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(slot)
}

/// The final options mapping of a parse.
///
/// Values are stored under canonical option names. Lookups through
/// [`get`](Options::get) accept any alias, hyphenated or camelCased, and
/// dot paths, so `-r`, `--recursive` and `recursive` address the same entry.
/// The passthrough tail is always present under [`PASSTHROUGH_KEY`].
///
/// # Examples
///
/// ```
/// use argweave_core::Cli;
/// use serde_json::json;
///
/// let mut cli: Cli = Cli::new("app");
/// cli.option("-o, --out-dir <dir>", "Output directory").unwrap();
///
/// let ctx = cli.parse((), &["-o", "dist", "--", "extra"], false).unwrap();
/// assert_eq!(ctx.options.get("o"), Some(&json!("dist")));
/// assert_eq!(ctx.options.get("--out-dir"), Some(&json!("dist")));
/// assert_eq!(ctx.options.get("outDir"), Some(&json!("dist")));
/// assert_eq!(ctx.options.passthrough(), vec!["extra"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    values: Map<String, Value>,
    aliases: HashMap<String, String>,
}

impl Options {
    pub(crate) fn new(
        mut values: Map<String, Value>,
        aliases: HashMap<String, String>,
        passthrough: Vec<String>,
    ) -> Self {
        values.insert(
            PASSTHROUGH_KEY.to_string(),
            Value::Array(passthrough.into_iter().map(Value::String).collect()),
        );
        Self { values, aliases }
    }

    /// Looks up a value by alias, hyphenated or camelCased name, or dot path.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == PASSTHROUGH_KEY {
            return self.values.get(PASSTHROUGH_KEY);
        }
        let key = normalize_key(key);
        let resolved = match key.split_once('.') {
            Some((head, rest)) => self
                .aliases
                .get(head)
                .map(|canonical| format!("{canonical}.{rest}")),
            None => self.aliases.get(key.as_str()).cloned(),
        }
        .unwrap_or(key);
        dot_path(&self.values, &resolved)
    }

    /// Returns the value as a boolean, if it is one.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Returns the value as a string slice, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns `true` if a value is stored for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns `true` if the value is present and truthy (not `false`,
    /// `null`, zero, or an empty string).
    pub fn is_set(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// Tokens that followed the standalone `--`.
    pub fn passthrough(&self) -> Vec<&str> {
        match self.values.get(PASSTHROUGH_KEY) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Top-level keys as stored.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The stored mapping.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Converts the mapping into a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.clone())
    }
}

impl Serialize for Options {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}
