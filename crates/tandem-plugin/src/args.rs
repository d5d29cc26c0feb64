//! Loosely-typed creation arguments, as read from run configuration.
//!
//! Each plugin kind parses a [`PluginArgs`] map into its own typed
//! argument struct; the getters here produce
//! [`PluginError::InvalidArgument`] messages that name the offending key.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tandem_core::{Cadence, PluginError};

/// One argument value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// String.
    Str(String),
    /// List of values.
    List(Vec<ArgValue>),
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::Int(_) => "an integer",
            Self::Float(_) => "a float",
            Self::Str(_) => "a string",
            Self::List(_) => "a list",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<[f64; 3]> for ArgValue {
    fn from(v: [f64; 3]) -> Self {
        Self::List(v.iter().map(|&c| Self::Float(c)).collect())
    }
}

impl<T: Into<ArgValue>> From<Vec<T>> for ArgValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

/// Named creation arguments in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginArgs(IndexMap<String, ArgValue>);

impl PluginArgs {
    /// No arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace one argument.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    /// Argument keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    fn require(&self, key: &str) -> Result<&ArgValue, PluginError> {
        self.get(key).ok_or_else(|| PluginError::InvalidArgument {
            reason: format!("missing argument '{key}'"),
        })
    }

    /// A non-negative integer.
    pub fn u64(&self, key: &str) -> Result<u64, PluginError> {
        match self.require(key)? {
            ArgValue::Int(v) => u64::try_from(*v).map_err(|_| PluginError::InvalidArgument {
                reason: format!("argument '{key}' must be non-negative, got {v}"),
            }),
            other => Err(wrong_type(key, "a non-negative integer", other)),
        }
    }

    /// A number; integers are widened.
    pub fn f64(&self, key: &str) -> Result<f64, PluginError> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| wrong_type(key, "a number", value))
    }

    /// A string.
    pub fn str(&self, key: &str) -> Result<&str, PluginError> {
        match self.require(key)? {
            ArgValue::Str(s) => Ok(s),
            other => Err(wrong_type(key, "a string", other)),
        }
    }

    /// A string, or `None` if the key is absent.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, PluginError> {
        match self.get(key) {
            None => Ok(None),
            Some(ArgValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    /// A list of three numbers.
    pub fn vec3(&self, key: &str) -> Result<[f64; 3], PluginError> {
        let value = self.require(key)?;
        let items = match value {
            ArgValue::List(items) if items.len() == 3 => items,
            other => return Err(wrong_type(key, "a list of three numbers", other)),
        };
        let mut out = [0.0; 3];
        for (slot, item) in out.iter_mut().zip(items) {
            *slot = item
                .as_f64()
                .ok_or_else(|| wrong_type(key, "a list of three numbers", item))?;
        }
        Ok(out)
    }

    /// A list of strings. A bare string is accepted as a one-element list.
    pub fn str_list(&self, key: &str) -> Result<Vec<String>, PluginError> {
        match self.require(key)? {
            ArgValue::Str(s) => Ok(vec![s.clone()]),
            ArgValue::List(items) => items
                .iter()
                .map(|item| match item {
                    ArgValue::Str(s) => Ok(s.clone()),
                    other => Err(wrong_type(key, "a list of strings", other)),
                })
                .collect(),
            other => Err(wrong_type(key, "a list of strings", other)),
        }
    }

    /// A positive step period.
    pub fn cadence(&self, key: &str) -> Result<Cadence, PluginError> {
        let every = self.u64(key)?;
        Cadence::every(every).ok_or_else(|| PluginError::InvalidArgument {
            reason: format!("argument '{key}' must be positive"),
        })
    }
}

fn wrong_type(key: &str, expected: &str, got: &ArgValue) -> PluginError {
    PluginError::InvalidArgument {
        reason: format!(
            "argument '{key}' must be {expected}, got {}",
            got.type_name()
        ),
    }
}

/// A plugin declaration: which kind to create, under which name, with
/// which arguments.
///
/// In TOML the arguments sit beside `kind` and `name`:
///
/// ```toml
/// [[plugins]]
/// kind = "stats"
/// name = "stats"
/// every = 100
/// vectors = ["solvent"]
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Plugin kind, looked up in a [`PluginRegistry`](crate::PluginRegistry).
    pub kind: String,
    /// Plugin name, unique per role.
    pub name: String,
    /// Kind-specific arguments.
    #[serde(flatten)]
    pub args: PluginArgs,
}

impl PluginSpec {
    /// Create a declaration.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, args: PluginArgs) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn getters_convert_and_name_keys() {
        let args = PluginArgs::new()
            .with("every", 10)
            .with("force", [1.0, 0.0, -2.0])
            .with("vectors", vec!["a", "b"])
            .with("scale", 2);
        assert_eq!(args.u64("every").unwrap(), 10);
        assert_eq!(args.vec3("force").unwrap(), [1.0, 0.0, -2.0]);
        assert_eq!(args.str_list("vectors").unwrap(), vec!["a", "b"]);
        assert_eq!(args.f64("scale").unwrap(), 2.0);
        assert_eq!(args.opt_str("path").unwrap(), None);

        match args.str("every") {
            Err(PluginError::InvalidArgument { reason }) => {
                assert!(reason.contains("'every'"));
                assert!(reason.contains("an integer"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn missing_and_negative_rejected() {
        let args = PluginArgs::new().with("every", -1);
        assert!(matches!(
            args.u64("every"),
            Err(PluginError::InvalidArgument { .. })
        ));
        assert!(matches!(
            args.u64("other"),
            Err(PluginError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn zero_cadence_rejected() {
        let args = PluginArgs::new().with("every", 0);
        assert!(args.cadence("every").is_err());
        let args = PluginArgs::new().with("every", 4);
        assert_eq!(args.cadence("every").unwrap().period(), 4);
    }

    #[test]
    fn spec_reads_flattened_toml() {
        let spec: PluginSpec = toml::from_str(
            r#"
            kind = "dump_xyz"
            name = "positions"
            every = 50
            vector = "solvent"
            path = "xyz"
            "#,
        )
        .unwrap();
        assert_eq!(spec.kind, "dump_xyz");
        assert_eq!(spec.name, "positions");
        assert_eq!(spec.args.u64("every").unwrap(), 50);
        assert_eq!(spec.args.str("vector").unwrap(), "solvent");
        assert_eq!(
            spec.args.keys().collect::<Vec<_>>(),
            vec!["every", "vector", "path"]
        );
    }
}
