use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::fetcher::OptionFetcher;
use super::validators::{ValidationError, ValidationResult};

/// How a parameter is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Password,
    Select,
    MultiSelect,
    Confirm,
    Integer,
}

/// A collected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Bool(bool),
    Int(i64),
}

impl ParamValue {
    /// Empty text, empty list, `false` and `0` count as "not provided".
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Bool(b) => !b,
            Self::Int(n) => *n == 0,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "{}", items.join(", ")),
            Self::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

/// One choice of a select prompt. The label is shown, the value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

pub type Validator = Arc<dyn Fn(&ParamValue) -> ValidationResult + Send + Sync>;

/// Declarative description of one collectible parameter.
#[derive(Clone)]
pub struct ParamDefinition {
    pub name: String,
    pub message: String,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub help: Option<String>,
    pub validator: Option<Validator>,
    pub fetcher: Option<Arc<dyn OptionFetcher>>,
    pub depends_on: Vec<String>,
}

impl fmt::Debug for ParamDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

impl ParamDefinition {
    pub fn new(name: impl Into<String>, message: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            kind,
            required: false,
            default: None,
            help: None,
            validator: None,
            fetcher: None,
            depends_on: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&ParamValue) -> ValidationResult + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Validator applied to text values; other value shapes are rejected.
    pub fn validate_text(self, check: fn(&str) -> ValidationResult) -> Self {
        self.with_validator(move |value| match value {
            ParamValue::Text(s) => check(s),
            other => Err(ValidationError::new(format!("expected text, got '{}'", other))),
        })
    }

    /// Validator applied to integer values; other value shapes are rejected.
    pub fn validate_int(self, check: fn(i64) -> ValidationResult) -> Self {
        self.with_validator(move |value| match value {
            ParamValue::Int(n) => check(*n),
            other => Err(ValidationError::new(format!(
                "expected a whole number, got '{}'",
                other
            ))),
        })
    }

    pub fn with_options(mut self, fetcher: impl OptionFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.depends_on = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn validate(&self, value: &ParamValue) -> ValidationResult {
        match &self.validator {
            Some(validator) => validator(value),
            None => Ok(()),
        }
    }

    /// Prompt text including the help suffix.
    pub fn prompt_text(&self) -> String {
        match &self.help {
            Some(help) => format!("{} ({})", self.message, help),
            None => self.message.clone(),
        }
    }
}
