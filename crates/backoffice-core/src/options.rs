//! Label/value option lists for enum dictionaries and select widgets.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Option value: enums are keyed either by integer codes or by strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Int(i64),
    Str(String),
}

impl OptionValue {
    /// Loose equality: an integer matches a string holding the same decimal
    /// text, so `1` and `"1"` are the same option.
    pub fn matches(&self, other: &OptionValue) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Int(a), Self::Str(b)) | (Self::Str(b), Self::Int(a)) => {
                b.trim().parse::<i64>().is_ok_and(|b| b == *a)
            }
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, Self::Int(0))
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Str(v) => f.write_str(v),
        }
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for OptionValue {
    fn from(v: u64) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: OptionValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SelectOption>,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<SelectOption>) -> Self {
        self.children = children;
        self
    }
}

/// Static enum dictionaries, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    enums: BTreeMap<String, Vec<SelectOption>>,
}

impl EnumRegistry {
    /// Build from already-parsed dictionaries. An integer `0` option is
    /// moved to the end of its list (the "unset/other" entry).
    pub fn new(enums: BTreeMap<String, Vec<SelectOption>>) -> Self {
        let enums = enums
            .into_iter()
            .filter(|(_, options)| !options.is_empty())
            .map(|(name, mut options)| {
                if let Some(pos) = options.iter().position(|o| o.value.is_zero()) {
                    let zero = options.remove(pos);
                    options.push(zero);
                }
                (name, options)
            })
            .collect();
        Self { enums }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let enums: BTreeMap<String, Vec<SelectOption>> = serde_json::from_str(json)?;
        Ok(Self::new(enums))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::io(path.display().to_string(), &e))?;
        Self::from_json(&raw)
    }

    /// Load from `path`, or start empty when the file is missing or invalid.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(registry) => {
                tracing::info!(path = %path.display(), enums = registry.len(), "Loaded enum dictionaries");
                registry
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Enum dictionaries unavailable, starting empty");
                Self::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[SelectOption]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    pub fn all(&self) -> &BTreeMap<String, Vec<SelectOption>> {
        &self.enums
    }

    pub fn len(&self) -> usize {
        self.enums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enums.is_empty()
    }

    pub fn get_label(&self, name: &str, value: &OptionValue) -> Option<&str> {
        self.get(name)?
            .iter()
            .find(|o| o.value.matches(value))
            .map(|o| o.label.as_str())
    }
}
