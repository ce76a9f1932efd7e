use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Descriptor key: service label
pub const KEY_LABEL: &str = "Label";
/// Descriptor key: program path
pub const KEY_PROGRAM: &str = "Program";
/// Descriptor key: program path plus arguments
pub const KEY_PROGRAM_ARGUMENTS: &str = "ProgramArguments";
/// Descriptor key: working directory
pub const KEY_WORKING_DIRECTORY: &str = "WorkingDirectory";
/// Descriptor key: enable `~` and wildcard expansion
pub const KEY_ENABLE_GLOBBING: &str = "EnableGlobbing";
/// Descriptor key: disabled flag
pub const KEY_DISABLED: &str = "Disabled";
/// Descriptor key: run at load
pub const KEY_RUN_AT_LOAD: &str = "RunAtLoad";
/// Descriptor key: keep alive
pub const KEY_KEEP_ALIVE: &str = "KeepAlive";
/// Descriptor key: stdout redirect
pub const KEY_STANDARD_OUT_PATH: &str = "StandardOutPath";
/// Descriptor key: stderr redirect
pub const KEY_STANDARD_ERROR_PATH: &str = "StandardErrorPath";

/// A typed property-list value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlistValue {
    /// `<string>`
    String(String),
    /// `<integer>`
    Integer(i64),
    /// `<real>`
    Real(f64),
    /// `<true/>` / `<false/>`
    Boolean(bool),
    /// `<date>`
    Date(DateTime<Utc>),
    /// `<data>`
    Data(Vec<u8>),
    /// `<array>`
    Array(Vec<PlistValue>),
    /// `<dict>`
    Dictionary(BTreeMap<String, PlistValue>),
}

impl PlistValue {
    /// String contents, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean contents, if this is a boolean
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Array contents, if this is an array
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary contents, if this is a dictionary
    #[must_use]
    pub const fn as_dictionary(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Dictionary(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key, if this is a dictionary
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dictionary().and_then(|map| map.get(key))
    }
}

impl From<&str> for PlistValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PlistValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PlistValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for PlistValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl<T: Into<Self>> From<Vec<T>> for PlistValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Parsed contents of a launchd descriptor: the top-level dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Descriptor {
    entries: BTreeMap<String, PlistValue>,
}

impl Descriptor {
    /// Wrap a top-level dictionary
    #[must_use]
    pub const fn new(entries: BTreeMap<String, PlistValue>) -> Self {
        Self { entries }
    }

    /// Builder-style insert, handy for tests and fixtures
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PlistValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Raw lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PlistValue> {
        self.entries.get(key)
    }

    /// All entries, sorted by key
    #[must_use]
    pub const fn entries(&self) -> &BTreeMap<String, PlistValue> {
        &self.entries
    }

    /// Is the dictionary empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(PlistValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(PlistValue::as_bool).unwrap_or(false)
    }

    /// `Label`
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.non_empty_str(KEY_LABEL)
    }

    /// `Program`
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.non_empty_str(KEY_PROGRAM)
    }

    /// `ProgramArguments`, keeping only string entries
    #[must_use]
    pub fn program_arguments(&self) -> Vec<&str> {
        self.get(KEY_PROGRAM_ARGUMENTS)
            .and_then(PlistValue::as_array)
            .map(|items| items.iter().filter_map(PlistValue::as_str).collect())
            .unwrap_or_default()
    }

    /// The program launchd would run: `Program`, else the first argument.
    #[must_use]
    pub fn executable(&self) -> Option<&str> {
        self.program().or_else(|| {
            self.program_arguments()
                .into_iter()
                .map(str::trim)
                .find(|s| !s.is_empty())
        })
    }

    /// `WorkingDirectory`
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.non_empty_str(KEY_WORKING_DIRECTORY)
    }

    /// `EnableGlobbing`
    #[must_use]
    pub fn globbing(&self) -> bool {
        self.flag(KEY_ENABLE_GLOBBING)
    }

    /// `Disabled`
    #[must_use]
    pub fn disabled(&self) -> bool {
        self.flag(KEY_DISABLED)
    }

    /// `RunAtLoad`
    #[must_use]
    pub fn run_at_load(&self) -> bool {
        self.flag(KEY_RUN_AT_LOAD)
    }

    /// `KeepAlive`; a dictionary of conditions counts as enabled
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        match self.get(KEY_KEEP_ALIVE) {
            Some(PlistValue::Boolean(b)) => *b,
            Some(PlistValue::Dictionary(conditions)) => !conditions.is_empty(),
            _ => false,
        }
    }

    /// `StandardOutPath` and `StandardErrorPath`, when set
    #[must_use]
    pub fn output_paths(&self) -> Vec<&str> {
        [KEY_STANDARD_OUT_PATH, KEY_STANDARD_ERROR_PATH]
            .into_iter()
            .filter_map(|key| self.non_empty_str(key))
            .collect()
    }
}
