//! Positional argument parsing and validation.
//!
//! Handlers receive a JSON array. Slot *i* belongs to the *i*-th declared
//! [`ParamSpec`]; extra slots are ignored. Each parameter layout has its own
//! request struct ([`SearchFirstArgs`], [`PropertiesFirstArgs`]) whose
//! `parse` validates the slots and applies defaults before any request is
//! made.

use serde_json::Value;

use crate::error::{HnResult, ValidationError};

/// Default `result_limit` of the configurable handlers.
pub const DEFAULT_LIMIT: usize = 100;
/// Hard cap on `result_limit`.
pub const MAX_LIMIT: usize = 1000;

/// Value type of a positional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A JSON string.
    Text,
    /// A string or list of strings naming output columns.
    Properties,
}

/// Declaration of one positional parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Value used when the slot is absent; `None` for required parameters.
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// Decode the raw handler input into positional arguments.
pub fn parse_input(input: &str) -> HnResult<Vec<Value>> {
    let value: Value = serde_json::from_str(input).map_err(|e| ValidationError::InvalidJson {
        message: e.to_string(),
    })?;
    match value {
        Value::Array(args) => Ok(args),
        _ => Err(ValidationError::NotAnArray.into()),
    }
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn text_arg(args: &[Value], index: usize, spec: &ParamSpec) -> HnResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::WrongType {
            field: spec.name.into(),
            expected: "a string",
        }
        .into()),
        None => match spec.default {
            Some(default) if !spec.required => Ok(default.to_string()),
            _ => Err(ValidationError::MissingField {
                field: spec.name.into(),
            }
            .into()),
        },
    }
}

fn properties_arg(args: &[Value], index: usize, spec: &ParamSpec) -> HnResult<PropertySelection> {
    match args.get(index) {
        Some(value) => PropertySelection::from_value(value),
        None if spec.required => Err(ValidationError::MissingField {
            field: spec.name.into(),
        }
        .into()),
        None => Ok(PropertySelection::from_names(
            spec.default.unwrap_or("*").split(','),
        )),
    }
}

// ---------------------------------------------------------------------------
// Property selection
// ---------------------------------------------------------------------------

/// Columns requested by the caller, normalized but not yet resolved against
/// a handler's property map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySelection {
    names: Vec<String>,
}

impl PropertySelection {
    /// Every property of the handler.
    pub fn all() -> Self {
        Self {
            names: vec!["*".into()],
        }
    }

    /// Normalize names: lower-case and trim each one.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Coerce a `properties` argument.
    ///
    /// A string is split on commas. A list may hold strings (each split on
    /// commas) or lists of strings, which are flattened one level.
    pub fn from_value(value: &Value) -> HnResult<Self> {
        let mut names = Vec::new();
        match value {
            Value::String(s) => names.extend(s.split(',').map(str::to_string)),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(s) => names.extend(s.split(',').map(str::to_string)),
                        Value::Array(inner) => {
                            for nested in inner {
                                let Value::String(s) = nested else {
                                    return Err(ValidationError::InvalidProperties {
                                        message: "nested lists may only contain strings".into(),
                                    }
                                    .into());
                                };
                                names.extend(s.split(',').map(str::to_string));
                            }
                        }
                        _ => {
                            return Err(ValidationError::InvalidProperties {
                                message: "must be a list with only string values".into(),
                            }
                            .into());
                        }
                    }
                }
            }
            _ => {
                return Err(ValidationError::InvalidProperties {
                    message: "must be a string or a list of strings".into(),
                }
                .into());
            }
        }
        Ok(Self::from_names(names))
    }

    /// True for `"*"`, `""` and the empty list.
    pub fn is_wildcard(&self) -> bool {
        match self.names.as_slice() {
            [] => true,
            [only] => only.is_empty() || only == "*",
            _ => false,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

// ---------------------------------------------------------------------------
// Run config
// ---------------------------------------------------------------------------

/// Options carried in the query-string `config` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum rows to emit, `0..=MAX_LIMIT`.
    pub limit: usize,
    /// Emit the header row first.
    pub headers: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            headers: true,
        }
    }
}

impl RunConfig {
    /// Parse `limit=250&headers=false`. Unknown keys and blank values are
    /// ignored, and the first occurrence of a repeated key wins.
    pub fn parse(config: &str) -> HnResult<Self> {
        let mut limit: Option<String> = None;
        let mut headers: Option<String> = None;
        for (key, value) in url::form_urlencoded::parse(config.as_bytes()) {
            // `key=` counts as absent, so the default still applies.
            if value.is_empty() {
                continue;
            }
            match key.as_ref() {
                "limit" if limit.is_none() => limit = Some(value.into_owned()),
                "headers" if headers.is_none() => headers = Some(value.into_owned()),
                _ => {}
            }
        }

        let mut run = Self::default();
        if let Some(raw) = limit {
            run.limit = clamp_limit(&raw).ok_or_else(|| ValidationError::InvalidConfig {
                key: "limit".into(),
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = headers {
            run.headers = raw.to_lowercase() == "true";
        }
        Ok(run)
    }
}

/// Clamp a signed decimal integer of any magnitude to `0..=MAX_LIMIT`.
/// `None` when `raw` is not an integer.
fn clamp_limit(raw: &str) -> Option<usize> {
    let text = raw.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(0);
    }
    // Only overflow can fail here; anything that large is over the cap.
    Some(digits.parse::<usize>().map_or(MAX_LIMIT, |n| n.min(MAX_LIMIT)))
}

// ---------------------------------------------------------------------------
// Request layouts
// ---------------------------------------------------------------------------

/// `[search, properties?]`, used by the list handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFirstArgs {
    pub search: String,
    pub properties: PropertySelection,
}

impl SearchFirstArgs {
    pub const PARAMS: [ParamSpec; 2] = [
        ParamSpec {
            name: "search",
            kind: ParamKind::Text,
            required: true,
            default: None,
            description: "Search string used to find the rows to return",
        },
        ParamSpec {
            name: "properties",
            kind: ParamKind::Properties,
            required: false,
            default: Some("*"),
            description: "The properties to return, given as a string or array; defaults to all properties",
        },
    ];

    pub fn parse(args: &[Value]) -> HnResult<Self> {
        let [search, properties] = &Self::PARAMS;
        Ok(Self {
            search: text_arg(args, 0, search)?,
            properties: properties_arg(args, 1, properties)?,
        })
    }
}

/// `[properties?, search, config?]`, used by the index-style handlers.
///
/// The search slot is optional for the comment search (`filter`) and
/// required for the story search (`search`), so the layout is parameterized
/// by its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesFirstArgs {
    pub properties: PropertySelection,
    pub search: String,
    pub config: RunConfig,
}

impl PropertiesFirstArgs {
    pub const PROPERTIES: ParamSpec = ParamSpec {
        name: "properties",
        kind: ParamKind::Properties,
        required: false,
        default: Some("*"),
        description: "The properties to return, given as a string or array; defaults to all properties",
    };

    pub const CONFIG: ParamSpec = ParamSpec {
        name: "config",
        kind: ParamKind::Text,
        required: false,
        default: Some(""),
        description: "Query-string options: limit (max 1000, default 100) and headers (default true)",
    };

    pub fn parse(args: &[Value], search: &ParamSpec) -> HnResult<Self> {
        let config = text_arg(args, 2, &Self::CONFIG)?;
        Ok(Self {
            properties: properties_arg(args, 0, &Self::PROPERTIES)?,
            search: text_arg(args, 1, search)?,
            config: RunConfig::parse(&config)?,
        })
    }
}
