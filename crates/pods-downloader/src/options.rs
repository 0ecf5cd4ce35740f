//! Option bags handed to download strategies.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl Scalar {
    /// String view of the value, `None` for booleans and lists
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value enables the option it is attached to
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::String(s) => !s.is_empty() && s != "false",
            Scalar::List(items) => !items.is_empty(),
        }
    }

    /// Values as a list; a plain string becomes a single element
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Scalar::List(items) => items.clone(),
            Scalar::String(s) => vec![s.clone()],
            Scalar::Bool(_) => Vec::new(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::String(s) => f.write_str(s),
            Scalar::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<Vec<String>> for Scalar {
    fn from(value: Vec<String>) -> Self {
        Scalar::List(value)
    }
}

/// Flat option bag, keyed by option name
pub type Options = IndexMap<String, Scalar>;

/// Look up a string option, ignoring empty strings
pub fn string_option<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .and_then(Scalar::as_str)
        .filter(|s| !s.is_empty())
}

/// Whether a boolean-ish option is set
pub fn flag_option(options: &Options, key: &str) -> bool {
    options.get(key).map(Scalar::is_truthy).unwrap_or(false)
}

/// Build an option bag from key/value pairs
///
/// ```
/// use pods_downloader::options::{options_from, Scalar};
///
/// let options = options_from([("git", Scalar::from("https://example.com/a.git")), ("submodules", true.into())]);
/// assert_eq!(options.len(), 2);
/// ```
pub fn options_from<K, I>(pairs: I) -> Options
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Scalar)>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::from(true).to_string(), "true");
        assert_eq!(Scalar::from("abc").to_string(), "abc");
        assert_eq!(
            Scalar::from(vec!["a: 1".to_string(), "b: 2".to_string()]).to_string(),
            "a: 1,b: 2"
        );
    }

    #[test]
    fn test_scalar_json_shapes() {
        let options: Options = serde_json::from_str(
            r#"{"http": "https://example.com/a.zip", "flatten": false, "headers": ["X-A: 1"]}"#,
        )
        .unwrap();

        assert_eq!(options["http"], Scalar::from("https://example.com/a.zip"));
        assert_eq!(options["flatten"], Scalar::Bool(false));
        assert_eq!(options["headers"], Scalar::List(vec!["X-A: 1".to_string()]));
    }

    #[test]
    fn test_flag_and_string_lookup() {
        let options = options_from([
            ("submodules", Scalar::from(true)),
            ("tag", Scalar::from("")),
            ("commit", Scalar::from("abc")),
        ]);

        assert!(flag_option(&options, "submodules"));
        assert!(!flag_option(&options, "missing"));
        assert_eq!(string_option(&options, "tag"), None);
        assert_eq!(string_option(&options, "commit"), Some("abc"));
    }
}
