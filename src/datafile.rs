use std::{str::FromStr, sync::Arc};

use serde_json::Value;

use crate::{Error, Result};

/// A feature flag configuration document as served by the datafile endpoint.
///
/// The manager treats the document as opaque: it is only compared structurally against the
/// previously accepted one and handed to the evaluation engine. `Datafile` is immutable and cheap
/// to clone.
#[derive(Debug, Clone)]
pub struct Datafile {
    value: Arc<Value>,
}

impl Datafile {
    /// Wrap an already parsed JSON value.
    pub fn from_value(value: Value) -> Datafile {
        Datafile {
            value: Arc::new(value),
        }
    }

    /// Parse a datafile from raw response bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Datafile> {
        let value = serde_json::from_slice(bytes)?;
        Ok(Datafile::from_value(value))
    }

    /// The underlying document.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Value of the top-level `"revision"` field, if the document has one. Informational only.
    pub fn revision(&self) -> Option<&str> {
        self.value.get("revision").and_then(Value::as_str)
    }

    /// Returns `true` if both datafiles share the same allocation.
    pub fn ptr_eq(&self, other: &Datafile) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl From<Value> for Datafile {
    fn from(value: Value) -> Self {
        Datafile::from_value(value)
    }
}

impl FromStr for Datafile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Datafile::from_slice(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Datafile;
    use crate::Error;

    #[test]
    fn parses_json_text() {
        let datafile: Datafile = r#"{"revision": "42", "flags": {"f1": true}}"#.parse().unwrap();
        assert_eq!(datafile.revision(), Some("42"));
        assert_eq!(datafile.as_value()["flags"]["f1"], json!(true));
    }

    #[test]
    fn rejects_non_json_body() {
        let result = Datafile::from_slice(b"<html>not found</html>");
        assert!(matches!(result, Err(Error::InvalidDatafile(_))));
    }

    #[test]
    fn revision_is_optional() {
        let datafile = Datafile::from_value(json!({"flags": {}}));
        assert_eq!(datafile.revision(), None);
    }

    #[test]
    fn clones_share_the_document() {
        let datafile = Datafile::from_value(json!({}));
        assert!(datafile.clone().ptr_eq(&datafile));
    }
}
