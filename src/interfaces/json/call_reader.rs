use crate::domain::payload::CallPayload;
use crate::error::Result;
use serde_json::Value;
use std::io::Read;

/// Reads call payloads from a JSON document.
///
/// The document is either one call object or an array of them. Items are
/// decoded one at a time, so a malformed call yields an error for that call
/// only.
pub struct CallReader {
    items: Vec<Value>,
}

impl CallReader {
    pub fn new<R: Read>(source: R) -> Result<Self> {
        let document: Value = serde_json::from_reader(source)?;
        let items = match document {
            Value::Array(items) => items,
            single => vec![single],
        };
        Ok(Self { items })
    }

    pub fn calls(self) -> impl Iterator<Item = Result<CallPayload>> {
        self.items
            .into_iter()
            .map(|item| Ok(serde_json::from_value(item)?))
    }
}
