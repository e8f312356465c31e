use crate::error::{DispatchError, Result};
use serde::de::DeserializeOwned;
use std::io::Read;

/// Reads typed records from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<T>`.
/// It handles whitespace trimming and flexible record lengths automatically,
/// so one malformed row yields one error without ending the stream.
pub struct RecordReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RecordReader<R> {
    /// Creates a new `RecordReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes records.
    pub fn records<T: DeserializeOwned>(self) -> impl Iterator<Item = Result<T>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(DispatchError::from))
    }
}
