use crate::base_writer::DEFAULT_TABLE_NAME;
use crate::items::Item;
use crate::types::{CountmeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// SQLite table to read from.
    pub table_name: String,
    /// Rows fetched per SQLite query.
    pub batch_size: usize,
    /// Column separator for flat text input.
    pub field_separator: String,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            batch_size: 1024,
            field_separator: "\t".to_string(),
        }
    }
}

/// Reads persisted items back.
///
/// Opening a reader discovers the field names stored in the resource and
/// refuses to continue unless they are exactly the item's fields, in order.
/// The reader is then a single-pass iterator over the stored items.
pub trait ItemReader<T: Item>: Iterator<Item = Result<T>> {
    /// Returns the format name of this reader (e.g. "csv", "sqlite")
    fn name(&self) -> &'static str;

    /// Field names found in the resource.
    fn fields(&self) -> &[String];
}

/// Checks discovered field names against the item schema.
pub fn check_fields<T: Item>(found: Vec<String>) -> Result<Vec<String>> {
    if found.is_empty() {
        error!("no field names found for {}", T::NAME);
        return Err(CountmeError::SchemaMissing);
    }
    let expected = T::field_names();
    if found.iter().map(String::as_str).ne(expected.iter().copied()) {
        error!("field mismatch for {}: expected {:?}, got {:?}", T::NAME, expected, found);
        return Err(CountmeError::SchemaMismatch {
            expected: expected.into_iter().map(String::from).collect(),
            found,
        });
    }
    debug!("fields match {}: {:?}", T::NAME, found);
    Ok(found)
}
