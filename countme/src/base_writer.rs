use crate::items::Item;
use crate::types::{CountmeError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_TABLE_NAME: &str = "countme_raw";

/// Writer settings. Backends ignore the settings that don't apply to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// SQLite table to create and fill.
    pub table_name: String,
    /// Separator for the AWK writer; written verbatim, never escaped.
    pub field_separator: String,
    /// Field to index; defaults to the item's own time field.
    pub time_field: Option<String>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            field_separator: "\t".to_string(),
            time_field: None,
        }
    }
}

impl WriterOptions {
    /// The configured time field, checked against the item's schema.
    pub fn time_field<T: Item>(&self) -> Result<&'static str> {
        let wanted = self.time_field.as_deref().unwrap_or(T::TIME_FIELD);
        T::FIELDS
            .iter()
            .map(|f| f.name)
            .find(|name| *name == wanted)
            .ok_or_else(|| CountmeError::UnknownTimeField {
                item: T::NAME,
                field: wanted.to_string(),
            })
    }
}

/// Serializes items of one type to one backend.
///
/// Callers must follow the protocol `write_header`, `write_item`*,
/// `write_footer`, `close`, even for backends where the header or footer
/// does nothing. [`write_items`] does this for a whole iterator.
pub trait ItemWriter<T: Item> {
    /// Returns the format name of this writer (e.g. "csv", "sqlite")
    fn name(&self) -> &'static str;

    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_item(&mut self, item: &T) -> Result<()>;

    fn write_footer(&mut self) -> Result<()> {
        Ok(())
    }

    /// Releases the underlying output.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Writes header, every item, and footer. Stops at the first error, in which
/// case the footer is not written.
pub fn write_items<T, I>(writer: &mut dyn ItemWriter<T>, items: I) -> Result<u64>
where
    T: Item,
    I: IntoIterator<Item = Result<T>>,
{
    debug!("{} writer: writing header for {}", writer.name(), T::NAME);
    writer.write_header()?;

    let mut count = 0u64;
    for item in items {
        writer.write_item(&item?)?;
        count += 1;
    }

    writer.write_footer()?;
    info!("{} writer: wrote {} {} items", writer.name(), count, T::NAME);
    Ok(count)
}
