use crate::base_writer::{ItemWriter, WriterOptions};
use crate::items::Item;
use crate::types::Result;
use std::io::Write;
use std::marker::PhantomData;

/// Flat text for awk/cut/sort: values joined by a separator, one item per
/// line. Nothing is quoted or escaped, so values containing the separator
/// or a newline will not survive a round trip.
pub struct AwkWriter<T, W: Write> {
    out: W,
    separator: String,
    _item: PhantomData<fn(&T)>,
}

impl<T: Item, W: Write> AwkWriter<T, W> {
    pub fn new(out: W, options: &WriterOptions) -> Result<Self> {
        options.time_field::<T>()?;
        Ok(Self {
            out,
            separator: options.field_separator.clone(),
            _item: PhantomData,
        })
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_row<I, S>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::new();
        for (i, col) in row.into_iter().enumerate() {
            if i > 0 {
                line.push_str(&self.separator);
            }
            line.push_str(col.as_ref());
        }
        line.push('\n');
        self.out.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl<T: Item, W: Write> ItemWriter<T> for AwkWriter<T, W> {
    fn name(&self) -> &'static str {
        "awk"
    }

    fn write_header(&mut self) -> Result<()> {
        self.write_row(T::field_names())
    }

    fn write_item(&mut self, item: &T) -> Result<()> {
        let values = item.values();
        self.write_row(values.iter().map(|v| v.to_text()))
    }

    fn write_footer(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
