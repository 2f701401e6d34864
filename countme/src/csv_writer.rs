use crate::base_writer::{ItemWriter, WriterOptions};
use crate::items::Item;
use crate::types::Result;
use std::io::Write;
use std::marker::PhantomData;

/// CSV writer: a header row of field names, then one row per item.
pub struct CsvWriter<T, W: Write> {
    writer: csv::Writer<W>,
    _item: PhantomData<fn(&T)>,
}

impl<T: Item, W: Write> CsvWriter<T, W> {
    pub fn new(out: W, options: &WriterOptions) -> Result<Self> {
        options.time_field::<T>()?;
        Ok(Self {
            writer: csv::Writer::from_writer(out),
            _item: PhantomData,
        })
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error().into())
    }
}

impl<T: Item, W: Write> ItemWriter<T> for CsvWriter<T, W> {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(T::field_names())?;
        Ok(())
    }

    fn write_item(&mut self, item: &T) -> Result<()> {
        let values = item.values();
        self.writer.write_record(values.iter().map(|v| v.to_text().into_owned()))?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
