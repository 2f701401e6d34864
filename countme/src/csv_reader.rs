use crate::base_reader::{check_fields, ItemReader};
use crate::items::Item;
use crate::types::{CountmeError, Result};
use csv::StringRecord;
use std::io::Read;
use std::marker::PhantomData;

/// Reads items back from CSV written by `CsvWriter`.
pub struct CsvReader<T, R: Read> {
    reader: csv::Reader<R>,
    fields: Vec<String>,
    record: StringRecord,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item, R: Read> CsvReader<T, R> {
    pub fn new(input: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(input);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        // numbers in the field names mean we're looking at data, not a header
        if header.iter().any(|name| !name.is_empty() && name.chars().all(|c| c.is_ascii_digit())) {
            return Err(CountmeError::SchemaMissing);
        }
        let fields = check_fields::<T>(header)?;
        Ok(Self {
            reader,
            fields,
            record: StringRecord::new(),
            done: false,
            _item: PhantomData,
        })
    }

    fn parse_record(&self) -> Result<T> {
        let values = T::FIELDS
            .iter()
            .zip(self.record.iter())
            .map(|(field, cell)| field.parse_text(cell))
            .collect::<Result<Vec<_>>>()?;
        T::from_values(values)
    }
}

impl<T: Item, R: Read> Iterator for CsvReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(self.parse_record()),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl<T: Item, R: Read> ItemReader<T> for CsvReader<T, R> {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }
}
