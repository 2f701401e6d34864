use crate::base_reader::{check_fields, ItemReader};
use crate::items::Item;
use crate::types::{CountmeError, Result};
use std::io::BufRead;
use std::marker::PhantomData;

/// Reads the flat text written by `AwkWriter`. Empty columns are NULL for
/// optional fields.
pub struct AwkReader<T, R: BufRead> {
    lines: std::io::Lines<R>,
    separator: String,
    fields: Vec<String>,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item, R: BufRead> AwkReader<T, R> {
    pub fn new(input: R, separator: &str) -> Result<Self> {
        let mut lines = input.lines();
        let header = match lines.next() {
            Some(line) => line?,
            None => String::new(),
        };
        let found = if header.is_empty() {
            Vec::new()
        } else {
            header.split(separator).map(str::to_string).collect()
        };
        let fields = check_fields::<T>(found)?;
        Ok(Self {
            lines,
            separator: separator.to_string(),
            fields,
            done: false,
            _item: PhantomData,
        })
    }

    fn parse_line(&self, line: &str) -> Result<T> {
        let cols: Vec<&str> = line.split(self.separator.as_str()).collect();
        if cols.len() != T::FIELDS.len() {
            return Err(CountmeError::malformed(T::NAME, line, "wrong number of columns"));
        }
        let values = T::FIELDS
            .iter()
            .zip(cols)
            .map(|(field, col)| field.parse_text(col))
            .collect::<Result<Vec<_>>>()?;
        T::from_values(values)
    }
}

impl<T: Item, R: BufRead> Iterator for AwkReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.lines.next() {
                Some(Ok(line)) if line.is_empty() => continue,
                Some(Ok(line)) => return Some(self.parse_line(&line)),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
                None => self.done = true,
            }
        }
        None
    }
}

impl<T: Item, R: BufRead> ItemReader<T> for AwkReader<T, R> {
    fn name(&self) -> &'static str {
        "awk"
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::MirrorItem;
    use std::io::Cursor;

    #[test]
    fn test_awk_read() {
        let data = "timestamp\thost\trepo_tag\trepo_arch\n7\ta b\tr\t\n\n8\tc\t\tx\n";
        let items: Vec<MirrorItem> = AwkReader::<MirrorItem, _>::new(Cursor::new(data), "\t")
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].host, "a b");
        assert_eq!(items[0].repo_arch, None);
        assert_eq!(items[1].repo_tag, None);
    }

    #[test]
    fn test_awk_schema_errors() {
        assert!(matches!(
            AwkReader::<MirrorItem, _>::new(Cursor::new(""), "\t"),
            Err(CountmeError::SchemaMissing)
        ));
        assert!(matches!(
            AwkReader::<MirrorItem, _>::new(Cursor::new("timestamp host repo_tag repo_arch\n"), "\t"),
            Err(CountmeError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_awk_separator_in_value() {
        let data = "timestamp\thost\trepo_tag\trepo_arch\n7\ta\tb\tr\t\n";
        let mut reader = AwkReader::<MirrorItem, _>::new(Cursor::new(data), "\t").unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(CountmeError::MalformedRecordField { .. }))
        ));
    }
}
