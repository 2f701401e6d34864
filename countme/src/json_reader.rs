use crate::base_reader::ItemReader;
use crate::items::Item;
use crate::types::{CountmeError, Result};
use serde_json::de::IoRead;
use serde_json::{Map, StreamDeserializer, Value as JsonValue};
use std::io::Read;
use std::marker::PhantomData;
use tracing::error;

type Object = Map<String, JsonValue>;

/// Reads a stream of JSON objects written by `JsonWriter`.
///
/// Every object names its own fields, so the schema check here compares the
/// first object's keys with the item fields as a set; key order is not
/// significant in this format.
pub struct JsonReader<T, R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Object>,
    pending: Option<Object>,
    fields: Vec<String>,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item, R: Read> JsonReader<T, R> {
    pub fn new(input: R) -> Result<Self> {
        let mut stream = serde_json::Deserializer::from_reader(input).into_iter::<Object>();
        let first = match stream.next() {
            Some(first) => first?,
            None => Object::new(),
        };
        let fields: Vec<String> = first.keys().cloned().collect();
        if fields.is_empty() {
            error!("no field names found for {}", T::NAME);
            return Err(CountmeError::SchemaMissing);
        }

        let mut found = fields.clone();
        found.sort_unstable();
        let mut expected = T::field_names();
        expected.sort_unstable();
        if found.iter().map(String::as_str).ne(expected.iter().copied()) {
            error!("field mismatch for {}: got {:?}", T::NAME, fields);
            return Err(CountmeError::SchemaMismatch {
                expected: T::field_names().into_iter().map(String::from).collect(),
                found: fields,
            });
        }

        Ok(Self {
            stream,
            pending: Some(first),
            fields,
            done: false,
            _item: PhantomData,
        })
    }
}

impl<T: Item, R: Read> Iterator for JsonReader<T, R> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(object) = self.pending.take() {
            return Some(serde_json::from_value(JsonValue::Object(object)).map_err(Into::into));
        }
        if self.done {
            return None;
        }
        match self.stream.next()? {
            Ok(object) => Some(serde_json::from_value(JsonValue::Object(object)).map_err(Into::into)),
            Err(e) => {
                // the stream can't resync after a syntax error
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

impl<T: Item, R: Read> ItemReader<T> for JsonReader<T, R> {
    fn name(&self) -> &'static str {
        "json"
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
    fn test_json_read_any_key_order() {
        let data = concat!(
            r#"{"timestamp":1,"host":"a","repo_tag":"r","repo_arch":null}"#,
            "\n",
            r#"{"host":"b","repo_arch":"x","repo_tag":null,"timestamp":2}"#,
        );
        let reader = JsonReader::<MirrorItem, _>::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.fields(), ["timestamp", "host", "repo_tag", "repo_arch"]);
        let items: Vec<MirrorItem> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].host, "b");
        assert_eq!(items[1].timestamp, 2);
    }

    #[test]
    fn test_json_schema_errors() {
        assert!(matches!(
            JsonReader::<MirrorItem, _>::new(Cursor::new("")),
            Err(CountmeError::SchemaMissing)
        ));
        assert!(matches!(
            JsonReader::<MirrorItem, _>::new(Cursor::new("{}")),
            Err(CountmeError::SchemaMissing)
        ));
        assert!(matches!(
            JsonReader::<MirrorItem, _>::new(Cursor::new(r#"{"timestamp":1,"host":"a"}"#)),
            Err(CountmeError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_json_bad_value() {
        let data = r#"{"timestamp":"soon","host":"a","repo_tag":null,"repo_arch":null}"#;
        let mut reader = JsonReader::<MirrorItem, _>::new(Cursor::new(data)).unwrap();
        assert!(matches!(reader.next(), Some(Err(CountmeError::Json(_)))));
        assert!(reader.next().is_none());
    }
}
