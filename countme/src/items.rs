//! Item (record) definitions.
//!
//! Each item type is a plain struct whose field list, in declaration order,
//! is its schema. Writers and readers only ever see that schema through the
//! [`Item`] trait, so adding a new item type means adding one
//! `define_item!` block here.

use crate::timefmt::{parse_logtime, LogTime};
use crate::types::{CountmeError, Field, FieldValue, Result, Value};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

/// A record type that can be written by an `ItemWriter` and read back by an
/// `ItemReader`.
pub trait Item: Serialize + DeserializeOwned + Sized {
    /// Type name, used in log and error messages.
    const NAME: &'static str;
    /// Ordered schema. Persisted data is compatible with this item only if
    /// its field names match this list exactly, in order.
    const FIELDS: &'static [Field];
    /// Field holding the item's time; gets the SQLite index.
    const TIME_FIELD: &'static str;

    fn field_names() -> Vec<&'static str> {
        Self::FIELDS.iter().map(|f| f.name).collect()
    }

    /// Field values in schema order.
    fn values(&self) -> Vec<Value>;

    /// Builds an item from values in schema order.
    fn from_values(values: Vec<Value>) -> Result<Self>;
}

/// Defines an item struct and its [`Item`] implementation from one field list.
macro_rules! define_item {
    (
        $(#[$meta:meta])*
        pub struct $name:ident [time = $time:ident] {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty ),*
        }

        impl Item for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [Field] = &[
                $( Field {
                    name: stringify!($field),
                    kind: <$ty as FieldValue>::KIND,
                    nullable: <$ty as FieldValue>::NULLABLE,
                } ),*
            ];
            const TIME_FIELD: &'static str = stringify!($time);

            fn values(&self) -> Vec<Value> {
                vec![ $( FieldValue::to_value(&self.$field) ),* ]
            }

            fn from_values(values: Vec<Value>) -> Result<Self> {
                if values.len() != Self::FIELDS.len() {
                    return Err(CountmeError::malformed(
                        Self::NAME,
                        &format!("{} values", values.len()),
                        "wrong number of fields",
                    ));
                }
                let mut values = values.into_iter();
                Ok($name {
                    $( $field: <$ty as FieldValue>::from_value(
                        stringify!($field),
                        values.next().unwrap_or(Value::Null),
                    )? ),*
                })
            }
        }
    };
}

define_item! {
    /// Generic access.log data holder.
    pub struct LogItem [time = time] {
        pub host: String,
        pub identity: String,
        /// Raw log timestamp, e.g. `29/Mar/2020:16:04:28 +0000`.
        pub time: String,
        pub method: String,
        pub path: String,
        pub query: Option<String>,
        pub protocol: String,
        pub status: i64,
        pub nbytes: Option<i64>,
        pub referrer: String,
        pub user_agent: String,
    }
}

impl LogItem {
    pub fn datetime(&self) -> Result<LogTime> {
        parse_logtime(&self.time)
    }

    pub fn timestamp(&self) -> Result<i64> {
        Ok(self.datetime()?.timestamp())
    }

    pub fn query_items(&self) -> Vec<(String, String)> {
        self.query.as_deref().map(parse_query_pairs).unwrap_or_default()
    }

    pub fn query_dict(&self) -> HashMap<String, String> {
        self.query.as_deref().map(parse_querydict).unwrap_or_default()
    }
}

define_item! {
    /// A basic mirrorlist/metalink request: timestamp, client address, and
    /// the requested `repo=` and `arch=` values.
    pub struct MirrorItem [time = timestamp] {
        pub timestamp: i64,
        pub host: String,
        pub repo_tag: Option<String>,
        pub repo_arch: Option<String>,
    }
}

define_item! {
    /// A "countme" request, with the countme value and the fields parsed
    /// out of the libdnf User-Agent.
    pub struct CountmeItem [time = timestamp] {
        pub timestamp: i64,
        pub host: String,
        pub os_name: String,
        pub os_version: String,
        pub os_variant: String,
        pub os_arch: String,
        pub countme: i64,
        pub repo_tag: String,
        pub repo_arch: String,
    }
}

/// Decoded `(key, value)` pairs, skipping pairs with a blank value
/// (`key=` or a bare `key`).
fn query_pairs(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(_, value)| !value.is_empty())
}

/// Decodes a query string into ordered `(key, value)` pairs.
pub fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query_pairs(query).collect()
}

/// Decodes a query string the way mirrormanager does: on duplicate keys the
/// last value wins, and blank values are ignored.
pub fn parse_querydict(query: &str) -> HashMap<String, String> {
    query_pairs(query).collect()
}
