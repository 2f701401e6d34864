// Access-log extraction crate for countme / mirror statistics
// Matchers turn log lines into items, writers and readers persist them

pub mod types;
pub mod timefmt;
pub mod items;

// Line matching
pub mod base_matcher;
pub mod patterns;
pub mod log_matcher;
pub mod mirror_matcher;
pub mod countme_matcher;

// Writer implementations
pub mod base_writer;
pub mod csv_writer;
pub mod json_writer;
pub mod awk_writer;
pub mod sqlite_writer;

// Reader implementations
pub mod base_reader;
pub mod csv_reader;
pub mod json_reader;
pub mod awk_reader;
pub mod sqlite_reader;

pub mod registry;

// Re-export main types
pub use types::*;
pub use timefmt::{parse_logtime, weeknum, LogTime};
pub use items::{CountmeItem, Item, LogItem, MirrorItem};
pub use base_matcher::{Captures, Extractor, MatchIter, Matcher};
pub use base_writer::{write_items, ItemWriter, WriterOptions, DEFAULT_TABLE_NAME};
pub use base_reader::{ItemReader, ReaderOptions};
pub use registry::{auto_reader, guess_reader, make_writer, Input, Output, ReaderFormat, WriterFormat};

// Re-export matchers and backends
pub use log_matcher::LogMatcher;
pub use mirror_matcher::MirrorMatcher;
pub use countme_matcher::CountmeMatcher;
pub use csv_writer::CsvWriter;
pub use json_writer::JsonWriter;
pub use awk_writer::AwkWriter;
pub use sqlite_writer::SqliteWriter;
pub use csv_reader::CsvReader;
pub use json_reader::JsonReader;
pub use awk_reader::AwkReader;
pub use sqlite_reader::SqliteReader;
