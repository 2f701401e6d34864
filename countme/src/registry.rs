//! Format dispatch: picks a writer by format name and a reader by file name.
//!
//! The set of formats is closed. To add a backend, add a variant to
//! [`WriterFormat`] and/or [`ReaderFormat`] and a match arm in `open`.

use crate::awk_reader::AwkReader;
use crate::awk_writer::AwkWriter;
use crate::base_reader::{ItemReader, ReaderOptions};
use crate::base_writer::{ItemWriter, WriterOptions};
use crate::csv_reader::CsvReader;
use crate::csv_writer::CsvWriter;
use crate::items::Item;
use crate::json_reader::JsonReader;
use crate::json_writer::JsonWriter;
use crate::sqlite_reader::SqliteReader;
use crate::sqlite_writer::SqliteWriter;
use crate::types::{CountmeError, Result};
use rusqlite::Connection;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Where a writer puts its items.
pub enum Output {
    Stream(Box<dyn Write>),
    Database(Connection),
}

impl Output {
    fn kind(&self) -> &'static str {
        match self {
            Output::Stream(_) => "stream",
            Output::Database(_) => "database",
        }
    }
}

/// Where a reader gets its items from.
pub enum Input {
    Stream(Box<dyn BufRead>),
    Database(Connection),
}

impl Input {
    fn kind(&self) -> &'static str {
        match self {
            Input::Stream(_) => "stream",
            Input::Database(_) => "database",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterFormat {
    Csv,
    Json,
    Awk,
    Sqlite,
}

impl WriterFormat {
    pub const ALL: [WriterFormat; 4] =
        [WriterFormat::Csv, WriterFormat::Json, WriterFormat::Awk, WriterFormat::Sqlite];

    pub fn name(self) -> &'static str {
        match self {
            WriterFormat::Csv => "csv",
            WriterFormat::Json => "json",
            WriterFormat::Awk => "awk",
            WriterFormat::Sqlite => "sqlite",
        }
    }

    /// Whether this format writes to a database rather than a byte stream.
    pub fn needs_database(self) -> bool {
        self == WriterFormat::Sqlite
    }

    pub fn open<T: Item + 'static>(
        self,
        output: Output,
        options: &WriterOptions,
    ) -> Result<Box<dyn ItemWriter<T>>> {
        info!("Opening {} writer for {}", self.name(), T::NAME);
        match (self, output) {
            (WriterFormat::Csv, Output::Stream(out)) => Ok(Box::new(CsvWriter::new(out, options)?)),
            (WriterFormat::Json, Output::Stream(out)) => Ok(Box::new(JsonWriter::new(out, options)?)),
            (WriterFormat::Awk, Output::Stream(out)) => Ok(Box::new(AwkWriter::new(out, options)?)),
            (WriterFormat::Sqlite, Output::Database(conn)) => {
                Ok(Box::new(SqliteWriter::new(conn, options)?))
            }
            (format, output) => Err(CountmeError::UnsupportedOutput {
                format: format.name(),
                output: output.kind(),
            }),
        }
    }
}

impl FromStr for WriterFormat {
    type Err = CountmeError;

    fn from_str(name: &str) -> Result<Self> {
        debug!("Looking up writer by name: {}", name);
        WriterFormat::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| {
                warn!("Writer not found: {}", name);
                CountmeError::UnknownFormat(name.to_string())
            })
    }
}

impl fmt::Display for WriterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Looks up the writer format by name and opens it. An unknown name fails
/// before `output` is touched.
pub fn make_writer<T: Item + 'static>(
    name: &str,
    output: Output,
    options: &WriterOptions,
) -> Result<Box<dyn ItemWriter<T>>> {
    let format: WriterFormat = name.parse()?;
    format.open(output, options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderFormat {
    Csv,
    Json,
    Awk,
    Sqlite,
}

impl ReaderFormat {
    pub const ALL: [ReaderFormat; 4] =
        [ReaderFormat::Csv, ReaderFormat::Json, ReaderFormat::Awk, ReaderFormat::Sqlite];

    pub fn name(self) -> &'static str {
        match self {
            ReaderFormat::Csv => "csv",
            ReaderFormat::Json => "json",
            ReaderFormat::Awk => "awk",
            ReaderFormat::Sqlite => "sqlite",
        }
    }

    /// File name suffixes this reader is picked for.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ReaderFormat::Csv => &["csv"],
            ReaderFormat::Json => &["json", "jsonl"],
            ReaderFormat::Awk => &["tsv", "awk"],
            ReaderFormat::Sqlite => &["db"],
        }
    }

    pub fn needs_database(self) -> bool {
        self == ReaderFormat::Sqlite
    }

    pub fn open<T: Item + 'static>(
        self,
        input: Input,
        options: &ReaderOptions,
    ) -> Result<Box<dyn ItemReader<T>>> {
        info!("Opening {} reader for {}", self.name(), T::NAME);
        match (self, input) {
            (ReaderFormat::Csv, Input::Stream(r)) => Ok(Box::new(CsvReader::new(r)?)),
            (ReaderFormat::Json, Input::Stream(r)) => Ok(Box::new(JsonReader::new(r)?)),
            (ReaderFormat::Awk, Input::Stream(r)) => {
                Ok(Box::new(AwkReader::new(r, &options.field_separator)?))
            }
            (ReaderFormat::Sqlite, Input::Database(conn)) => {
                Ok(Box::new(SqliteReader::new(conn, options)?))
            }
            (format, input) => Err(CountmeError::UnsupportedInput {
                format: format.name(),
                input: input.kind(),
            }),
        }
    }
}

impl FromStr for ReaderFormat {
    type Err = CountmeError;

    fn from_str(name: &str) -> Result<Self> {
        ReaderFormat::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CountmeError::UnknownFormat(name.to_string()))
    }
}

impl fmt::Display for ReaderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Guesses the reader from a file name. `None` means the format can't be
/// told from the name; what to do then is up to the caller.
pub fn guess_reader(hint: &str) -> Option<ReaderFormat> {
    let extension = match hint.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => {
            debug!("No extension in '{}'", hint);
            return None;
        }
    };
    debug!("Looking up reader by extension: {}", extension);
    let result = ReaderFormat::ALL
        .into_iter()
        .find(|f| f.extensions().contains(&extension));

    match result {
        Some(format) => info!("Selected reader '{}' for extension '.{}'", format, extension),
        None => warn!("No reader found for extension '.{}'", extension),
    }
    result
}

/// Guesses the reader from `hint` and opens it.
pub fn auto_reader<T: Item + 'static>(
    hint: &str,
    input: Input,
    options: &ReaderOptions,
) -> Result<Box<dyn ItemReader<T>>> {
    guess_reader(hint)
        .ok_or_else(|| CountmeError::UnknownFormat(hint.to_string()))?
        .open(input, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::MirrorItem;
    use std::io::{self, Cursor};

    /// Output that fails the test if anything touches it.
    struct Untouchable;

    impl Write for Untouchable {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            panic!("output was written to");
        }

        fn flush(&mut self) -> io::Result<()> {
            panic!("output was flushed");
        }
    }

    #[test]
    fn test_writer_names() {
        for format in WriterFormat::ALL {
            assert_eq!(format.name().parse::<WriterFormat>().unwrap(), format);
        }
        assert_eq!("awk".parse::<WriterFormat>().unwrap().to_string(), "awk");
    }

    #[test]
    fn test_unknown_writer_before_output() {
        let result = make_writer::<MirrorItem>(
            "unsupported",
            Output::Stream(Box::new(Untouchable)),
            &WriterOptions::default(),
        );
        match result {
            Err(CountmeError::UnknownFormat(name)) => assert_eq!(name, "unsupported"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("made a writer for an unknown format"),
        }
    }

    #[test]
    fn test_writer_output_mismatch() {
        let result = make_writer::<MirrorItem>(
            "sqlite",
            Output::Stream(Box::new(Vec::new())),
            &WriterOptions::default(),
        );
        assert!(matches!(result, Err(CountmeError::UnsupportedOutput { format: "sqlite", .. })));

        let conn = Connection::open_in_memory().unwrap();
        let result = make_writer::<MirrorItem>("csv", Output::Database(conn), &WriterOptions::default());
        assert!(matches!(result, Err(CountmeError::UnsupportedOutput { format: "csv", .. })));
    }

    #[test]
    fn test_reader_input_mismatch() {
        let result = ReaderFormat::Sqlite.open::<MirrorItem>(
            Input::Stream(Box::new(Cursor::new(""))),
            &ReaderOptions::default(),
        );
        assert!(matches!(
            result,
            Err(CountmeError::UnsupportedInput { format: "sqlite", input: "stream" })
        ));

        let conn = Connection::open_in_memory().unwrap();
        let result = ReaderFormat::Csv.open::<MirrorItem>(Input::Database(conn), &ReaderOptions::default());
        assert!(matches!(
            result,
            Err(CountmeError::UnsupportedInput { format: "csv", input: "database" })
        ));
    }

    #[test]
    fn test_guess_reader() {
        assert_eq!(guess_reader("countme.csv"), Some(ReaderFormat::Csv));
        assert_eq!(guess_reader("/var/tmp/mirrors.db"), Some(ReaderFormat::Sqlite));
        assert_eq!(guess_reader("out.jsonl"), Some(ReaderFormat::Json));
        assert_eq!(guess_reader("out.tsv"), Some(ReaderFormat::Awk));
        assert_eq!(guess_reader("access_log"), None);
        assert_eq!(guess_reader("access_log.gz"), None);
        assert_eq!(guess_reader("data.csv.gz"), None);
    }

    #[test]
    fn test_auto_reader() {
        let data = "timestamp,host,repo_tag,repo_arch\n1,a,,\n";
        let reader = auto_reader::<MirrorItem>(
            "items.csv",
            Input::Stream(Box::new(Cursor::new(data))),
            &ReaderOptions::default(),
        )
        .unwrap();
        assert_eq!(reader.name(), "csv");
        assert_eq!(reader.count(), 1);

        let result = auto_reader::<MirrorItem>(
            "items.bin",
            Input::Stream(Box::new(Cursor::new(data))),
            &ReaderOptions::default(),
        );
        assert!(matches!(result, Err(CountmeError::UnknownFormat(_))));
    }
}
