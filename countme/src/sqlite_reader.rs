use crate::base_reader::{check_fields, ItemReader, ReaderOptions};
use crate::items::Item;
use crate::sqlite_writer::quote_ident;
use crate::types::{Result, Value};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::marker::PhantomData;
use tracing::debug;

/// Reads items back from a SQLite table written by `SqliteWriter`.
///
/// Rows are fetched in rowid order, `batch_size` at a time.
pub struct SqliteReader<T> {
    conn: Connection,
    select_items: String,
    fields: Vec<String>,
    batch_size: usize,
    last_rowid: i64,
    buffer: VecDeque<Result<T>>,
    done: bool,
    _item: PhantomData<fn() -> T>,
}

/// Column names of `table` in declaration order; empty if there is no such table.
fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

impl<T: Item> SqliteReader<T> {
    pub fn new(conn: Connection, options: &ReaderOptions) -> Result<Self> {
        let found = table_columns(&conn, &options.table_name)?;
        let fields = check_fields::<T>(found)?;

        let select_items = format!(
            "SELECT rowid, {} FROM {} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
            T::field_names().join(","),
            quote_ident(&options.table_name),
        );
        Ok(Self {
            conn,
            select_items,
            fields,
            batch_size: options.batch_size.max(1),
            last_rowid: i64::MIN,
            buffer: VecDeque::new(),
            done: false,
            _item: PhantomData,
        })
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn fetch_batch(&mut self) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&self.select_items)?;
        let mut rows = stmt.query((self.last_rowid, self.batch_size as i64))?;
        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            fetched += 1;
            self.last_rowid = row.get(0)?;
            let values = (1..=T::FIELDS.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            self.buffer.push_back(T::from_values(values));
        }
        debug!("sqlite reader: fetched {} rows up to rowid {}", fetched, self.last_rowid);
        if fetched < self.batch_size {
            self.done = true;
        }
        Ok(())
    }
}

impl<T: Item> Iterator for SqliteReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.done {
            if let Err(e) = self.fetch_batch() {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front()
    }
}

impl<T: Item> ItemReader<T> for SqliteReader<T> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::MirrorItem;
    use crate::types::CountmeError;

    fn mirror_db(rows: i64) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE countme_raw (timestamp INTEGER NOT NULL, host TEXT NOT NULL, \
             repo_tag TEXT, repo_arch TEXT)",
        )
        .unwrap();
        for i in 0..rows {
            conn.execute(
                "INSERT INTO countme_raw VALUES (?1, ?2, ?3, NULL)",
                (i, format!("host{}", i), "fedora"),
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn test_sqlite_read_in_batches() {
        let opts = ReaderOptions { batch_size: 3, ..Default::default() };
        let reader = SqliteReader::<MirrorItem>::new(mirror_db(10), &opts).unwrap();
        assert_eq!(reader.fields(), ["timestamp", "host", "repo_tag", "repo_arch"]);
        let items: Vec<MirrorItem> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(items[9].host, "host9");
        assert_eq!(items[9].repo_tag.as_deref(), Some("fedora"));
        assert_eq!(items[9].repo_arch, None);
    }

    #[test]
    fn test_sqlite_exact_batch_multiple() {
        let opts = ReaderOptions { batch_size: 5, ..Default::default() };
        let reader = SqliteReader::<MirrorItem>::new(mirror_db(10), &opts).unwrap();
        assert_eq!(reader.count(), 10);
    }

    #[test]
    fn test_sqlite_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteReader::<MirrorItem>::new(conn, &ReaderOptions::default()),
            Err(CountmeError::SchemaMissing)
        ));
    }

    #[test]
    fn test_sqlite_reordered_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE countme_raw (host TEXT NOT NULL, timestamp INTEGER NOT NULL, \
             repo_tag TEXT, repo_arch TEXT)",
        )
        .unwrap();
        match SqliteReader::<MirrorItem>::new(conn, &ReaderOptions::default()) {
            Err(CountmeError::SchemaMismatch { found, .. }) => {
                assert_eq!(found, ["host", "timestamp", "repo_tag", "repo_arch"]);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other.map(|r| r.fields().to_vec())),
        }
    }
}
