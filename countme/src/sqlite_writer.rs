use crate::base_writer::{ItemWriter, WriterOptions};
use crate::items::Item;
use crate::types::Result;
use rusqlite::{params_from_iter, Connection};
use std::marker::PhantomData;
use tracing::{debug, info};

/// Quotes an SQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Writes each item as a new row in a SQLite table.
///
/// The header creates the table (if needed) and opens a transaction; the
/// footer builds the time index and commits.
pub struct SqliteWriter<T> {
    conn: Connection,
    create_table: String,
    insert_item: String,
    create_time_index: String,
    in_transaction: bool,
    _item: PhantomData<fn(&T)>,
}

impl<T: Item> SqliteWriter<T> {
    pub fn new(conn: Connection, options: &WriterOptions) -> Result<Self> {
        let timefield = options.time_field::<T>()?;
        let table = quote_ident(&options.table_name);

        let coldefs: Vec<String> = T::FIELDS.iter().map(|f| f.sql_column()).collect();
        let create_table = format!("CREATE TABLE IF NOT EXISTS {} ({})", table, coldefs.join(","));
        let insert_item = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            T::field_names().join(","),
            vec!["?"; T::FIELDS.len()].join(","),
        );
        let create_time_index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quote_ident(&format!("{}_idx", timefield)),
            table,
            timefield,
        );
        debug!("sqlite writer: {}", create_table);

        Ok(Self {
            conn,
            create_table,
            insert_item,
            create_time_index,
            in_transaction: false,
            _item: PhantomData,
        })
    }

    /// Gives the connection back, e.g. to query what was written.
    pub fn into_connection(self) -> Connection {
        self.conn
    }
}

impl<T: Item> ItemWriter<T> for SqliteWriter<T> {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn write_header(&mut self) -> Result<()> {
        self.conn.execute_batch(&self.create_table)?;
        self.conn.execute_batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn write_item(&mut self, item: &T) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(&self.insert_item)?;
        stmt.execute(params_from_iter(item.values()))?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        self.conn.execute_batch(&self.create_time_index)?;
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        info!("sqlite writer: committed, index built");
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        // an open transaction here means the footer never ran; SQLite
        // rolls it back on close
        self.conn.close().map_err(|(_, e)| e.into())
    }
}
