use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use thiserror::Error;
use tracing::debug;

use crate::config::DbConfig;
use crate::model::Record;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Registrations that own at least one certificate and carry a non-empty
/// contact payload. No ORDER BY: rows arrive in store order.
pub const AUDIT_QUERY: &str = "
    SELECT DISTINCT r.id, r.contact, r.createdAt
    FROM registrations AS r
      INNER JOIN certificates AS c ON c.registrationID = r.id
    WHERE r.contact IS NOT NULL
      AND CAST(r.contact AS TEXT) NOT IN ('[]', 'null')
";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open audit query cursor")]
    Open(#[source] BoxError),
    #[error("failed to read row {row} from audit query cursor")]
    Fetch {
        row: u64,
        #[source]
        source: BoxError,
    },
    #[error("audit query cursor was not closed cleanly")]
    Close(#[source] BoxError),
}

impl SourceError {
    pub fn open(err: impl Into<BoxError>) -> Self {
        Self::Open(err.into())
    }

    pub fn fetch(row: u64, err: impl Into<BoxError>) -> Self {
        Self::Fetch {
            row,
            source: err.into(),
        }
    }

    pub fn close(err: impl Into<BoxError>) -> Self {
        Self::Close(err.into())
    }
}

/// Forward-only, single-pass producer of candidate records.
pub trait RecordSource {
    /// Opens the cursor, hands every record to `visit` in cursor order and
    /// closes it. Returns the number of records fetched. Any error stops the
    /// stream before the failing row reaches `visit`.
    fn stream(&mut self, visit: &mut dyn FnMut(Record)) -> Result<u64, SourceError>;
}

pub struct SqliteRecordSource<'conn> {
    connection: &'conn Connection,
}

impl<'conn> SqliteRecordSource<'conn> {
    pub fn new(connection: &'conn Connection) -> Self {
        Self { connection }
    }
}

impl RecordSource for SqliteRecordSource<'_> {
    fn stream(&mut self, visit: &mut dyn FnMut(Record)) -> Result<u64, SourceError> {
        let mut statement = self
            .connection
            .prepare(AUDIT_QUERY)
            .map_err(SourceError::open)?;

        let mut fetched = 0_u64;
        {
            let mut rows = statement.query([]).map_err(SourceError::open)?;
            while let Some(row) = rows
                .next()
                .map_err(|err| SourceError::fetch(fetched + 1, err))?
            {
                let record = read_record(row).map_err(|err| SourceError::fetch(fetched + 1, err))?;
                fetched += 1;
                visit(record);
            }
        }

        // Finalizing surfaces errors the last step may have left behind.
        statement.finalize().map_err(SourceError::close)?;
        debug!(rows = fetched, "audit query cursor closed");
        Ok(fetched)
    }
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let created_at = column_bytes(row, 2, "createdAt")?;

    Ok(Record {
        id: row.get(0)?,
        raw_contact: column_bytes(row, 1, "contact")?,
        created_at: String::from_utf8_lossy(&created_at).into_owned(),
    })
}

// Numbers stored in text columns read back as their decimal text so the
// record is still audited; only NULL is unreadable.
fn column_bytes(row: &Row<'_>, index: usize, name: &str) -> rusqlite::Result<Vec<u8>> {
    match row.get_ref(index)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Ok(bytes.to_vec()),
        ValueRef::Integer(value) => Ok(value.to_string().into_bytes()),
        ValueRef::Real(value) => Ok(value.to_string().into_bytes()),
        ValueRef::Null => Err(rusqlite::Error::InvalidColumnType(
            index,
            name.to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

/// Opens the store read-only. With `read_uncommitted` the connection joins the
/// shared cache and reads uncommitted data, trading consistency for not
/// contending with live writers.
pub fn open_store(db_path: &Path, db: &DbConfig) -> Result<Connection> {
    let cache_flag = if db.read_uncommitted {
        OpenFlags::SQLITE_OPEN_SHARED_CACHE
    } else {
        OpenFlags::SQLITE_OPEN_PRIVATE_CACHE
    };
    let connection = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | cache_flag,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))?;

    connection
        .busy_timeout(db.busy_timeout())
        .context("failed to set busy timeout")?;
    configure_isolation(&connection, db.read_uncommitted)?;

    Ok(connection)
}

pub fn configure_isolation(connection: &Connection, read_uncommitted: bool) -> Result<()> {
    connection
        .pragma_update(None, "read_uncommitted", read_uncommitted)
        .with_context(|| format!("failed to set read_uncommitted={read_uncommitted}"))
}
