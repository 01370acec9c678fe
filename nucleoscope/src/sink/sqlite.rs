use std::path::Path;

use rusqlite::{params, Connection};

use super::{ImageRecord, PersistenceError, ResultSink};

/// SQLite store with one row per spot and one row per image.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Open or create the database at `path` and make sure the tables exist.
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| PersistenceError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened result database '{}'", path.display());

        let sink = Self { conn };
        sink.init_schema()?;
        Ok(sink)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let sink = Self {
            conn: Connection::open_in_memory()?,
        };
        sink.init_schema()?;
        Ok(sink)
    }

    fn init_schema(&self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS spots (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                filename             TEXT,
                magnification        TEXT,
                zslice               INTEGER,
                channel              TEXT,
                label                INTEGER,
                area_pixels          REAL,
                mean_intensity       REAL,
                integrated_intensity REAL
            );
            CREATE TABLE IF NOT EXISTS images (
                id                   INTEGER PRIMARY KEY AUTOINCREMENT,
                filename             TEXT,
                magnification        TEXT,
                zslice               INTEGER,
                channel              TEXT,
                total_area           REAL,
                mean_intensity       REAL,
                integrated_intensity REAL
            );
            CREATE INDEX IF NOT EXISTS idx_spots_filename ON spots(filename);",
        )?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn spot_row_count(&self) -> Result<usize, PersistenceError> {
        self.count_rows("spots")
    }

    pub fn image_row_count(&self) -> Result<usize, PersistenceError> {
        self.count_rows("images")
    }

    fn count_rows(&self, table: &str) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl ResultSink for SqliteSink {
    /// Spot rows and the image row of one record commit together or not at all.
    fn write(&mut self, record: &ImageRecord<'_>) -> Result<(), PersistenceError> {
        let metadata = record.metadata();
        let filename = metadata.filename();
        let summary = record.summary;

        let tx = self.conn.transaction()?;
        {
            let mut insert_spot = tx.prepare_cached(
                "INSERT INTO spots (
                    filename, magnification, zslice, channel,
                    label, area_pixels, mean_intensity, integrated_intensity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for spot in record.spots {
                insert_spot.execute(params![
                    filename,
                    metadata.magnification,
                    metadata.zslice,
                    metadata.channel,
                    spot.label,
                    spot.area_pixels as f64,
                    spot.mean_intensity,
                    spot.integrated_intensity,
                ])?;
            }

            tx.execute(
                "INSERT INTO images (
                    filename, magnification, zslice, channel,
                    total_area, mean_intensity, integrated_intensity
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    filename,
                    metadata.magnification,
                    metadata.zslice,
                    metadata.channel,
                    summary.total_area as f64,
                    summary.mean_intensity,
                    summary.total_integrated_intensity,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
