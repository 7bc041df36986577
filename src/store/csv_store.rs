//! CSV-backed posting store
//!
//! The file is opened once at startup: its header is checked, older layouts
//! are migrated, and every identifier is loaded into memory. After that the
//! file is only appended to, one flushed and synced row per call.

use crate::store::schema::{
    check_header, header_record, schema_version, HeaderCheck, COLUMNS, JOB_ID_INDEX,
};
use crate::store::traits::{DedupStore, StoreError, StoreMigrationError, StoreResult};
use crate::store::PostingRecord;
use csv::{ByteRecord, ReaderBuilder, StringRecord, WriterBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A row read back from the store
///
/// Columns added by a migration are empty on older rows, so everything
/// past the identifier is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRow {
    pub crawl_time: String,
    #[serde(rename = "jobID")]
    pub job_id: String,
    pub duration_specified: Option<bool>,
    pub duration_months: Option<u32>,
    pub renewal_mentioned: Option<bool>,
    pub start_specified: Option<bool>,
    pub start_iso: Option<String>,
    pub start_descriptor: Option<String>,
}

/// Append-only CSV store with an in-memory identifier set
#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    known: HashSet<String>,
    /// Columns declared by the file's header; below `COLUMNS.len()` only when
    /// a migration failed and the file is still in an older layout
    width: usize,
}

impl CsvStore {
    /// Opens or creates the store and loads every known identifier
    ///
    /// # Open modes
    ///
    /// | File | Action |
    /// |------|--------|
    /// | missing | create with header (parent directories too) |
    /// | empty | write header |
    /// | current header | load identifiers |
    /// | older prefix header | migrate in place, then load |
    /// | anything else | `StoreError::SchemaMismatch` |
    ///
    /// A failed migration is logged and leaves the file untouched; the store
    /// then keeps appending in the file's older layout.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() || fs::metadata(&path)?.len() == 0 {
            create_with_header(&path)?;
            tracing::info!("Created posting store at {}", path.display());
            return Ok(Self {
                path,
                known: HashSet::new(),
                width: COLUMNS.len(),
            });
        }

        let header = read_header(&path)?;
        let check = check_header(&header);
        if check != HeaderCheck::Incompatible {
            repair_tail(&path, header.len())?;
        }

        let (known, width) = match check {
            HeaderCheck::Current => (read_job_ids(&path)?, COLUMNS.len()),
            HeaderCheck::Legacy { width } => match migrate(&path, width) {
                Ok(known) => {
                    tracing::info!(
                        "Migrated {} rows in {} from {} to {} columns (schema v{})",
                        known.len(),
                        path.display(),
                        width,
                        COLUMNS.len(),
                        schema_version()
                    );
                    (known, COLUMNS.len())
                }
                Err(e) => {
                    tracing::error!("{}; continuing with the old layout", e);
                    let known = read_job_ids(&path).unwrap_or_else(|e| {
                        tracing::error!(
                            "Could not read identifiers from {}: {}; treating store as empty",
                            path.display(),
                            e
                        );
                        HashSet::new()
                    });
                    (known, width)
                }
            },
            HeaderCheck::Incompatible => {
                return Err(StoreError::SchemaMismatch {
                    path: path.display().to_string(),
                    found: header.iter().collect::<Vec<_>>().join(","),
                })
            }
        };

        tracing::info!(
            "Loaded {} known postings from {}",
            known.len(),
            path.display()
        );

        Ok(Self { path, known, width })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the file is still in an older layout
    pub fn is_legacy_layout(&self) -> bool {
        self.width < COLUMNS.len()
    }

    /// Counts data rows without opening the store
    ///
    /// Never creates or migrates the file; a missing file yields `None`.
    pub fn peek_row_count(path: impl AsRef<Path>) -> StoreResult<Option<usize>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let mut count = 0;
        for record in reader.records() {
            record?;
            count += 1;
        }
        Ok(Some(count))
    }

    /// Reads rows without opening the store
    ///
    /// Like [`CsvStore::peek_row_count`], this never creates or migrates the
    /// file. Rows in an older layout come back with the newer columns unset.
    pub fn peek_rows(path: impl AsRef<Path>) -> StoreResult<Option<Vec<StoredRow>>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        read_rows_from(path).map(Some)
    }

    /// Reads every row back from disk
    pub fn read_rows(&self) -> StoreResult<Vec<StoredRow>> {
        read_rows_from(&self.path)
    }
}

impl DedupStore for CsvStore {
    fn contains(&self, job_id: &str) -> bool {
        self.known.contains(job_id)
    }

    fn append(&mut self, record: &PostingRecord) -> StoreResult<()> {
        if !self.path.exists() {
            create_with_header(&self.path)?;
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if self.is_legacy_layout() {
            let fields = record.fields();
            writer.write_record(fields.iter().take(self.width))?;
        } else {
            writer.serialize(record)?;
        }

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_data()?;

        self.known.insert(record.job_id.clone());
        Ok(())
    }

    fn len(&self) -> usize {
        self.known.len()
    }
}

/// Creates the file (and its parent directories) containing only the header
fn create_with_header(path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = WriterBuilder::new().from_path(path)?;
    writer.write_record(&header_record())?;
    writer.flush()?;
    Ok(())
}

/// Makes sure the next append starts on a line of its own
///
/// A final row with fewer or more fields than the header is what an
/// interrupted append leaves behind; it is cut off. A complete final line
/// that only lacks its terminator gets one.
fn repair_tail(path: &Path, width: usize) -> StoreResult<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut record = ByteRecord::new();
    let mut last_start = 0;
    let mut last_len = 0;
    loop {
        let start = reader.position().byte();
        if !reader.read_byte_record(&mut record)? {
            break;
        }
        last_start = start;
        last_len = record.len();
    }

    if last_len == width || last_start == 0 {
        file.seek(SeekFrom::End(0))?;
        file.write_all(b"\n")?;
    } else {
        tracing::warn!(
            "Dropping incomplete last row of {} ({} of {} fields)",
            path.display(),
            last_len,
            width
        );
        file.set_len(last_start)?;
    }

    file.sync_data()?;
    Ok(())
}

fn read_rows_from(path: &Path) -> StoreResult<Vec<StoredRow>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn read_header(path: &Path) -> StoreResult<StringRecord> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    Ok(reader.headers()?.clone())
}

fn read_job_ids(path: &Path) -> StoreResult<HashSet<String>> {
    let mut reader = ReaderBuilder::new().from_path(path)?;
    let mut known = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(job_id) = record.get(JOB_ID_INDEX) {
            known.insert(job_id.to_string());
        }
    }
    Ok(known)
}

/// Rewrites an older-layout file with the current header
///
/// Every row is padded with empty values for the missing trailing columns.
/// The new content goes to a temporary file next to the original, which is
/// then renamed over it, so a failure at any point leaves the original intact.
fn migrate(path: &Path, from_width: usize) -> Result<HashSet<String>, StoreMigrationError> {
    let fail = |reason: String| StoreMigrationError {
        path: path.display().to_string(),
        from_width,
        to_width: COLUMNS.len(),
        reason,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| fail(e.to_string()))?;
    let temp = NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    let mut writer = WriterBuilder::new().from_writer(temp);
    writer
        .write_record(&header_record())
        .map_err(|e| fail(e.to_string()))?;

    let mut known = HashSet::new();
    for record in reader.records() {
        let mut record = record.map_err(|e| fail(e.to_string()))?;
        while record.len() < COLUMNS.len() {
            record.push_field("");
        }
        if let Some(job_id) = record.get(JOB_ID_INDEX) {
            known.insert(job_id.to_string());
        }
        writer
            .write_record(&record)
            .map_err(|e| fail(e.to_string()))?;
    }

    let mut temp = writer
        .into_inner()
        .map_err(|e| fail(e.into_error().to_string()))?;
    temp.flush().map_err(|e| fail(e.to_string()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| fail(e.to_string()))?;
    temp.persist(path).map_err(|e| fail(e.error.to_string()))?;

    // Make the rename itself durable where the platform allows it
    if let Ok(dir) = File::open(dir) {
        let _ = dir.sync_all();
    }

    Ok(known)
}
