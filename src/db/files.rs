//! File records
//!
//! A record is written once, after the storage node exchange completes,
//! and never mutated. The `node_addr` column remembers which node holds
//! the bytes.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::users::parse_column;
use super::MetaStore;
use crate::types::Result;

/// A stored file record.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: Uuid,
    pub filename: String,
    pub size_bytes: u64,
    pub owner_id: Uuid,
    pub node_addr: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Fields for recording a completed upload.
#[derive(Debug)]
pub struct NewFile {
    pub filename: String,
    pub size_bytes: u64,
    pub owner_id: Uuid,
    pub node_addr: String,
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let id: String = row.get(0)?;
    let owner_id: String = row.get(3)?;
    let uploaded_at: String = row.get(5)?;
    Ok(FileRecord {
        id: parse_column(0, &id)?,
        filename: row.get(1)?,
        size_bytes: row.get::<_, i64>(2)? as u64,
        owner_id: parse_column(3, &owner_id)?,
        node_addr: row.get(4)?,
        uploaded_at: parse_column(5, &uploaded_at)?,
    })
}

const FILE_COLUMNS: &str = "id, filename, size_bytes, owner_id, node_addr, uploaded_at";

impl MetaStore {
    /// Record a completed upload.
    pub async fn insert_file(&self, new: NewFile) -> Result<FileRecord> {
        let record = FileRecord {
            id: Uuid::new_v4(),
            filename: new.filename,
            size_bytes: new.size_bytes,
            owner_id: new.owner_id,
            node_addr: new.node_addr,
            uploaded_at: Utc::now(),
        };

        let row = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO files (id, filename, size_bytes, owner_id, node_addr, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.id.to_string(),
                    row.filename,
                    row.size_bytes as i64,
                    row.owner_id.to_string(),
                    row.node_addr,
                    row.uploaded_at.to_rfc3339(),
                ],
            )
        })
        .await?;

        Ok(record)
    }

    pub async fn get_file(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.prepare_cached(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"))?
                .query_row([id], row_to_file)
                .optional()
        })
        .await
    }

    /// All files, newest first. Admin view.
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {FILE_COLUMNS} FROM files ORDER BY uploaded_at DESC"
            ))?;
            let rows = stmt.query_map([], row_to_file)?;
            rows.collect()
        })
        .await
    }

    /// Files owned by one user, newest first.
    pub async fn list_files_by_owner(&self, owner_id: Uuid) -> Result<Vec<FileRecord>> {
        let owner = owner_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ?1 ORDER BY uploaded_at DESC"
            ))?;
            let rows = stmt.query_map([owner], row_to_file)?;
            rows.collect()
        })
        .await
    }
}
