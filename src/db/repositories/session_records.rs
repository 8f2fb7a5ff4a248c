use anyhow::{Context, Result};
use rusqlite::{params, Row};

use crate::channels::{Channel, ReadingSet};
use crate::db::{helpers::parse_datetime, Database};
use crate::models::SessionRecord;
use crate::session::{PersistFuture, ResultSink};

fn row_to_record(row: &Row) -> Result<SessionRecord> {
    let started_at: String = row.get("started_at")?;
    let recorded_at: String = row.get("recorded_at")?;

    Ok(SessionRecord {
        session_id: row.get("session_id")?,
        identity: row.get("identity")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
        readings: ReadingSet::new([
            row.get("blue_value")?,
            row.get("orange_value")?,
            row.get("green_value")?,
        ]),
    })
}

impl Database {
    pub async fn insert_session_record(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO session_records (session_id, identity, started_at, recorded_at, blue_value, orange_value, green_value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.session_id,
                    record.identity,
                    record.started_at.to_rfc3339(),
                    record.recorded_at.to_rfc3339(),
                    record.value(Channel::Blue),
                    record.value(Channel::Orange),
                    record.value(Channel::Green),
                ],
            )
            .with_context(|| format!("failed to insert record for {}", record.identity))?;
            Ok(())
        })
        .await
    }

    /// Most recent first.
    pub async fn list_session_records(&self, limit: u32) -> Result<Vec<SessionRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, identity, started_at, recorded_at, blue_value, orange_value, green_value
                 FROM session_records
                 ORDER BY recorded_at DESC, id DESC
                 LIMIT ?1",
            )?;
            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn list_records_for_identity(&self, identity: &str) -> Result<Vec<SessionRecord>> {
        let identity = identity.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, identity, started_at, recorded_at, blue_value, orange_value, green_value
                 FROM session_records
                 WHERE identity = ?1
                 ORDER BY recorded_at ASC, id ASC",
            )?;
            let mut rows = stmt.query(params![identity])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}

impl ResultSink for Database {
    fn persist(&self, record: SessionRecord) -> PersistFuture {
        let db = self.clone();
        Box::pin(async move { db.insert_session_record(&record).await })
    }
}
