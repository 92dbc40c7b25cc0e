use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::error::Result;
use crate::model::ScaffoldingLevel;

/// Keep only the most recent sessions.
pub const MAX_LOGS: usize = 50;

/// End-of-session record for caregiver review. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    pub id: String,
    pub timestamp: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    pub collection_name: String,
    pub total_items: u32,
    pub completed_items: u32,
    pub mistakes: u32,
    /// Seconds
    pub average_time_per_item: f64,
    pub most_used_scaffold: ScaffoldingLevel,
}

/// Persistence of session logs, most recent first.
pub trait LogStore {
    fn append_game_log(&mut self, log: &GameLog) -> Result<()>;
    fn game_logs(&self) -> Result<Vec<GameLog>>;
    fn clear_game_logs(&mut self) -> Result<()>;
}

/// Database manager for session logs
#[derive(Debug)]
pub struct SqliteLogStore {
    conn: Connection,
}

impl SqliteLogStore {
    /// Opens (creating if needed) the database in the state directory.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("matchking_logs.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS game_logs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                student_name TEXT,
                collection_name TEXT NOT NULL,
                total_items INTEGER NOT NULL,
                completed_items INTEGER NOT NULL,
                mistakes INTEGER NOT NULL,
                average_time_per_item REAL NOT NULL,
                most_used_scaffold INTEGER NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl LogStore for SqliteLogStore {
    fn append_game_log(&mut self, log: &GameLog) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO game_logs
            (id, timestamp, student_name, collection_name, total_items, completed_items,
             mistakes, average_time_per_item, most_used_scaffold)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.id,
                log.timestamp.to_rfc3339(),
                log.student_name,
                log.collection_name,
                log.total_items,
                log.completed_items,
                log.mistakes,
                log.average_time_per_item,
                log.most_used_scaffold.as_u8(),
            ],
        )?;
        tx.execute(
            "DELETE FROM game_logs WHERE seq NOT IN
             (SELECT seq FROM game_logs ORDER BY seq DESC LIMIT ?1)",
            [MAX_LOGS as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn game_logs(&self) -> Result<Vec<GameLog>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, timestamp, student_name, collection_name, total_items, completed_items,
                   mistakes, average_time_per_item, most_used_scaffold
            FROM game_logs
            ORDER BY seq DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let timestamp_str: String = row.get(1)?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "timestamp".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?
                .with_timezone(&Local);

            Ok(GameLog {
                id: row.get(0)?,
                timestamp,
                student_name: row.get(2)?,
                collection_name: row.get(3)?,
                total_items: row.get(4)?,
                completed_items: row.get(5)?,
                mistakes: row.get(6)?,
                average_time_per_item: row.get(7)?,
                most_used_scaffold: ScaffoldingLevel::from_u8(row.get(8)?),
            })
        })?;

        let mut logs = Vec::new();
        for log in rows {
            logs.push(log?);
        }
        Ok(logs)
    }

    fn clear_game_logs(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM game_logs", [])?;
        Ok(())
    }
}

/// Writes logs as CSV, one row per session, header first.
pub fn export_csv<W: Write>(logs: &[GameLog], out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record([
        "date",
        "collection",
        "completed",
        "total",
        "mistakes",
        "avg_secs_per_item",
        "scaffold",
    ])?;
    for log in logs {
        writer.write_record([
            log.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            log.collection_name.clone(),
            log.completed_items.to_string(),
            log.total_items.to_string(),
            log.mistakes.to_string(),
            format!("{:.1}", log.average_time_per_item),
            log.most_used_scaffold.label().to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(id: &str, mistakes: u32) -> GameLog {
        GameLog {
            id: id.to_string(),
            timestamp: Local::now(),
            student_name: None,
            collection_name: "認識班上同學".to_string(),
            total_items: 3,
            completed_items: 3,
            mistakes,
            average_time_per_item: 4.5,
            most_used_scaffold: ScaffoldingLevel::Audio,
        }
    }

    #[test]
    fn append_and_read_back_most_recent_first() {
        let mut store = SqliteLogStore::open_in_memory().unwrap();
        store.append_game_log(&log("a", 1)).unwrap();
        store.append_game_log(&log("b", 2)).unwrap();

        let logs = store.game_logs().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, "b");
        assert_eq!(logs[1].id, "a");
        assert_eq!(logs[0].mistakes, 2);
        assert_eq!(logs[0].most_used_scaffold, ScaffoldingLevel::Audio);
        assert_eq!(logs[0].average_time_per_item, 4.5);
    }

    #[test]
    fn keeps_only_the_latest_fifty() {
        let mut store = SqliteLogStore::open_in_memory().unwrap();
        for i in 0..(MAX_LOGS + 5) {
            store.append_game_log(&log(&i.to_string(), 0)).unwrap();
        }
        let logs = store.game_logs().unwrap();
        assert_eq!(logs.len(), MAX_LOGS);
        assert_eq!(logs[0].id, (MAX_LOGS + 4).to_string());
        assert_eq!(logs.last().unwrap().id, "5");
    }

    #[test]
    fn clear_removes_everything() {
        let mut store = SqliteLogStore::open_in_memory().unwrap();
        store.append_game_log(&log("a", 0)).unwrap();
        store.clear_game_logs().unwrap();
        assert!(store.game_logs().unwrap().is_empty());
    }

    #[test]
    fn student_name_survives_storage() {
        let mut store = SqliteLogStore::open_in_memory().unwrap();
        let mut named = log("n", 0);
        named.student_name = Some("小華".into());
        store.append_game_log(&named).unwrap();
        assert_eq!(
            store.game_logs().unwrap()[0].student_name.as_deref(),
            Some("小華")
        );
    }

    #[test]
    fn file_backed_store_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/logs.db");
        SqliteLogStore::open(&path)
            .unwrap()
            .append_game_log(&log("persisted", 0))
            .unwrap();
        let logs = SqliteLogStore::open(&path).unwrap().game_logs().unwrap();
        assert_eq!(logs[0].id, "persisted");
    }

    #[test]
    fn csv_export_has_header_and_rows() {
        let mut buf = Vec::new();
        export_csv(&[log("a", 2)], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date,collection,completed,total,mistakes,avg_secs_per_item,scaffold")
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(",認識班上同學,3,3,2,4.5,audio prompt"));
    }
}
