use crate::error::{CoreError, Result};
use areacrawl_scanner::{AreaNode, AreaSink, CrawlStats};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use tracing::info;

pub struct Database {
    conn: Connection,
    log_sql: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRun {
    pub id: String,
    pub root_id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: String,
    pub stats: Option<CrawlStats>,
    pub error: Option<String>,
}

const INSERT_AREA: &str = "INSERT INTO areas (
    run_id, uid, parent_id, level, area_name, simple_name, whole_name,
    pin_yin, pre_pin_yin, simple_py, province_id, city_id, county_id,
    area_code, zip_code, lon, lat, remark, created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)";

const AREA_COLUMNS: &str = "uid, parent_id, level, area_name, simple_name, whole_name,
    pin_yin, pre_pin_yin, simple_py, province_id, city_id, county_id,
    area_code, zip_code, lon, lat, remark";

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn area_from_row(row: &Row<'_>) -> rusqlite::Result<AreaNode> {
    Ok(AreaNode {
        uid: row.get(0)?,
        parent_id: row.get(1)?,
        level: row.get(2)?,
        area_name: row.get(3)?,
        simple_name: row.get(4)?,
        whole_name: row.get(5)?,
        pin_yin: row.get(6)?,
        pre_pin_yin: row.get(7)?,
        simple_py: row.get(8)?,
        province_id: row.get(9)?,
        city_id: row.get(10)?,
        county_id: row.get(11)?,
        area_code: row.get(12)?,
        zip_code: row.get(13)?,
        lon: row.get(14)?,
        lat: row.get(15)?,
        remark: row.get(16)?,
    })
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    /// Opens (or creates) the database file and makes sure the schema exists.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database {
            conn,
            log_sql: false,
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Database {
            conn,
            log_sql: false,
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn with_statement_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- One row per crawl invocation
            CREATE TABLE IF NOT EXISTS crawl_runs (
    id TEXT PRIMARY KEY,
    root_id TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    stats TEXT,               -- JSON counters
    error TEXT
);

-- Area records, one per occurrence in the API pages (uid is not unique)
CREATE TABLE IF NOT EXISTS areas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id TEXT,
    uid TEXT NOT NULL,
    parent_id TEXT NOT NULL,
    level INTEGER NOT NULL DEFAULT 0,
    area_name TEXT NOT NULL DEFAULT '',
    simple_name TEXT NOT NULL DEFAULT '',
    whole_name TEXT NOT NULL DEFAULT '',
    pin_yin TEXT NOT NULL DEFAULT '',
    pre_pin_yin TEXT NOT NULL DEFAULT '',
    simple_py TEXT NOT NULL DEFAULT '',
    province_id TEXT NOT NULL DEFAULT '',
    city_id TEXT NOT NULL DEFAULT '',
    county_id TEXT NOT NULL DEFAULT '',
    area_code TEXT NOT NULL DEFAULT '',
    zip_code TEXT NOT NULL DEFAULT '',
    lon TEXT NOT NULL DEFAULT '',
    lat TEXT NOT NULL DEFAULT '',
    remark TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,

    FOREIGN KEY(run_id) REFERENCES crawl_runs(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_areas_uid ON areas(uid);
CREATE INDEX IF NOT EXISTS idx_areas_parent ON areas(parent_id);
CREATE INDEX IF NOT EXISTS idx_areas_level ON areas(level);
CREATE INDEX IF NOT EXISTS idx_areas_run ON areas(run_id);
            ",
        )?;
        Ok(())
    }

    fn log_statement(&self, sql: &str, args: impl Debug) {
        if self.log_sql {
            let sql = sql.split_whitespace().collect::<Vec<_>>().join(" ");
            info!(target: "areacrawl::sql", "[SQL] {} {:?}", sql, args);
        }
    }

    // Run management
    pub fn create_run(&self, root_id: &str) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        let sql = "INSERT INTO crawl_runs (id, root_id, start_time, status) VALUES (?1, ?2, ?3, ?4)";
        self.log_statement(sql, (&run_id, root_id));
        self.conn.execute(
            sql,
            params![&run_id, root_id, timestamp, RunStatus::Running.as_str()],
        )?;

        Ok(run_id)
    }

    pub fn complete_run(&self, run_id: &str, stats: &CrawlStats) -> Result<()> {
        self.finish_run(run_id, RunStatus::Completed, stats, None)
    }

    pub fn fail_run(&self, run_id: &str, stats: &CrawlStats, error: &str) -> Result<()> {
        self.finish_run(run_id, RunStatus::Failed, stats, Some(error))
    }

    fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        stats: &CrawlStats,
        error: Option<&str>,
    ) -> Result<()> {
        let timestamp = current_timestamp();
        let stats_json = serde_json::to_string(stats)?;

        let sql = "UPDATE crawl_runs SET status = ?1, end_time = ?2, stats = ?3, error = ?4 WHERE id = ?5";
        self.log_statement(sql, (status.as_str(), run_id));
        let updated = self.conn.execute(
            sql,
            params![status.as_str(), timestamp, stats_json, error, run_id],
        )?;

        if updated == 0 {
            return Err(CoreError::UnknownRun(run_id.to_string()));
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<CrawlRun>> {
        self.query_run("WHERE id = ?1", params![run_id])
    }

    pub fn latest_run(&self) -> Result<Option<CrawlRun>> {
        self.query_run("ORDER BY start_time DESC, rowid DESC LIMIT 1", params![])
    }

    fn query_run(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Option<CrawlRun>> {
        let sql = format!(
            "SELECT id, root_id, start_time, end_time, status, stats, error FROM crawl_runs {}",
            clause
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let row = stmt
            .query_row(args, |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })
            .optional()?;

        let Some((id, root_id, start_time, end_time, status, stats, error)) = row else {
            return Ok(None);
        };

        let stats = stats.map(|s| serde_json::from_str(&s)).transpose()?;
        Ok(Some(CrawlRun {
            id,
            root_id,
            start_time,
            end_time,
            status,
            stats,
            error,
        }))
    }

    // Area operations
    pub fn insert_area(&self, run_id: Option<&str>, area: &AreaNode) -> Result<i64> {
        self.log_statement(INSERT_AREA, (&area.uid, &area.parent_id, area.level));

        let affected = self.conn.execute(
            INSERT_AREA,
            params![
                run_id,
                &area.uid,
                &area.parent_id,
                area.level,
                &area.area_name,
                &area.simple_name,
                &area.whole_name,
                &area.pin_yin,
                &area.pre_pin_yin,
                &area.simple_py,
                &area.province_id,
                &area.city_id,
                &area.county_id,
                &area.area_code,
                &area.zip_code,
                &area.lon,
                &area.lat,
                &area.remark,
                current_timestamp(),
            ],
        )?;

        if affected == 0 {
            return Err(CoreError::NoRowsAffected(area.uid.clone()));
        }
        Ok(self.conn.last_insert_rowid())
    }

    pub fn count_areas(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM areas", [], |row| row.get(0))?)
    }

    pub fn count_areas_for_run(&self, run_id: &str) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM areas WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?)
    }

    /// Row counts per level, lowest level first. `None` counts every run.
    pub fn count_areas_by_level(&self, run_id: Option<&str>) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT level, COUNT(*) FROM areas
             WHERE ?1 IS NULL OR run_id = ?1
             GROUP BY level ORDER BY level",
        )?;

        let counts = stmt
            .query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    pub fn get_children(&self, parent_id: &str) -> Result<Vec<AreaNode>> {
        let sql = format!(
            "SELECT {} FROM areas WHERE parent_id = ?1 ORDER BY id",
            AREA_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let areas = stmt
            .query_map(params![parent_id], area_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(areas)
    }

    /// Sink that tags every stored area with `run_id`.
    pub fn run_sink(&self, run_id: &str) -> RunSink<'_> {
        RunSink {
            db: self,
            run_id: run_id.to_string(),
        }
    }
}

impl AreaSink for Database {
    type Error = CoreError;

    fn persist(&mut self, area: &AreaNode) -> Result<()> {
        self.insert_area(None, area).map(|_| ())
    }
}

pub struct RunSink<'a> {
    db: &'a Database,
    run_id: String,
}

impl RunSink<'_> {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl AreaSink for RunSink<'_> {
    type Error = CoreError;

    fn persist(&mut self, area: &AreaNode) -> Result<()> {
        self.db.insert_area(Some(&self.run_id), area).map(|_| ())
    }
}
