// ==========================================
// 城市地理数据导入 - 运行台账仓储
// ==========================================
// 职责: 管理 import_run 表（每次调用的统计与最终偏移）
// 说明: 控制器本身不持久化状态; 由驱动层在运行结束后写入台账,
//       续跑时读取同一数据源最近一次的 final_offset
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{RunState, RunStatistics};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

fn map_run_row(row: &Row<'_>) -> rusqlite::Result<RunStatistics> {
    let state: String = row.get(1)?;
    Ok(RunStatistics {
        run_id: row.get(0)?,
        // 未知状态按中止处理,续跑时仍以 final_offset 为准
        state: state.parse().unwrap_or(RunState::Aborted),
        start_offset: row.get::<_, i64>(2)? as usize,
        end_offset: row.get::<_, i64>(3)? as usize,
        final_offset: row.get::<_, i64>(4)? as usize,
        source_rows: row.get::<_, i64>(5)? as usize,
        batches: row.get::<_, i64>(6)? as usize,
        processed: row.get::<_, i64>(7)? as usize,
        inserted: row.get::<_, i64>(8)? as usize,
        skipped: row.get::<_, i64>(9)? as usize,
        abort_reason: row.get(10)?,
        started_at: row.get(11)?,
        finished_at: row.get(12)?,
    })
}

pub struct ImportRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRunRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一次运行的统计
    pub fn record_run(&self, source_path: &str, stats: &RunStatistics) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_run (
                run_id, source_path, state, start_offset, end_offset, final_offset,
                source_rows, batches, processed, inserted, skipped, abort_reason,
                started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                stats.run_id,
                source_path,
                stats.state.to_string(),
                stats.start_offset as i64,
                stats.end_offset as i64,
                stats.final_offset as i64,
                stats.source_rows as i64,
                stats.batches as i64,
                stats.processed as i64,
                stats.inserted as i64,
                stats.skipped as i64,
                stats.abort_reason,
                stats.started_at,
                stats.finished_at,
            ],
        )?;
        Ok(())
    }

    /// 同一数据源最近一次运行
    pub fn last_run(&self, source_path: &str) -> RepositoryResult<Option<RunStatistics>> {
        let conn = self.get_conn()?;
        let run = conn
            .query_row(
                r#"
                SELECT run_id, state, start_offset, end_offset, final_offset,
                       source_rows, batches, processed, inserted, skipped,
                       abort_reason, started_at, finished_at
                FROM import_run
                WHERE source_path = ?1
                ORDER BY finished_at DESC, rowid DESC
                LIMIT 1
                "#,
                params![source_path],
                map_run_row,
            )
            .optional()?;
        Ok(run)
    }

    /// 查询最近 N 次运行（所有数据源）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<RunStatistics>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, state, start_offset, end_offset, final_offset,
                   source_rows, batches, processed, inserted, skipped,
                   abort_reason, started_at, finished_at
            FROM import_run
            ORDER BY finished_at DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;
        let runs = stmt
            .query_map(params![limit as i64], map_run_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runs)
    }
}
