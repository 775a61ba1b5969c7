// ==========================================
// 城市地理数据导入 - 城市数据 Repository 实现
// ==========================================
// 职责: 实现 cities 表数据访问（使用 rusqlite）
// 写入策略: INSERT ... ON CONFLICT(dedup_key) DO NOTHING,每批一个事务
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::{ClassifiedCity, DatasetSummary, Region, StoredCity};
use crate::importer::dedup_key::DedupKey;
use crate::repository::city_repo::CityRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const CITY_COLUMNS: &str = "id, name, country, region, population, latitude, longitude, \
                            timezone, is_capital, created_at, updated_at";

fn map_city_row(row: &Row<'_>) -> rusqlite::Result<StoredCity> {
    let region: String = row.get(3)?;
    Ok(StoredCity {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        // 外部写入的未知标签按兜底值处理
        region: region.parse().unwrap_or(Region::Other),
        population: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        timezone: row.get(7)?,
        is_capital: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

// ==========================================
// CityRepositoryImpl
// ==========================================
pub struct CityRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl CityRepositoryImpl {
    /// 创建新的 Repository 实例（打开连接并确保表结构存在）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已有连接（表结构由调用方保证）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在事务中逐行执行插入; execute 返回 0 表示命中唯一键被跳过
    fn insert_if_absent_tx(
        tx: &Transaction,
        cities: &[ClassifiedCity],
        now: DateTime<Utc>,
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO cities (
                name, country, region, population, latitude, longitude,
                timezone, is_capital, dedup_key, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(dedup_key) DO NOTHING
            "#,
        )?;

        let mut inserted = 0;
        for classified in cities {
            let city = &classified.city;
            inserted += stmt.execute(params![
                city.name,
                city.country,
                classified.region.as_str(),
                city.population,
                city.latitude(),
                city.longitude(),
                city.timezone,
                city.is_capital as i64,
                DedupKey::for_city(classified).as_str(),
                now,
                now,
            ])?;
        }

        Ok(inserted)
    }
}

#[async_trait]
impl CityRepository for CityRepositoryImpl {
    async fn insert_if_absent(&self, cities: Vec<ClassifiedCity>) -> RepositoryResult<usize> {
        if cities.is_empty() {
            return Ok(0);
        }

        let conn = self.get_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let inserted = Self::insert_if_absent_tx(&tx, &cities, Utc::now())?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            batch_len = cities.len(),
            inserted,
            conflicts = cities.len() - inserted,
            "批次写入完成"
        );
        Ok(inserted)
    }

    async fn count_cities(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cities", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn find_by_name(&self, name: &str) -> RepositoryResult<Vec<StoredCity>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM cities WHERE name = ?1 ORDER BY id",
            CITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let cities = stmt
            .query_map(params![name], map_city_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cities)
    }

    async fn summary(&self, top_n: usize) -> RepositoryResult<DatasetSummary> {
        let conn = self.get_conn()?;

        let (total_cities, total_countries, total_regions): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT country), COUNT(DISTINCT region) FROM cities",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let mut stmt = conn.prepare(
            r#"
            SELECT country, COUNT(*) AS city_count
            FROM cities
            GROUP BY country
            ORDER BY city_count DESC, country ASC
            LIMIT ?1
            "#,
        )?;
        let top_countries = stmt
            .query_map(params![top_n as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let sql = format!(
            "SELECT {} FROM cities WHERE population IS NOT NULL \
             ORDER BY population DESC, name ASC LIMIT ?1",
            CITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let largest_cities = stmt
            .query_map(params![top_n as i64], map_city_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(DatasetSummary {
            total_cities: total_cities as usize,
            total_countries: total_countries as usize,
            total_regions: total_regions as usize,
            top_countries,
            largest_cities,
        })
    }

    async fn clear_all(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM cities", [])?;
        Ok(deleted)
    }
}
