// ==========================================
// 城市地理数据导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 优先级: 命令行参数 > config_kv > 内置默认值
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ImportResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ImportError::ConfigReadError {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value,
                                                      updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值; 缺失时返回默认值,格式错误时报错
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ImportError::ConfigValueError {
                    key: key.to_string(),
                    value: raw.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 运行日志中记录本次生效的配置
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let config_map = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<BTreeMap<String, String>>>()?;

        serde_json::to_string(&json!(config_map))
            .map_err(|e| ImportError::InternalError(e.to_string()))
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::BATCH_SIZE, defaults::BATCH_SIZE)
    }

    async fn get_min_population(&self) -> ImportResult<i64> {
        self.get_parsed_or_default(config_keys::MIN_POPULATION, defaults::MIN_POPULATION)
    }

    async fn get_throttle_ms(&self) -> ImportResult<u64> {
        self.get_parsed_or_default(config_keys::THROTTLE_MS, defaults::THROTTLE_MS)
    }

    async fn get_milestone_every(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::MILESTONE_EVERY, defaults::MILESTONE_EVERY)
    }

    async fn get_max_batches(&self) -> ImportResult<Option<usize>> {
        // 空串或 0 视为不限制
        match self.get_config_value(config_keys::MAX_BATCHES)? {
            Some(raw) if !raw.trim().is_empty() => {
                let n = self.get_parsed_or_default::<usize>(config_keys::MAX_BATCHES, 0)?;
                Ok((n > 0).then_some(n))
            }
            _ => Ok(None),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const BATCH_SIZE: &str = "import.batch_size";
    pub const MIN_POPULATION: &str = "import.min_population";
    pub const THROTTLE_MS: &str = "import.throttle_ms";
    pub const MILESTONE_EVERY: &str = "import.milestone_every";
    pub const MAX_BATCHES: &str = "import.max_batches";
}

// ==========================================
// 内置默认值
// ==========================================
pub mod defaults {
    pub const BATCH_SIZE: usize = 1000;
    pub const MIN_POPULATION: i64 = 1000;
    pub const THROTTLE_MS: u64 = 100;
    pub const MILESTONE_EVERY: usize = 10;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_absent() {
        let manager = setup_manager();
        assert_eq!(manager.get_batch_size().await.unwrap(), 1000);
        assert_eq!(manager.get_min_population().await.unwrap(), 1000);
        assert_eq!(manager.get_throttle_ms().await.unwrap(), 100);
        assert_eq!(manager.get_milestone_every().await.unwrap(), 10);
        assert_eq!(manager.get_max_batches().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stored_values_override_defaults() {
        let manager = setup_manager();
        manager.set_config_value(config_keys::BATCH_SIZE, "2500").unwrap();
        manager.set_config_value(config_keys::MAX_BATCHES, "8").unwrap();
        manager.set_config_value(config_keys::BATCH_SIZE, " 3000 ").unwrap();

        assert_eq!(manager.get_batch_size().await.unwrap(), 3000);
        assert_eq!(manager.get_max_batches().await.unwrap(), Some(8));
    }

    #[tokio::test]
    async fn test_malformed_value_is_error() {
        let manager = setup_manager();
        manager.set_config_value(config_keys::THROTTLE_MS, "fast").unwrap();

        let err = manager.get_throttle_ms().await.unwrap_err();
        assert!(
            matches!(err, ImportError::ConfigValueError { ref key, .. } if key == config_keys::THROTTLE_MS),
            "格式错误应返回 ConfigValueError: {}",
            err
        );
    }

    #[test]
    fn test_config_snapshot_json() {
        let manager = setup_manager();
        manager.set_config_value(config_keys::MIN_POPULATION, "500").unwrap();

        let snapshot = manager.get_config_snapshot().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(parsed[config_keys::MIN_POPULATION], "500");
    }
}
