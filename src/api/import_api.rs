// ==========================================
// 城市地理数据导入 - 导入API
// ==========================================
// 职责: 驱动层门面,组装数据源/仓储/配置/控制器并记录运行台账
// 参数优先级: 请求字段 > config_kv > 内置默认值
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, RunParams};
use crate::db::open_and_init;
use crate::domain::{DatasetSummary, RunStatistics};
use crate::importer::{
    CityImporter, CityImporterImpl, ProgressObserver, StopHandle, TracingProgressObserver,
    UniversalFileParser,
};
use crate::repository::{CityRepository, CityRepositoryImpl, ImportRunRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// 汇总报告中的排行长度
pub const SUMMARY_TOP_N: usize = 10;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "GEO_CITY_DB_PATH";

/// 单次运行请求
///
/// 未填写的字段取 config_kv 或内置默认值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    pub source_path: String,
    pub start_offset: Option<usize>,
    pub end_offset: Option<usize>,
    pub batch_size: Option<usize>,
    pub min_population: Option<i64>,
    pub throttle_ms: Option<u64>,
    pub max_batches: Option<usize>,
    pub milestone_every: Option<usize>,
    /// 从台账中该数据源最近一次的 final_offset 开始
    pub resume: bool,
    /// 导入前清空 cities 表
    pub reset: bool,
    pub csv_delimiter: Option<u8>,
}

impl RunRequest {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }
}

/// 导入API
pub struct ImportApi {
    db_path: String,
    observer: Arc<dyn ProgressObserver>,
    stop: StopHandle,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            observer: Arc::new(TracingProgressObserver),
            stop: StopHandle::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// 取消句柄（在批次之间生效）
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    fn open_connection(&self) -> ApiResult<Arc<Mutex<Connection>>> {
        ensure_sqlite_path(&self.db_path)?;
        let conn = open_and_init(&self.db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", self.db_path, e)))?;
        Ok(Arc::new(Mutex::new(conn)))
    }

    /// 台账中使用的数据源标识（尽量使用绝对路径）
    fn source_key(source_path: &str) -> String {
        std::fs::canonicalize(source_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| source_path.to_string())
    }

    /// 合并请求字段与配置值
    async fn resolve_params(
        &self,
        request: &RunRequest,
        config: &ConfigManager,
        runs: &ImportRunRepository,
        source_key: &str,
    ) -> ApiResult<RunParams> {
        // 清空后从台账位置续跑会丢失 [0, final_offset) 的已提交数据
        if request.resume && request.reset {
            return Err(ApiError::InvalidInput(
                "续跑与清空不能同时使用".to_string(),
            ));
        }

        let mut params = RunParams::from_config(config).await?;

        let start_offset = match (request.start_offset, request.resume) {
            (Some(start), resume) => {
                if resume {
                    warn!(start, "同时指定了起始偏移与续跑,以起始偏移为准");
                }
                start
            }
            (None, true) => match runs.last_run(source_key)? {
                Some(last) => {
                    info!(
                        last_run_id = %last.run_id,
                        final_offset = last.final_offset,
                        "从上次运行的位置续跑"
                    );
                    last.final_offset
                }
                None => {
                    info!("台账中没有该数据源的运行记录,从 0 开始");
                    0
                }
            },
            (None, false) => 0,
        };
        params = params.with_range(start_offset, request.end_offset);

        if let Some(batch_size) = request.batch_size {
            params = params.with_batch_size(batch_size);
        }
        if let Some(min_population) = request.min_population {
            params = params.with_min_population(min_population);
        }
        if let Some(throttle_ms) = request.throttle_ms {
            params = params.with_throttle(Duration::from_millis(throttle_ms));
        }
        if request.max_batches.is_some() {
            params = params.with_max_batches(request.max_batches);
        }
        if let Some(milestone_every) = request.milestone_every {
            params = params.with_milestone_every(milestone_every);
        }

        params.validate()?;
        Ok(params)
    }

    /// 执行一次导入
    ///
    /// # 返回
    /// - Ok(RunStatistics): 运行结束（包括中止）; final_offset 为续跑位置
    /// - Err(ApiError): 运行未开始（参数/文件/数据库缺陷）
    pub async fn run(&self, request: RunRequest) -> ApiResult<RunStatistics> {
        if request.source_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("数据文件路径不能为空".to_string()));
        }

        let conn = self.open_connection()?;
        let config = ConfigManager::from_connection(Arc::clone(&conn))?;
        let runs = ImportRunRepository::from_connection(Arc::clone(&conn));
        let source_key = Self::source_key(&request.source_path);

        let params = self
            .resolve_params(&request, &config, &runs, &source_key)
            .await?;

        // 解析数据源（缺列/格式错误在这里返回）
        let mut parser = UniversalFileParser::new();
        if let Some(delimiter) = request.csv_delimiter {
            parser = parser.with_csv_delimiter(delimiter);
        }
        let source = parser.parse(Path::new(&request.source_path))?;

        let repo = CityRepositoryImpl::from_connection(Arc::clone(&conn));
        if request.reset {
            let deleted = repo.clear_all().await?;
            warn!(deleted, "已清空 cities 表");
        }

        info!(
            source = %source_key,
            config = %config.get_config_snapshot().unwrap_or_default(),
            "运行参数已确定"
        );

        let importer = CityImporterImpl::with_defaults(repo)
            .with_observer(Arc::clone(&self.observer))
            .with_stop_handle(self.stop.clone());
        let stats = importer.run(&source, &params).await?;

        if let Err(e) = runs.record_run(&source_key, &stats) {
            warn!(error = %e, final_offset = stats.final_offset, "运行台账写入失败");
        }

        Ok(stats)
    }

    /// 库内数据汇总
    pub async fn summary(&self) -> ApiResult<DatasetSummary> {
        let conn = self.open_connection()?;
        let repo = CityRepositoryImpl::from_connection(conn);
        Ok(repo.summary(SUMMARY_TOP_N).await?)
    }

    /// 某数据源最近一次运行
    pub fn last_run(&self, source_path: &str) -> ApiResult<Option<RunStatistics>> {
        let conn = self.open_connection()?;
        let runs = ImportRunRepository::from_connection(conn);
        Ok(runs.last_run(&Self::source_key(source_path))?)
    }
}

/// 校验数据库位置是 SQLite 文件路径而不是连接 URL
///
/// 形如 `postgres://...` 的值会被 SQLite 当作文件名,在当前目录生成无用文件
pub fn ensure_sqlite_path(db_path: &str) -> ApiResult<()> {
    if db_path.trim().is_empty() {
        return Err(ApiError::InvalidInput("数据库路径不能为空".to_string()));
    }
    if db_path.contains("://") {
        return Err(ApiError::InvalidInput(format!(
            "数据库路径应为 SQLite 文件路径,而不是连接 URL: {}",
            db_path
        )));
    }
    Ok(())
}

/// 默认数据库路径
///
/// 顺序: GEO_CITY_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./geo_cities.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("geo-city-import");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("geo_cities.db");
        }
    }

    path.to_string_lossy().to_string()
}
