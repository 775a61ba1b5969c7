// ==========================================
// 城市地理数据导入 - 检查点/续跑控制器
// ==========================================
// 职责: 在 [start, end) 区间内驱动整条管道,汇总运行统计
// 流程: 读块 → 规范化 → 过滤 → 分类 → 组批 → 幂等写入 → 推进偏移 → 发布进度
// 状态机: Idle → Running → (Completed | Aborted)
// ==========================================
// 红线:
// - 单线程顺序执行: 第 N 批提交成功后才读取第 N+1 块
// - 控制器不持久化任何状态,续跑位置通过 RunStatistics.final_offset 返回
// - 只有写入端错误会中止运行,行级缺陷只计入 skipped
// ==========================================

use crate::config::RunParams;
use crate::domain::{ClassifiedCity, RawRecord, RunProgress, RunState, RunStatistics};
use crate::importer::batch_assembler::BatchAssembler;
use crate::importer::city_importer_trait::{
    CityImporter, FieldNormalizer, RegionClassifier, RowSource,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::progress::{
    BatchOutcome, ProgressEvent, ProgressObserver, StopHandle, TracingProgressObserver,
};
use crate::importer::region_classifier::StaticRegionClassifier;
use crate::importer::row_filter::{FilterDecision, RowFilter};
use crate::repository::CityRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// 单块转换结果
struct ChunkTransform {
    eligible: Vec<ClassifiedCity>,
    skipped: usize,
}

// ==========================================
// CityImporterImpl - 城市数据导入控制器
// ==========================================
pub struct CityImporterImpl<R>
where
    R: CityRepository,
{
    // 写入端
    repo: R,

    // 管道组件
    normalizer: Box<dyn FieldNormalizer>,
    classifier: Box<dyn RegionClassifier>,

    // 进度发布与取消
    observer: Arc<dyn ProgressObserver>,
    stop: StopHandle,
}

impl<R> CityImporterImpl<R>
where
    R: CityRepository,
{
    /// 创建新的 CityImporter 实例
    ///
    /// # 参数
    /// - repo: 城市数据仓储（幂等写入端）
    /// - normalizer: 字段规范化器
    /// - classifier: 区域分类器
    /// - observer: 进度观察者
    pub fn new(
        repo: R,
        normalizer: Box<dyn FieldNormalizer>,
        classifier: Box<dyn RegionClassifier>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Self {
        Self {
            repo,
            normalizer,
            classifier,
            observer,
            stop: StopHandle::new(),
        }
    }

    /// 使用默认组件（FieldMapper + 静态查表 + tracing 进度输出）
    pub fn with_defaults(repo: R) -> Self {
        Self::new(
            repo,
            Box::new(FieldMapper::new()),
            Box::new(StaticRegionClassifier),
            Arc::new(TracingProgressObserver),
        )
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// 规范化 → 过滤 → 分类; 丢弃的行只计数
    fn transform_chunk(&self, rows: &[RawRecord], filter: &RowFilter) -> ChunkTransform {
        let mut eligible = Vec::with_capacity(rows.len());
        let mut skipped = 0;

        for row in rows {
            let Some(city) = self.normalizer.normalize(row) else {
                skipped += 1;
                continue;
            };

            match filter.evaluate(&city) {
                FilterDecision::Accept => {
                    let region = self.classifier.classify(&city.country);
                    eligible.push(ClassifiedCity { city, region });
                }
                FilterDecision::Reject(reason) => {
                    debug!(row_index = row.row_index, reason = %reason, "行被过滤");
                    skipped += 1;
                }
            }
        }

        ChunkTransform { eligible, skipped }
    }

    /// 写入一块的合格记录; 返回新增行数
    async fn load_chunk(
        &self,
        eligible: Vec<ClassifiedCity>,
        batch_size: usize,
        offset: usize,
    ) -> ImportResult<usize> {
        let mut inserted = 0;
        // 块长度不超过 batch_size,因此这里至多产生一个批次
        for batch in BatchAssembler::assemble(batch_size, eligible) {
            inserted += self
                .repo
                .insert_if_absent(batch)
                .await
                .map_err(|e| ImportError::BatchWriteError {
                    offset,
                    message: e.to_string(),
                })?;
        }
        Ok(inserted)
    }

    /// 里程碑: 查询库内总行数; 查询失败不影响运行
    async fn publish_milestone(&self, progress: &RunProgress, source_rows: usize) {
        match self.repo.count_cities().await {
            Ok(total_in_sink) => {
                let dataset_percent = if source_rows == 0 {
                    100.0
                } else {
                    progress.current_offset as f64 / source_rows as f64 * 100.0
                };
                self.observer.publish(ProgressEvent::Milestone {
                    progress: progress.clone(),
                    total_in_sink,
                    dataset_percent,
                });
            }
            Err(e) => warn!(error = %e, "里程碑统计失败"),
        }
    }
}

#[async_trait]
impl<R> CityImporter for CityImporterImpl<R>
where
    R: CityRepository + Send + Sync,
{
    #[instrument(skip(self, source, params), fields(run_id))]
    async fn run(&self, source: &dyn RowSource, params: &RunParams) -> ImportResult<RunStatistics> {
        // === 配置缺陷: 在任何批次之前报错 ===
        params.validate()?;

        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let source_rows = source.row_count();
        let (start, end) = params.effective_range(source_rows);
        let batch_size = params.batch_size;
        let filter = RowFilter::new(params.min_population);

        let mut progress = RunProgress::new(run_id, start, end, batch_size);
        let mut abort_reason: Option<String> = None;

        // === Idle → Running ===
        progress.state = RunState::Running;
        self.observer.publish(ProgressEvent::RunStarted {
            progress: progress.clone(),
            source_rows,
        });

        while progress.current_offset < end {
            if let Some(max_batches) = params.max_batches {
                if progress.batches_committed >= max_batches {
                    info!(max_batches, offset = progress.current_offset, "达到本次批次上限");
                    break;
                }
            }

            if self.stop.is_stop_requested() {
                warn!(offset = progress.current_offset, "收到停止请求");
                abort_reason = Some("收到停止请求".to_string());
                progress.state = RunState::Aborted;
                break;
            }

            // === 读块 ===
            let offset = progress.current_offset;
            let len = (end - offset).min(batch_size);
            let rows = source.read_chunk(offset, len);

            // === 转换 ===
            let ChunkTransform { eligible, skipped } = self.transform_chunk(&rows, &filter);
            let eligible_count = eligible.len();

            // === 写入（原子,失败即中止）===
            let inserted = match self.load_chunk(eligible, batch_size, offset).await {
                Ok(n) => n,
                Err(e) => {
                    error!(offset, error = %e, "批次写入失败,运行中止");
                    abort_reason = Some(e.to_string());
                    progress.state = RunState::Aborted;
                    break;
                }
            };

            // === 推进检查点（仅在提交成功后）===
            progress.current_offset = offset + len;
            progress.batches_committed += 1;
            progress.processed += rows.len();
            progress.inserted += inserted;
            progress.skipped += skipped;

            self.observer.publish(ProgressEvent::BatchCommitted {
                progress: progress.clone(),
                outcome: BatchOutcome {
                    batch_no: progress.batches_committed,
                    offset,
                    next_offset: progress.current_offset,
                    rows_read: rows.len(),
                    eligible: eligible_count,
                    inserted,
                    skipped,
                },
            });

            if params.milestone_every > 0 && progress.batches_committed % params.milestone_every == 0 {
                self.publish_milestone(&progress, source_rows).await;
            }

            // === 节流（最后一块之后不等待）===
            if progress.current_offset < end && !params.throttle.is_zero() {
                tokio::time::sleep(params.throttle).await;
            }
        }

        // === Running → Completed（未中止时）===
        if progress.state == RunState::Running {
            progress.state = RunState::Completed;
        }

        let stats = RunStatistics::from_progress(&progress, source_rows, abort_reason, started_at);
        self.observer.publish(ProgressEvent::RunFinished {
            stats: stats.clone(),
        });

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use crate::domain::Region;
    use crate::domain::CellValue;
    use crate::importer::file_parser::{InMemorySource, TabularSource};
    use crate::importer::progress::NoOpProgressObserver;
    use crate::repository::CityRepositoryImpl;
    use rusqlite::Connection;
    use std::sync::Mutex;
    use std::time::Duration;

    fn setup_importer() -> CityImporterImpl<CityRepositoryImpl> {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let repo = CityRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)));
        CityImporterImpl::with_defaults(repo).with_observer(Arc::new(NoOpProgressObserver))
    }

    fn city_row(name: &str, country: &str, population: &str, coords: &str) -> RawRecord {
        RawRecord::from_pairs(
            vec![
                ("Name", name),
                ("Country name EN", country),
                ("Population", population),
                ("Coordinates", coords),
            ],
            0,
        )
    }

    fn fast_params() -> RunParams {
        RunParams::default()
            .with_throttle(Duration::ZERO)
            .with_milestone_every(0)
    }

    #[tokio::test]
    async fn test_springfield_scenario() {
        let importer = setup_importer();
        let source = InMemorySource::new(vec![
            city_row("Springfield", "United States", "1500", "39.78,-89.65"),
            city_row("Smallville", "United States", "200", "39.0,-88.0"),
            city_row("Unknown City", "Nowhereland", "5000", ""),
        ]);

        let stats = importer
            .run(&source, &fast_params().with_min_population(1000))
            .await
            .unwrap();

        assert_eq!(stats.state, RunState::Completed);
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.final_offset, 3);

        let repo = importer.repository();
        let springfield = repo.find_by_name("Springfield").await.unwrap();
        assert_eq!(springfield[0].region, Region::NorthAmerica);
        assert_eq!(springfield[0].latitude, Some(39.78));
        assert_eq!(springfield[0].longitude, Some(-89.65));

        let unknown = repo.find_by_name("Unknown City").await.unwrap();
        assert_eq!(unknown[0].region, Region::Other);
        assert_eq!(unknown[0].latitude, None);
        assert_eq!(unknown[0].longitude, None);

        assert!(repo.find_by_name("Smallville").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_row_counts_as_skipped_and_keeps_offsets() {
        let importer = setup_importer();
        let headers = ["Name", "Country name EN", "Population", "Coordinates"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let text = |s: &str| CellValue::Text(s.to_string());
        let source = TabularSource::new(
            headers,
            vec![
                vec![text("A"), text("France"), text("5000"), CellValue::Empty],
                vec![CellValue::Empty; 4],
                vec![text("B"), text("France"), text("5000"), CellValue::Empty],
            ],
        );

        let stats = importer.run(&source, &fast_params()).await.unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(stats.skipped, 1, "空白行由规范化阶段丢弃");
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.final_offset, 3);

        // 从偏移 2 续跑只读取 B
        let importer = setup_importer();
        let stats = importer
            .run(&source, &fast_params().with_range(2, None))
            .await
            .unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(importer.repository().find_by_name("B").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let importer = setup_importer();
        let source = InMemorySource::new(
            (0..25)
                .map(|i| city_row(&format!("City {}", i), "France", "5000", "48.0,2.0"))
                .collect(),
        );
        let params = fast_params().with_batch_size(10);

        let first = importer.run(&source, &params).await.unwrap();
        assert_eq!(first.inserted, 25);
        assert_eq!(first.batches, 3);

        let second = importer.run(&source, &params).await.unwrap();
        assert_eq!(second.inserted, 0, "重复运行不应新增数据");
        assert_eq!(second.skipped, 0, "唯一键冲突不计入 skipped");
        assert_eq!(importer.repository().count_cities().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn test_max_batches_ceiling_completes_with_resume_offset() {
        let importer = setup_importer();
        let source = InMemorySource::new(
            (0..50)
                .map(|i| city_row(&format!("C{}", i), "Chile", "", ""))
                .collect(),
        );

        let stats = importer
            .run(
                &source,
                &fast_params()
                    .with_range(5, None)
                    .with_batch_size(10)
                    .with_max_batches(Some(2)),
            )
            .await
            .unwrap();

        assert_eq!(stats.state, RunState::Completed);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.final_offset, 25);
        assert_eq!(stats.inserted, 20);
    }

    #[tokio::test]
    async fn test_stop_requested_aborts_before_first_batch() {
        let importer = setup_importer();
        let stop = importer.stop_handle();
        stop.request_stop();

        let source = InMemorySource::new(vec![city_row("Oslo", "Norway", "1", "")]);
        let stats = importer.run(&source, &fast_params()).await.unwrap();

        assert_eq!(stats.state, RunState::Aborted);
        assert_eq!(stats.final_offset, 0);
        assert!(stats.abort_reason.is_some());
    }

    #[tokio::test]
    async fn test_invalid_params_fail_before_run() {
        let importer = setup_importer();
        let source = InMemorySource::default();
        let result = importer
            .run(&source, &fast_params().with_batch_size(0))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_empty_range_completes_immediately() {
        let importer = setup_importer();
        let source = InMemorySource::new(vec![city_row("Oslo", "Norway", "5000", "")]);
        let stats = importer
            .run(&source, &fast_params().with_range(1, Some(1)))
            .await
            .unwrap();
        assert_eq!(stats.state, RunState::Completed);
        assert_eq!(stats.batches, 0);
        assert_eq!(stats.final_offset, 1);
    }
}
