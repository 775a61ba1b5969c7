// ==========================================
// 城市地理数据导入 - 进度事件发布
// ==========================================
// 职责: 定义进度观察者 trait,控制器只依赖 trait
// 红线: 某偏移的进度事件只在该批次提交成功之后发布
// ==========================================

use crate::domain::{RunProgress, RunStatistics};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// 进度事件类型
// ==========================================

/// 单个批次的处理结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_no: usize,    // 本次运行内的批次序号（1 起）
    pub offset: usize,      // 批次起始偏移
    pub next_offset: usize, // 批次提交后的续跑位置
    pub rows_read: usize,
    pub eligible: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// 进度事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProgressEvent {
    /// 运行开始（状态已进入 RUNNING）
    RunStarted {
        progress: RunProgress,
        source_rows: usize,
    },
    /// 批次已提交
    BatchCommitted {
        progress: RunProgress,
        outcome: BatchOutcome,
    },
    /// 里程碑（库内总行数 + 数据集整体进度）
    Milestone {
        progress: RunProgress,
        total_in_sink: usize,
        dataset_percent: f64,
    },
    /// 运行结束（COMPLETED 或 ABORTED）
    RunFinished { stats: RunStatistics },
}

impl ProgressEvent {
    pub fn as_str(&self) -> &str {
        match self {
            ProgressEvent::RunStarted { .. } => "RunStarted",
            ProgressEvent::BatchCommitted { .. } => "BatchCommitted",
            ProgressEvent::Milestone { .. } => "Milestone",
            ProgressEvent::RunFinished { .. } => "RunFinished",
        }
    }
}

// ==========================================
// 进度观察者 Trait
// ==========================================

/// 进度观察者
///
/// 控制器在每个检查点调用 `publish`; 观察者不能影响运行流程
pub trait ProgressObserver: Send + Sync {
    fn publish(&self, event: ProgressEvent);
}

/// 空操作观察者
///
/// 用于不需要进度输出的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpProgressObserver;

impl ProgressObserver for NoOpProgressObserver {
    fn publish(&self, event: ProgressEvent) {
        debug!("NoOpProgressObserver: 跳过事件 - {}", event.as_str());
    }
}

/// 基于 tracing 的观察者（默认）
///
/// 每个批次一行 info 日志,里程碑单独一行
#[derive(Debug, Clone, Default)]
pub struct TracingProgressObserver;

impl ProgressObserver for TracingProgressObserver {
    fn publish(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::RunStarted {
                progress,
                source_rows,
            } => {
                info!(
                    run_id = %progress.run_id,
                    start = progress.start_offset,
                    end = progress.end_offset,
                    batch_size = progress.batch_size,
                    source_rows,
                    "开始导入城市数据"
                );
            }
            ProgressEvent::BatchCommitted { progress, outcome } => {
                info!(
                    run_id = %progress.run_id,
                    batch_no = outcome.batch_no,
                    offset = outcome.offset,
                    next_offset = outcome.next_offset,
                    inserted = outcome.inserted,
                    skipped = outcome.skipped,
                    total_inserted = progress.inserted,
                    percent = format_args!("{:.1}", progress.percent_complete()),
                    "批次已提交"
                );
            }
            ProgressEvent::Milestone {
                progress,
                total_in_sink,
                dataset_percent,
            } => {
                info!(
                    run_id = %progress.run_id,
                    batches = progress.batches_committed,
                    total_in_sink,
                    dataset_percent = format_args!("{:.1}", dataset_percent),
                    "里程碑"
                );
            }
            ProgressEvent::RunFinished { stats } => {
                if stats.is_completed() {
                    info!(
                        run_id = %stats.run_id,
                        final_offset = stats.final_offset,
                        processed = stats.processed,
                        inserted = stats.inserted,
                        skipped = stats.skipped,
                        "导入完成"
                    );
                } else {
                    warn!(
                        run_id = %stats.run_id,
                        final_offset = stats.final_offset,
                        reason = stats.abort_reason.as_deref().unwrap_or("未知"),
                        "导入中止,可从 final_offset 续跑"
                    );
                }
            }
        }
    }
}

// ==========================================
// StopHandle - 协作式取消
// ==========================================
// 控制器只在批次之间检查; 已提交批次保持有效
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
