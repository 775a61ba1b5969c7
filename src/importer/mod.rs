// ==========================================
// 城市地理数据导入 - 导入层
// ==========================================
// 职责: 表格数据源 → cities 表的可续跑批量导入管道
// 支持: Excel, CSV, 内存数据源
// ==========================================

// 模块声明
pub mod batch_assembler;
pub mod city_importer_impl;
pub mod city_importer_trait;
pub mod data_cleaner;
pub mod dedup_key;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod progress;
pub mod region_classifier;
pub mod row_filter;

// 重导出核心类型
pub use batch_assembler::BatchAssembler;
pub use city_importer_impl::CityImporterImpl;
pub use data_cleaner::DataCleaner;
pub use dedup_key::DedupKey;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, InMemorySource, TabularSource, UniversalFileParser};
pub use progress::{
    BatchOutcome, NoOpProgressObserver, ProgressEvent, ProgressObserver, StopHandle,
    TracingProgressObserver,
};
pub use region_classifier::{classify, StaticRegionClassifier};
pub use row_filter::{FilterDecision, RejectReason, RowFilter};

// 重导出 Trait 接口
pub use city_importer_trait::{
    CityImporter, FieldNormalizer, FileParser, RegionClassifier, RowSource,
};
