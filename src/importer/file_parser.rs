// ==========================================
// 城市地理数据导入 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 约定: 首行为表头; 完全空白的行保留在原位置,行偏移与数据集一致
// 红线: 缺少必需列属于配置缺陷,在任何批次开始前返回
// ==========================================

use crate::domain::{CellValue, RawRecord};
use crate::importer::city_importer_trait::{FileParser, RowSource};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::REQUIRED_COLUMNS;
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// ==========================================
// TabularSource - 解析后的表格数据
// ==========================================
// 表头在所有行之间共享
#[derive(Debug, Clone)]
pub struct TabularSource {
    headers: Arc<[String]>,
    rows: Vec<Vec<CellValue>>,
}

impl TabularSource {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            headers: headers.into(),
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 校验必需列是否齐全
    pub fn validate_headers(&self) -> ImportResult<()> {
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !self.headers.iter().any(|h| h == col))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumn(missing.join(", ")))
        }
    }
}

impl RowSource for TabularSource {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_at(&self, index: usize) -> Option<RawRecord> {
        self.rows
            .get(index)
            .map(|cells| RawRecord::new(Arc::clone(&self.headers), cells.clone(), index))
    }
}

// ==========================================
// InMemorySource - 预先构造好的记录序列
// ==========================================
// 用途: 测试与程序化调用; 每行可以有各自的列
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<RawRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

impl RowSource for InMemorySource {
    fn row_count(&self) -> usize {
        self.records.len()
    }

    fn row_at(&self, index: usize) -> Option<RawRecord> {
        self.records.get(index).map(|r| {
            let mut record = r.clone();
            record.row_index = index;
            record
        })
    }
}

fn ensure_file_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
// 所有单元格都是文本; 空白单元格 → CellValue::Empty
pub struct CsvParser {
    delimiter: u8,
}

impl CsvParser {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// 指定分隔符（公开数据集常见 ';'）
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FileParser for CsvParser {
    fn parse_to_source(&self, file_path: &Path) -> ImportResult<TabularSource> {
        ensure_file_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(self.delimiter)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        // 全空白行保留,由规范化阶段丢弃
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(CellValue::from).collect::<Vec<_>>());
        }

        let source = TabularSource::new(headers, rows);
        source.validate_headers()?;

        debug!(path = %file_path.display(), rows = source.row_count(), "CSV 解析完成");
        Ok(source)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 读取第一个工作表,保留单元格原始类型
pub struct ExcelParser;

impl ExcelParser {
    fn to_cell_value(cell: &Data) -> CellValue {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::Int(v) => CellValue::Int(*v),
            Data::Float(v) => CellValue::Float(*v),
            Data::Bool(v) => CellValue::Bool(*v),
            Data::String(s) => CellValue::from(s.as_str()),
            // 日期/时长类单元格按文本保留
            other => CellValue::from(other.to_string().as_str()),
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_to_source(&self, file_path: &Path) -> ImportResult<TabularSource> {
        ensure_file_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut rows_iter = range.rows();
        let header_row = rows_iter
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let rows: Vec<Vec<CellValue>> = rows_iter
            .map(|data_row| data_row.iter().map(Self::to_cell_value).collect::<Vec<_>>())
            .collect();

        let source = TabularSource::new(headers, rows);
        source.validate_headers()?;

        debug!(
            path = %file_path.display(),
            sheet = %sheet_name,
            rows = source.row_count(),
            "Excel 解析完成"
        );
        Ok(source)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
#[derive(Default)]
pub struct UniversalFileParser {
    csv_delimiter: Option<u8>,
}

impl UniversalFileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csv_delimiter(mut self, delimiter: u8) -> Self {
        self.csv_delimiter = Some(delimiter);
        self
    }

    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<TabularSource> {
        let path = file_path.as_ref();
        ensure_file_exists(path)?;

        let source = match extension_of(path).as_str() {
            "csv" => {
                let parser = self
                    .csv_delimiter
                    .map(CsvParser::with_delimiter)
                    .unwrap_or_default();
                parser.parse_to_source(path)?
            }
            "xlsx" | "xls" => ExcelParser.parse_to_source(path)?,
            other => return Err(ImportError::UnsupportedFormat(other.to_string())),
        };

        info!(path = %path.display(), rows = source.row_count(), "数据源加载完成");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "Name,Country name EN,Population,Coordinates",
            "Springfield,United States,1500,\"39.78,-89.65\"",
            "Smallville,United States,200,\"39.0,-88.0\"",
        ]);

        let source = CsvParser::new().parse_to_source(temp_file.path()).unwrap();
        assert_eq!(source.row_count(), 2);

        let row = source.row_at(0).unwrap();
        assert_eq!(
            row.get("Name"),
            Some(&CellValue::Text("Springfield".to_string()))
        );
        assert_eq!(
            row.get("Coordinates"),
            Some(&CellValue::Text("39.78,-89.65".to_string()))
        );
        assert_eq!(source.row_at(1).unwrap().row_index, 1);
        assert!(source.row_at(2).is_none());
    }

    #[test]
    fn test_csv_parser_semicolon_delimiter() {
        let temp_file = csv_file(&[
            "Name;Country name EN;Population;Coordinates",
            "Oslo;Norway;580000;59.91,10.75",
        ]);
        let source = CsvParser::with_delimiter(b';')
            .parse_to_source(temp_file.path())
            .unwrap();
        assert_eq!(
            source.row_at(0).unwrap().get("Coordinates"),
            Some(&CellValue::Text("59.91,10.75".to_string()))
        );
    }

    #[test]
    fn test_csv_parser_keeps_blank_rows_in_position() {
        let temp_file = csv_file(&[
            "Name,Country name EN,Population,Coordinates",
            "Unknown City,Nowhereland,5000,",
            ",,,",
            "Oslo,Norway,,",
        ]);

        let source = CsvParser::new().parse_to_source(temp_file.path()).unwrap();
        assert_eq!(source.row_count(), 3);
        assert_eq!(
            source.row_at(0).unwrap().get("Coordinates"),
            Some(&CellValue::Empty)
        );

        let blank = source.row_at(1).unwrap();
        assert_eq!(blank.row_index, 1);
        assert!(blank.cells().iter().all(CellValue::is_blank));

        let oslo = source.row_at(2).unwrap();
        assert_eq!(oslo.row_index, 2);
        assert_eq!(oslo.get("Name"), Some(&CellValue::Text("Oslo".to_string())));
    }

    #[test]
    fn test_csv_parser_missing_column() {
        let temp_file = csv_file(&["Name,Population", "Oslo,1"]);
        let result = CsvParser::new().parse_to_source(temp_file.path());
        match result {
            Err(ImportError::MissingColumn(cols)) => {
                assert!(cols.contains("Country name EN"));
                assert!(cols.contains("Coordinates"));
            }
            other => panic!("应返回缺列错误, 实际: {:?}", other.map(|s| s.row_count())),
        }
    }

    #[test]
    fn test_parser_file_not_found() {
        let result = UniversalFileParser::new().parse("non_existent.csv");
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_parser_unsupported_format() {
        let temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        let result = UniversalFileParser::new().parse(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_read_chunk_truncates_at_end() {
        let source = TabularSource::new(
            vec!["Name".to_string()],
            (0..5)
                .map(|i| vec![CellValue::Text(format!("c{}", i))])
                .collect(),
        );
        let chunk = source.read_chunk(3, 10);
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk[0].row_index, 3);
        assert!(source.read_chunk(9, 2).is_empty());
    }
}
