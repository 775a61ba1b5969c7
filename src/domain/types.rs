// ==========================================
// 城市地理数据导入 - 领域类型定义
// ==========================================
// 职责: 区域枚举 / 原始单元格值 / 运行状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 区域 (Region)
// ==========================================
// 红线: 分类结果只能是以下 7 个值之一,永不为空
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    NorthAmerica,
    Europe,
    Asia,
    Africa,
    SouthAmerica,
    Oceania,
    Other, // 未收录国家的兜底值
}

impl Region {
    /// 全部区域（含兜底值）
    pub const ALL: [Region; 7] = [
        Region::NorthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Africa,
        Region::SouthAmerica,
        Region::Oceania,
        Region::Other,
    ];

    /// 数据库中存储的文本标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "North America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::SouthAmerica => "South America",
            Region::Oceania => "Oceania",
            Region::Other => "Other",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .iter()
            .find(|r| r.as_str() == s.trim())
            .copied()
            .ok_or_else(|| format!("未知区域: {}", s))
    }
}

// ==========================================
// 单元格值 (CellValue)
// ==========================================
// 用途: 源表格中一个未定型的标量（文本/数字/空白）
// Excel 保留原始类型; CSV 全部为文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl CellValue {
    /// 空白判定（Empty 或仅含空白字符的文本）
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 仅当单元格本身是文本时返回
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Int(v) => write!(f, "{}", v),
            CellValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

// ==========================================
// 运行状态 (Run State)
// ==========================================
// 状态机: Idle → Running → (Completed | Aborted)
// 序列化格式: SCREAMING_SNAKE_CASE (与 import_run 表一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "IDLE"),
            RunState::Running => write!(f, "RUNNING"),
            RunState::Completed => write!(f, "COMPLETED"),
            RunState::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IDLE" => Ok(RunState::Idle),
            "RUNNING" => Ok(RunState::Running),
            "COMPLETED" => Ok(RunState::Completed),
            "ABORTED" => Ok(RunState::Aborted),
            other => Err(format!("未知运行状态: {}", other)),
        }
    }
}
