// ==========================================
// 楼盘单元库存系统 - 导入模块
// ==========================================
// 流水线: 字段匹配 -> 行规范化 -> 对账编排
// ==========================================

pub mod error;
pub mod field_matcher;
pub mod row_normalizer;
pub mod unit_importer_impl;
pub mod unit_importer_trait;

pub use error::{ImportError, ImportResult};
pub use field_matcher::{infer_mapping, match_header, HeaderMatch, MappingInference};
pub use row_normalizer::{NormalizedRow, RowError};
pub use unit_importer_impl::UnitImporterImpl;
pub use unit_importer_trait::{RowNormalizer, UnitImporter};
