// ==========================================
// 楼盘单元库存系统 - 领域层
// ==========================================
// 职责: 实体与类型定义,不含数据访问与业务编排
// ==========================================

pub mod import;
pub mod mapping;
pub mod project;
pub mod types;
pub mod unit;

// 重导出核心类型
pub use import::{ImportOutcome, ImportRecord, ImportSnapshot, ImportSummary, RawImportRow};
pub use mapping::{CanonicalField, FieldMapping, KeywordDictionary, MappingTarget};
pub use project::{Building, Layout, Project, ProjectContext};
pub use types::{AuthContext, UnitStatus, UpdateType};
pub use unit::{CanonicalUnit, FieldChanges, Unit, UnitVersion, VersionMetadata};
