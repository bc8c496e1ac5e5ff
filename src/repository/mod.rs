// ==========================================
// 楼盘单元库存系统 - 数据仓储层
// ==========================================
// 职责: 数据访问接口与 rusqlite 实现
// 红线: Repository 不含业务规则,只做数据 CRUD
// ==========================================

pub mod error;
pub mod import_record_repo;
pub mod inventory_repo;
pub mod inventory_repo_impl;
pub mod mapping_repo;

// 重导出核心类型
pub use error::{RepoResult, RepositoryError};
pub use import_record_repo::{ImportCounts, ImportRecordRepository, ImportRecordRepositoryImpl};
pub use inventory_repo::{InventoryRepository, UnitMutation};
pub use inventory_repo_impl::InventoryRepositoryImpl;
pub use mapping_repo::{FieldMappingRepository, FieldMappingRepositoryImpl};
