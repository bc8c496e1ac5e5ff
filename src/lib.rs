// ==========================================
// 楼盘单元库存系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 单元库存导入与对账核心 (导入即权威在售清单)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 对账规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AuthContext, UnitStatus, UpdateType};

// 领域实体
pub use domain::{
    Building, CanonicalField, CanonicalUnit, FieldMapping, ImportOutcome, ImportRecord,
    ImportSnapshot, ImportSummary, KeywordDictionary, Layout, MappingTarget, Project,
    ProjectContext, Unit, UnitVersion,
};

// 引擎
pub use engine::{ReconcileOptions, ReconcileOutcome, ReconciliationEngine};

// 导入器
pub use importer::{ImportError, UnitImporter, UnitImporterImpl};

// API
pub use api::{ApiError, Credentials, UnitImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "楼盘单元库存系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================
