// ==========================================
// 楼盘单元库存系统 - 配置层
// ==========================================
// 职责: 系统配置读取
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

pub use config_manager::ConfigManager;
pub use import_config_trait::ImportConfigReader;
