// ==========================================
// 楼盘单元库存系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 行级错误不在此处（收集进结果列表）;此处为批级失败
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型（批级,整次调用失败）
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 资源缺失 =====
    #[error("项目不存在: {0}")]
    ProjectNotFound(String),

    #[error("字段映射不存在: {0}")]
    MappingNotFound(String),

    #[error("导入记录不存在: {0}")]
    ImportRecordNotFound(String),

    // ===== 审批门禁 =====
    #[error("字段映射未审批,自动化导入被拒绝: {0}")]
    MappingNotApproved(String),

    #[error("导入记录缺少字段映射,无法重放: {0}")]
    MissingMapping(String),

    #[error("导入记录已处理完成,不可重复执行: {0}")]
    ImportAlreadyProcessed(String),

    // ===== 请求内容 =====
    #[error("导入数据为空")]
    EmptyPayload,

    #[error("导入快照反序列化失败: {0}")]
    SnapshotDecodeError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ===== 事务级失败 =====
    #[error("对账事务失败: {0}")]
    TransactionFailed(String),

    // ===== 数据访问 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::SnapshotDecodeError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
