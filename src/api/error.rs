// ==========================================
// 楼盘单元库存系统 - API 层错误类型
// ==========================================
// 职责: 导入错误 -> HTTP 语义(状态码 + 结构化错误体)的映射
// 红线: 错误体固定 {error, message, details} 三段结构
// ==========================================

use crate::importer::error::ImportError;
use serde::Serialize;
use thiserror::Error;

/// API 层错误（按 HTTP 状态码语义分类）
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("请求无效: {0}")]
    BadRequest(String),

    #[error("认证失败")]
    Unauthorized,

    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 结构化错误响应体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }

    /// 错误种类标识（错误体 error 字段）
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized => "unauthorized",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            ApiError::BadRequest(d)
            | ApiError::NotFound(d)
            | ApiError::Internal(d) => Some(d.clone()),
            ApiError::Unauthorized => None,
        };
        ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
            details,
        }
    }
}

// 导入错误 -> HTTP 语义
// 资源缺失归 404;门禁/请求内容问题归 400;其余归 500
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::ProjectNotFound(id) => ApiError::NotFound(format!("项目 {}", id)),
            ImportError::MappingNotFound(id) => ApiError::NotFound(format!("字段映射 {}", id)),
            ImportError::ImportRecordNotFound(id) => {
                ApiError::NotFound(format!("导入记录 {}", id))
            }
            ImportError::MappingNotApproved(_)
            | ImportError::MissingMapping(_)
            | ImportError::ImportAlreadyProcessed(_)
            | ImportError::EmptyPayload
            | ImportError::SnapshotDecodeError(_) => ApiError::BadRequest(err.to_string()),
            ImportError::ConfigError(_)
            | ImportError::TransactionFailed(_)
            | ImportError::Repository(_)
            | ImportError::InternalError(_)
            | ImportError::Other(_) => ApiError::Internal(err.to_string()),
        }
    }
}
