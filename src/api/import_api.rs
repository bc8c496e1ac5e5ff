// ==========================================
// 楼盘单元库存系统 - 单元导入 API
// ==========================================
// 职责: 两个导入端点的请求/响应契约 + 调用方认证
//   POST /projects/{id}/units/import
//   POST /projects/{id}/units/import/process-pending?importId=...
// 红线: HTTP 路由/传输不在此层,这里只定义契约与编排入口
// ==========================================

use crate::api::error::ApiError;
use crate::domain::import::{ImportOutcome, ImportSnapshot, ImportSummary};
use crate::domain::types::AuthContext;
use crate::importer::unit_importer_trait::UnitImporter;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

// ==========================================
// Credentials - 调用方凭据
// ==========================================
// 认证策略是通过/不通过的能力检查:
// 交互式会话直接可信,自动化调用方校验共享密钥
#[derive(Debug, Clone)]
pub enum Credentials {
    Session { user: String },
    SharedSecret { client: String, secret: String },
}

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 导入请求体（行数据 + 选项平铺,外加可选映射 ID）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUnitsRequest {
    #[serde(flatten)]
    pub snapshot: ImportSnapshot,
    #[serde(default)]
    pub field_mapping_id: Option<String>,
}

/// 门禁拦截响应体
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalBody {
    pub success: bool,
    pub status: &'static str, // 恒为 "pending_approval"
    pub import_id: String,
    pub field_mapping_id: String,
}

/// 导入端点响应: 对账汇总,或门禁拦截
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ImportUnitsResponse {
    Completed(ImportSummary),
    PendingApproval(PendingApprovalBody),
}

/// process-pending 端点响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPendingResponse {
    pub success: bool,
    pub data: ImportSummary,
}

// ==========================================
// UnitImportApi
// ==========================================
pub struct UnitImportApi<T: UnitImporter> {
    importer: T,
    shared_secret: String,
}

impl<T: UnitImporter> UnitImportApi<T> {
    pub fn new(importer: T, shared_secret: impl Into<String>) -> Self {
        Self {
            importer,
            shared_secret: shared_secret.into(),
        }
    }

    /// 凭据 -> 调用方身份（失败即 401,不区分失败原因）
    pub fn authenticate(&self, credentials: &Credentials) -> Result<AuthContext, ApiError> {
        match credentials {
            Credentials::Session { user } => Ok(AuthContext::Interactive { user: user.clone() }),
            Credentials::SharedSecret { client, secret } => {
                if !self.shared_secret.is_empty() && secret == &self.shared_secret {
                    Ok(AuthContext::Automated {
                        client: client.clone(),
                    })
                } else {
                    warn!(client = %client, "共享密钥校验失败");
                    Err(ApiError::Unauthorized)
                }
            }
        }
    }

    /// POST /projects/{id}/units/import
    #[instrument(skip(self, request, credentials), fields(project_id = %project_id))]
    pub async fn import_units(
        &self,
        project_id: &str,
        request: ImportUnitsRequest,
        credentials: &Credentials,
    ) -> Result<ImportUnitsResponse, ApiError> {
        let auth = self.authenticate(credentials)?;
        let outcome = self
            .importer
            .import_units(project_id, request.snapshot, request.field_mapping_id, &auth)
            .await?;

        match outcome {
            ImportOutcome::Completed { import_id, summary } => {
                info!(import_id = %import_id, "导入请求完成");
                Ok(ImportUnitsResponse::Completed(summary))
            }
            ImportOutcome::PendingApproval {
                import_id,
                field_mapping_id,
            } => Ok(ImportUnitsResponse::PendingApproval(PendingApprovalBody {
                success: true,
                status: "pending_approval",
                import_id,
                field_mapping_id,
            })),
        }
    }

    /// POST /projects/{id}/units/import/process-pending?importId=...
    #[instrument(skip(self, credentials), fields(project_id = %project_id, import_id = %import_id))]
    pub async fn process_pending(
        &self,
        project_id: &str,
        import_id: &str,
        credentials: &Credentials,
    ) -> Result<ProcessPendingResponse, ApiError> {
        let auth = self.authenticate(credentials)?;
        let summary = self
            .importer
            .process_pending(project_id, import_id, &auth)
            .await?;
        Ok(ProcessPendingResponse {
            success: true,
            data: summary,
        })
    }
}
