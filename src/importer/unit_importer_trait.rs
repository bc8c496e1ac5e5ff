// ==========================================
// 楼盘单元库存系统 - 导入器 Trait 接口
// ==========================================
// 职责: 定义导入编排与行规范化的接口（不包含实现）
// ==========================================

use crate::domain::import::{ImportOutcome, ImportSnapshot, ImportSummary, RawImportRow};
use crate::domain::mapping::FieldMapping;
use crate::domain::project::ProjectContext;
use crate::domain::types::AuthContext;
use crate::importer::error::ImportResult;
use crate::importer::row_normalizer::{NormalizedRow, RowError};
use async_trait::async_trait;

// ==========================================
// RowNormalizer Trait
// ==========================================
// 用途: 单行规范化（纯变换）
// 实现者: row_normalizer::RowNormalizer
pub trait RowNormalizer: Send + Sync {
    /// 规范化单行
    ///
    /// # 参数
    /// - row: 原始键值对
    /// - mapping: 列头映射（ignore 列被丢弃）
    /// - ctx: 项目上下文（楼栋/户型索引）
    /// - row_number: 源数据行号（从 1 起）
    ///
    /// # 返回
    /// - Ok(NormalizedRow): 标准化行 + 行级警告
    /// - Err(RowError): 行级错误（该行跳过,批次继续）
    fn normalize(
        &self,
        row: &RawImportRow,
        mapping: &FieldMapping,
        ctx: &ProjectContext,
        row_number: usize,
    ) -> Result<NormalizedRow, RowError>;
}

// ==========================================
// UnitImporter Trait
// ==========================================
// 用途: 导入主流程编排（含审批门禁）
// 实现者: unit_importer_impl::UnitImporterImpl
#[async_trait]
pub trait UnitImporter: Send + Sync {
    /// 执行一次单元导入
    ///
    /// # 参数
    /// - project_id: 目标项目
    /// - snapshot: 请求体快照（行数据 + 选项,亦是落库的可重放快照）
    /// - field_mapping_id: 显式指定的映射（可选）
    /// - auth: 调用方身份（交互式/自动化,门禁依据）
    ///
    /// # 返回
    /// - Ok(ImportOutcome::Completed): 对账已执行
    /// - Ok(ImportOutcome::PendingApproval): 自动化导入被门禁暂存
    /// - Err(ImportError): 批级失败,无任何局部状态落库
    async fn import_units(
        &self,
        project_id: &str,
        snapshot: ImportSnapshot,
        field_mapping_id: Option<String>,
        auth: &AuthContext,
    ) -> ImportResult<ImportOutcome>;

    /// 重放一次待审批导入（映射审批通过后调用）
    async fn process_pending(
        &self,
        project_id: &str,
        import_id: &str,
        auth: &AuthContext,
    ) -> ImportResult<ImportSummary>;
}
