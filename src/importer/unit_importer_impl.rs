// ==========================================
// 楼盘单元库存系统 - 导入编排实现
// ==========================================
// 职责: 一次导入的全流程编排
//   映射解析(含审批门禁) -> 导入记录落库 -> 行规范化 -> 对账 -> 计数回填
// 红线: import_record 必须在处理前创建;门禁拦截时除映射与记录外零变更
// 不变式: 处理完成后 total = created + updated + skipped
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::domain::import::{ImportOutcome, ImportRecord, ImportSnapshot, ImportSummary};
use crate::domain::mapping::FieldMapping;
use crate::domain::project::ProjectContext;
use crate::domain::types::AuthContext;
use crate::domain::unit::CanonicalUnit;
use crate::engine::reconciliation::{ReconcileOptions, ReconciliationEngine};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_matcher::infer_mapping;
use crate::importer::row_normalizer::RowNormalizer as RowNormalizerImpl;
use crate::importer::unit_importer_trait::{RowNormalizer, UnitImporter};
use crate::repository::import_record_repo::{ImportCounts, ImportRecordRepository};
use crate::repository::inventory_repo::InventoryRepository;
use crate::repository::mapping_repo::FieldMappingRepository;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// UnitImporterImpl - 导入编排器
// ==========================================
pub struct UnitImporterImpl<R, M, I, C>
where
    R: InventoryRepository + Clone,
    M: FieldMappingRepository,
    I: ImportRecordRepository,
    C: ImportConfigReader,
{
    inventory_repo: R,
    mapping_repo: M,
    import_repo: I,
    config: C,
    engine: ReconciliationEngine<R>,
    normalizer: RowNormalizerImpl,
}

impl<R, M, I, C> UnitImporterImpl<R, M, I, C>
where
    R: InventoryRepository + Clone,
    M: FieldMappingRepository,
    I: ImportRecordRepository,
    C: ImportConfigReader,
{
    pub fn new(inventory_repo: R, mapping_repo: M, import_repo: I, config: C) -> Self {
        let engine = ReconciliationEngine::new(inventory_repo.clone());
        Self {
            inventory_repo,
            mapping_repo,
            import_repo,
            config,
            engine,
            normalizer: RowNormalizerImpl,
        }
    }

    /// 收集全部行的列头并集（排序,保证映射推断确定性）
    fn collect_headers(snapshot: &ImportSnapshot) -> Vec<String> {
        let mut headers: BTreeSet<&str> = BTreeSet::new();
        for row in &snapshot.data {
            for key in row.keys() {
                headers.insert(key.as_str());
            }
        }
        headers.into_iter().map(|h| h.to_string()).collect()
    }

    /// 解析本次导入使用的映射
    ///
    /// 返回 (映射, 是否已落库):
    /// - 显式 mapping_id: 按 ID 取,自动化调用方要求已审批
    /// - 交互式无指定: 恒等映射（源列名已是标准字段名,不落库）
    /// - 自动化无指定: 项目默认已审批映射;没有则走门禁(返回 None)
    async fn resolve_mapping(
        &self,
        project_id: &str,
        field_mapping_id: Option<&str>,
        headers: &[String],
        auth: &AuthContext,
    ) -> ImportResult<Option<(FieldMapping, bool)>> {
        if let Some(id) = field_mapping_id {
            let mapping = self
                .mapping_repo
                .get(id)
                .await?
                .filter(|m| m.project_id == project_id)
                .ok_or_else(|| ImportError::MappingNotFound(id.to_string()))?;
            if auth.is_automated() && !mapping.is_approved {
                return Err(ImportError::MappingNotApproved(id.to_string()));
            }
            return Ok(Some((mapping, true)));
        }

        if !auth.is_automated() {
            return Ok(Some((FieldMapping::identity(project_id, headers), false)));
        }

        Ok(self
            .mapping_repo
            .find_default_approved(project_id)
            .await?
            .map(|m| (m, true)))
    }

    /// 审批门禁: 推断映射并暂存,本次不执行任何对账
    ///
    /// 落库内容仅两条: 未审批的推断映射 + processed=false 的导入记录
    /// (raw_data 为完整请求快照,审批后可原样重放)
    async fn hold_for_approval(
        &self,
        project_id: &str,
        snapshot: &ImportSnapshot,
        headers: &[String],
        auth: &AuthContext,
    ) -> ImportResult<ImportOutcome> {
        let dict = self
            .config
            .get_keyword_dictionary()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        let inference = infer_mapping(headers, &dict);
        for warning in &inference.warnings {
            warn!(project_id = %project_id, "{}", warning);
        }

        let now = Utc::now();
        let mapping = FieldMapping {
            mapping_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: format!("自动推断 {}", now.format("%Y-%m-%d %H:%M")),
            mappings: inference.targets,
            is_default: false,
            is_approved: false,
            created_at: now,
            updated_at: now,
        };
        let record = ImportRecord {
            import_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            imported_by: auth.actor().to_string(),
            total_units: snapshot.data.len() as i64,
            created_units: 0,
            updated_units: 0,
            skipped_units: 0,
            processed: false,
            raw_data: serde_json::to_string(snapshot)?,
            field_mapping_id: Some(mapping.mapping_id.clone()),
            created_at: now,
            updated_at: now,
        };
        // 映射与记录同事务落库,避免残留无记录引用的孤儿映射
        self.import_repo.insert_pending(&mapping, &record).await?;

        info!(
            project_id = %project_id,
            import_id = %record.import_id,
            mapping_id = %mapping.mapping_id,
            rows = snapshot.data.len(),
            "自动化导入无已审批映射,已暂存待审批"
        );
        Ok(ImportOutcome::PendingApproval {
            import_id: record.import_id,
            field_mapping_id: mapping.mapping_id,
        })
    }

    /// 规范化 + 对账 + 计数回填（映射已就绪的公共路径）
    async fn execute_import(
        &self,
        project_id: &str,
        import_id: &str,
        mapping: &FieldMapping,
        snapshot: &ImportSnapshot,
    ) -> ImportResult<ImportSummary> {
        let started = std::time::Instant::now();
        let project = self
            .inventory_repo
            .get_project(project_id)
            .await?
            .ok_or_else(|| ImportError::ProjectNotFound(project_id.to_string()))?;
        let ctx = ProjectContext {
            buildings: self.inventory_repo.list_buildings(project_id).await?,
            layouts: self.inventory_repo.list_layouts(project_id).await?,
            default_building_id: snapshot.default_building_id.clone(),
            project,
        };

        let mut units: Vec<CanonicalUnit> = Vec::with_capacity(snapshot.data.len());
        let mut warnings: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut row_errors: i64 = 0;

        for (idx, row) in snapshot.data.iter().enumerate() {
            match self.normalizer.normalize(row, mapping, &ctx, idx + 1) {
                Ok(normalized) => {
                    warnings.extend(normalized.warnings);
                    units.push(normalized.unit);
                }
                Err(e) => {
                    errors.push(e.to_string());
                    row_errors += 1;
                }
            }
        }

        let max_reported_errors = self
            .config
            .get_max_reported_errors()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        let tx_max_retries = self
            .config
            .get_tx_max_retries()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        let tx_backoff_ms = self
            .config
            .get_tx_backoff_ms()
            .await
            .map_err(|e| ImportError::ConfigError(e.to_string()))?;
        let opts = ReconcileOptions {
            update_existing: snapshot.update_existing,
            max_reported_errors,
            tx_max_retries,
            tx_backoff_ms,
        };

        let outcome = self
            .engine
            .reconcile(project_id, import_id, &units, &opts)
            .await?;

        warnings.extend(outcome.warnings);
        errors.extend(outcome.errors);
        errors.truncate(max_reported_errors);

        let total = snapshot.data.len() as i64;
        let skipped = outcome.skipped + row_errors;
        self.import_repo
            .update_result(
                import_id,
                ImportCounts {
                    total,
                    created: outcome.created,
                    updated: outcome.updated,
                    skipped,
                },
                true,
            )
            .await?;

        info!(
            import_id = %import_id,
            total = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "对账批次处理完成"
        );
        Ok(ImportSummary {
            success: true,
            total,
            processed: outcome.created + outcome.updated,
            created: outcome.created,
            updated: outcome.updated,
            skipped,
            marked_as_sold: outcome.marked_as_sold,
            warnings,
            errors,
        })
    }
}

#[async_trait]
impl<R, M, I, C> UnitImporter for UnitImporterImpl<R, M, I, C>
where
    R: InventoryRepository + Clone,
    M: FieldMappingRepository,
    I: ImportRecordRepository,
    C: ImportConfigReader,
{
    #[instrument(skip(self, snapshot, auth), fields(project_id = %project_id, actor = %auth.actor()))]
    async fn import_units(
        &self,
        project_id: &str,
        snapshot: ImportSnapshot,
        field_mapping_id: Option<String>,
        auth: &AuthContext,
    ) -> ImportResult<ImportOutcome> {
        self.inventory_repo
            .get_project(project_id)
            .await?
            .ok_or_else(|| ImportError::ProjectNotFound(project_id.to_string()))?;
        if snapshot.data.is_empty() {
            return Err(ImportError::EmptyPayload);
        }

        let headers = Self::collect_headers(&snapshot);
        let (mapping, persisted) = match self
            .resolve_mapping(project_id, field_mapping_id.as_deref(), &headers, auth)
            .await?
        {
            Some(resolved) => resolved,
            // 自动化调用方没有可用映射 -> 门禁暂存
            None => return self.hold_for_approval(project_id, &snapshot, &headers, auth).await,
        };

        let now = Utc::now();
        let record = ImportRecord {
            import_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            imported_by: auth.actor().to_string(),
            total_units: snapshot.data.len() as i64,
            created_units: 0,
            updated_units: 0,
            skipped_units: 0,
            processed: false,
            raw_data: serde_json::to_string(&snapshot)?,
            // 恒等映射不落库,显式/默认映射记录其 ID
            field_mapping_id: if persisted {
                Some(mapping.mapping_id.clone())
            } else {
                None
            },
            created_at: now,
            updated_at: now,
        };
        self.import_repo.insert(&record).await?;

        let summary = self
            .execute_import(project_id, &record.import_id, &mapping, &snapshot)
            .await?;

        info!(
            import_id = %record.import_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            marked_as_sold = summary.marked_as_sold,
            "导入完成"
        );
        Ok(ImportOutcome::Completed {
            import_id: record.import_id,
            summary,
        })
    }

    #[instrument(skip(self, auth), fields(project_id = %project_id, import_id = %import_id, actor = %auth.actor()))]
    async fn process_pending(
        &self,
        project_id: &str,
        import_id: &str,
        auth: &AuthContext,
    ) -> ImportResult<ImportSummary> {
        let record = self
            .import_repo
            .get(import_id)
            .await?
            .filter(|r| r.project_id == project_id)
            .ok_or_else(|| ImportError::ImportRecordNotFound(import_id.to_string()))?;
        if record.processed {
            return Err(ImportError::ImportAlreadyProcessed(import_id.to_string()));
        }

        let mapping_id = record
            .field_mapping_id
            .clone()
            .ok_or_else(|| ImportError::MissingMapping(import_id.to_string()))?;
        let mapping = self
            .mapping_repo
            .get(&mapping_id)
            .await?
            .ok_or_else(|| ImportError::MappingNotFound(mapping_id.clone()))?;
        if !mapping.is_approved {
            return Err(ImportError::MappingNotApproved(mapping_id));
        }

        // raw_data 是落库时的完整请求快照,原样重放
        let snapshot: ImportSnapshot = serde_json::from_str(&record.raw_data)?;
        let summary = self
            .execute_import(project_id, import_id, &mapping, &snapshot)
            .await?;

        info!(
            created = summary.created,
            updated = summary.updated,
            marked_as_sold = summary.marked_as_sold,
            "待审批导入重放完成"
        );
        Ok(summary)
    }
}
