// ==========================================
// 楼盘单元库存系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::mapping::KeywordDictionary;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取关键词字典
    ///
    /// # 返回
    /// - config_kv 中 import.keyword_dictionary 的 JSON 覆盖,否则内置双语字典
    ///
    /// # 用途
    /// - 字典作为显式配置值传入匹配器,本地化/扩展不需改算法
    async fn get_keyword_dictionary(&self) -> Result<KeywordDictionary, Box<dyn Error>>;

    /// 获取行级错误返回上限
    ///
    /// # 默认值
    /// - 50
    ///
    /// # 用途
    /// - 错误列表有界,避免超大批次把响应撑爆
    async fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>>;

    /// 获取对账事务最大重试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_tx_max_retries(&self) -> Result<u32, Box<dyn Error>>;

    /// 获取事务重试基础退避（毫秒,按次数指数放大）
    ///
    /// # 默认值
    /// - 200
    async fn get_tx_backoff_ms(&self) -> Result<u64, Box<dyn Error>>;
}
