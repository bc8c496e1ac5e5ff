// ==========================================
// 楼盘单元库存系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::mapping::KeywordDictionary;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键 =====
pub const KEY_KEYWORD_DICTIONARY: &str = "import.keyword_dictionary";
pub const KEY_MAX_REPORTED_ERRORS: &str = "import.max_reported_errors";
pub const KEY_TX_MAX_RETRIES: &str = "import.tx_max_retries";
pub const KEY_TX_BACKOFF_MS: &str = "import.tx_backoff_ms";

// ===== 默认值 =====
const DEFAULT_MAX_REPORTED_ERRORS: usize = 50;
const DEFAULT_TX_MAX_RETRIES: u32 = 3;
const DEFAULT_TX_BACKOFF_MS: u64 = 200;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Clone)]
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（对传入连接再次应用统一 PRAGMA,幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 读取单个配置值（不存在返回 None）
    fn get_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（运维/测试用）
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now')) \
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
        raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_keyword_dictionary(&self) -> Result<KeywordDictionary, Box<dyn Error>> {
        if let Some(raw) = self.get_value(KEY_KEYWORD_DICTIONARY)? {
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(value) => {
                    if let Some(dict) = KeywordDictionary::from_json(&value) {
                        return Ok(dict);
                    }
                    tracing::warn!("关键词字典配置为空或无有效字段,回退内置字典");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "关键词字典配置解析失败,回退内置字典");
                }
            }
        }
        Ok(KeywordDictionary::default())
    }

    async fn get_max_reported_errors(&self) -> Result<usize, Box<dyn Error>> {
        let raw = self.get_value(KEY_MAX_REPORTED_ERRORS)?;
        Ok(Self::parse_or(raw, DEFAULT_MAX_REPORTED_ERRORS))
    }

    async fn get_tx_max_retries(&self) -> Result<u32, Box<dyn Error>> {
        let raw = self.get_value(KEY_TX_MAX_RETRIES)?;
        Ok(Self::parse_or(raw, DEFAULT_TX_MAX_RETRIES))
    }

    async fn get_tx_backoff_ms(&self) -> Result<u64, Box<dyn Error>> {
        let raw = self.get_value(KEY_TX_BACKOFF_MS)?;
        Ok(Self::parse_or(raw, DEFAULT_TX_BACKOFF_MS))
    }
}
