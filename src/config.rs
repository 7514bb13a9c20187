use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub shop: ShopConfig,
    pub pricing: PricingConfig,
    pub columns: ColumnConfig,
    pub output: OutputConfig,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// PrestaShop 连接参数
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    pub url: String,
    pub api_key: String,
    pub supplier_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            supplier_id: None,
            timeout_secs: 30,
        }
    }
}

// api_key 不进日志
impl std::fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConfig")
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<set>" })
            .field("supplier_id", &self.supplier_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ShopConfig {
    /// URL 与 API key 均已配置时才允许走 API 更新
    pub fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() || self.api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "shop.url and shop.api_key must both be set".to_string(),
            ));
        }
        reqwest::Url::parse(self.url.trim())
            .map_err(|e| AppError::Configuration(format!("invalid shop.url {:?}: {}", self.url, e)))?;
        Ok(())
    }

    /// 默认供应商ID (空字符串视为未配置)
    pub fn default_supplier_id(&self) -> Option<&str> {
        self.supplier_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// 默认利润率 (百分比)
    pub default_margin: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { default_margin: 12.0 }
    }
}

/// 供应商价格表的列名映射
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub sku: String,
    pub article: String,
    pub price: String,
    pub manufacturer: String,
    pub availability: String,
    pub group: String,
    pub delimiter: char,
    pub available_value: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            sku: "Internal Article No.".to_string(),
            article: "Article No.".to_string(),
            price: "Price".to_string(),
            manufacturer: "Manufacturer".to_string(),
            availability: "Availability".to_string(),
            group: "Productgroup".to_string(),
            delimiter: ',',
            available_value: "Available".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub log_dir: PathBuf,
    pub sql_dir: PathBuf,
    pub table_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            sql_dir: PathBuf::from("."),
            table_prefix: "ps_".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl AppConfig {
    /// 加载配置: 内置默认值 -> ./config.{ini,toml,...} -> PRICE_SYNC__* 环境变量
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, AppError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("PRICE_SYNC")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        let mut cfg: AppConfig = settings
            .try_deserialize()
            .map_err(|e| AppError::Configuration(e.to_string()))?;

        if cfg.database.as_ref().is_some_and(|db| db.url.trim().is_empty()) {
            cfg.database = None;
        }
        Ok(cfg)
    }
}
