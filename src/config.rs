use serde::{Deserialize, Serialize};

use crate::format::AmountFormat;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub sync: SyncConfig,
    pub format: AmountFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 外部记账服务
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    /// 由会话层提供的访问令牌，这里只透传
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// 同时同步的客户数；1 表示严格顺序
    pub max_concurrent_customers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            source: SourceConfig {
                base_url: "https://www.zohoapis.com/books/v3".to_string(),
                access_token: None,
                timeout_secs: 30,
            },
            sync: SyncConfig {
                max_concurrent_customers: 1,
            },
            format: AmountFormat::default(),
        }
    }
}

impl AppConfig {
    /// 默认值 → 可选 `statement.toml` → `STATEMENT__*` 环境变量
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name("statement").required(false))
            .add_source(
                config::Environment::with_prefix("STATEMENT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            source: SourceConfig {
                base_url: std::env::var("ACCOUNTING_BASE_URL").unwrap_or(defaults.source.base_url),
                access_token: std::env::var("ACCOUNTING_ACCESS_TOKEN").ok(),
                timeout_secs: defaults.source.timeout_secs,
            },
            sync: defaults.sync,
            format: defaults.format,
        }
    }
}
