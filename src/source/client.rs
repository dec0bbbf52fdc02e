use reqwest::Client;
use std::time::Duration;

use crate::config::SourceConfig;

/// 创建访问外部记账服务的 HTTP 客户端
pub fn create_client(config: &SourceConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(config.timeout_secs))
        .pool_max_idle_per_host(4)
        .build()
}
