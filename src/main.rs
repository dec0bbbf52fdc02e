use customer_statement::{api, create_client, AppConfig, HttpRecordSource, StatementService};
use customer_statement::service::Workspace;
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Config load failed ({}), falling back to environment", e);
            AppConfig::from_env()
        }
    };
    info!("Starting server with config: {:?}", config);

    // 创建外部记账服务客户端
    let client = create_client(&config.source)?;
    let source = Arc::new(HttpRecordSource::new(client, &config.source));
    info!("Accounting source: {}", config.source.base_url);

    // 组织上下文在首次切换组织时建立
    let workspace = Arc::new(Workspace::new(None));
    let service = Arc::new(StatementService::new(
        source,
        workspace,
        config.format.clone(),
        config.sync.max_concurrent_customers,
    ));

    let app = api::router(service).layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/organization                  - switch organization");
    info!("  POST /api/sync                          - sync customers");
    info!("  GET  /api/customers/:id/statement       - statement");
    info!("  POST /api/customers/:id/overlay/edits   - edit + recalculate");
    info!("  GET  /api/customers/:id/export.csv      - spreadsheet export");
    info!("  GET  /api/customers/:id/document        - document export");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
