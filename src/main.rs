use price_sync_rust::api::{self, AppState};
use price_sync_rust::service::pricing;
use price_sync_rust::{create_pool, AppConfig, CatalogClient, PrestaShopClient};
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
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // PrestaShop 客户端 (未配置时仅可生成 SQL)
    let catalog: Option<Arc<dyn CatalogClient>> = match PrestaShopClient::new(&config.shop) {
        Ok(client) => {
            info!("PrestaShop API: {}", client.api_url());
            Some(Arc::new(client) as Arc<dyn CatalogClient>)
        }
        Err(e) => {
            warn!("{} - API updates disabled, SQL generation still available", e);
            None
        }
    };

    // 可选: 商店数据库, 用于直接执行 SQL 脚本
    let db = match &config.database {
        Some(database) => {
            let pool = create_pool(&database.url).await?;
            info!("Database pool created");
            Some(pool)
        }
        None => None,
    };

    let margin = pricing::parse_margin(config.pricing.default_margin)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, catalog, db, margin));

    let app = api::router(state).layer(ServiceBuilder::new());

    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/pricelist          - load supplier price list (CSV)");
    info!("  POST /api/margin             - reapply margin");
    info!("  PUT  /api/rows/:index/override - manual sale price");
    info!("  POST /api/sync               - push prices through the PrestaShop API");
    info!("  POST /api/sql                - write SQL script instead");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
