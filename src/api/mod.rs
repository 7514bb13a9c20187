pub mod handlers;
pub mod state;

pub use handlers::*;
pub use state::{AppState, Session, SyncSlot};

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/pricelist", post(load_price_list))
        .route("/api/rows", get(list_rows))
        .route(
            "/api/rows/:index/override",
            put(set_row_override).delete(clear_row_override),
        )
        .route("/api/margin", post(apply_margin))
        .route("/api/sync", post(start_sync).get(sync_status))
        .route("/api/sync/cancel", post(cancel_sync))
        .route("/api/sql", post(generate_sql_script))
        .route("/api/sql/apply", post(apply_sql_script))
        .with_state(state)
}
