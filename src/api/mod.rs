pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::service::StatementService;

pub use handlers::*;

/// 构建路由
pub fn router(service: Arc<StatementService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/organization", post(switch_organization).delete(logout))
        .route("/api/sync", post(sync_customers))
        .route("/api/customers", get(list_customers))
        .route("/api/customers/:id/statement", get(get_statement))
        .route(
            "/api/customers/:id/overlay",
            get(get_overlay).delete(reset_overlay),
        )
        .route("/api/customers/:id/overlay/edits", post(edit_overlay))
        .route("/api/customers/:id/export.csv", get(export_csv))
        .route("/api/customers/:id/document", get(export_document))
        .with_state(service)
}
