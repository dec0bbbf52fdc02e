use crate::error::SyncError;
use crate::service::{ExportSource, OverlayEdit, StatementService, SyncReport};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 切换组织
#[derive(Debug, Deserialize)]
pub struct OrganizationRequest {
    pub org_id: String,
}

/// 请求体: 客户ID列表
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub customer_ids: Vec<String>,
}

/// 请求体: 屏幕编辑
#[derive(Debug, Deserialize)]
pub struct OverlayEditRequest {
    pub edits: Vec<OverlayEdit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub source: ExportSource,
}

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        message,
        data: None,
    };
    (status, Json(response)).into_response()
}

fn not_found(customer_id: &str) -> Response {
    failure(StatusCode::NOT_FOUND, format!("Customer {} has not been synced", customer_id))
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 切换组织 (丢弃旧组织的全部缓存)
pub async fn switch_organization(
    State(service): State<Arc<StatementService>>,
    Json(req): Json<OrganizationRequest>,
) -> Response {
    service.switch_organization(&req.org_id).await;
    let response = ApiResponse::ok(format!("Switched to organization {}", req.org_id), req.org_id);
    (StatusCode::OK, Json(response)).into_response()
}

/// 登出
pub async fn logout(State(service): State<Arc<StatementService>>) -> StatusCode {
    service.logout().await;
    StatusCode::NO_CONTENT
}

/// 批量同步客户
pub async fn sync_customers(
    State(service): State<Arc<StatementService>>,
    Json(req): Json<SyncRequest>,
) -> Response {
    match service.sync(&req.customer_ids).await {
        Ok(report) => {
            let message = format!(
                "Synced {} customers{}",
                report.customers.len(),
                if report.superseded { " (superseded by organization switch)" } else { "" }
            );
            let response: ApiResponse<SyncReport> = ApiResponse::ok(message, report);
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e @ SyncError::Session { .. }) => failure(StatusCode::UNAUTHORIZED, format!("Error: {}", e)),
        Err(e @ SyncError::NoOrganization) => failure(StatusCode::CONFLICT, format!("Error: {}", e)),
    }
}

pub async fn list_customers(State(service): State<Arc<StatementService>>) -> Response {
    let ids = service.customer_ids().await;
    (StatusCode::OK, Json(ApiResponse::ok(format!("{} customers", ids.len()), ids))).into_response()
}

/// 对账单
pub async fn get_statement(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
) -> Response {
    match service.statement(&customer_id).await {
        Some(statement) => (StatusCode::OK, Json(statement)).into_response(),
        None => not_found(&customer_id),
    }
}

/// 屏幕展示层
pub async fn get_overlay(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
) -> Response {
    match service.overlay(&customer_id).await {
        Some(overlay) => (StatusCode::OK, Json(overlay)).into_response(),
        None => not_found(&customer_id),
    }
}

/// 应用编辑并重算余额列
pub async fn edit_overlay(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
    Json(req): Json<OverlayEditRequest>,
) -> Response {
    match service.apply_edits(&customer_id, &req.edits).await {
        Some((overlay, ignored)) => {
            let message = format!("Applied {} edits, ignored {}", req.edits.len() - ignored, ignored);
            (StatusCode::OK, Json(ApiResponse::ok(message, overlay))).into_response()
        }
        None => not_found(&customer_id),
    }
}

/// 丢弃编辑
pub async fn reset_overlay(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
) -> Response {
    match service.reset_overlay(&customer_id).await {
        Some(overlay) => (StatusCode::OK, Json(overlay)).into_response(),
        None => not_found(&customer_id),
    }
}

/// 表格导出 (CSV)
pub async fn export_csv(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    match service.export_csv(&customer_id, query.source).await {
        Ok(Some(body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"statement-{}.csv\"", customer_id),
                ),
            ],
            body,
        )
            .into_response(),
        Ok(None) => not_found(&customer_id),
        Err(e) => {
            tracing::error!("CSV export for customer {} failed: {}", customer_id, e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
        }
    }
}

/// 文档导出表格
pub async fn export_document(
    State(service): State<Arc<StatementService>>,
    Path(customer_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Response {
    match service.document(&customer_id, query.source).await {
        Some(table) => (StatusCode::OK, Json(table)).into_response(),
        None => not_found(&customer_id),
    }
}
