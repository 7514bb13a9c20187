use crate::api::state::{AppState, SyncSlot};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{GroupCount, PriceListStats, PricedRow, Selection};
use crate::service::{import, pricing, spawn_sync, SyncHandle, SyncJob};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 请求体: 分组选择 (缺省为全选) 和可选的供应商ID
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    pub groups: Option<Vec<String>>,
    pub supplier_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoadParams {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarginRequest {
    pub margin: f64,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub price: String,
}

#[derive(Debug, Serialize)]
pub struct PriceListResponse {
    pub success: bool,
    pub source: Option<String>,
    pub margin: BigDecimal,
    pub stats: PriceListStats,
    pub groups: Vec<GroupCount>,
}

#[derive(Debug, Serialize)]
pub struct RowView {
    #[serde(flatten)]
    pub row: PricedRow,
    pub effective_price: BigDecimal,
}

impl From<&PricedRow> for RowView {
    fn from(row: &PricedRow) -> Self {
        Self {
            effective_price: row.effective_price().clone(),
            row: row.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SyncStarted {
    pub success: bool,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SqlResponse {
    pub success: bool,
    pub file: String,
    pub products: usize,
    pub statements: usize,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub rows_affected: u64,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 加载供应商价格表 (CSV 请求体)
pub async fn load_price_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LoadParams>,
    body: String,
) -> AppResult<Json<PriceListResponse>> {
    let mut session = state.session.write().await;
    let list = import::read_price_list(body.as_bytes(), &state.config.columns, &session.margin)?;

    let response = PriceListResponse {
        success: true,
        source: params.name.clone(),
        margin: session.margin.clone(),
        stats: list.stats(),
        groups: list.group_counts(),
    };
    session.price_list = Some(list);
    session.source_name = params.name;
    Ok(Json(response))
}

/// 当前价格表的全部行
pub async fn list_rows(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<RowView>>> {
    let session = state.session.read().await;
    let list = session.price_list.as_ref().ok_or(AppError::NoPriceList)?;
    Ok(Json(list.rows.iter().map(RowView::from).collect()))
}

/// 重新应用利润率 (人工价不变)
pub async fn apply_margin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarginRequest>,
) -> AppResult<Json<PriceListResponse>> {
    let margin = pricing::parse_margin(req.margin)?;
    let mut session = state.session.write().await;
    let session = &mut *session;

    // 未加载价格表时会话保持不变
    let list = session.price_list.as_mut().ok_or(AppError::NoPriceList)?;
    pricing::apply_margin(&mut list.rows, &margin);
    let response = PriceListResponse {
        success: true,
        source: session.source_name.clone(),
        margin: margin.clone(),
        stats: list.stats(),
        groups: list.group_counts(),
    };
    session.margin = margin;
    Ok(Json(response))
}

/// 人工改价
pub async fn set_row_override(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
    Json(req): Json<OverrideRequest>,
) -> AppResult<Json<RowView>> {
    let mut session = state.session.write().await;
    let list = session.price_list.as_mut().ok_or(AppError::NoPriceList)?;
    let row = list.row_mut(index)?;
    pricing::set_override(row, &req.price)?;
    Ok(Json(RowView::from(&*row)))
}

/// 清除人工价
pub async fn clear_row_override(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> AppResult<Json<RowView>> {
    let mut session = state.session.write().await;
    let list = session.price_list.as_mut().ok_or(AppError::NoPriceList)?;
    let row = list.row_mut(index)?;
    pricing::clear_override(row);
    Ok(Json(RowView::from(&*row)))
}

/// 选中的行和当前利润率
async fn selected_rows(state: &AppState, groups: Option<Vec<String>>) -> AppResult<(Vec<PricedRow>, BigDecimal)> {
    let session = state.session.read().await;
    let list = session.price_list.as_ref().ok_or(AppError::NoPriceList)?;
    Ok((list.filter(&Selection::from_groups(groups)), session.margin.clone()))
}

/// 请求中的供应商ID优先, 否则用配置的默认值
fn resolve_supplier_id(state: &AppState, requested: Option<String>) -> Option<String> {
    requested
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| state.config.shop.default_supplier_id().map(str::to_string))
}

/// 启动后台价格更新
pub async fn start_sync(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> AppResult<(StatusCode, Json<SyncStarted>)> {
    let catalog = state
        .catalog
        .clone()
        .ok_or_else(|| AppError::Configuration("PrestaShop API is not configured".to_string()))?;
    let (rows, margin) = selected_rows(&state, req.groups).await?;
    let supplier_id = resolve_supplier_id(&state, req.supplier_id);

    let mut slot = state.sync.lock().await;
    if slot.running {
        return Err(AppError::RunInProgress);
    }
    let handle = spawn_sync(SyncJob {
        client: catalog,
        rows,
        supplier_id,
        margin,
        log_dir: state.config.output.log_dir.clone(),
    })?;
    let total = handle.total;
    slot.begin(total, handle.cancel.clone());
    drop(slot);

    tokio::spawn(track_sync(state.clone(), handle));
    Ok((StatusCode::ACCEPTED, Json(SyncStarted { success: true, total })))
}

/// 消费进度事件, 运行结束后保存结果
async fn track_sync(state: Arc<AppState>, handle: SyncHandle) {
    let SyncHandle { mut events, join, .. } = handle;
    while let Some(event) = events.recv().await {
        state.sync.lock().await.apply(event);
    }

    let result = match join.await {
        Ok(result) => {
            let s = &result.report.summary;
            tracing::info!(
                "Update finished: {} updated, {} skipped, {} errors, log: {:?}",
                s.updated,
                s.skipped,
                s.errors,
                result.log_file
            );
            Some(result)
        }
        Err(e) => {
            tracing::error!("Update worker aborted: {}", e);
            None
        }
    };
    state.sync.lock().await.finish(result);
}

/// 当前运行进度及上次结果
pub async fn sync_status(State(state): State<Arc<AppState>>) -> Json<SyncSlot> {
    Json(state.sync.lock().await.clone())
}

/// 请求取消 (当前行处理完后生效)
pub async fn cancel_sync(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.sync.lock().await.cancel.as_ref() {
        Some(cancel) => {
            cancel.cancel();
            StatusCode::ACCEPTED
        }
        None => StatusCode::NO_CONTENT,
    }
}

/// 生成 SQL 脚本文件
pub async fn generate_sql_script(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<SqlResponse>> {
    let (rows, margin) = selected_rows(&state, req.groups).await?;
    let supplier_id = resolve_supplier_id(&state, req.supplier_id);
    let script = db::generate_sql(&rows, supplier_id.as_deref(), &margin, &state.config.output.table_prefix)?;
    let (products, statements) = (script.row_count, script.statements.len());
    let path = db::persist_script(state.config.output.sql_dir.clone(), script).await?;

    Ok(Json(SqlResponse {
        success: true,
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        products,
        statements,
    }))
}

/// 生成并直接执行 SQL 脚本 (需要配置数据库)
pub async fn apply_sql_script(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<ApplyResponse>> {
    let pool = state
        .db
        .as_ref()
        .ok_or_else(|| AppError::Configuration("database is not configured".to_string()))?;
    let (rows, margin) = selected_rows(&state, req.groups).await?;
    let supplier_id = resolve_supplier_id(&state, req.supplier_id);
    let script = db::generate_sql(&rows, supplier_id.as_deref(), &margin, &state.config.output.table_prefix)?;
    let rows_affected = db::apply_script(pool, &script).await?;

    Ok(Json(ApplyResponse {
        success: true,
        rows_affected,
    }))
}
