use crate::catalog::{CatalogClient, CatalogError};
use crate::error::AppError;
use crate::models::{
    actionable_rows, IdentityCache, OutcomeStatus, PricedRow, Resolution, RowOutcome, RunReport, RunSummary,
};
use bigdecimal::BigDecimal;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const NOT_FOUND_REASON: &str = "not found in catalog";

/// 进度事件 (每行处理完发送一次)
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started { total: usize },
    RowDone { position: usize, total: usize, outcome: RowOutcome },
}

/// 批次预检: 没有选中行或没有正价格行时, 在任何网络调用前中止
pub fn prepare_batch(selected: Vec<PricedRow>) -> Result<Vec<PricedRow>, AppError> {
    if selected.is_empty() {
        return Err(AppError::EmptyBatch("no rows selected"));
    }
    let rows = actionable_rows(selected);
    if rows.is_empty() {
        return Err(AppError::EmptyBatch("no rows with a positive purchase price"));
    }
    Ok(rows)
}

/// 对账引擎: 查找商品ID -> 缓存 -> 更新价格
///
/// 严格按行顺序逐个请求, 单行失败不会中止整个批次。
pub struct ReconcileEngine<C: ?Sized> {
    client: Arc<C>,
}

impl<C: CatalogClient + ?Sized> ReconcileEngine<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// 在每行开始前检查 `cancel`; 已完成的行保留结果
    pub async fn run(
        &self,
        rows: &[PricedRow],
        supplier_id: Option<&str>,
        margin: &BigDecimal,
        events: Option<&mpsc::Sender<SyncEvent>>,
        cancel: &CancellationToken,
    ) -> RunReport {
        let started_at = Local::now();
        let batch: Vec<&PricedRow> = rows.iter().filter(|r| r.is_actionable()).collect();
        let total = batch.len();

        let mut cache = IdentityCache::new();
        let mut summary = RunSummary::new(total);
        let mut outcomes = Vec::with_capacity(total);

        tracing::info!("Price update started: {} rows, margin {}%", total, margin);
        post(events, SyncEvent::Started { total });

        for (position, row) in batch.into_iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                tracing::warn!("Price update cancelled after {}/{} rows", position, total);
                break;
            }

            let status = self.process_row(&mut cache, row, supplier_id).await;
            summary.record(&status);

            let outcome = RowOutcome {
                index: row.index,
                supplier_sku: row.sku().to_string(),
                status,
            };
            post(
                events,
                SyncEvent::RowDone {
                    position: position + 1,
                    total,
                    outcome: outcome.clone(),
                },
            );
            outcomes.push(outcome);
        }

        tracing::info!(
            "Price update finished: {} updated, {} skipped, {} errors ({} SKUs resolved)",
            summary.updated,
            summary.skipped,
            summary.errors,
            cache.resolved_count()
        );

        RunReport {
            started_at,
            margin: margin.clone(),
            outcomes,
            summary,
        }
    }

    async fn process_row(&self, cache: &mut IdentityCache, row: &PricedRow, supplier_id: Option<&str>) -> OutcomeStatus {
        let product_id = match self.resolve(cache, row.sku(), supplier_id).await {
            Resolution::Found(id) => id,
            Resolution::Missing(reason) => {
                tracing::warn!("{}: skipped ({})", row.sku(), reason);
                return OutcomeStatus::Skipped { reason };
            }
        };

        let price = row.effective_price().clone();
        match self.client.update_price(&product_id, &price).await {
            Ok(()) => OutcomeStatus::Updated { product_id, price },
            Err(e) => {
                tracing::warn!("{}: update of product {} failed: {}", row.sku(), product_id, e);
                OutcomeStatus::Failed { reason: e.to_string() }
            }
        }
    }

    /// 每个 SKU 每次运行最多查询一次
    async fn resolve(&self, cache: &mut IdentityCache, sku: &str, supplier_id: Option<&str>) -> Resolution {
        if let Some(hit) = cache.get(sku) {
            return hit.clone();
        }

        let resolution = match self.client.find_product_id(sku, supplier_id).await {
            Ok(id) => Resolution::Found(id),
            Err(CatalogError::NotFound) => Resolution::Missing(NOT_FOUND_REASON.to_string()),
            Err(e) => Resolution::Missing(format!("lookup failed: {}", e)),
        };
        cache.insert(sku, resolution.clone());
        resolution
    }
}

/// 非阻塞投递; 通道满时丢弃进度事件 (最终报告不受影响)
fn post(events: Option<&mpsc::Sender<SyncEvent>>, event: SyncEvent) {
    if let Some(tx) = events {
        if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(event) {
            tracing::debug!("Progress channel full, event dropped");
        }
    }
}
