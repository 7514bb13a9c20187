use crate::catalog::CatalogClient;
use crate::error::AppError;
use crate::models::{PricedRow, RunReport};
use crate::service::audit_log;
use crate::service::reconcile::{prepare_batch, ReconcileEngine, SyncEvent};
use bigdecimal::BigDecimal;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 64;

/// 一次后台更新任务的输入
pub struct SyncJob<C: ?Sized> {
    pub client: Arc<C>,
    pub rows: Vec<PricedRow>,
    pub supplier_id: Option<String>,
    pub margin: BigDecimal,
    pub log_dir: PathBuf,
}

/// 运行结果; 日志写入失败不影响已完成的更新
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub report: RunReport,
    pub log_file: Option<PathBuf>,
    pub log_error: Option<String>,
}

pub struct SyncHandle {
    pub total: usize,
    pub events: mpsc::Receiver<SyncEvent>,
    pub cancel: CancellationToken,
    pub join: JoinHandle<SyncResult>,
}

/// 预检通过后在单个后台任务上执行更新
pub fn spawn_sync<C>(job: SyncJob<C>) -> Result<SyncHandle, AppError>
where
    C: CatalogClient + ?Sized + 'static,
{
    let SyncJob {
        client,
        rows,
        supplier_id,
        margin,
        log_dir,
    } = job;
    let rows = prepare_batch(rows)?;
    let total = rows.len();
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let cancel = CancellationToken::new();
    let worker_cancel = cancel.clone();

    let join = tokio::spawn(async move {
        let engine = ReconcileEngine::new(client);
        let report = engine
            .run(&rows, supplier_id.as_deref(), &margin, Some(&tx), &worker_cancel)
            .await;

        match audit_log::persist_log(log_dir, report.clone()).await {
            Ok(path) => SyncResult {
                report,
                log_file: Some(path),
                log_error: None,
            },
            Err(e) => {
                tracing::error!("Run log could not be written: {}", e);
                SyncResult {
                    report,
                    log_file: None,
                    log_error: Some(e.to_string()),
                }
            }
        }
    });

    Ok(SyncHandle {
        total,
        events: rx,
        cancel,
        join,
    })
}
