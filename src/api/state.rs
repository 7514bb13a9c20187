use crate::catalog::CatalogClient;
use crate::config::AppConfig;
use crate::models::PriceList;
use crate::service::{SyncEvent, SyncResult};
use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::MySqlPool;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// 共享状态
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Option<Arc<dyn CatalogClient>>, // 未配置商店时为 None, 只能生成 SQL
    pub db: Option<MySqlPool>,
    pub session: RwLock<Session>,
    pub sync: Mutex<SyncSlot>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        catalog: Option<Arc<dyn CatalogClient>>,
        db: Option<MySqlPool>,
        margin: BigDecimal,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            db,
            session: RwLock::new(Session {
                price_list: None,
                source_name: None,
                margin,
            }),
            sync: Mutex::new(SyncSlot::default()),
        }
    }
}

/// 当前加载的价格表及利润率
pub struct Session {
    pub price_list: Option<PriceList>,
    pub source_name: Option<String>,
    pub margin: BigDecimal,
}

/// 后台更新的进度 (同一时间只允许一个运行)
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncSlot {
    pub running: bool,
    pub processed: usize,
    pub total: usize,
    pub current_sku: Option<String>,
    pub last: Option<SyncResult>,
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

impl SyncSlot {
    pub fn begin(&mut self, total: usize, cancel: CancellationToken) {
        self.running = true;
        self.processed = 0;
        self.total = total;
        self.current_sku = None;
        self.cancel = Some(cancel);
    }

    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Started { total } => self.total = total,
            SyncEvent::RowDone { position, total, outcome } => {
                self.processed = position;
                self.total = total;
                self.current_sku = Some(outcome.supplier_sku);
            }
        }
    }

    pub fn finish(&mut self, result: Option<SyncResult>) {
        self.running = false;
        self.cancel = None;
        self.current_sku = None;
        if let Some(result) = result {
            self.processed = result.report.summary.processed;
            self.last = Some(result);
        }
    }
}
