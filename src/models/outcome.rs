use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// PrestaShop 商品ID (由商店分配, 不透明)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Updated { product_id: ProductId, price: BigDecimal },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub index: usize,
    pub supplier_sku: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record(&mut self, status: &OutcomeStatus) {
        self.processed += 1;
        match status {
            OutcomeStatus::Updated { .. } => self.updated += 1,
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed { .. } => self.errors += 1,
        }
    }
}

/// 一次更新运行的完整结果 (按输入顺序, 每行一条)
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Local>,
    pub margin: BigDecimal,
    pub outcomes: Vec<RowOutcome>,
    pub summary: RunSummary,
}
