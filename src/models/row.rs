use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

/// 供应商价格表中的一行 (加载后不可变)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierRow {
    pub supplier_sku: String,       // 供应商SKU (匹配键)
    pub purchase_price: BigDecimal, // 采购价
    pub group: String,              // 商品分组, 可为空
    pub article: String,
    pub manufacturer: String,
    pub availability: Option<String>, // 无该列时为 None
}

impl SupplierRow {
    pub fn has_price(&self) -> bool {
        self.purchase_price > BigDecimal::zero()
    }
}

/// 带售价的行
///
/// `derived_price` 由利润率计算, `override_price` 为人工改价;
/// 人工改价在被清除前始终优先。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedRow {
    pub index: usize, // 行在价格表中的位置 (行标识)
    #[serde(flatten)]
    pub row: SupplierRow,
    pub derived_price: BigDecimal,
    pub override_price: Option<BigDecimal>,
}

impl PricedRow {
    pub fn new(index: usize, row: SupplierRow, derived_price: BigDecimal) -> Self {
        Self {
            index,
            row,
            derived_price,
            override_price: None,
        }
    }

    /// 实际使用的售价: 人工价优先, 否则为计算价
    pub fn effective_price(&self) -> &BigDecimal {
        self.override_price.as_ref().unwrap_or(&self.derived_price)
    }

    pub fn sku(&self) -> &str {
        &self.row.supplier_sku
    }

    /// 采购价为 0 的行不参与更新和 SQL 生成
    pub fn is_actionable(&self) -> bool {
        self.row.has_price()
    }
}
