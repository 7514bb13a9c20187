//! 远程商品目录 (PrestaShop Webservice)
//!
//! `CatalogClient` 是对账引擎唯一依赖的接口; `PrestaShopClient` 为 HTTP 实现,
//! 测试中可替换为内存实现。

pub mod prestashop;
pub mod xml;

use crate::models::ProductId;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;

pub use prestashop::PrestaShopClient;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found in catalog")]
    NotFound,

    /// 非 2xx 响应
    #[error("HTTP {status} on {context}")]
    Status { status: u16, context: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// 商品目录操作
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// 按供应商SKU查找商品ID
    ///
    /// 先按 products.supplier_reference 查询; 未命中且提供了 `supplier_id` 时,
    /// 再按 product_suppliers (供应商引用 + 供应商ID) 查询。返回第一个命中。
    async fn find_product_id(
        &self,
        supplier_sku: &str,
        supplier_id: Option<&str>,
    ) -> Result<ProductId, CatalogError>;

    /// 更新商品售价 (取回完整商品 -> 去掉只读字段 -> 替换价格 -> 回写)
    async fn update_price(&self, product_id: &ProductId, price: &BigDecimal) -> Result<(), CatalogError>;
}
