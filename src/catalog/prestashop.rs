use crate::catalog::xml::{first_child_text, rewrite_product_for_update};
use crate::catalog::{CatalogClient, CatalogError};
use crate::config::ShopConfig;
use crate::error::AppError;
use crate::models::ProductId;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 PrestaShop Price Manager";

/// PrestaShop Webservice 客户端
///
/// 部分主机 (OVH, o2switch 等) 在 Web 服务器层拦截 PUT,
/// 因此更新一律以 `POST /api/products/{id}?ps_method=PUT` 发送。
/// 连接在多次调用间复用; 不做重试。
#[derive(Debug, Clone)]
pub struct PrestaShopClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl PrestaShopClient {
    pub fn new(shop: &ShopConfig) -> Result<Self, AppError> {
        shop.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(shop.timeout_secs.max(1)))
            .build()
            .map_err(|e| AppError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: format!("{}/api", shop.url.trim().trim_end_matches('/')),
            api_key: shop.api_key.trim().to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// HTTP Basic: API key 作用户名, 密码为空
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.api_key, Some(""))
    }

    async fn get_xml(&self, path: &str, query: &[(&str, &str)]) -> Result<String, CatalogError> {
        let url = format!("{}/{}", self.api_url, path);
        let response = self.authed(self.http.get(&url).query(query)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                context: format!("GET {}", path),
            });
        }
        Ok(response.text().await?)
    }

    /// 方法1: products.supplier_reference
    async fn lookup_by_product_reference(&self, supplier_sku: &str) -> Result<Option<ProductId>, CatalogError> {
        let xml = self
            .get_xml(
                "products",
                &[
                    ("display", "[id,reference,supplier_reference]"),
                    ("filter[supplier_reference]", supplier_sku),
                ],
            )
            .await?;
        Ok(first_child_text(&xml, "product", "id")?.map(ProductId))
    }

    /// 方法2: product_suppliers (供应商引用 + 供应商ID)
    async fn lookup_by_product_supplier(
        &self,
        supplier_sku: &str,
        supplier_id: &str,
    ) -> Result<Option<ProductId>, CatalogError> {
        let xml = self
            .get_xml(
                "product_suppliers",
                &[
                    ("display", "[id,id_product,product_supplier_reference]"),
                    ("filter[product_supplier_reference]", supplier_sku),
                    ("filter[id_supplier]", supplier_id),
                ],
            )
            .await?;
        Ok(first_child_text(&xml, "product_supplier", "id_product")?.map(ProductId))
    }
}

#[async_trait]
impl CatalogClient for PrestaShopClient {
    async fn find_product_id(
        &self,
        supplier_sku: &str,
        supplier_id: Option<&str>,
    ) -> Result<ProductId, CatalogError> {
        let mut last_error = None;

        match self.lookup_by_product_reference(supplier_sku).await {
            Ok(Some(id)) => {
                tracing::debug!("{} -> product {} (supplier_reference)", supplier_sku, id);
                return Ok(id);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Lookup of {} in products failed: {}", supplier_sku, e);
                last_error = Some(e);
            }
        }

        if let Some(supplier_id) = supplier_id {
            match self.lookup_by_product_supplier(supplier_sku, supplier_id).await {
                Ok(Some(id)) => {
                    tracing::debug!("{} -> product {} (product_suppliers)", supplier_sku, id);
                    return Ok(id);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Lookup of {} in product_suppliers failed: {}", supplier_sku, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(CatalogError::NotFound))
    }

    async fn update_price(&self, product_id: &ProductId, price: &BigDecimal) -> Result<(), CatalogError> {
        let path = format!("products/{}", product_id);
        let current = self.get_xml(&path, &[]).await?;

        let body = rewrite_product_for_update(&current, &price.to_string())?;

        let url = format!("{}/{}", self.api_url, path);
        let response = self
            .authed(self.http.post(&url).query(&[("ps_method", "PUT")]))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                context: format!("POST {}?ps_method=PUT", path),
            });
        }
        tracing::debug!("Product {} price set to {}", product_id, price);
        Ok(())
    }
}
