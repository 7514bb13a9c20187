mod common;

use bigdecimal::BigDecimal;
use common::{shop_config, spawn_shop, MockShop};
use price_sync_rust::models::ProductId;
use price_sync_rust::{CatalogClient, CatalogError, PrestaShopClient};
use std::str::FromStr;
use std::sync::Arc;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

async fn client_for(shop: Arc<MockShop>) -> PrestaShopClient {
    let url = spawn_shop(shop).await;
    PrestaShopClient::new(&shop_config(&url)).unwrap()
}

#[tokio::test]
async fn finds_product_by_supplier_reference() {
    let shop = Arc::new(MockShop::with_products(&[("A1", "100")]));
    let client = client_for(shop.clone()).await;

    let id = client.find_product_id("A1", None).await.unwrap();
    assert_eq!(id, ProductId("100".to_string()));

    let lookups = shop.requests_to("products");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].query.get("filter[supplier_reference]").map(String::as_str), Some("A1"));
    assert_eq!(
        lookups[0].query.get("display").map(String::as_str),
        Some("[id,reference,supplier_reference]")
    );
    assert!(shop.requests_to("product_suppliers").is_empty());
}

#[tokio::test]
async fn falls_back_to_product_suppliers_only_with_supplier_id() {
    let mut shop = MockShop::default();
    shop.by_supplier.insert(("B7".to_string(), "3".to_string()), "321".to_string());
    let shop = Arc::new(shop);
    let client = client_for(shop.clone()).await;

    let id = client.find_product_id("B7", Some("3")).await.unwrap();
    assert_eq!(id.0, "321");

    let fallback = shop.requests_to("product_suppliers");
    assert_eq!(fallback.len(), 1);
    assert_eq!(
        fallback[0].query.get("filter[product_supplier_reference]").map(String::as_str),
        Some("B7")
    );
    assert_eq!(fallback[0].query.get("filter[id_supplier]").map(String::as_str), Some("3"));

    // 没有供应商ID时不走第二种查询
    let err = client.find_product_id("B7", None).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound));
    assert_eq!(shop.requests_to("product_suppliers").len(), 1);
}

#[tokio::test]
async fn unknown_sku_is_not_found() {
    let shop = Arc::new(MockShop::with_products(&[("A1", "100")]));
    let client = client_for(shop).await;

    let err = client.find_product_id("ZZZ", Some("3")).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound));
}

#[tokio::test]
async fn rejected_credentials_are_reported_not_swallowed() {
    let shop = Arc::new(MockShop::with_products(&[("A1", "100")]));
    let url = spawn_shop(shop).await;
    let mut cfg = shop_config(&url);
    cfg.api_key = "WRONG".to_string();
    let client = PrestaShopClient::new(&cfg).unwrap();

    let err = client.find_product_id("A1", None).await.unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 401, .. }));
}

#[tokio::test]
async fn update_posts_full_product_with_method_override() {
    let shop = Arc::new(MockShop::with_products(&[("A1", "100")]));
    let client = client_for(shop.clone()).await;

    client
        .update_price(&ProductId("100".to_string()), &dec("11.000"))
        .await
        .unwrap();

    let posts = shop.requests_to("products/100");
    let methods: Vec<&str> = posts.iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["GET", "POST"]);
    assert_eq!(posts[1].query.get("ps_method").map(String::as_str), Some("PUT"));

    let body = shop.posted_body("100").unwrap();
    assert!(body.contains("<price><![CDATA[11.000]]></price>") || body.contains("<price>11.000</price>"));
    assert!(body.contains("REF-100"));
    for field in ["manufacturer_name", "quantity", "position_in_category", "date_add", "date_upd", "associations"] {
        assert!(!body.contains(&format!("<{}", field)), "{} should be stripped", field);
    }
    assert!(!body.contains("<type>"));
}

#[tokio::test]
async fn rejected_update_surfaces_status() {
    let mut shop = MockShop::with_products(&[("A1", "100")]);
    shop.rejected.insert("100".to_string());
    let shop = Arc::new(shop);
    let client = client_for(shop.clone()).await;

    let err = client
        .update_price(&ProductId("100".to_string()), &dec("11.000"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 500, .. }));
    assert!(shop.posted_body("100").is_none());
}

#[tokio::test]
async fn update_of_missing_product_fails_on_fetch() {
    let shop = Arc::new(MockShop::default());
    let client = client_for(shop.clone()).await;

    let err = client
        .update_price(&ProductId("999".to_string()), &dec("5.000"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Status { status: 404, .. }));
    assert!(shop
        .requests_to("products/999")
        .iter()
        .all(|r| r.method == "GET"));
}
