//! 内存版 PrestaShop Webservice, 绑定在 127.0.0.1 随机端口
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use price_sync_rust::config::ShopConfig;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "TESTKEY";
/// base64("TESTKEY:")
const EXPECTED_AUTH: &str = "Basic VEVTVEtFWTo=";

#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Default)]
pub struct MockShop {
    pub by_reference: HashMap<String, String>,
    pub by_supplier: HashMap<(String, String), String>,
    pub rejected: HashSet<String>,
    pub requests: Mutex<Vec<Recorded>>,
    pub posted: Mutex<HashMap<String, String>>,
}

impl MockShop {
    pub fn with_products(products: &[(&str, &str)]) -> Self {
        Self {
            by_reference: products.iter().map(|(s, i)| (s.to_string(), i.to_string())).collect(),
            ..Self::default()
        }
    }

    fn record(&self, method: &'static str, path: &str, query: &HashMap<String, String>) {
        self.requests.lock().unwrap().push(Recorded {
            method,
            path: path.to_string(),
            query: query.clone(),
        });
    }

    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn posted_body(&self, id: &str) -> Option<String> {
        self.posted.lock().unwrap().get(id).cloned()
    }
}

pub fn product_xml(id: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<prestashop xmlns:xlink="http://www.w3.org/1999/xlink">
<product>
	<id><![CDATA[{id}]]></id>
	<manufacturer_name not_filterable="true"><![CDATA[Acme]]></manufacturer_name>
	<quantity not_filterable="true"><![CDATA[3]]></quantity>
	<type><![CDATA[simple]]></type>
	<reference><![CDATA[REF-{id}]]></reference>
	<price><![CDATA[9.500000]]></price>
	<position_in_category><![CDATA[1]]></position_in_category>
	<date_add><![CDATA[2024-01-01 10:00:00]]></date_add>
	<date_upd><![CDATA[2024-02-01 10:00:00]]></date_upd>
	<associations><categories><category><id>2</id></category></categories></associations>
</product>
</prestashop>"#
    )
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(EXPECTED_AUTH)
}

async fn list_products(
    State(shop): State<Arc<MockShop>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    shop.record("GET", "products", &query);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    let found = query
        .get("filter[supplier_reference]")
        .and_then(|sku| shop.by_reference.get(sku));
    let body = match found {
        Some(id) => format!(
            "<?xml version=\"1.0\"?><prestashop><products><product><id><![CDATA[{id}]]></id>\
             <reference><![CDATA[REF-{id}]]></reference></product></products></prestashop>"
        ),
        None => "<?xml version=\"1.0\"?><prestashop><products></products></prestashop>".to_string(),
    };
    (StatusCode::OK, body)
}

async fn list_product_suppliers(
    State(shop): State<Arc<MockShop>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    shop.record("GET", "product_suppliers", &query);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    let key = (
        query.get("filter[product_supplier_reference]").cloned().unwrap_or_default(),
        query.get("filter[id_supplier]").cloned().unwrap_or_default(),
    );
    let body = match shop.by_supplier.get(&key) {
        Some(id) => format!(
            "<prestashop><product_suppliers><product_supplier><id>1</id>\
             <id_product><![CDATA[{id}]]></id_product></product_supplier></product_suppliers></prestashop>"
        ),
        None => "<prestashop><product_suppliers/></prestashop>".to_string(),
    };
    (StatusCode::OK, body)
}

fn known(shop: &MockShop, id: &str) -> bool {
    shop.by_reference.values().any(|v| v == id) || shop.by_supplier.values().any(|v| v == id)
}

async fn get_product(
    State(shop): State<Arc<MockShop>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, String) {
    shop.record("GET", &format!("products/{}", id), &HashMap::new());
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    if !known(&shop, &id) {
        return (StatusCode::NOT_FOUND, String::new());
    }
    (StatusCode::OK, product_xml(&id))
}

async fn update_product(
    State(shop): State<Arc<MockShop>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> (StatusCode, String) {
    shop.record("POST", &format!("products/{}", id), &query);
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, String::new());
    }
    // 没有 ps_method=PUT 的 POST 在 PrestaShop 中是创建
    if query.get("ps_method").map(String::as_str) != Some("PUT") {
        return (StatusCode::BAD_REQUEST, String::new());
    }
    if shop.rejected.contains(&id) {
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    shop.posted.lock().unwrap().insert(id, body.clone());
    (StatusCode::OK, body)
}

/// 启动模拟商店, 返回商店根 URL; 未注册 PUT 路由 (模拟被拦截)
pub async fn spawn_shop(shop: Arc<MockShop>) -> String {
    let app = Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/:id", get(get_product).post(update_product))
        .route("/api/product_suppliers", get(list_product_suppliers))
        .with_state(shop);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn shop_config(url: &str) -> ShopConfig {
    ShopConfig {
        url: url.to_string(),
        api_key: API_KEY.to_string(),
        supplier_id: None,
        timeout_secs: 5,
    }
}
