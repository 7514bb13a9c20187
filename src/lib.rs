pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use catalog::{CatalogClient, CatalogError, PrestaShopClient};
pub use config::AppConfig;
pub use db::create_pool;
pub use error::{AppError, AppResult};
pub use service::ReconcileEngine;
