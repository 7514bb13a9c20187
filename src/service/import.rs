use crate::config::ColumnConfig;
use crate::error::AppError;
use crate::models::{PriceList, PricedRow, SupplierRow};
use crate::service::pricing::{derive_price, parse_price};
use bigdecimal::{BigDecimal, Zero};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;

/// 列位置
struct ColumnIndex {
    sku: usize,
    price: usize,
    article: Option<usize>,
    manufacturer: Option<usize>,
    availability: Option<usize>,
    group: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, columns: &ColumnConfig) -> Result<Self, AppError> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let mut missing = Vec::new();
        let sku = find(&columns.sku);
        let price = find(&columns.price);
        if sku.is_none() {
            missing.push(columns.sku.clone());
        }
        if price.is_none() {
            missing.push(columns.price.clone());
        }
        match (sku, price) {
            (Some(sku), Some(price)) => Ok(Self {
                sku,
                price,
                article: find(&columns.article),
                manufacturer: find(&columns.manufacturer),
                availability: find(&columns.availability),
                group: find(&columns.group),
            }),
            _ => Err(AppError::MissingColumns(missing)),
        }
    }
}

fn cell(record: &StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i)).unwrap_or_default().to_string()
}

/// 读取供应商价格表 (CSV), 并按当前利润率计算售价
pub fn read_price_list<R: Read>(
    reader: R,
    columns: &ColumnConfig,
    margin_percent: &BigDecimal,
) -> Result<PriceList, AppError> {
    if !columns.delimiter.is_ascii() {
        return Err(AppError::Configuration(format!(
            "columns.delimiter must be an ASCII character, got {:?}",
            columns.delimiter
        )));
    }

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(columns.delimiter as u8)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let idx = ColumnIndex::resolve(&headers, columns)?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();

        let sku = cell(&record, Some(idx.sku));
        if sku.is_empty() {
            dropped += 1;
            tracing::warn!("Line {}: empty supplier SKU, row ignored", line);
            continue;
        }

        let raw_price = cell(&record, Some(idx.price));
        let purchase_price = if raw_price.is_empty() {
            BigDecimal::zero()
        } else {
            parse_price(&raw_price).map_err(|_| AppError::InvalidRow {
                line,
                reason: format!("invalid purchase price {:?} for {}", raw_price, sku),
            })?
        };

        let row = SupplierRow {
            supplier_sku: sku,
            purchase_price,
            group: cell(&record, idx.group),
            article: cell(&record, idx.article),
            manufacturer: cell(&record, idx.manufacturer),
            availability: idx.availability.map(|i| cell(&record, Some(i))),
        };
        let derived = derive_price(&row.purchase_price, margin_percent);
        rows.push(PricedRow::new(rows.len(), row, derived));
    }

    let list = PriceList {
        rows,
        has_group_column: idx.group.is_some(),
        has_availability_column: idx.availability.is_some(),
        available_value: columns.available_value.clone(),
    };

    let stats = list.stats();
    tracing::info!(
        "Price list loaded: {} rows, {} with price, {} dropped",
        stats.total,
        stats.with_price,
        dropped
    );
    Ok(list)
}
