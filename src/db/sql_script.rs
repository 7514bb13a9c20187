use crate::error::AppError;
use crate::models::PricedRow;
use crate::service::audit_log::create_new_file;
use crate::service::pricing::round_price;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 供 phpMyAdmin 等手工导入的 SQL 脚本
///
/// 采购价 > 0 的每一行都会生成一条 UPDATE, 不校验该 SKU 是否存在于商店中
/// (与 API 路径跳过未找到 SKU 的行为不同)。
#[derive(Debug, Clone)]
pub struct SqlScript {
    pub generated_at: DateTime<Local>,
    pub supplier_id: u64,
    pub margin: BigDecimal,
    pub row_count: usize,
    pub statements: Vec<String>,
}

impl SqlScript {
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            format!("-- Price update generated {}", self.generated_at.format("%Y-%m-%d %H:%M")),
            format!("-- Margin: {}%", self.margin),
            format!("-- Products: {}", self.row_count),
            format!("-- Supplier ID: {}", self.supplier_id),
            String::new(),
        ];
        if let Some((sync, updates)) = self.statements.split_last() {
            lines.extend(updates.iter().cloned());
            lines.push(String::new());
            lines.push("-- Propagate prices to the per-shop table".to_string());
            lines.push(sync.clone());
        }
        lines.join("\n") + "\n"
    }
}

/// 供应商ID 直接拼入 SQL, 必须是正整数
fn parse_supplier_id(supplier_id: Option<&str>) -> Result<u64, AppError> {
    let raw = supplier_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingSupplierId)?;
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidSupplierId(raw.to_string())),
    }
}

fn check_table_prefix(prefix: &str) -> Result<(), AppError> {
    if prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(AppError::Configuration(format!("invalid table prefix {:?}", prefix)))
    }
}

/// MySQL 字符串字面量转义
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// 生成价格更新脚本: 每行一条 UPDATE, 末尾一条同步到 product_shop 的语句
pub fn generate_sql(
    selected: &[PricedRow],
    supplier_id: Option<&str>,
    margin: &BigDecimal,
    table_prefix: &str,
) -> Result<SqlScript, AppError> {
    if selected.is_empty() {
        return Err(AppError::EmptyBatch("no rows selected"));
    }
    let rows: Vec<&PricedRow> = selected.iter().filter(|r| r.is_actionable()).collect();
    if rows.is_empty() {
        return Err(AppError::EmptyBatch("no rows with a positive purchase price"));
    }
    let supplier_id = parse_supplier_id(supplier_id)?;
    check_table_prefix(table_prefix)?;

    let p = table_prefix;
    let mut statements: Vec<String> = rows
        .iter()
        .map(|r| {
            format!(
                "UPDATE {p}product p\n\
                 JOIN {p}product_supplier ps ON p.id_product = ps.id_product\n\
                 SET p.price = {price}\n\
                 WHERE ps.product_supplier_reference = '{sku}' AND ps.id_supplier = {supplier_id};",
                price = round_price(r.effective_price()),
                sku = escape_sql_string(r.sku()),
            )
        })
        .collect();

    statements.push(format!(
        "UPDATE {p}product_shop psh\n\
         JOIN {p}product p ON psh.id_product = p.id_product\n\
         JOIN {p}product_supplier ps ON p.id_product = ps.id_product\n\
         SET psh.price = p.price\n\
         WHERE ps.id_supplier = {supplier_id};"
    ));

    Ok(SqlScript {
        generated_at: Local::now(),
        supplier_id,
        margin: margin.clone(),
        row_count: rows.len(),
        statements,
    })
}

/// 写入 `update_prices_<时间戳>.sql`, 不覆盖已有文件
pub fn write_script(dir: &Path, script: &SqlScript) -> Result<PathBuf, AppError> {
    let stem = format!("update_prices_{}", script.generated_at.format("%Y%m%d_%H%M%S"));
    let (path, mut file) = create_new_file(dir, &stem, "sql")?;
    file.write_all(script.to_text().as_bytes())?;
    file.sync_all()?;
    tracing::info!("SQL script with {} updates written to {}", script.row_count, path.display());
    Ok(path)
}

/// `write_script` 的异步版本, 在阻塞线程池上执行
pub async fn persist_script(dir: PathBuf, script: SqlScript) -> Result<PathBuf, AppError> {
    tokio::task::spawn_blocking(move || write_script(&dir, &script))
        .await
        .map_err(|e| AppError::Persistence(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?
}
