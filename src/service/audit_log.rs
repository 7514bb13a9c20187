use crate::error::AppError;
use crate::models::{OutcomeStatus, RunReport};
use crate::service::pricing::round_price;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// 在 `dir` 下新建文件, 不覆盖已有文件 (同名时追加 `_1`, `_2`, ...)
pub fn create_new_file(dir: &Path, stem: &str, extension: &str) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(dir)?;
    for attempt in 0u32..1000 {
        let name = if attempt == 0 {
            format!("{}.{}", stem, extension)
        } else {
            format!("{}_{}.{}", stem, attempt, extension)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free file name for {} in {}", stem, dir.display()),
    ))
}

/// 生成运行日志文本 (确定性, 按结果顺序)
pub fn render_log(report: &RunReport) -> String {
    let mut lines = Vec::with_capacity(report.outcomes.len() + 6);
    lines.push(format!(
        "=== Price update {} ===",
        report.started_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(format!("Rows: {}, Margin: {}%", report.summary.total, report.margin));
    lines.push(String::new());

    for outcome in &report.outcomes {
        let line = match &outcome.status {
            OutcomeStatus::Updated { product_id, price } => {
                format!("✓ UPDATED {}: {} (product {})", outcome.supplier_sku, round_price(price), product_id)
            }
            OutcomeStatus::Skipped { reason } => format!("⏭ SKIPPED {}: {}", outcome.supplier_sku, reason),
            OutcomeStatus::Failed { reason } => format!("✗ FAILED {}: {}", outcome.supplier_sku, reason),
        };
        lines.push(line);
    }

    lines.push(String::new());
    if report.summary.cancelled {
        lines.push(format!(
            "Cancelled after {}/{} rows",
            report.summary.processed, report.summary.total
        ));
    }
    lines.push(format!(
        "Updated: {}, Skipped: {}, Errors: {}",
        report.summary.updated, report.summary.skipped, report.summary.errors
    ));
    lines.join("\n") + "\n"
}

/// 写入 `price_update_<时间戳>.log`; 每次运行一个新文件
pub fn write_log(dir: &Path, report: &RunReport) -> Result<PathBuf, AppError> {
    let stem = format!("price_update_{}", report.started_at.format("%Y%m%d_%H%M%S"));
    let (path, mut file) = create_new_file(dir, &stem, "log")?;
    file.write_all(render_log(report).as_bytes())?;
    file.sync_all()?;
    tracing::info!("Run log written to {}", path.display());
    Ok(path)
}

/// 在阻塞线程池上写日志, 不占用运行时线程
pub async fn persist_log(dir: PathBuf, report: RunReport) -> Result<PathBuf, AppError> {
    tokio::task::spawn_blocking(move || write_log(&dir, &report))
        .await
        .map_err(|e| AppError::Persistence(io::Error::new(io::ErrorKind::Other, e.to_string())))?
}
