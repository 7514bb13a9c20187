use crate::db::sql_script::SqlScript;
use crate::error::AppError;
use sqlx::MySqlPool;
use std::time::{Duration, Instant};

/// 在一个事务中执行脚本中的全部语句, 返回影响行数
pub async fn apply_script(pool: &MySqlPool, script: &SqlScript) -> Result<u64, AppError> {
    tracing::info!("Applying SQL script: {} statements", script.statements.len());
    let start = Instant::now();

    let run = async {
        let mut tx = pool.begin().await?;
        let mut affected = 0u64;
        for statement in &script.statements {
            affected += sqlx::query(statement.as_str()).execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok::<u64, sqlx::Error>(affected)
    };

    // 超时控制: 30秒
    match tokio::time::timeout(Duration::from_secs(30), run).await {
        Ok(Ok(affected)) => {
            tracing::info!("✓ SQL script applied, {} rows affected, took {:?}", affected, start.elapsed());
            Ok(affected)
        }
        Ok(Err(e)) => {
            tracing::error!("✗ SQL script failed after {:?}: {:?}", start.elapsed(), e);
            Err(AppError::Database(e))
        }
        Err(_) => {
            tracing::error!("✗ SQL script timed out (>30s), transaction rolled back");
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
    }
}
