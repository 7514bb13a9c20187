use crate::error::AppError;
use crate::models::PricedRow;
use bigdecimal::{BigDecimal, Zero};
use rayon::prelude::*;
use std::str::FromStr;

/// 售价保留的小数位
pub const PRICE_SCALE: i64 = 3;

/// 四舍五入到 3 位小数
pub fn round_price(value: &BigDecimal) -> BigDecimal {
    value.round(PRICE_SCALE).with_scale(PRICE_SCALE)
}

/// 售价 = round(采购价 * (1 + 利润率/100), 3)
pub fn derive_price(purchase_price: &BigDecimal, margin_percent: &BigDecimal) -> BigDecimal {
    let factor = BigDecimal::from(1) + margin_percent.clone() / BigDecimal::from(100);
    round_price(&(purchase_price.clone() * factor))
}

/// 解析人工输入的价格, `.` 和 `,` 都可作小数点
pub fn parse_price(input: &str) -> Result<BigDecimal, AppError> {
    let normalized = input.trim().replace(',', ".");
    let value = BigDecimal::from_str(&normalized).map_err(|_| AppError::InvalidPrice(input.to_string()))?;
    if value < BigDecimal::zero() {
        return Err(AppError::InvalidPrice(input.to_string()));
    }
    Ok(value)
}

/// f64 按其最短十进制表示转换, 避免二进制误差 (12.5 -> "12.5")
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

/// 校验利润率 (非负有限数)
pub fn parse_margin(margin_percent: f64) -> Result<BigDecimal, AppError> {
    match decimal_from_f64(margin_percent) {
        Some(m) if m >= BigDecimal::zero() => Ok(m),
        _ => Err(AppError::InvalidMargin(margin_percent.to_string())),
    }
}

/// 重新应用利润率: 覆盖所有行的计算价, 人工价保持不变
pub fn apply_margin(rows: &mut [PricedRow], margin_percent: &BigDecimal) {
    rows.par_iter_mut().for_each(|r| {
        r.derived_price = derive_price(&r.row.purchase_price, margin_percent);
    });

    let overridden = rows.iter().filter(|r| r.override_price.is_some()).count();
    tracing::info!(
        "Margin {}% applied to {} rows ({} manual prices kept)",
        margin_percent,
        rows.len(),
        overridden
    );
}

/// 设置人工售价; 输入非法时行保持不变
pub fn set_override(row: &mut PricedRow, input: &str) -> Result<BigDecimal, AppError> {
    let price = round_price(&parse_price(input)?);
    tracing::debug!("Manual price for {}: {}", row.sku(), price);
    row.override_price = Some(price.clone());
    Ok(price)
}

/// 清除人工售价, 恢复为计算价
pub fn clear_override(row: &mut PricedRow) {
    row.override_price = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SupplierRow;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn row(index: usize, sku: &str, price: &str) -> PricedRow {
        PricedRow::new(
            index,
            SupplierRow {
                supplier_sku: sku.to_string(),
                purchase_price: dec(price),
                group: String::new(),
                article: String::new(),
                manufacturer: String::new(),
                availability: None,
            },
            BigDecimal::zero(),
        )
    }

    #[test]
    fn derive_price_applies_margin_and_rounds_to_three_places() {
        assert_eq!(derive_price(&dec("10"), &dec("10")), dec("11"));
        assert_eq!(derive_price(&dec("10"), &dec("10")).to_string(), "11.000");
        assert_eq!(derive_price(&dec("1.2345"), &dec("0")), dec("1.235"));
        assert_eq!(derive_price(&dec("3.333"), &dec("12.5")), dec("3.750"));
        assert_eq!(derive_price(&dec("0"), &dec("25")), dec("0"));
    }

    #[test]
    fn parse_price_accepts_both_separators() {
        assert_eq!(parse_price("12,5").unwrap(), parse_price("12.5").unwrap());
        assert_eq!(parse_price(" 12.5 ").unwrap(), dec("12.5"));
    }

    #[test]
    fn parse_price_rejects_negative_and_garbage() {
        assert!(matches!(parse_price("-1"), Err(AppError::InvalidPrice(_))));
        assert!(matches!(parse_price("abc"), Err(AppError::InvalidPrice(_))));
        assert!(matches!(parse_price(""), Err(AppError::InvalidPrice(_))));
    }

    #[test]
    fn set_override_leaves_row_untouched_on_invalid_input() {
        let mut r = row(0, "A1", "10");
        set_override(&mut r, "15").unwrap();
        assert!(set_override(&mut r, "-3").is_err());
        assert!(set_override(&mut r, "n/a").is_err());
        assert_eq!(r.override_price, Some(dec("15")));
    }

    #[test]
    fn effective_price_prefers_override() {
        let mut r = row(0, "A1", "10");
        apply_margin(std::slice::from_mut(&mut r), &dec("10"));
        assert_eq!(r.effective_price(), &dec("11"));

        set_override(&mut r, "12,5").unwrap();
        assert_eq!(r.effective_price(), &dec("12.5"));

        clear_override(&mut r);
        assert_eq!(r.effective_price(), &dec("11"));
    }

    #[test]
    fn reapplying_margin_only_moves_rows_without_override() {
        let mut rows = vec![row(0, "A1", "10"), row(1, "A2", "20"), row(2, "A3", "30")];
        apply_margin(&mut rows, &dec("10"));
        set_override(&mut rows[1], "99").unwrap();

        apply_margin(&mut rows, &dec("20"));

        let prices: Vec<_> = rows.iter().map(|r| r.effective_price().clone()).collect();
        assert_eq!(prices, vec![dec("12"), dec("99"), dec("36")]);
        // 计算价仍然更新, 只是被人工价遮盖
        assert_eq!(rows[1].derived_price, dec("24"));
    }

    #[test]
    fn margin_from_float_keeps_decimal_digits() {
        assert_eq!(parse_margin(12.5).unwrap(), dec("12.5"));
        assert!(parse_margin(-1.0).is_err());
        assert!(parse_margin(f64::NAN).is_err());
    }
}
