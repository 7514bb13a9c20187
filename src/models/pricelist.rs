use crate::error::AppError;
use crate::models::PricedRow;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// 商品分组选择
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Groups(HashSet<String>),
}

impl Selection {
    /// `None` 表示全选; 空列表表示什么都不选
    pub fn from_groups(groups: Option<Vec<String>>) -> Self {
        match groups {
            None => Selection::All,
            Some(groups) => Selection::Groups(groups.into_iter().collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceListStats {
    pub total: usize,
    pub with_price: usize,
    pub available: Option<usize>,
}

/// 已加载的供应商价格表
#[derive(Debug, Clone)]
pub struct PriceList {
    pub rows: Vec<PricedRow>,
    pub has_group_column: bool,
    pub has_availability_column: bool,
    pub available_value: String,
}

impl PriceList {
    pub fn row_mut(&mut self, index: usize) -> Result<&mut PricedRow, AppError> {
        self.rows.get_mut(index).ok_or(AppError::UnknownRow(index))
    }

    /// 按分组过滤 (保持原顺序)
    pub fn filter(&self, selection: &Selection) -> Vec<PricedRow> {
        filter_rows(&self.rows, selection, self.has_group_column)
    }

    /// 分组及行数, 按分组名排序
    pub fn group_counts(&self) -> Vec<GroupCount> {
        if !self.has_group_column {
            return Vec::new();
        }
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in &self.rows {
            *counts.entry(r.row.group.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(group, count)| GroupCount {
                group: group.to_string(),
                count,
            })
            .collect()
    }

    pub fn stats(&self) -> PriceListStats {
        let available = self.has_availability_column.then(|| {
            self.rows
                .iter()
                .filter(|r| r.row.availability.as_deref() == Some(self.available_value.as_str()))
                .count()
        });
        PriceListStats {
            total: self.rows.len(),
            with_price: self.rows.iter().filter(|r| r.is_actionable()).count(),
            available,
        }
    }
}

/// 按分组选择过滤行; 没有分组列时忽略选择
pub fn filter_rows(rows: &[PricedRow], selection: &Selection, has_group_column: bool) -> Vec<PricedRow> {
    match selection {
        Selection::Groups(groups) if has_group_column => rows
            .iter()
            .filter(|r| groups.contains(&r.row.group))
            .cloned()
            .collect(),
        _ => rows.to_vec(),
    }
}

/// 只保留采购价 > 0 的行
pub fn actionable_rows(rows: Vec<PricedRow>) -> Vec<PricedRow> {
    rows.into_iter().filter(|r| r.is_actionable()).collect()
}
