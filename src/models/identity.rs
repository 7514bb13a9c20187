use crate::models::ProductId;
use indexmap::IndexMap;

/// SKU 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ProductId),
    Missing(String), // 未找到或查询失败的原因
}

/// 单次运行内的 SKU -> 商品ID 缓存
///
/// 只在一次运行内有效, 不跨运行持久化, 运行期间不失效。
/// 失败的查询同样缓存, 保证每个 SKU 每次运行最多查询一次。
#[derive(Debug, Default)]
pub struct IdentityCache {
    entries: IndexMap<String, Resolution>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sku: &str) -> Option<&Resolution> {
        self.entries.get(sku)
    }

    pub fn insert(&mut self, sku: &str, resolution: Resolution) {
        self.entries.insert(sku.to_string(), resolution);
    }

    /// 已解析成功的 SKU 数量
    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|r| matches!(r, Resolution::Found(_)))
            .count()
    }
}
