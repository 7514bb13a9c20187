//! PrestaShop XML 处理
//!
//! 列表响应形如 `<prestashop><products><product><id><![CDATA[12]]></id>...`,
//! 单个商品为 `<prestashop><product>...</product></prestashop>`。

use crate::catalog::CatalogError;
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

/// 回写前必须移除的只读/服务端维护字段, 否则 PrestaShop 拒绝写入
pub const READ_ONLY_FIELDS: &[&str] = &[
    "manufacturer_name",
    "quantity",
    "position_in_category",
    "type",
    "date_add",
    "date_upd",
    "associations",
];

fn malformed(e: impl std::fmt::Display) -> CatalogError {
    CatalogError::Malformed(e.to_string())
}

/// 取第一个 `<parent>` 元素下直接子元素 `<child>` 的文本
pub fn first_child_text(xml: &str, parent: &str, child: &str) -> Result<Option<String>, CatalogError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut depth = 0usize;
    let mut parent_depth: Option<usize> = None;
    let mut in_child = false;
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => {
                depth += 1;
                match parent_depth {
                    None if e.name().as_ref() == parent.as_bytes() => parent_depth = Some(depth),
                    Some(d) if depth == d + 1 && e.name().as_ref() == child.as_bytes() => in_child = true,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                // <product_supplier/> 之类的空元素没有子元素
                if parent_depth.is_some_and(|d| depth == d) && e.name().as_ref() == child.as_bytes() {
                    return Ok(None);
                }
            }
            Event::Text(t) if in_child => {
                text.push_str(&t.unescape().map_err(malformed)?);
            }
            Event::CData(c) if in_child => {
                text.push_str(&String::from_utf8_lossy(&c));
            }
            Event::End(_) => {
                if in_child {
                    let value = text.trim();
                    return Ok((!value.is_empty()).then(|| value.to_string()));
                }
                if parent_depth == Some(depth) {
                    // 第一个 parent 结束仍未找到 child
                    return Ok(None);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// 生成回写用的商品 XML: 删除只读字段, 替换 `<price>`
pub fn rewrite_product_for_update(xml: &str, price: &str) -> Result<String, CatalogError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut depth = 0usize;
    let mut product_depth: Option<usize> = None;
    let mut skip = 0usize; // >0 表示正在丢弃某个元素的内容
    let mut closing_price = false;
    let mut price_written = false;

    loop {
        let event = reader.read_event().map_err(malformed)?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                depth += 1;
                if skip > 0 {
                    skip += 1;
                    continue;
                }
                let is_field = product_depth.is_some_and(|d| depth == d + 1);
                let name = e.name();
                if product_depth.is_none() && name.as_ref() == b"product" {
                    product_depth = Some(depth);
                } else if is_field && is_read_only(name.as_ref()) {
                    skip = 1;
                    continue;
                } else if is_field && name.as_ref() == b"price" {
                    writer.write_event(Event::Start(e.clone())).map_err(malformed)?;
                    writer.write_event(Event::Text(BytesText::new(price))).map_err(malformed)?;
                    price_written = true;
                    closing_price = true;
                    skip = 1;
                    continue;
                }
                writer.write_event(Event::Start(e)).map_err(malformed)?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if skip > 0 {
                    skip -= 1;
                    if skip == 0 && closing_price {
                        closing_price = false;
                        writer.write_event(Event::End(e)).map_err(malformed)?;
                    }
                    continue;
                }
                writer.write_event(Event::End(e)).map_err(malformed)?;
            }
            Event::Empty(e) => {
                if skip > 0 {
                    continue;
                }
                let is_field = product_depth.is_some_and(|d| depth == d);
                if is_field && is_read_only(e.name().as_ref()) {
                    continue;
                }
                if is_field && e.name().as_ref() == b"price" {
                    writer.write_event(Event::Start(e.clone())).map_err(malformed)?;
                    writer.write_event(Event::Text(BytesText::new(price))).map_err(malformed)?;
                    writer.write_event(Event::End(e.to_end())).map_err(malformed)?;
                    price_written = true;
                    continue;
                }
                writer.write_event(Event::Empty(e)).map_err(malformed)?;
            }
            other => {
                if skip > 0 {
                    continue;
                }
                writer.write_event(other).map_err(malformed)?;
            }
        }
    }

    if product_depth.is_none() {
        return Err(CatalogError::Malformed("no <product> element".to_string()));
    }
    if !price_written {
        return Err(CatalogError::Malformed("product has no <price> field".to_string()));
    }
    String::from_utf8(writer.into_inner()).map_err(malformed)
}

fn is_read_only(name: &[u8]) -> bool {
    READ_ONLY_FIELDS.iter().any(|f| f.as_bytes() == name)
}
