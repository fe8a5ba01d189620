pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod dashboard_service;
pub mod gemstone_service;
pub mod image_service;
pub mod import_service;
pub mod liquidation_service;
pub mod order_service;
pub mod product_service;
pub mod supplier_service;
pub mod user_service;

/// ILIKE pattern matching `search` anywhere, with its own wildcards taken literally.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(contains_pattern("ruby"), "%ruby%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern(r"c:\d"), r"%c:\\d%");
    }
}
