//! Product Catalog
//!
//! Static in-memory catalog standing in for a product database. Read-only
//! after startup; safe to share across sessions without locking.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// A catalog product
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub brand: String,
    pub category: String,
    /// Price in USD
    pub price: u32,
    pub in_stock: bool,
}

/// Search response returned to the agent
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProductSearchResponse {
    pub message: String,
    pub products: Vec<Product>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
}

static CATALOG: LazyLock<Vec<Product>> = LazyLock::new(|| {
    let entries: [(u32, &str, &str, &str, u32, bool); 10] = [
        (1, "Dell XPS 13 Laptop", "Dell", "Electronics", 1500, true),
        (2, "iPhone 15 Pro", "Apple", "Electronics", 1200, false),
        (3, "Keychron K2 Mechanical Keyboard", "Keychron", "Accessories", 90, true),
        (4, "Sihoo Ergonomic Chair", "Sihoo", "Furniture", 250, true),
        (5, "Sony WH-1000XM5 Headphones", "Sony", "Audio", 400, false),
        (6, "AirPods Pro 2", "Apple", "Audio", 250, true),
        (7, "ThinkPad X1 Carbon", "Lenovo", "Electronics", 1600, true),
        (8, "Logitech G Pro X Headset", "Logitech", "Gaming", 130, true),
        (9, "Herman Miller Aeron Chair", "Herman Miller", "Furniture", 1500, false),
        (10, "Canon EOS R5 Camera", "Canon", "Photography", 3900, true),
    ];

    entries
        .into_iter()
        .map(|(id, name, brand, category, price, in_stock)| Product {
            id,
            name: name.into(),
            brand: brand.into(),
            category: category.into(),
            price,
            in_stock,
        })
        .collect()
});

/// All products
pub fn all() -> &'static [Product] {
    &CATALOG
}

/// Case-insensitive substring search across name, brand, and category.
///
/// Zero matches deliberately fall back to the full catalog with a
/// "not found" message, so the model can still offer alternatives.
pub fn search(query: &str) -> ProductSearchResponse {
    let needle = query.to_lowercase();

    let matched: Vec<Product> = CATALOG
        .iter()
        .filter(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.brand.to_lowercase().contains(&needle)
                || p.category.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        return ProductSearchResponse {
            message: format!(
                "No products matched '{}'. Showing the full catalog instead:",
                query
            ),
            products: CATALOG.clone(),
            total: CATALOG.len(),
            search_query: Some(query.to_string()),
        };
    }

    ProductSearchResponse {
        message: format!("Found {} product(s) matching '{}':", matched.len(), query),
        total: matched.len(),
        products: matched,
        search_query: Some(query.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let response = search("APPLE");
        assert_eq!(response.total, 2);
        assert!(response.products.iter().all(|p| p.brand == "Apple"));
    }

    #[test]
    fn test_category_match() {
        let response = search("furniture");
        assert_eq!(response.total, 2);
    }

    #[test]
    fn test_zero_match_returns_full_catalog() {
        let response = search("zzz-nonexistent");
        assert_eq!(response.total, all().len());
        assert_eq!(response.products.len(), all().len());
        assert!(response.message.contains("No products matched"));
    }

    #[test]
    fn test_search_is_idempotent() {
        let a = serde_json::to_value(search("sony")).unwrap();
        let b = serde_json::to_value(search("sony")).unwrap();
        assert_eq!(a, b);
    }
}
