//! Agent tools wrapping the catalogs, web search, and image generation.

pub mod image;
pub mod order_search;
pub mod product_search;
pub mod web_search;

pub use image::GenerateImageTool;
pub use order_search::OrderSearchTool;
pub use product_search::ProductSearchTool;
pub use web_search::WebSearchTool;

use chat_core::tool::ToolRegistry;

/// Registry with the full support tool set registered.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(WebSearchTool::new());
    registry.register(ProductSearchTool);
    registry.register(OrderSearchTool);
    registry.register(GenerateImageTool);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_all_tools() {
        let registry = default_registry();
        assert_eq!(registry.len(), 4);
        for name in ["web_search", "product_search", "order_search", "generate_image"] {
            assert!(registry.get(name).is_some(), "missing tool {name}");
        }
    }
}
