//! Product search tool

use async_trait::async_trait;

use chat_core::error::Result;
use chat_core::tool::{Tool, ToolResult, ToolSchema};

use crate::catalog::products;

/// Looks up products in the internal catalog by name, brand, or category.
pub struct ProductSearchTool;

#[async_trait]
impl Tool for ProductSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "product_search".into(),
            description: "Search the internal product catalog by name, brand, or category. \
                          Use this whenever the user asks about products, prices, or stock."
                .into(),
            query_description: "Product name, brand, or category to look up".into(),
        }
    }

    async fn execute(&self, query: &str) -> Result<ToolResult> {
        let response = products::search(query);
        let summary = response.message.clone();
        let data = serde_json::to_value(&response)?;

        Ok(ToolResult::success("product_search", summary).with_data(data))
    }
}
