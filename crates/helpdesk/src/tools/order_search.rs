//! Order search tool

use async_trait::async_trait;

use chat_core::error::Result;
use chat_core::tool::{Tool, ToolResult, ToolSchema};

use crate::catalog::orders;

/// Looks up orders by id, customer name, email, or status.
pub struct OrderSearchTool;

#[async_trait]
impl Tool for OrderSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "order_search".into(),
            description: "Search customer orders by order id (ORD-YYYY-NNN), customer name, \
                          email, or delivery status. Use this for order and shipping questions."
                .into(),
            query_description: "Order id, customer name, email, or status to look up".into(),
        }
    }

    async fn execute(&self, query: &str) -> Result<ToolResult> {
        let response = orders::search(query);
        let summary = response.message.clone();
        let data = serde_json::to_value(&response)?;

        Ok(ToolResult::success("order_search", summary).with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exact_order_id_returns_single_result() {
        let result = OrderSearchTool.execute("ORD-2024-001").await.unwrap();
        assert!(result.success);

        let data = result.data.unwrap();
        assert_eq!(data["total"], 1);
        assert_eq!(data["exact_match"], true);
        assert_eq!(data["orders"][0]["order_id"], "ORD-2024-001");
    }

    #[tokio::test]
    async fn test_status_query() {
        let result = OrderSearchTool.execute("shipping").await.unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["total"], 2);
    }
}
