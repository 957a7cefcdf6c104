//! Image generation tool
//!
//! Produces a markdown image link whose URL carries the url-encoded prompt;
//! the image host renders it on demand. No binary data is ever handled
//! server-side.

use async_trait::async_trait;

use chat_core::error::Result;
use chat_core::tool::{Tool, ToolResult, ToolSchema};

use crate::catalog::orders::{self, Order};

const IMAGE_HOST: &str = "https://image.pollinations.ai/prompt";
const IMAGE_SIZE: u32 = 512;

/// Markdown image link for a general prompt, 512x512.
pub fn general_image_markdown(prompt: &str) -> String {
    let encoded = urlencoding::encode(prompt);
    format!(
        "Here is the image you asked for:\n\n![{}]({}/{}?width={}&height={})",
        prompt, IMAGE_HOST, encoded, IMAGE_SIZE, IMAGE_SIZE
    )
}

/// Markdown invoice for an order id mentioned in the text.
///
/// Renders a plain-text invoice table when the order is found; otherwise a
/// message asking for a valid order id.
pub fn invoice_markdown(text: &str) -> String {
    match orders::find_in_text(text) {
        Some(order) => render_invoice(order),
        None => "I couldn't find an order id in your request. Please include one, \
                 for example: 'create an invoice image for ORD-2024-001'."
            .into(),
    }
}

fn render_invoice(order: &Order) -> String {
    let mut lines = vec![
        format!("**Invoice for {}**\n", order.order_id),
        format!("Customer: {}", order.customer_name),
        format!("Email: {}", order.customer_email),
        format!("Date: {}", order.order_date),
        format!("Status: {}", order.status),
        format!("Payment: {}\n", order.payment_method),
        "| Item | Qty | Price |".into(),
        "|------|-----|-------|".into(),
    ];
    for item in &order.items {
        lines.push(format!(
            "| {} | {} | ${} |",
            item.name, item.quantity, item.price
        ));
    }
    lines.push(format!("\n**Total: ${}**", order.total_amount));
    lines.join("\n")
}

/// Generates images from text prompts via a templated image URL.
pub struct GenerateImageTool;

#[async_trait]
impl Tool for GenerateImageTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "generate_image".into(),
            description: "Generate an image from a text description. Returns a markdown \
                          image link; use it when the user asks for a picture, poster, \
                          logo, or illustration."
                .into(),
            query_description: "Description of the image to generate".into(),
        }
    }

    async fn execute(&self, query: &str) -> Result<ToolResult> {
        Ok(ToolResult::success(
            "generate_image",
            general_image_markdown(query),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_markdown_encodes_prompt() {
        let md = general_image_markdown("a red fox & friends");
        assert!(md.contains("![a red fox & friends]"));
        assert!(md.contains("a%20red%20fox%20%26%20friends"));
        assert!(md.contains("width=512&height=512"));
    }

    #[test]
    fn test_invoice_markdown_with_known_order() {
        let md = invoice_markdown("make an invoice image for ORD-2024-001 please");
        assert!(md.contains("Invoice for ORD-2024-001"));
        assert!(md.contains("Alice Nguyen"));
        assert!(md.contains("**Total: $1750**"));
    }

    #[test]
    fn test_invoice_markdown_without_order_id() {
        let md = invoice_markdown("make me an invoice image");
        assert!(md.contains("couldn't find an order id"));
    }

    #[tokio::test]
    async fn test_tool_returns_markdown() {
        let result = GenerateImageTool.execute("sunset over a lake").await.unwrap();
        assert!(result.success);
        assert!(result.output.starts_with("Here is the image"));
        assert!(result.data.is_none());
    }
}
