//! Image intent detection
//!
//! Keyword classifier that routes image requests straight to markdown
//! templating, skipping the reasoning loop entirely. Cheap and predictable;
//! anything it misses still reaches the agent, which has the image tool.

const IMAGE_KEYWORDS: &[&str] = &[
    "generate image",
    "generate an image",
    "create an image",
    "create image",
    "make an image",
    "make me an image",
    "draw",
    "image of",
    "picture of",
    "poster",
    "logo",
    "banner",
    "illustration",
];

const INVOICE_KEYWORDS: &[&str] = &["invoice", "bill", "receipt", "order"];

/// What kind of image the user asked for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageIntent {
    /// Freeform image from a prompt
    General,
    /// Invoice rendering for an order
    Invoice,
}

/// Classify a message as an image request, if it is one.
///
/// Invoice intent requires both an invoice keyword and an image keyword, so
/// plain order questions ("where is my order?") still go through the agent.
pub fn detect(text: &str) -> Option<ImageIntent> {
    let lower = text.to_lowercase();

    let wants_image = IMAGE_KEYWORDS.iter().any(|k| lower.contains(k));
    if !wants_image {
        return None;
    }

    let mentions_invoice = INVOICE_KEYWORDS.iter().any(|k| lower.contains(k));
    if mentions_invoice {
        Some(ImageIntent::Invoice)
    } else {
        Some(ImageIntent::General)
    }
}
