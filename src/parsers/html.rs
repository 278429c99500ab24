use crate::error::{CrawlError, Result};
use scraper::{Html, Selector};

/// Compile a CSS selector, keeping the source text in the error
pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Parse a full HTML document
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Values of `attr` on every element matching `selector`, in document order.
/// Elements without the attribute are skipped.
pub fn attr_values(doc: &Html, selector: &Selector, attr: &str) -> Vec<String> {
    let values = doc
        .select(selector)
        .filter_map(|e| e.value().attr(attr))
        .map(|s| s.to_string())
        .collect::<Vec<String>>();

    ::log::debug!("HTML parser found {} '{}' attributes", values.len(), attr);
    values
}

/// First text node beneath any element matching `selector`, in document order.
/// An empty first match falls through to the next one.
pub fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .flat_map(|e| e.text())
        .next()
        .map(|s| s.to_string())
}

/// Every text node beneath every element matching `selector`, in document order
pub fn all_text(doc: &Html, selector: &Selector) -> Vec<String> {
    doc.select(selector)
        .flat_map(|e| e.text())
        .map(|s| s.to_string())
        .collect()
}
