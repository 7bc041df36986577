//! Markup to plain text

use scraper::{ElementRef, Html, Node};

/// Elements whose text is never part of the readable description
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "template"];

/// Elements that break the text flow; inline elements join their neighbours
const BLOCK_ELEMENTS: [&str; 26] = [
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section", "table", "td", "th", "tr",
];

/// Converts description markup to single-spaced plain text
///
/// Tags are dropped and entities decoded by the HTML parser. Block-level
/// elements are separated by a space, so `<li>a</li><li>b</li>` reads as
/// `a b`, while inline markup such as `6<sup>th</sup>` reads as `6th`.
pub fn normalize(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut text = String::with_capacity(markup.len());
    collect_text(fragment.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(piece) => out.push_str(piece),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push(' ');
                }
                collect_text(child, out);
                if block {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Collapses runs of whitespace, including non-breaking spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
