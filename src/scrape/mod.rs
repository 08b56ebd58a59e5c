//! Locates the representative image of an event page.
//!
//! Sources are tried in order and the first non-empty one wins:
//! 1. `og:image` meta tag
//! 2. `twitter:image` meta tag
//! 3. `image` / `thumbnailUrl` in JSON-LD blocks, in document order
//!
//! The returned URL may be relative; resolving it is the caller's job.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

static META_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta").expect("Failed to compile meta selector"));

static JSON_LD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("Failed to compile JSON-LD selector")
});

/// JSON-LD fields that may carry an image, in preference order.
const JSON_LD_IMAGE_FIELDS: [&str; 2] = ["image", "thumbnailUrl"];

/// Candidate image URL for a page, or an empty string.
pub fn locate_image_url(html: &str) -> String {
    let document = Html::parse_document(html);

    meta_image(&document, "og:image")
        .or_else(|| meta_image(&document, "twitter:image"))
        .or_else(|| json_ld_image(&document))
        .unwrap_or_default()
}

/// `content` of the first meta tag keyed `key` through either `property` or `name`.
fn meta_image(document: &Html, key: &str) -> Option<String> {
    document
        .select(&META_SELECTOR)
        .filter(|element| meta_key_matches(element, key))
        .find_map(|element| non_empty(element.attr("content")?))
}

fn meta_key_matches(element: &ElementRef, key: &str) -> bool {
    [element.attr("property"), element.attr("name")]
        .into_iter()
        .flatten()
        .any(|meta_key| meta_key.trim().eq_ignore_ascii_case(key))
}

fn json_ld_image(document: &Html) -> Option<String> {
    document.select(&JSON_LD_SELECTOR).find_map(|element| {
        let json_text = element.text().collect::<String>();
        let json_text = json_text.trim();
        if json_text.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(json_text) {
            Ok(json) => image_from_json_ld(&json),
            Err(err) => {
                log::debug!("skipping malformed JSON-LD block: {err}");
                None
            }
        }
    })
}

/// Search a JSON-LD node for an image, descending into top-level arrays and `@graph`.
fn image_from_json_ld(node: &Value) -> Option<String> {
    match node {
        Value::Array(items) => items.iter().find_map(image_from_json_ld),
        Value::Object(map) => map
            .get("@graph")
            .and_then(image_from_json_ld)
            .or_else(|| {
                JSON_LD_IMAGE_FIELDS
                    .iter()
                    .filter_map(|field| map.get(*field))
                    .find_map(|value| ImageField::classify(value).url())
            }),
        _ => None,
    }
}

/// Shapes an `image`-like JSON-LD field comes in.
enum ImageField<'a> {
    Url(&'a str),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
    Unusable,
}

impl<'a> ImageField<'a> {
    fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(url) => ImageField::Url(url.as_str()),
            Value::Array(items) => ImageField::List(items.as_slice()),
            Value::Object(map) => ImageField::Object(map),
            _ => ImageField::Unusable,
        }
    }

    fn url(self) -> Option<String> {
        match self {
            ImageField::Url(url) => non_empty(url),
            // first string element wins; objects with `url` only as a fallback
            ImageField::List(items) => items
                .iter()
                .find_map(|item| item.as_str().and_then(non_empty))
                .or_else(|| items.iter().find_map(|item| object_url(item.as_object()?))),
            ImageField::Object(map) => object_url(map),
            ImageField::Unusable => None,
        }
    }
}

fn object_url(map: &Map<String, Value>) -> Option<String> {
    map.get("url").and_then(Value::as_str).and_then(non_empty)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
