//! Flattening of heterogeneous provider output into candidate image URLs.

use serde_json::Value;

/// Object keys that may hold an image URL or a nested collection of them, in lookup order.
pub const URL_KEYS: [&str; 5] = ["url", "image", "output", "images", "data"];

const MAX_DEPTH: usize = 16;

/// Collects every candidate URL string found in `value`. Unknown shapes yield nothing.
pub fn extract_urls(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect(value, 0, &mut out);
    out
}

/// First non-empty candidate URL in `value`, if any.
pub fn first_url(value: &Value) -> Option<String> {
    extract_urls(value).into_iter().next()
}

fn collect(value: &Value, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if !trimmed.is_empty() && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, depth + 1, out);
            }
        }
        Value::Object(obj) => {
            for key in URL_KEYS {
                if let Some(inner) = obj.get(key) {
                    collect(inner, depth + 1, out);
                }
            }
        }
        _ => {}
    }
}
