//! crates/storynest_core/src/content.rs
//!
//! Converts between a story's in-memory ordered page sequence and the single
//! JSON text blob persisted in the `stories.content` column, and validates
//! that blob on the way back in.
//!
//! The codec is strict: anything other than an array of page objects is
//! rejected with a `ContentFormatError`. A bare string standing in place of a
//! page is corruption, not something to paper over by wrapping it in a page.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One ordered unit of a story's content. A page may carry text, an image
/// reference, or both. Position within the sequence is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Page {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentFormatError {
    #[error("content blob is not valid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("content blob is not a sequence")]
    NotASequence,
    #[error("page {index} is not a well-formed page record: {reason}")]
    InvalidPage { index: usize, reason: String },
}

/// Encodes an ordered page sequence as a JSON array, omitting absent fields.
/// Lossless: `deserialize_pages(&serialize_pages(pages)) == pages`.
pub fn serialize_pages(pages: &[Page]) -> String {
    let items: Vec<Value> = pages
        .iter()
        .map(|page| {
            let mut record = Map::new();
            if let Some(text) = &page.text {
                record.insert("text".to_string(), Value::String(text.clone()));
            }
            if let Some(image) = &page.image {
                record.insert("image".to_string(), Value::String(image.clone()));
            }
            Value::Object(record)
        })
        .collect();
    Value::Array(items).to_string()
}

/// Decodes a persisted content blob back into its page sequence.
///
/// An empty (or all-whitespace) blob is an empty sequence, not an error.
pub fn deserialize_pages(blob: &str) -> Result<Vec<Page>, ContentFormatError> {
    if blob.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(blob)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(ContentFormatError::NotASequence),
    };

    let mut pages = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        pages.push(page_from_value(index, item)?);
    }
    Ok(pages)
}

fn page_from_value(index: usize, value: Value) -> Result<Page, ContentFormatError> {
    let record = match value {
        Value::Object(record) => record,
        other => {
            return Err(ContentFormatError::InvalidPage {
                index,
                reason: format!("expected a page object, found {}", value_kind(&other)),
            })
        }
    };

    let mut page = Page {
        text: None,
        image: None,
    };
    for (key, field) in record {
        let slot = match key.as_str() {
            "text" => &mut page.text,
            "image" => &mut page.image,
            other => {
                return Err(ContentFormatError::InvalidPage {
                    index,
                    reason: format!("unknown field `{other}`"),
                })
            }
        };
        *slot = match field {
            Value::String(s) => Some(s),
            // A stored null is the same as an omitted field.
            Value::Null => None,
            other => {
                return Err(ContentFormatError::InvalidPage {
                    index,
                    reason: format!("field `{key}` must be a string, found {}", value_kind(&other)),
                })
            }
        };
    }
    Ok(page)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pages() -> Vec<Page> {
        vec![
            Page::text("A"),
            Page {
                text: None,
                image: Some("x.png".to_string()),
            },
            Page {
                text: Some("B".to_string()),
                image: Some("y.png".to_string()),
            },
        ]
    }

    #[test]
    fn round_trip_preserves_pages_and_order() {
        let pages = sample_pages();
        let blob = serialize_pages(&pages);
        assert_eq!(deserialize_pages(&blob).unwrap(), pages);
    }

    #[test]
    fn absent_fields_are_omitted_from_the_blob() {
        let blob = serialize_pages(&[Page::text("A")]);
        assert_eq!(blob, r#"[{"text":"A"}]"#);
    }

    #[test]
    fn empty_blob_is_an_empty_sequence() {
        assert_eq!(deserialize_pages("").unwrap(), Vec::<Page>::new());
        assert_eq!(deserialize_pages("  \n").unwrap(), Vec::<Page>::new());
        assert_eq!(deserialize_pages("[]").unwrap(), Vec::<Page>::new());
    }

    #[test]
    fn malformed_json_is_a_syntax_error() {
        assert!(matches!(
            deserialize_pages("{not a list}"),
            Err(ContentFormatError::Syntax(_))
        ));
    }

    #[test]
    fn non_sequence_top_level_is_rejected() {
        assert!(matches!(
            deserialize_pages(r#"{"text":"A"}"#),
            Err(ContentFormatError::NotASequence)
        ));
        assert!(matches!(
            deserialize_pages(r#""just a string""#),
            Err(ContentFormatError::NotASequence)
        ));
    }

    #[test]
    fn scalar_elements_are_rejected_not_coerced() {
        assert!(matches!(
            deserialize_pages("[1,2,3]"),
            Err(ContentFormatError::InvalidPage { index: 0, .. })
        ));
        assert!(matches!(
            deserialize_pages(r#"[{"text":"ok"},"bare string"]"#),
            Err(ContentFormatError::InvalidPage { index: 1, .. })
        ));
    }

    #[test]
    fn unknown_page_fields_are_rejected() {
        assert!(matches!(
            deserialize_pages(r#"[{"text":"A","image_prompt":"a fox"}]"#),
            Err(ContentFormatError::InvalidPage { index: 0, .. })
        ));
    }

    #[test]
    fn non_string_field_values_are_rejected() {
        assert!(matches!(
            deserialize_pages(r#"[{"text":42}]"#),
            Err(ContentFormatError::InvalidPage { index: 0, .. })
        ));
    }

    #[test]
    fn null_fields_read_back_as_absent() {
        let pages = deserialize_pages(r#"[{"text":"A","image":null}]"#).unwrap();
        assert_eq!(pages, vec![Page::text("A")]);
    }

    #[test]
    fn pages_with_neither_field_survive_the_round_trip() {
        let pages = vec![Page {
            text: None,
            image: None,
        }];
        assert_eq!(deserialize_pages(&serialize_pages(&pages)).unwrap(), pages);
    }
}
