//! Data models for provider articles, normalized articles and the digest.
//!
//! This module defines the data structures that flow through the pipeline:
//! - [`NewsResponse`] / [`RawArticle`]: payload returned by the news provider
//! - [`NormalizedArticle`]: uniform article shape handed to the summarizer
//! - [`NewsDigest`] / [`SummaryArticle`]: categorized summaries produced by the LLM
//! - [`CategoryIndexResult`] / [`CategoryFilterResult`]: answers to digest queries
//!
//! # Schema Drift
//!
//! Upstream payloads are only loosely shaped. Missing or `null` collections
//! (`results`, `summaries`, `category`) deserialize to empty collections through
//! the accessors in [`lenient`] instead of failing the whole document. Provider
//! text fields with the wrong type never drop the article they belong to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page (or the combined pages) of the news provider response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NewsResponse {
    /// Provider status, `"success"` per page and `"ok"` once combined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Number of results the provider reports (or accumulated results once combined).
    #[serde(rename = "totalResults", default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    /// Articles in provider order.
    #[serde(default, deserialize_with = "lenient::raw_articles")]
    pub results: Vec<RawArticle>,
    /// Pagination token for the next page, if any.
    #[serde(rename = "nextPage", default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

/// An article as returned by the news provider.
///
/// Only the fields the normalizer reads are typed; everything else the provider
/// sends is kept in `extra` so the raw dump written to disk stays complete.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RawArticle {
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_labels")]
    pub category: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub source_name: Option<String>,
    #[serde(rename = "pubDate", default, deserialize_with = "lenient::optional_text")]
    pub pub_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Provider-independent article shape used as summarizer input.
///
/// Fields map 1:1 from [`RawArticle`] by renaming only
/// (`source_name` → `source`, `pubDate` → `date`, `link` → `url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NormalizedArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Vec<String>>,
    pub source: Option<String>,
    /// Provider timestamp, passed through without reparsing.
    pub date: Option<String>,
    pub url: Option<String>,
}

impl From<&RawArticle> for NormalizedArticle {
    fn from(raw: &RawArticle) -> Self {
        Self {
            title: raw.title.clone(),
            description: raw.description.clone(),
            category: raw.category.clone(),
            source: raw.source_name.clone(),
            date: raw.pub_date.clone(),
            url: raw.link.clone(),
        }
    }
}

/// The digest produced by the summarizer for one run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NewsDigest {
    #[serde(default, deserialize_with = "lenient::summaries")]
    pub summaries: Vec<SummaryArticle>,
}

impl NewsDigest {
    /// Build a digest from an already-parsed JSON document.
    ///
    /// An object is read with the tolerant field rules; a bare array is taken
    /// as the `summaries` list itself (models sometimes drop the wrapper).
    /// Any other value yields an empty digest.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => Self {
                summaries: lenient::summaries_from_value(map.remove("summaries")),
            },
            Value::Array(items) => Self {
                summaries: lenient::summaries_from_items(items),
            },
            _ => Self::default(),
        }
    }
}

/// A single summary in the digest.
///
/// `category` is always present once deserialized. All other fields written by
/// the summarizer are opaque and carried through untouched in `content`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SummaryArticle {
    #[serde(default, deserialize_with = "lenient::labels")]
    pub category: Vec<String>,
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl SummaryArticle {
    /// Exact, case-sensitive label membership.
    pub fn has_category(&self, category: &str) -> bool {
        self.category.iter().any(|label| label == category)
    }
}

/// Distinct lowercase category labels found in a digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryIndexResult {
    pub total_categories: usize,
    pub categories: Vec<String>,
}

/// Summaries carrying one requested category label.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CategoryFilterResult {
    pub category: String,
    pub total_articles: usize,
    pub summaries: Vec<SummaryArticle>,
}

/// Default-on-absence deserializers for loosely shaped upstream JSON.
pub(crate) mod lenient {
    use super::{RawArticle, SummaryArticle};
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::warn;

    /// `null`/missing → empty, a lone string → one label, other shapes → empty.
    /// Non-string entries inside a list are dropped.
    fn labels_from_value(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(label) => Some(label),
                    _ => None,
                })
                .collect(),
            Value::String(label) => vec![label],
            _ => Vec::new(),
        }
    }

    pub fn labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.map(labels_from_value).unwrap_or_default())
    }

    /// Like [`labels`] but keeps the difference between "no categories" and an empty list.
    pub fn optional_labels<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(Value::Null) => None,
            Some(other) => Some(labels_from_value(other)),
        })
    }

    /// `null`/missing → `None`. Numbers and booleans keep their JSON text;
    /// arrays and objects carry no usable text and become `None`.
    pub fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            Some(Value::String(text)) => Some(text),
            Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Some(scalar.to_string()),
            _ => None,
        })
    }

    /// Deserialize each object item, dropping (and logging) the ones that still fail.
    fn objects<T: DeserializeOwned>(items: Vec<Value>, kind: &'static str) -> Vec<T> {
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| {
                if !item.is_object() {
                    warn!(index, kind, "Dropping non-object item");
                    return None;
                }
                match serde_json::from_value(item) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!(index, kind, error = %e, "Dropping unreadable item");
                        None
                    }
                }
            })
            .collect()
    }

    pub fn summaries_from_items(items: Vec<Value>) -> Vec<SummaryArticle> {
        objects(items, "summary")
    }

    /// A `summaries` value: a list is read item by item, anything else is empty.
    pub fn summaries_from_value(value: Option<Value>) -> Vec<SummaryArticle> {
        match value {
            Some(Value::Array(items)) => summaries_from_items(items),
            _ => Vec::new(),
        }
    }

    pub fn summaries<'de, D>(deserializer: D) -> Result<Vec<SummaryArticle>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(summaries_from_value(Option::<Value>::deserialize(deserializer)?))
    }

    pub fn raw_articles<'de, D>(deserializer: D) -> Result<Vec<RawArticle>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            Some(Value::Array(items)) => Ok(objects(items, "article")),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_article_renames_into_normalized() {
        let raw: RawArticle = serde_json::from_value(json!({
            "title": "A",
            "description": "desc",
            "category": ["AI", "Tech"],
            "source_name": "X",
            "pubDate": "2024-01-01 10:00:00",
            "link": "u1",
            "creator": ["someone"]
        }))
        .unwrap();

        let article = NormalizedArticle::from(&raw);
        assert_eq!(article.title.as_deref(), Some("A"));
        assert_eq!(article.description.as_deref(), Some("desc"));
        assert_eq!(
            article.category,
            Some(vec!["AI".to_string(), "Tech".to_string()])
        );
        assert_eq!(article.source.as_deref(), Some("X"));
        assert_eq!(article.date.as_deref(), Some("2024-01-01 10:00:00"));
        assert_eq!(article.url.as_deref(), Some("u1"));
        assert_eq!(raw.extra.get("creator"), Some(&json!(["someone"])));
    }

    #[test]
    fn test_missing_raw_fields_become_none() {
        let raw: RawArticle = serde_json::from_value(json!({ "title": null })).unwrap();
        let article = NormalizedArticle::from(&raw);
        assert_eq!(article, NormalizedArticle::default());
    }

    #[test]
    fn test_normalized_article_serializes_renamed_fields() {
        let article = NormalizedArticle {
            title: Some("A".to_string()),
            source: Some("X".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&article).unwrap();
        assert_eq!(value["source"], json!("X"));
        assert_eq!(value["date"], Value::Null);
        assert!(value.get("source_name").is_none());
    }

    #[test]
    fn test_response_without_results_is_empty() {
        let response: NewsResponse = serde_json::from_value(json!({ "status": "success" })).unwrap();
        assert!(response.results.is_empty());
        assert!(response.next_page.is_none());
    }

    #[test]
    fn test_response_reads_next_page() {
        let response: NewsResponse = serde_json::from_value(json!({
            "results": [{ "title": "A" }, "garbage"],
            "nextPage": "abc"
        }))
        .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.next_page.as_deref(), Some("abc"));
    }

    #[test]
    fn test_mistyped_text_field_keeps_article() {
        let response: NewsResponse = serde_json::from_value(json!({
            "results": [
                {"title": "A", "pubDate": 20240101, "link": "u1"},
                {"title": 5, "description": {"html": "<p>"}, "source_name": true, "link": "u2"},
                {"title": "B", "link": "u3"}
            ]
        }))
        .unwrap();
        let articles: Vec<NormalizedArticle> =
            response.results.iter().map(NormalizedArticle::from).collect();

        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title.as_deref(), Some("A"));
        assert_eq!(articles[0].date.as_deref(), Some("20240101"));
        assert_eq!(articles[1].title.as_deref(), Some("5"));
        assert_eq!(articles[1].description, None);
        assert_eq!(articles[1].source.as_deref(), Some("true"));
        assert_eq!(articles[1].url.as_deref(), Some("u2"));
        assert_eq!(articles[2].title.as_deref(), Some("B"));
        assert_eq!(articles[2].date, None);
    }

    #[test]
    fn test_summary_without_category_has_empty_list() {
        let summary: SummaryArticle = serde_json::from_value(json!({ "title": "A" })).unwrap();
        assert!(summary.category.is_empty());
        assert_eq!(summary.content.get("title"), Some(&json!("A")));

        let summary: SummaryArticle =
            serde_json::from_value(json!({ "title": "A", "category": null })).unwrap();
        assert!(summary.category.is_empty());
    }

    #[test]
    fn test_summary_category_shape_mismatches() {
        let single: SummaryArticle = serde_json::from_value(json!({ "category": "Tech" })).unwrap();
        assert_eq!(single.category, vec!["Tech".to_string()]);

        let mixed: SummaryArticle =
            serde_json::from_value(json!({ "category": ["Tech", 3, null, "AI"] })).unwrap();
        assert_eq!(mixed.category, vec!["Tech".to_string(), "AI".to_string()]);

        let object: SummaryArticle =
            serde_json::from_value(json!({ "category": { "name": "Tech" } })).unwrap();
        assert!(object.category.is_empty());
    }

    #[test]
    fn test_digest_from_value_shapes() {
        assert!(NewsDigest::from_value(json!({})).summaries.is_empty());
        assert!(NewsDigest::from_value(json!({ "summaries": null })).summaries.is_empty());
        assert!(NewsDigest::from_value(json!({ "summaries": "nope" })).summaries.is_empty());
        assert!(NewsDigest::from_value(json!("nope")).summaries.is_empty());

        let bare = NewsDigest::from_value(json!([{ "category": ["ai"] }, 1]));
        assert_eq!(bare.summaries.len(), 1);
        assert_eq!(bare.summaries[0].category, vec!["ai".to_string()]);
    }

    #[test]
    fn test_digest_object_with_extra_keys_keeps_summaries() {
        let digest = NewsDigest::from_value(json!({
            "summaries": [{ "title": "A", "category": ["ai"] }, "stray"],
            "model": { "name": "m" },
            "count": "two"
        }));
        assert_eq!(digest.summaries.len(), 1);
        assert_eq!(digest.summaries[0].content["title"], json!("A"));
    }

    #[test]
    fn test_summary_keeps_opaque_payload() {
        let input = json!({
            "summaries": [
                { "title": "A", "summary": "s", "category": ["ai"], "score": 3 }
            ]
        });
        let digest = NewsDigest::from_value(input);
        let output = serde_json::to_value(&digest).unwrap();
        assert_eq!(output["summaries"][0]["title"], json!("A"));
        assert_eq!(output["summaries"][0]["summary"], json!("s"));
        assert_eq!(output["summaries"][0]["score"], json!(3));
        assert_eq!(output["summaries"][0]["category"], json!(["ai"]));
    }

    #[test]
    fn test_has_category_is_case_sensitive() {
        let summary = SummaryArticle {
            category: vec!["Tech".to_string()],
            content: Map::new(),
        };
        assert!(summary.has_category("Tech"));
        assert!(!summary.has_category("tech"));
    }
}
