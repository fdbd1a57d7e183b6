//! Mapping of provider articles into [`NormalizedArticle`]s.

use crate::models::{NewsResponse, NormalizedArticle};
use tracing::{info, instrument};

/// Number of articles handed to the summarizer when nothing else is configured.
pub const DEFAULT_LIMIT: usize = 5;

/// Normalize the first `limit` provider results, preserving their order.
///
/// A `limit` of zero yields nothing; a `limit` above the number of results
/// yields all of them.
#[instrument(level = "info", skip_all, fields(limit = limit))]
pub fn normalize(response: &NewsResponse, limit: usize) -> Vec<NormalizedArticle> {
    let articles: Vec<NormalizedArticle> = response
        .results
        .iter()
        .take(limit)
        .map(NormalizedArticle::from)
        .collect();

    info!(
        available = response.results.len(),
        normalized = articles.len(),
        "Normalized provider articles"
    );
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response_with(count: usize) -> NewsResponse {
        let results: Vec<_> = (0..count)
            .map(|i| json!({ "title": format!("t{i}"), "link": format!("u{i}") }))
            .collect();
        serde_json::from_value(json!({ "results": results })).unwrap()
    }

    #[test]
    fn test_truncates_to_limit_in_order() {
        let articles = normalize(&response_with(10), DEFAULT_LIMIT);
        let titles: Vec<_> = articles.iter().map(|a| a.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["t0", "t1", "t2", "t3", "t4"]);
    }

    #[test]
    fn test_limit_above_available_returns_all() {
        assert_eq!(normalize(&response_with(3), 50).len(), 3);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        assert!(normalize(&response_with(3), 0).is_empty());
    }

    #[test]
    fn test_missing_results_is_empty() {
        let response: NewsResponse = serde_json::from_value(json!({})).unwrap();
        assert!(normalize(&response, DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_renames_provider_fields() {
        let response: NewsResponse = serde_json::from_value(json!({
            "results": [
                {"title": "A", "category": ["AI", "Tech"], "source_name": "X", "pubDate": "2024-01-01", "link": "u1"},
                {"title": "B", "category": ["Tech"], "source_name": "Y", "pubDate": "2024-01-02", "link": "u2"}
            ]
        }))
        .unwrap();

        let articles = normalize(&response, DEFAULT_LIMIT);
        assert_eq!(
            serde_json::to_value(&articles).unwrap(),
            json!([
                {"title": "A", "description": null, "category": ["AI", "Tech"], "source": "X", "date": "2024-01-01", "url": "u1"},
                {"title": "B", "description": null, "category": ["Tech"], "source": "Y", "date": "2024-01-02", "url": "u2"}
            ])
        );
    }

    #[test]
    fn test_mistyped_date_keeps_article() {
        let response: NewsResponse = serde_json::from_value(json!({
            "results": [
                {"title": "A", "pubDate": [2024, 1, 1], "link": "u1"},
                {"title": "B", "link": "u2"}
            ]
        }))
        .unwrap();
        let articles = normalize(&response, DEFAULT_LIMIT);
        let titles: Vec<_> = articles.iter().map(|a| a.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(articles[0].date, None);
        assert_eq!(articles[0].url.as_deref(), Some("u1"));
    }
}
