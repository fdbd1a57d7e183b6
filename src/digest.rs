//! Category queries over a [`NewsDigest`].
//!
//! Both queries are pure and total: a digest with missing summaries or
//! missing category lists simply produces empty results.
//!
//! # Case Handling
//!
//! [`list_categories`] folds labels to lowercase, while [`filter_by_category`]
//! compares labels exactly as given. `"Tech"` is therefore listed as `"tech"`
//! but only a filter for `"Tech"` returns it. Callers that feed listed
//! categories back into the filter need to be aware of this.

use crate::models::{CategoryFilterResult, CategoryIndexResult, NewsDigest, SummaryArticle};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// List the distinct category labels of a digest, lowercased and sorted ascending.
#[instrument(level = "debug", skip_all, fields(summaries = digest.summaries.len()))]
pub fn list_categories(digest: &NewsDigest) -> CategoryIndexResult {
    let categories: BTreeSet<String> = digest
        .summaries
        .iter()
        .flat_map(|summary| summary.category.iter())
        .map(|label| label.to_lowercase())
        .collect();

    debug!(total = categories.len(), "Indexed digest categories");
    CategoryIndexResult {
        total_categories: categories.len(),
        categories: categories.into_iter().collect(),
    }
}

/// Return the summaries tagged with `category` (exact match), in digest order.
#[instrument(level = "debug", skip_all, fields(%category))]
pub fn filter_by_category(digest: &NewsDigest, category: &str) -> CategoryFilterResult {
    let summaries: Vec<SummaryArticle> = digest
        .summaries
        .iter()
        .filter(|summary| summary.has_category(category))
        .cloned()
        .collect();

    debug!(matches = summaries.len(), "Filtered digest by category");
    CategoryFilterResult {
        category: category.to_string(),
        total_articles: summaries.len(),
        summaries,
    }
}
