//! Output generation for the persisted JSON artifacts.
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── news_response.json   # combined provider pages, as fetched
//! └── news_summary.json    # digest queried by `categories` and `filter`
//! ```

pub mod json;
