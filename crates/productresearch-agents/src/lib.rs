//! Agent roles and external tools for the product research crew.
//!
//! - [`ProductSearchAgent`] finds source URLs through a [`tools::SearchTool`].
//! - [`WebScraperAgent`] reduces those pages to text through a [`tools::PageFetcher`].
//! - [`ProductAnalysisAgent`] summarizes the text through a [`tools::LlmClient`].
//!
//! [`ProductResearchSystem`] ties them together for one query.

pub mod analyst;
pub mod personas;
pub mod scraper;
pub mod search;
pub mod system;
pub mod tasks;
pub mod tools;

pub use analyst::ProductAnalysisAgent;
pub use scraper::WebScraperAgent;
pub use search::ProductSearchAgent;
pub use system::ProductResearchSystem;
pub use tasks::{create_analysis_task, create_scraping_task, create_search_task};
