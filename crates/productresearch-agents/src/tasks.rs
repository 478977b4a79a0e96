//! Templated task descriptors, built fresh for every query.

use productresearch_core::TaskDescriptor;
use serde_json::{Map, Value, json};

pub const SEARCH_TASK: &str = "search";
pub const SCRAPE_TASK: &str = "scrape";
pub const ANALYSIS_TASK: &str = "analysis";

pub fn create_search_task(query: &str) -> TaskDescriptor {
    TaskDescriptor::new(
        SEARCH_TASK,
        format!("Find reliable sources for: {query}"),
        "List of relevant URLs for product information",
    )
    .with_context("query", json!(query))
}

pub fn create_scraping_task(urls: &[String]) -> TaskDescriptor {
    TaskDescriptor::new(
        SCRAPE_TASK,
        "Extract product information from provided URLs",
        "Consolidated product information from all sources",
    )
    .with_context("urls", json!(urls))
}

pub fn create_analysis_task(product_data: Map<String, Value>) -> TaskDescriptor {
    TaskDescriptor::new(
        ANALYSIS_TASK,
        "Analyze and summarize product information",
        "Comprehensive product analysis and summary",
    )
    .with_context("product_data", Value::Object(product_data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_task_carries_query() {
        let task = create_search_task("iPhone 15 Pro Max");
        assert_eq!(task.description, "Find reliable sources for: iPhone 15 Pro Max");
        assert_eq!(task.context_value("query"), Some(&json!("iPhone 15 Pro Max")));
    }

    #[test]
    fn scraping_and_analysis_tasks_start_empty() {
        let scrape = create_scraping_task(&[]);
        assert_eq!(scrape.context_value("urls"), Some(&json!([])));

        let analysis = create_analysis_task(Map::new());
        assert_eq!(analysis.context_value("product_data"), Some(&json!({})));
        assert_eq!(
            analysis.expected_output,
            "Comprehensive product analysis and summary"
        );
    }
}
