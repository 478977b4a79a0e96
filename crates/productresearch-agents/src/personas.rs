//! Persona definitions for the three crew members.

use productresearch_core::PersonaConfig;

pub fn search_persona() -> PersonaConfig {
    PersonaConfig::new(
        "Product Search Specialist",
        "Find relevant and authoritative sources for product information",
        "Expert at finding reliable product information sources including \
         official product pages, major retailers, and trusted review sites",
    )
}

pub fn scraper_persona() -> PersonaConfig {
    PersonaConfig::new(
        "Web Scraping Specialist",
        "Extract comprehensive product information from websites",
        "Expert at extracting and consolidating product information \
         from multiple sources into a coherent format",
    )
}

pub fn analysis_persona() -> PersonaConfig {
    PersonaConfig::new(
        "Product Analysis Expert",
        "Analyze and summarize product information from multiple sources",
        "Expert at analyzing product features, specifications, \
         prices, and reviews to provide comprehensive insights",
    )
}
