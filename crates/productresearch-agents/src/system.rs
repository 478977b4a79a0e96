//! The product research driver: one crew kickoff per query.

use std::sync::Arc;

use anyhow::{bail, Result};
use productresearch_core::{
    Agent, Config, Crew, CrewOutput, DynMemory, ExecutionEngine, Process, Secrets,
    SequentialEngine, TaskDescriptor,
};
use serde_json::Map;

use crate::analyst::ProductAnalysisAgent;
use crate::scraper::WebScraperAgent;
use crate::search::ProductSearchAgent;
use crate::tasks::{create_analysis_task, create_scraping_task, create_search_task};
use crate::tools::{HttpScraper, OpenAiChatClient, SerperClient};

const CREW_NAME: &str = "product_research";

/// Builds the three research tasks for a query and hands them, with the
/// agents and the long-term memory, to the execution engine.
pub struct ProductResearchSystem {
    search_agent: Arc<dyn Agent>,
    scraper_agent: Arc<dyn Agent>,
    analysis_agent: Arc<dyn Agent>,
    engine: Arc<dyn ExecutionEngine>,
    memory: Option<DynMemory>,
    recall_limit: usize,
}

impl ProductResearchSystem {
    pub fn new(
        search_agent: Arc<dyn Agent>,
        scraper_agent: Arc<dyn Agent>,
        analysis_agent: Arc<dyn Agent>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Self {
        Self {
            search_agent,
            scraper_agent,
            analysis_agent,
            engine,
            memory: None,
            recall_limit: 3,
        }
    }

    /// Wire the real Serper, HTTP and LLM clients into a sequential crew.
    pub fn from_config(config: &Config, secrets: &Secrets, memory: Option<DynMemory>) -> Result<Self> {
        let search = SerperClient::new(&config.search, secrets.search_api_key.clone())?;
        let scraper = HttpScraper::new(&config.scrape)?;
        let llm = OpenAiChatClient::new(&config.llm, secrets.llm_api_key.clone())?;

        let mut system = Self::new(
            Arc::new(ProductSearchAgent::new(Arc::new(search), &config.search)),
            Arc::new(WebScraperAgent::new(Arc::new(scraper))),
            Arc::new(ProductAnalysisAgent::new(Arc::new(llm))),
            Arc::new(SequentialEngine::new()),
        );
        system.recall_limit = config.memory.recall_limit;
        if let (true, Some(memory)) = (config.memory.enabled, memory) {
            system = system.with_memory(memory);
        }
        Ok(system)
    }

    pub fn with_memory(mut self, memory: DynMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn memory_backend(&self) -> Option<&'static str> {
        self.memory.as_ref().map(|memory| memory.backend())
    }

    /// Fresh descriptors for one query: search, scrape, analysis.
    pub fn build_tasks(&self, query: &str) -> Vec<TaskDescriptor> {
        vec![
            create_search_task(query),
            create_scraping_task(&[]),
            create_analysis_task(Map::new()),
        ]
    }

    pub fn build_crew(&self, query: &str) -> Crew {
        let mut tasks = self.build_tasks(query).into_iter();
        let mut crew = Crew::new(CREW_NAME)
            .with_agent(self.search_agent.clone())
            .with_agent(self.scraper_agent.clone())
            .with_agent(self.analysis_agent.clone())
            .with_process(Process::Sequential)
            .with_recall_limit(self.recall_limit)
            .with_topic(query);

        for agent in [&self.search_agent, &self.scraper_agent, &self.analysis_agent] {
            if let Some(task) = tasks.next() {
                crew = crew.with_task(task, agent.clone());
            }
        }
        if let Some(memory) = &self.memory {
            crew = crew.with_memory(memory.clone());
        }
        crew
    }

    /// Research one product. The crew is submitted to the engine exactly once.
    pub async fn process_query(&self, query: &str) -> Result<CrewOutput> {
        let query = query.trim();
        if query.is_empty() {
            bail!("query cannot be empty");
        }

        let crew = self.build_crew(query);
        tracing::info!(query = %query, tasks = crew.tasks.len(), "processing query");

        match self.engine.kickoff(crew).await {
            Ok(output) => Ok(output),
            Err(err) => {
                tracing::error!(query = %query, error = %format!("{err:#}"), "error processing query");
                Err(err)
            }
        }
    }
}
