pub mod api;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod llm;
pub mod pipeline;
pub mod retry;
pub mod summarizer;
pub mod telemetry;

use std::sync::Arc;

use config::Config;
use extractor::ReadabilityExtractor;
use fetcher::HttpFetcher;
use llm::GeminiClient;
use pipeline::SummaryPipeline;
use summarizer::Summarizer;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<SummaryPipeline>,
}

impl AppState {
    pub fn new(config: Config, pipeline: SummaryPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Wires the HTTP fetcher, readability extractor and Gemini client from configuration.
    pub fn from_config(config: Config) -> reqwest::Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch_timeout, config.connect_timeout)?;
        let gemini = GeminiClient::new(config.gemini())?;
        tracing::info!(model = gemini.model(), "Using Gemini model");

        let summarizer = Summarizer::new(Arc::new(gemini), config.summarizer());
        let pipeline = SummaryPipeline::new(
            Arc::new(fetcher),
            Arc::new(ReadabilityExtractor),
            summarizer,
        );

        Ok(Self::new(config, pipeline))
    }
}
