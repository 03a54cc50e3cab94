//! Pipeline orchestrator — guard, research, writing, contract
//!
//! The orchestrator owns only immutable pieces (factory, guard, contract).
//! Stage instances come from the factory on every run and are dropped when
//! the run ends, so concurrent runs share nothing mutable.

use crate::contract::OutputContract;
use crate::guard::InputGuard;
use crate::stage::{ResearchStage, Stage, WritingInput, WritingStage};
use redator_core::{
    ArticleDraft, PipelineResult, RedatorConfig, ResearchContext, Result, SanitizedTopic,
};
use redator_llm::LlmProvider;
use redator_tools::{KnowledgeTool, WikipediaTool};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Builds the two stages of a run.
pub trait StageFactory: Send + Sync {
    type Research: Stage<Input = SanitizedTopic, Output = ResearchContext>;
    type Writing: Stage<Input = WritingInput, Output = ArticleDraft>;

    fn research(&self) -> Self::Research;
    fn writing(&self) -> Self::Writing;
}

/// Produces a fresh knowledge tool for each research stage.
pub type ToolFactory = Arc<dyn Fn() -> Box<dyn KnowledgeTool> + Send + Sync>;

/// Factory for the model-backed stages.
#[derive(Clone)]
pub struct LlmStageFactory {
    config: Arc<RedatorConfig>,
    provider: Arc<dyn LlmProvider>,
    tool: ToolFactory,
}

impl LlmStageFactory {
    pub fn new(config: Arc<RedatorConfig>, provider: Arc<dyn LlmProvider>, tool: ToolFactory) -> Self {
        Self { config, provider, tool }
    }

    /// Research backed by the Wikipedia API. Tools share one HTTP client.
    pub fn wikipedia(config: Arc<RedatorConfig>, provider: Arc<dyn LlmProvider>) -> Self {
        let knowledge = config.knowledge.clone();
        let client = WikipediaTool::client_for(&knowledge);
        let tool: ToolFactory = Arc::new(move || {
            Box::new(WikipediaTool::with_client(client.clone(), &knowledge)) as Box<dyn KnowledgeTool>
        });
        Self::new(config, provider, tool)
    }
}

impl StageFactory for LlmStageFactory {
    type Research = ResearchStage;
    type Writing = WritingStage;

    fn research(&self) -> ResearchStage {
        ResearchStage::new(self.config.clone(), self.provider.clone(), (self.tool)())
    }

    fn writing(&self) -> WritingStage {
        WritingStage::new(self.config.clone(), self.provider.clone())
    }
}

pub struct PipelineOrchestrator<F: StageFactory> {
    factory: F,
    guard: InputGuard,
    contract: OutputContract,
}

impl<F: StageFactory> PipelineOrchestrator<F> {
    pub fn new(factory: F, guard: InputGuard, contract: OutputContract) -> Self {
        Self { factory, guard, contract }
    }

    /// Guard and contract from config. Fails only on a bad extra pattern.
    pub fn from_config(factory: F, config: &RedatorConfig) -> Result<Self> {
        Ok(Self::new(
            factory,
            InputGuard::from_config(&config.guard)?,
            OutputContract::from_config(&config.contract),
        ))
    }

    pub fn guard(&self) -> &InputGuard {
        &self.guard
    }

    pub fn contract(&self) -> &OutputContract {
        &self.contract
    }

    pub fn admit(&self, raw: &str) -> Result<SanitizedTopic> {
        Ok(self.guard.admit(raw)?)
    }

    /// Research, then writing, then the output contract. No retries.
    pub async fn run(&self, topic: SanitizedTopic) -> PipelineResult {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, topic = %topic);
        self.run_stages(topic).instrument(span).await
    }

    pub async fn admit_and_run(&self, raw: &str) -> PipelineResult {
        let topic = self.admit(raw)?;
        self.run(topic).await
    }

    async fn run_stages(&self, topic: SanitizedTopic) -> PipelineResult {
        let started = Instant::now();

        let research = self.factory.research();
        let context = research.execute(&topic).await.map_err(log_failure)?;
        drop(research);
        info!(chars = context.as_str().len(), "research finished");

        let writing = self.factory.writing();
        let input = WritingInput { topic, context };
        let draft = writing.execute(&input).await.map_err(log_failure)?;

        let article = self.contract.validate(draft).map_err(log_failure)?;
        info!(
            words = article.word_count(),
            keywords = article.keywords.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "article generated"
        );
        Ok(article)
    }
}

fn log_failure(e: redator_core::Error) -> redator_core::Error {
    let stage = e.stage().map(|s| s.as_str()).unwrap_or("none");
    error!(stage, "pipeline failed: {}", e);
    e
}
