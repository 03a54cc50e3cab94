//! Pipeline stages
//!
//! A stage is an explicit descriptor: an id, an input type, an output type
//! and `execute`. Stages never know where they sit in the pipeline and never
//! call each other; the orchestrator threads values between them.

use redator_core::{
    ArticleDraft, Error, LlmConfig, RedatorConfig, ResearchContext, Result, SanitizedTopic,
    StageId, StageSpec,
};
use redator_llm::{LlmMessage, LlmProvider, LlmRequest};
use redator_tools::KnowledgeTool;
use std::sync::Arc;
use tracing::{debug, info};

/// One step of the generation pipeline.
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    fn id(&self) -> StageId;

    async fn execute(&self, input: &Self::Input) -> Result<Self::Output>;
}

/// What the writing stage receives: the topic and the research output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WritingInput {
    pub topic: SanitizedTopic,
    pub context: ResearchContext,
}

fn generation_request(llm: &LlmConfig, system: String, user: String) -> LlmRequest {
    LlmRequest {
        model: llm.model.clone(),
        messages: vec![LlmMessage::user(user)],
        max_tokens: llm.max_tokens,
        temperature: Some(llm.temperature),
        system: Some(system),
    }
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// Looks the topic up, then asks the model to organize what was found.
///
/// The lookup text goes into the prompt unchanged; the model's reply becomes
/// the context handed to the writer.
pub struct ResearchStage {
    config: Arc<RedatorConfig>,
    provider: Arc<dyn LlmProvider>,
    tool: Box<dyn KnowledgeTool>,
}

impl ResearchStage {
    pub fn new(
        config: Arc<RedatorConfig>,
        provider: Arc<dyn LlmProvider>,
        tool: Box<dyn KnowledgeTool>,
    ) -> Self {
        Self { config, provider, tool }
    }

    fn spec(&self) -> &StageSpec {
        &self.config.stages.research
    }
}

#[async_trait::async_trait]
impl Stage for ResearchStage {
    type Input = SanitizedTopic;
    type Output = ResearchContext;

    fn id(&self) -> StageId {
        StageId::ResearchStage
    }

    async fn execute(&self, topic: &SanitizedTopic) -> Result<ResearchContext> {
        let lookup = self.tool.lookup(topic.as_str()).await;
        info!(tool = self.tool.name(), chars = lookup.chars().count(), "knowledge lookup finished");

        let vars = [("assunto", topic.as_str()), ("pesquisa", lookup.as_str())];
        let request = generation_request(
            &self.config.llm,
            self.spec().system_prompt(&vars),
            self.spec().render(&vars),
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::upstream(self.id(), e.to_string()))?;
        debug!(chars = response.text.len(), "research notes received");

        Ok(ResearchContext::new(response.text.trim()))
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Turns topic + context into a candidate article. Performs no lookups.
pub struct WritingStage {
    config: Arc<RedatorConfig>,
    provider: Arc<dyn LlmProvider>,
}

impl WritingStage {
    pub fn new(config: Arc<RedatorConfig>, provider: Arc<dyn LlmProvider>) -> Self {
        Self { config, provider }
    }

    fn spec(&self) -> &StageSpec {
        &self.config.stages.writing
    }
}

#[async_trait::async_trait]
impl Stage for WritingStage {
    type Input = WritingInput;
    type Output = ArticleDraft;

    fn id(&self) -> StageId {
        StageId::WritingStage
    }

    async fn execute(&self, input: &WritingInput) -> Result<ArticleDraft> {
        let vars = [
            ("assunto", input.topic.as_str()),
            ("contexto", input.context.as_str()),
        ];
        let request = generation_request(
            &self.config.llm,
            self.spec().system_prompt(&vars),
            self.spec().render(&vars),
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| Error::upstream(self.id(), e.to_string()))?;

        parse_article_json(&response.text).map_err(|msg| Error::schema(self.id(), msg))
    }
}

/// Parse the first complete JSON object in a model reply as an [`ArticleDraft`].
///
/// Tolerates code fences and prose on either side, braces included. Each `{`
/// is tried in order; when none parses, the error of the first attempt is
/// reported.
pub fn parse_article_json(reply: &str) -> std::result::Result<ArticleDraft, String> {
    let mut first_error = None;
    for (start, _) in reply.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<ArticleDraft>();
        match values.next() {
            Some(Ok(draft)) => return Ok(draft),
            Some(Err(e)) => {
                first_error.get_or_insert(e);
            }
            None => {}
        }
    }
    Err(match first_error {
        Some(e) => format!("model reply is not a valid article object: {}", e),
        None => "model reply contains no JSON object".to_string(),
    })
}
