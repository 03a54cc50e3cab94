//! Wikipedia tool — first-paragraph extract of an article, by exact title

use crate::knowledge::{KnowledgeTool, LookupOutcome};
use redator_core::KnowledgeConfig;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct WikipediaTool {
    client: Client,
    api_url: String,
}

impl WikipediaTool {
    /// Build a tool with its own HTTP client.
    pub fn new(config: &KnowledgeConfig) -> Self {
        Self::with_client(Self::client_for(config), config)
    }

    /// Build a tool over an existing client. `Client` is immutable and
    /// reference counted, so one can back many tool instances.
    pub fn with_client(client: Client, config: &KnowledgeConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
        }
    }

    /// HTTP client configured with the lookup timeout and User-Agent.
    pub fn client_for(config: &KnowledgeConfig) -> Client {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    /// Query the API and classify the result.
    pub async fn fetch(&self, topic: &str) -> LookupOutcome {
        let params = [
            ("action", "query"),
            ("prop", "extracts"),
            ("exlimit", "1"),
            ("explaintext", "1"),
            ("titles", topic),
            ("format", "json"),
            ("utf8", "1"),
            ("redirects", "1"),
        ];

        let response = match self.client.get(&self.api_url).query(&params).send().await {
            Ok(r) => r,
            Err(e) => return LookupOutcome::RequestFailed(e.to_string()),
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return LookupOutcome::RequestFailed(e.to_string()),
        };
        match response.text().await {
            Ok(body) => interpret(&body),
            Err(e) => LookupOutcome::RequestFailed(e.to_string()),
        }
    }
}

/// Pull the first page's extract out of a `query.pages` response.
fn interpret(body: &str) -> LookupOutcome {
    let data: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return LookupOutcome::Unreadable(e.to_string()),
    };
    let Some(pages) = data
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(Value::as_object)
    else {
        return LookupOutcome::Unreadable("resposta sem 'query.pages'".into());
    };
    match pages.values().next() {
        Some(page) => LookupOutcome::from_extract(page.get("extract").and_then(Value::as_str)),
        None => LookupOutcome::Unreadable("nenhuma página na resposta".into()),
    }
}

#[async_trait::async_trait]
impl KnowledgeTool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    async fn lookup(&self, topic: &str) -> String {
        let outcome = self.fetch(topic).await;
        match &outcome {
            LookupOutcome::RequestFailed(e) | LookupOutcome::Unreadable(e) => {
                warn!(topic, error = %e, "Wikipedia lookup degraded to text")
            }
            other => debug!(topic, found = other.is_found(), "Wikipedia lookup done"),
        }
        outcome.render(topic)
    }
}
