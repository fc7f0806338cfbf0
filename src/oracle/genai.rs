//! GenAI-backed patch oracle.
//!
//! Talks to any provider the `genai` crate supports (Ollama, OpenAI,
//! Anthropic, Gemini, xAI, Groq). Provider-side fallback and credential
//! handling are the library's concern; this adapter only shapes the
//! request and maps failures onto [`OracleError`].

use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::Duration;
use tracing::{debug, error};

use super::{FixRequest, OracleError, OracleReply, PatchOracle};
use crate::patch::extract_unified_diff;

/// Multi-provider oracle built on the `genai` client.
pub struct GenAiOracle {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAiOracle {
    /// Creates an oracle for `provider`/`model`.
    ///
    /// `BUILDMEND_API_BASE_URL` overrides the provider endpoint, with
    /// credentials still resolved from the provider's usual key variable.
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        let client = match std::env::var("BUILDMEND_API_BASE_URL").ok() {
            Some(endpoint_url) => {
                debug!(
                    provider = provider.as_str(),
                    endpoint = %endpoint_url,
                    "using custom oracle endpoint"
                );
                let provider_clone = provider;
                let model_clone = model.clone();
                let resolver = ServiceTargetResolver::from_resolver_fn(
                    move |_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                        let endpoint = Endpoint::from_owned(endpoint_url.clone());
                        let auth = match provider_clone.default_key_env_name() {
                            Some(var) => AuthData::from_env(var),
                            None => AuthData::from_single(""),
                        };
                        Ok(ServiceTarget {
                            endpoint,
                            auth,
                            model: ModelIden::new(provider_clone, &model_clone),
                        })
                    },
                );
                Client::builder()
                    .with_service_target_resolver(resolver)
                    .build()
            }
            None => Client::default(),
        };

        debug!(
            provider = provider.as_str(),
            model = %model,
            "created genai oracle"
        );

        Self {
            client,
            model,
            provider,
            timeout,
        }
    }
}

#[async_trait]
impl PatchOracle for GenAiOracle {
    async fn propose_fix(&self, request: &FixRequest) -> Result<OracleReply, OracleError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(request.prompt()));

        let chat_request = ChatRequest::new(messages);
        let options = ChatOptions::default().with_temperature(0.2);

        let response = match tokio::time::timeout(
            self.timeout,
            self.client
                .exec_chat(&self.model, chat_request, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!(provider = self.provider.as_str(), error = %e, "oracle request failed");
                return Err(OracleError::Transport {
                    message: format!("{} request failed: {}", self.provider.as_str(), e),
                });
            }
            Err(_) => {
                error!(
                    provider = self.provider.as_str(),
                    seconds = self.timeout.as_secs(),
                    "oracle request timed out"
                );
                return Err(OracleError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let text = response.first_text().unwrap_or_default().to_string();
        let diff = if request.want_diff {
            extract_unified_diff(&text)
        } else {
            None
        };
        Ok(OracleReply { text, diff })
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }
}

impl std::fmt::Debug for GenAiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiOracle")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}
