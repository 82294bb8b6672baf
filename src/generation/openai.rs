//! OpenAI-compatible chat completion backend.

use super::{GenerationRequest, Generator, MessageRole};
use crate::error::{GuideError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Generator that talks to any OpenAI-compatible chat endpoint.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIGenerator {
    /// Create a generator for `model`, optionally against a custom endpoint and key.
    pub fn with_config(model: &str, api_base: Option<&str>, api_key: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: create_client(api_base, api_key)?,
            model: model.to_string(),
        })
    }

    fn to_messages(request: &GenerationRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        request
            .messages
            .iter()
            .map(|m| -> Result<ChatCompletionRequestMessage> {
                let message: ChatCompletionRequestMessage = match m.role {
                    MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| GuideError::Generation(e.to_string()))?
                        .into(),
                    MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| GuideError::Generation(e.to_string()))?
                        .into(),
                    MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                        .content(m.content.clone())
                        .build()
                        .map_err(|e| GuideError::Generation(e.to_string()))?
                        .into(),
                };
                Ok(message)
            })
            .collect()
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[allow(deprecated)]
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let messages = Self::to_messages(request)?;

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_output_tokens)
            .build()
            .map_err(|e| GuideError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| GuideError::Generation(format!("Chat completion failed: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GuideError::Generation("Empty response from model".to_string()))?
            .clone();

        debug!("Generated {} characters", answer.len());
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PromptMessage;

    #[test]
    fn test_message_conversion_preserves_order() {
        let mut request = GenerationRequest::new("system text", "user text");
        request.messages.push(PromptMessage {
            role: MessageRole::Assistant,
            content: "earlier answer".to_string(),
        });

        let messages = OpenAIGenerator::to_messages(&request).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
    }

    #[test]
    fn test_generator_creation_with_local_endpoint() {
        let generator =
            OpenAIGenerator::with_config("llama3.2", Some("http://localhost:11434/v1"), Some("none"))
                .unwrap();
        assert_eq!(generator.model_name(), "llama3.2");
    }
}
