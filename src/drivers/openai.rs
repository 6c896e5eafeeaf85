//! Our OpenAI driver, which also works with LiteLLM, Ollama and other
//! compatible gateways.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        ImageUrlArgs,
    },
};

use crate::{llm_client::create_llm_client, prelude::*};

use super::{ChatCompletionResponse, Driver, LlmOpts, VisionPrompt};

/// Our OpenAI driver.
#[derive(Debug)]
pub struct OpenAiDriver {
    /// The OpenAI client.
    pub client: Client<OpenAIConfig>,
}

impl OpenAiDriver {
    /// Create a new OpenAI driver, if we have credentials.
    pub fn from_env() -> Option<Self> {
        create_llm_client().map(|client| Self { client })
    }
}

#[async_trait]
impl Driver for OpenAiDriver {
    #[instrument(level = "debug", skip_all, fields(model = %llm_opts.model))]
    async fn chat_completion(
        &self,
        prompt: &VisionPrompt,
        llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse> {
        // Build a single user message with our instruction and the image.
        let text_part = ChatCompletionRequestMessageContentPartTextArgs::default()
            .text(prompt.text.clone())
            .build()
            .context("Error building text content")?;
        let image_url = ImageUrlArgs::default()
            .url(prompt.image_data_url.clone())
            .build()
            .context("Error building image URL")?;
        let image_part = ChatCompletionRequestMessageContentPartImageArgs::default()
            .image_url(image_url)
            .build()
            .context("Error building image content")?;
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(vec![text_part.into(), image_part.into()])
            .build()
            .context("Error building user message")?;

        let req = CreateChatCompletionRequestArgs::default()
            .model(llm_opts.model.clone())
            .messages(vec![message.into()])
            .temperature(llm_opts.temperature)
            .build()
            .context("Error building request")?;

        // Call OpenAI.
        let chat = self.client.chat();
        let response = llm_opts
            .apply_timeout(chat.create(req))
            .await
            .context("Error calling chat completion API")?;
        debug!(choices = response.choices.len(), "OpenAI response");

        Ok(ChatCompletionResponse {
            choices: response
                .choices
                .into_iter()
                .map(|choice| choice.message.content)
                .collect(),
        })
    }
}
