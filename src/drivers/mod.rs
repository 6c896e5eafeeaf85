//! LLM drivers.
//!
//! We only need one thing from a hosted model: send a text instruction plus
//! an image, and get back the text of the reply. Drivers are injected into
//! the extraction pipeline, so a missing API key is just a missing driver.

use std::{error, fmt, pin::Pin, sync::Arc, time::Duration};

use clap::Args;
use futures::{FutureExt as _, TryFutureExt as _};
use tokio::time;

use crate::prelude::*;

#[cfg(test)]
pub mod canned;
pub mod openai;

/// Our chat-related options.
#[derive(Args, Clone, Debug)]
pub struct LlmOpts {
    /// The vision model to ask about receipts.
    #[clap(long, default_value = "gpt-4o-mini")]
    pub model: String,

    /// The temperature to use for sampling, between 0.0 and 2.0. Lower values
    /// make the output more deterministic.
    #[clap(long, default_value = "0.2")]
    pub temperature: f32,

    /// A timeout, in seconds, for the model to return a complete response.
    #[clap(long, default_value = "60")]
    pub timeout: u64,
}

impl LlmOpts {
    /// Create the default driver, if we have credentials for it.
    pub fn create_driver(&self) -> Option<Arc<dyn Driver>> {
        match openai::OpenAiDriver::from_env() {
            Some(driver) => Some(Arc::new(driver)),
            None => {
                debug!("No OPENAI_API_KEY, so no vision model is configured");
                None
            }
        }
    }

    /// Apply our timeout to a future.
    ///
    /// The `'fut` lifetime covers any data borrowed by `future`, which we
    /// carefully preserve. We box the output because the two branches have
    /// different future types.
    pub fn apply_timeout<'fut, T, E>(
        &self,
        future: impl Future<Output = Result<T, E>> + Send + 'fut,
    ) -> Pin<Box<dyn Future<Output = Result<T, LlmError<E>>> + Send + 'fut>>
    where
        T: Send + 'static,
        E: Send + 'static,
    {
        let timeout = Duration::from_secs(self.timeout);
        time::timeout(timeout, future.map_err(LlmError::Native))
            // We have a `Result<Result<T, LlmError<E>>, Elapsed>` here, and
            // we want a `Result<T, LlmError<E>>`.
            .map(|result| match result {
                Ok(inner) => inner,
                Err(_) => Err(LlmError::Timeout),
            })
            .boxed()
    }
}

/// A single-turn prompt with one image attached.
#[derive(Clone, Debug)]
pub struct VisionPrompt {
    /// The instruction.
    pub text: String,

    /// The image, as a `data:` URL.
    pub image_data_url: String,
}

/// Interface trait for LLM drivers.
#[async_trait]
pub trait Driver: fmt::Debug + Send + Sync + 'static {
    /// Run a "chat completion" request.
    async fn chat_completion(
        &self,
        prompt: &VisionPrompt,
        llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse>;
}

/// A chat completion response.
#[derive(Debug, Default)]
pub struct ChatCompletionResponse {
    /// The message content of each choice. Any of these may be missing.
    pub choices: Vec<Option<String>>,
}

impl ChatCompletionResponse {
    /// The content of the first choice, if there is any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|content| content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}

/// An error which occurred while calling an LLM.
#[derive(Debug)]
pub enum LlmError<E> {
    /// A native error.
    Native(E),

    /// A timeout error.
    Timeout,
}

impl<E> fmt::Display for LlmError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Native(err) => write!(f, "LLM error: {err}"),
            LlmError::Timeout => write!(f, "LLM request timed out"),
        }
    }
}

impl<E> error::Error for LlmError<E>
where
    E: error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LlmError::Native(err) => Some(err),
            LlmError::Timeout => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(timeout: u64) -> LlmOpts {
        LlmOpts {
            model: "test-model".to_owned(),
            temperature: 0.2,
            timeout,
        }
    }

    #[test]
    fn first_content_skips_blank_replies() {
        let response = ChatCompletionResponse {
            choices: vec![Some("{}".to_owned()), None],
        };
        assert_eq!(response.first_content(), Some("{}"));

        let response = ChatCompletionResponse {
            choices: vec![Some("  ".to_owned())],
        };
        assert_eq!(response.first_content(), None);

        assert_eq!(ChatCompletionResponse::default().first_content(), None);
    }

    #[tokio::test]
    async fn slow_requests_time_out() {
        let slow = async {
            time::sleep(Duration::from_secs(5)).await;
            Ok::<_, std::io::Error>(())
        };
        let result = opts(0).apply_timeout(slow).await;
        assert!(matches!(result, Err(LlmError::Timeout)));

        let fast = async { Ok::<_, std::io::Error>(42) };
        assert_eq!(opts(10).apply_timeout(fast).await.unwrap(), 42);
    }
}
