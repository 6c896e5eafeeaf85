//! Canned driver for testing.
//!
//! Replies with a fixed response (or error) and remembers the last prompt it
//! was sent.

use std::sync::Mutex;

use crate::prelude::*;

use super::{ChatCompletionResponse, Driver, LlmOpts, VisionPrompt};

/// A driver that always gives the same answer.
#[derive(Debug)]
pub struct CannedDriver {
    /// Our reply, or an error message.
    reply: Result<Vec<Option<String>>, String>,

    /// The most recent prompt we were sent.
    last_prompt: Mutex<Option<VisionPrompt>>,
}

impl CannedDriver {
    /// Reply with a single choice containing `content`.
    pub fn replying(content: &str) -> Self {
        Self::with_choices(vec![Some(content.to_owned())])
    }

    /// Reply with exactly these choices.
    pub fn with_choices(choices: Vec<Option<String>>) -> Self {
        Self {
            reply: Ok(choices),
            last_prompt: Mutex::new(None),
        }
    }

    /// Fail every request.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_owned()),
            last_prompt: Mutex::new(None),
        }
    }

    /// The most recent prompt we were sent.
    pub fn last_prompt(&self) -> Option<VisionPrompt> {
        self.last_prompt.lock().unwrap().clone()
    }
}

#[async_trait]
impl Driver for CannedDriver {
    async fn chat_completion(
        &self,
        prompt: &VisionPrompt,
        _llm_opts: &LlmOpts,
    ) -> Result<ChatCompletionResponse> {
        *self.last_prompt.lock().unwrap() = Some(prompt.clone());
        match &self.reply {
            Ok(choices) => Ok(ChatCompletionResponse {
                choices: choices.clone(),
            }),
            Err(message) => Err(anyhow!("{message}")),
        }
    }
}
