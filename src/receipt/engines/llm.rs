//! Extraction using a hosted vision model.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    drivers::{Driver, LlmOpts, VisionPrompt},
    models::Category,
    prelude::*,
    receipt::{
        Extraction, ReceiptImage,
        normalize::{hosted_model_default, normalize_response},
    },
};

use super::ExtractionEngine;

/// Our instruction to the model. `{{categories}}` is replaced with our
/// category labels.
const RECEIPT_PROMPT: &str = include_str!("llm/receipt_prompt.txt");

/// Build the instruction we send along with each receipt.
pub fn receipt_prompt() -> String {
    let categories = Category::ALL.map(Category::label).join(", ");
    RECEIPT_PROMPT.trim().replace("{{categories}}", &categories)
}

/// A vision-model extraction engine.
pub struct LlmExtractionEngine {
    /// Our driver, if a model is configured.
    driver: Option<Arc<dyn Driver>>,

    /// Model, temperature and timeout.
    llm_opts: LlmOpts,
}

impl LlmExtractionEngine {
    /// Create a new vision-model engine. With no driver, every extraction is
    /// unavailable.
    pub fn new(driver: Option<Arc<dyn Driver>>, llm_opts: LlmOpts) -> Self {
        Self { driver, llm_opts }
    }
}

#[async_trait]
impl ExtractionEngine for LlmExtractionEngine {
    #[instrument(
        level = "debug",
        skip_all,
        fields(path = %image.path.display(), model = %self.llm_opts.model)
    )]
    async fn extract(&self, image: &ReceiptImage, today: NaiveDate) -> Extraction {
        let unavailable = |reason: String| Extraction::Unavailable {
            reason,
            fallback: hosted_model_default(today),
        };

        let Some(driver) = &self.driver else {
            warn!("No vision model configured, using default receipt values");
            return unavailable(
                "no vision model is configured (set OPENAI_API_KEY)".to_owned(),
            );
        };

        if !image.mime_type.starts_with("image/") {
            warn!(mime_type = %image.mime_type, "Not an image, using default receipt values");
            return unavailable(format!(
                "{:?} is not an image we recognize",
                image.path.display()
            ));
        }

        let prompt = VisionPrompt {
            text: receipt_prompt(),
            image_data_url: image.to_data_url(),
        };
        let response = match driver.chat_completion(&prompt, &self.llm_opts).await {
            Ok(response) => response,
            Err(err) => {
                error!("Error processing receipt with vision model: {err:#}");
                return unavailable(format!("{err:#}"));
            }
        };

        match response.first_content() {
            Some(content) => {
                debug!(content, "Response from vision model");
                normalize_response(content, today)
            }
            None => {
                error!("Empty or invalid response from vision model");
                unavailable("vision model returned no content".to_owned())
            }
        }
    }
}
