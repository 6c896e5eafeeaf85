//! Extraction engine interface.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{drivers::Driver, prelude::*};

use super::{Backend, ExtractOpts, Extraction, ReceiptImage};

pub mod llm;
pub mod ocr;
pub mod tesseract;

/// Interface to something that can read receipts.
#[async_trait]
pub trait ExtractionEngine: Send + Sync + 'static {
    /// Read a receipt. `today` is used for default dates.
    ///
    /// This never fails. Problems are reported as
    /// [`Extraction::Unavailable`].
    async fn extract(&self, image: &ReceiptImage, today: NaiveDate) -> Extraction;
}

/// Get the extraction engine for the configured backend.
///
/// `driver` is only used by the LLM backend, and may be `None` if no vision
/// model is configured.
pub fn extraction_engine_for_backend(
    opts: &ExtractOpts,
    driver: Option<Arc<dyn Driver>>,
) -> Arc<dyn ExtractionEngine> {
    match opts.backend {
        Backend::Ocr => Arc::new(ocr::OcrExtractionEngine::new(
            Arc::new(tesseract::TesseractOcrEngine::new(
                opts.tesseract.clone(),
                opts.ocr_lang.clone(),
            )),
            opts.ocr_currency.clone(),
        )),
        Backend::Llm => Arc::new(llm::LlmExtractionEngine::new(driver, opts.llm.clone())),
    }
}
