//! Receipt extraction pipeline.
//!
//! An image goes in, and we get back an [`Extraction`]. Which engine does the
//! work (local OCR or a hosted vision model) is a configuration choice; see
//! [`engines::extraction_engine_for_backend`].

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use schemars::JsonSchema;

use crate::{
    data_url::{data_url, image_mime_type},
    drivers::LlmOpts,
    models::ExtractedReceipt,
    prelude::*,
};

use self::engines::{ExtractionEngine, extraction_engine_for_backend};

pub mod engines;
pub mod fields;
pub mod normalize;
pub mod preprocess;

/// The result of trying to read a receipt.
///
/// Extraction never fails outright. When an engine can't help, we say why
/// and offer a fallback, and the caller decides whether to use it.
#[derive(Clone, Debug, PartialEq, Serialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Extraction {
    /// We read the receipt.
    Extracted(ExtractedReceipt),

    /// We couldn't read the receipt.
    Unavailable {
        /// Why not.
        reason: String,
        /// Default values to use in place of real data.
        fallback: ExtractedReceipt,
    },
}

impl Extraction {
    /// Did an engine actually read the receipt?
    pub fn is_extracted(&self) -> bool {
        matches!(self, Extraction::Extracted(_))
    }

    /// The extracted fields, or the fallback.
    pub fn receipt(&self) -> &ExtractedReceipt {
        match self {
            Extraction::Extracted(receipt) => receipt,
            Extraction::Unavailable { fallback, .. } => fallback,
        }
    }
}

/// Which extraction backend to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum Backend {
    /// Local OCR using the `tesseract` CLI.
    Ocr,

    /// A hosted vision model behind an OpenAI-compatible API.
    #[default]
    Llm,
}

/// Options controlling receipt extraction.
#[derive(Args, Clone, Debug)]
pub struct ExtractOpts {
    /// How to read receipts.
    #[clap(long, value_enum, default_value_t = Backend::default())]
    pub backend: Backend,

    /// The currency assigned to OCR results. We don't detect currencies in
    /// OCR text yet.
    #[clap(long, default_value = "INR")]
    pub ocr_currency: String,

    /// Tesseract language(s), such as "eng" or "deu+eng".
    #[clap(long)]
    pub ocr_lang: Option<String>,

    /// Path to the `tesseract` executable.
    #[clap(long, default_value = "tesseract")]
    pub tesseract: PathBuf,

    #[clap(flatten)]
    pub llm: LlmOpts,
}

impl ExtractOpts {
    /// Create the configured extraction engine.
    pub fn create_engine(&self) -> Arc<dyn ExtractionEngine> {
        let driver = match self.backend {
            Backend::Llm => self.llm.create_driver(),
            Backend::Ocr => None,
        };
        extraction_engine_for_backend(self, driver)
    }
}

/// The MIME type we give files we can't identify.
const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// A receipt image, as uploaded.
#[derive(Debug)]
pub struct ReceiptImage {
    /// Where we read it from.
    pub path: PathBuf,

    /// The MIME type of `data`.
    pub mime_type: String,

    /// Raw, undecoded image data.
    pub data: Vec<u8>,
}

impl ReceiptImage {
    /// Read an image from disk. Files we can't identify are still read, and
    /// left for the extraction engine to reject.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read receipt image {:?}", path.display()))?;
        let mime_type = image_mime_type(path, &data).unwrap_or_else(|err| {
            warn!("{err:#}");
            UNKNOWN_MIME_TYPE.to_owned()
        });
        Ok(Self {
            path: path.to_owned(),
            mime_type,
            data,
        })
    }

    /// Convert to a data URL.
    pub fn to_data_url(&self) -> String {
        data_url(&self.mime_type, &self.data)
    }
}

/// Today's date, in local time.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn extraction_serializes_with_status_tag() {
        let receipt = ExtractedReceipt {
            amount: None,
            date: None,
            description: "Receipt Expense".to_owned(),
            category: Category::Miscellaneous,
            currency: "INR".to_owned(),
        };
        let json = serde_json::to_value(Extraction::Extracted(receipt.clone())).unwrap();
        assert_eq!(json["status"], "extracted");
        assert_eq!(json["currency"], "INR");

        let unavailable = Extraction::Unavailable {
            reason: "no engine".to_owned(),
            fallback: receipt.clone(),
        };
        assert!(!unavailable.is_extracted());
        assert_eq!(unavailable.receipt(), &receipt);
        let json = serde_json::to_value(&unavailable).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["fallback"]["category"], "Miscellaneous");
    }

    #[tokio::test]
    async fn unidentified_files_are_still_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("receipt");
        tokio::fs::write(&path, b"???").await.unwrap();

        let image = ReceiptImage::from_path(&path).await.unwrap();
        assert_eq!(image.mime_type, UNKNOWN_MIME_TYPE);
        assert_eq!(image.data, b"???");

        assert!(ReceiptImage::from_path(&dir.path().join("missing.png")).await.is_err());
    }
}
