//! OCR-based extraction: preprocess, recognize text, then parse fields.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    async_utils::spawn_blocking_propagating_panics,
    models::{Category, ExtractedReceipt},
    prelude::*,
    receipt::{
        Extraction, ReceiptImage, fields::parse_receipt_text,
        preprocess::preprocess_to_png,
    },
};

use super::ExtractionEngine;

/// Description used when OCR can't run at all.
pub const OCR_UNAVAILABLE_DESCRIPTION: &str = "Receipt Expense (OCR not available)";

/// Interface to an engine that turns an image into text.
#[async_trait]
pub trait OcrEngine: Send + Sync + 'static {
    /// Recognize text in a PNG image.
    async fn recognize_png(&self, png: &[u8]) -> Result<String>;
}

/// Extraction engine built on local OCR.
pub struct OcrExtractionEngine {
    /// Turns pixels into text.
    ocr: Arc<dyn OcrEngine>,

    /// The currency we assign to every result.
    currency: String,
}

impl OcrExtractionEngine {
    /// Create a new OCR extraction engine.
    pub fn new(ocr: Arc<dyn OcrEngine>, currency: String) -> Self {
        Self {
            ocr,
            currency: currency.trim().to_uppercase(),
        }
    }

    fn unavailable(&self, reason: String) -> Extraction {
        Extraction::Unavailable {
            reason,
            fallback: ExtractedReceipt {
                amount: None,
                date: None,
                description: OCR_UNAVAILABLE_DESCRIPTION.to_owned(),
                category: Category::Miscellaneous,
                currency: self.currency.clone(),
            },
        }
    }
}

#[async_trait]
impl ExtractionEngine for OcrExtractionEngine {
    #[instrument(level = "debug", skip_all, fields(path = %image.path.display()))]
    async fn extract(&self, image: &ReceiptImage, _today: NaiveDate) -> Extraction {
        let data = image.data.clone();
        let png = match spawn_blocking_propagating_panics(move || preprocess_to_png(&data))
            .await
        {
            Ok(png) => png,
            Err(err) => {
                warn!("Cannot preprocess receipt: {err:#}");
                return self.unavailable(format!("{err:#}"));
            }
        };

        let text = match self.ocr.recognize_png(&png).await {
            Ok(text) => text,
            Err(err) => {
                warn!("OCR not available: {err:#}");
                return self.unavailable(format!("{err:#}"));
            }
        };
        debug!(%text, "OCR text");
        Extraction::Extracted(parse_receipt_text(&text, &self.currency))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use rust_decimal::Decimal;

    use super::*;

    /// OCR engine that returns fixed text without looking at the image.
    struct FixedText(Option<&'static str>);

    #[async_trait]
    impl OcrEngine for FixedText {
        async fn recognize_png(&self, _png: &[u8]) -> Result<String> {
            self.0
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("tesseract not installed"))
        }
    }

    fn receipt_image() -> ReceiptImage {
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])))
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();
        ReceiptImage {
            path: PathBuf::from("receipt.png"),
            mime_type: "image/png".to_owned(),
            data: png.into_inner(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
    }

    #[tokio::test]
    async fn recognized_text_is_parsed() {
        let engine = OcrExtractionEngine::new(
            Arc::new(FixedText(Some("UBER TRIP\n13/11/2024\nTotal 123.45"))),
            "inr".to_owned(),
        );
        let extraction = engine.extract(&receipt_image(), today()).await;
        assert!(extraction.is_extracted());
        let receipt = extraction.receipt();
        assert_eq!(receipt.amount, Some(Decimal::new(12345, 2)));
        assert_eq!(receipt.date, NaiveDate::from_ymd_opt(2024, 11, 13));
        assert_eq!(receipt.category, Category::Transportation);
        assert_eq!(receipt.currency, "INR");
    }

    #[tokio::test]
    async fn missing_ocr_gives_fallback() {
        let engine = OcrExtractionEngine::new(Arc::new(FixedText(None)), "INR".to_owned());
        let extraction = engine.extract(&receipt_image(), today()).await;
        match extraction {
            Extraction::Unavailable { reason, fallback } => {
                assert!(reason.contains("tesseract"));
                assert_eq!(fallback.amount, None);
                assert_eq!(fallback.date, None);
                assert_eq!(fallback.category, Category::Miscellaneous);
                assert_eq!(fallback.currency, "INR");
                assert_eq!(fallback.description, OCR_UNAVAILABLE_DESCRIPTION);
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_images_give_fallback() {
        let engine = OcrExtractionEngine::new(
            Arc::new(FixedText(Some("never used"))),
            "INR".to_owned(),
        );
        let image = ReceiptImage {
            path: PathBuf::from("receipt.png"),
            mime_type: "image/png".to_owned(),
            data: b"garbage".to_vec(),
        };
        assert!(!engine.extract(&image, today()).await.is_extracted());
    }
}
