//! Tesseract OCR engine.

use std::{fs::File, io::Write as _, sync::LazyLock};

use regex::Regex;
use tokio::process::Command;

use crate::{async_utils::check_for_command_failure, prelude::*};

use super::ocr::OcrEngine;

/// Lines in tesseract's standard error that mean it failed.
static ERROR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^(leptonica )?error\b").expect("failed to compile regex")
});

/// OCR engine wrapping the `tesseract` CLI tool.
#[derive(Debug)]
pub struct TesseractOcrEngine {
    /// The `tesseract` executable.
    command: PathBuf,

    /// Language(s) to pass with `-l`.
    lang: Option<String>,
}

impl TesseractOcrEngine {
    /// Create a new `tesseract` engine.
    pub fn new(command: PathBuf, lang: Option<String>) -> Self {
        Self { command, lang }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcrEngine {
    #[instrument(level = "debug", skip_all, fields(command = %self.command.display()))]
    async fn recognize_png(&self, png: &[u8]) -> Result<String> {
        // Write our input to a temporary file.
        let tmpdir = tempfile::TempDir::with_prefix("tesseract")?;
        let input_path = tmpdir.path().join("input.png");
        let output_path = tmpdir.path().join("output.txt");
        let mut input_file =
            File::create(&input_path).context("cannot create tesseract input file")?;
        input_file
            .write_all(png)
            .context("cannot write tesseract input file")?;
        input_file
            .flush()
            .context("cannot flush tesseract input file")?;

        // Run tesseract on the input file. It appends `.txt` to the output
        // base name itself.
        let mut command = Command::new(&self.command);
        command.arg(&input_path).arg(output_path.with_extension(""));
        if let Some(lang) = &self.lang {
            command.arg("-l").arg(lang);
        }
        let output = command.output().await.context("cannot run tesseract")?;
        check_for_command_failure("tesseract", &output, Some(&*ERROR_REGEX))?;

        // Read the output file.
        tokio::fs::read_to_string(&output_path)
            .await
            .context("cannot read tesseract output file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_executable_is_an_error() {
        let engine = TesseractOcrEngine::new(
            PathBuf::from("/nonexistent/budgetlens/tesseract"),
            None,
        );
        let err = engine.recognize_png(b"png").await.unwrap_err();
        assert!(format!("{err:#}").contains("cannot run tesseract"));
    }

    #[test]
    fn error_lines_are_recognized() {
        let stderr = "Estimating resolution as 300\nError in pixReadStream";
        assert!(ERROR_REGEX.is_match(stderr));
        assert!(ERROR_REGEX.is_match("Leptonica Error in findFileFormat"));
        assert!(!ERROR_REGEX.is_match("Warning: Invalid resolution 0 dpi"));
    }
}
