//! The `scan` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json,
    prelude::*,
    receipt::{ExtractOpts, ReceiptImage, local_today},
    ui::{ProgressConfig, Ui},
};

use super::OutputOpts;

/// Options for `scan`.
#[derive(Args, Debug)]
pub struct ScanOpts {
    /// The receipt image to read.
    pub image: PathBuf,

    #[clap(flatten)]
    pub extract: ExtractOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// The `scan` subcommand: read a receipt without saving anything.
#[instrument(level = "debug", skip_all, fields(image = %opts.image.display()))]
pub async fn cmd_scan(ui: &Ui, opts: &ScanOpts) -> Result<()> {
    let engine = opts.extract.create_engine();
    let image = ReceiptImage::from_path(&opts.image).await?;

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🧾",
        msg: "Reading receipt",
        done_msg: "Read receipt",
    });
    let extraction = engine.extract(&image, local_today()).await;
    spinner.finish_using_style();
    debug!(extracted = extraction.is_extracted(), "Finished reading receipt");

    write_json(opts.output.output_path.as_deref(), &extraction).await
}
