//! The `upload` subcommand.

use clap::Args;

use crate::{
    async_utils::io::write_json,
    prelude::*,
    receipt::ExtractOpts,
    store::discard_receipt_image,
    ui::{ProgressConfig, Ui},
};

use super::{BookOpts, OutputOpts};

/// Options for `upload`.
#[derive(Args, Debug)]
pub struct UploadOpts {
    /// The receipt image to read.
    pub image: PathBuf,

    #[clap(flatten)]
    pub extract: ExtractOpts,

    #[clap(flatten)]
    pub book: BookOpts,

    #[clap(flatten)]
    pub output: OutputOpts,
}

/// The `upload` subcommand: create an expense from a receipt.
#[instrument(level = "debug", skip_all, fields(image = %opts.image.display()))]
pub async fn cmd_upload(ui: &Ui, opts: &UploadOpts) -> Result<()> {
    let engine = opts.extract.create_engine();
    let bookkeeper = opts.book.bookkeeper()?;
    let mut ledger = opts.book.ledger.load().await?;

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🧾",
        msg: "Reading receipt",
        done_msg: "Saved expense",
    });
    let upload = bookkeeper
        .upload_receipt(
            engine.as_ref(),
            &mut ledger,
            &opts.book.ledger.user,
            &opts.image,
        )
        .await?;
    if let Err(err) = opts.book.ledger.save(&ledger).await {
        if let Some(path) = &upload.expense.receipt_image {
            discard_receipt_image(path).await;
        }
        return Err(err);
    }
    spinner.finish_using_style();

    info!(id = upload.expense.id, "Created expense from receipt");
    write_json(opts.output.output_path.as_deref(), &upload).await
}
