//! # Sync Azure CLI Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use cloudcreds_core::{Applied, StoreContext};

use crate::output::{format_path, print_info, print_success, print_warning};

/// Update the Azure CLI files from an Azure credential record
#[derive(Args)]
pub struct SyncArgs {
  /// Credential record JSON file, or `-` for stdin
  #[arg(long, short = 'f', value_name = "FILE")]
  pub file: PathBuf,
}

pub(crate) fn handle_sync_command(context: &StoreContext, args: SyncArgs) -> Result<()> {
  let record = super::read_record(&args.file)?;
  let files = context.azure_cli_files()?;

  let report = files.update_azure_cli_files(&record);
  if report.applied == Applied::NotApplicable {
    print_info("Record is not an Azure record; nothing to do");
    return Ok(());
  }

  // Individual step failures never abort the sync
  for failure in &report.failures {
    print_warning(&failure.to_string());
  }
  if report.is_complete() {
    print_success(&format!(
      "Updated Azure CLI files in {}",
      format_path(&cloudcreds_core::config::display_path(files.dir()))
    ));
  }
  Ok(())
}
