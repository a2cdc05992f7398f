//! # Write Command
//!
//! Feeds a credential record into the native files of its cloud.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cloudcreds_core::{Applied, CredentialRecord, StoreContext};

use crate::output::{format_name, format_path, print_success, print_warning};

/// Write a credential record for an identity
#[derive(Args)]
pub struct WriteArgs {
  /// Provider the identity authenticated through
  #[arg(long, short = 'p')]
  pub provider: String,

  /// Identity name (becomes the AWS profile name)
  #[arg(long, short = 'i')]
  pub identity: String,

  /// Credential record JSON file, or `-` for stdin
  #[arg(long, short = 'f', value_name = "FILE")]
  pub file: PathBuf,

  /// Also update the Azure CLI token cache and profile (Azure records only)
  #[arg(long)]
  pub sync_azure_cli: bool,
}

pub(crate) fn handle_write_command(context: &StoreContext, args: WriteArgs) -> Result<()> {
  let record = super::read_record(&args.file)?;

  match &record {
    CredentialRecord::Aws(_) => write_aws(context, &args, &record),
    CredentialRecord::Azure(_) => write_azure(context, &args, &record),
  }
}

fn write_aws(context: &StoreContext, args: &WriteArgs, record: &CredentialRecord) -> Result<()> {
  let manager = context.aws_files(&args.provider)?;
  let applied = manager
    .setup_files(
      &args.provider,
      &args.identity,
      record,
      context.output_format(&args.provider),
    )
    .with_context(|| format!("Failed to write AWS files for identity '{}'", args.identity))?;

  if applied == Applied::Written {
    print_success(&format!(
      "Wrote AWS profile {} to {}",
      format_name(&args.identity),
      format_path(&manager.display_path()),
    ));
  }
  Ok(())
}

fn write_azure(context: &StoreContext, args: &WriteArgs, record: &CredentialRecord) -> Result<()> {
  let manager = context.azure_files(&args.provider)?;
  let applied = manager
    .setup_files(&args.provider, &args.identity, record)
    .with_context(|| format!("Failed to write Azure credentials for identity '{}'", args.identity))?;

  if applied == Applied::Written {
    print_success(&format!(
      "Wrote Azure credentials for {} to {}",
      format_name(&args.identity),
      format_path(&manager.display_path()),
    ));
  }

  if args.sync_azure_cli {
    let files = context.azure_cli_files()?;
    let report = files.update_azure_cli_files(record);
    for failure in &report.failures {
      print_warning(&format!("Azure CLI update incomplete: {failure}"));
    }
    if report.is_complete() {
      print_success("Updated Azure CLI files");
    }
  }
  Ok(())
}
