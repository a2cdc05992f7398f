//! # Delete Command
//!
//! Removes one identity's credentials while leaving every other identity in
//! the shared files untouched.

use anyhow::{Context, Result};
use clap::Args;
use cloudcreds_core::StoreContext;

use super::Cloud;
use crate::output::{format_name, print_success};

/// Remove an identity's credentials
#[derive(Args)]
pub struct DeleteArgs {
  /// Provider the identity authenticated through
  #[arg(long, short = 'p')]
  pub provider: String,

  /// Identity to remove
  #[arg(long, short = 'i')]
  pub identity: String,

  /// Which cloud's files to remove from
  #[arg(long, value_enum, default_value_t = Cloud::All)]
  pub cloud: Cloud,

  /// Also drop the service principal entry for this client id
  #[arg(long, value_name = "CLIENT_ID")]
  pub client_id: Option<String>,
}

pub(crate) fn handle_delete_command(context: &StoreContext, args: DeleteArgs) -> Result<()> {
  if args.cloud.includes_aws() {
    context
      .aws_files(&args.provider)?
      .delete_identity(&args.provider, &args.identity)
      .with_context(|| format!("Failed to remove AWS profile '{}'", args.identity))?;
  }

  if args.cloud.includes_azure() {
    context
      .azure_files(&args.provider)?
      .delete_identity(&args.provider, &args.identity)
      .with_context(|| format!("Failed to remove Azure credentials for '{}'", args.identity))?;

    if let Some(client_id) = &args.client_id {
      context
        .azure_cli_files()?
        .service_principals()
        .remove(client_id)
        .with_context(|| format!("Failed to remove service principal entry '{client_id}'"))?;
    }
  }

  print_success(&format!("Removed credentials for {}", format_name(&args.identity)));
  Ok(())
}
