//! # Cleanup Command

use anyhow::{Context, Result, bail};
use clap::Args;
use cloudcreds_core::StoreContext;

use super::Cloud;
use crate::output::{format_name, format_path, print_success};

/// Remove credential files
#[derive(Args)]
pub struct CleanupArgs {
  /// Provider whose files to remove
  #[arg(long, short = 'p', required_unless_present = "all", conflicts_with = "all")]
  pub provider: Option<String>,

  /// Remove the base directories for every provider
  #[arg(long)]
  pub all: bool,

  /// Which cloud's files to remove
  #[arg(long, value_enum, default_value_t = Cloud::All)]
  pub cloud: Cloud,
}

pub(crate) fn handle_cleanup_command(context: &StoreContext, args: CleanupArgs) -> Result<()> {
  match (&args.provider, args.all) {
    (_, true) => cleanup_all(context, args.cloud),
    (Some(provider), false) => cleanup_provider(context, provider, args.cloud),
    (None, false) => bail!("Either --provider or --all is required"),
  }
}

fn cleanup_provider(context: &StoreContext, provider: &str, cloud: Cloud) -> Result<()> {
  if cloud.includes_aws() {
    context
      .aws_files(provider)?
      .cleanup(provider)
      .with_context(|| format!("Failed to clean up AWS files for '{provider}'"))?;
  }
  if cloud.includes_azure() {
    context
      .azure_files(provider)?
      .cleanup(provider)
      .with_context(|| format!("Failed to clean up Azure files for '{provider}'"))?;
  }

  print_success(&format!("Removed files for provider {}", format_name(provider)));
  Ok(())
}

fn cleanup_all(context: &StoreContext, cloud: Cloud) -> Result<()> {
  // Base directories do not depend on a provider unless one overrides it
  if cloud.includes_aws() {
    let manager = context.aws_files("")?;
    manager.cleanup_all().context("Failed to clean up AWS files")?;
    print_success(&format!("Removed {}", format_path(&manager.display_path())));
  }
  if cloud.includes_azure() {
    let manager = context.azure_files("")?;
    manager.cleanup_all().context("Failed to clean up Azure files")?;
    print_success(&format!("Removed {}", format_path(&manager.display_path())));
  }
  Ok(())
}
