//! # Paths Command

use anyhow::Result;
use clap::Args;
use cloudcreds_core::StoreContext;
use cloudcreds_core::config::display_path;

use crate::output::{format_name, format_path};

/// Show file locations for a provider
#[derive(Args)]
pub struct PathsArgs {
  /// Provider to show paths for
  #[arg(long, short = 'p')]
  pub provider: String,
}

pub(crate) fn handle_paths_command(context: &StoreContext, args: PathsArgs) -> Result<()> {
  let aws = context.aws_files(&args.provider)?;
  let azure = context.azure_files(&args.provider)?;
  let cli_files = context.azure_cli_files()?;

  let rows = [
    ("settings", context.dirs().settings_path()),
    ("aws credentials", aws.credentials_path(&args.provider)),
    ("aws config", aws.config_path(&args.provider)),
    ("azure credentials", azure.credentials_path(&args.provider)),
    ("msal cache", cli_files.msal().path().to_path_buf()),
    ("azure profile", cli_files.profile().path().to_path_buf()),
    ("service principals", cli_files.service_principals().path().to_path_buf()),
  ];

  for (label, path) in rows {
    println!("{:<20} {}", format_name(label), format_path(&display_path(&path)));
  }
  Ok(())
}
