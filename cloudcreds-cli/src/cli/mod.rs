//! # Command Line Interface
//!
//! Defines the CLI structure and dispatches each subcommand to its handler.

mod cleanup;
mod delete;
mod env;
mod paths;
mod sync;
mod write;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cloudcreds_core::{ConfigDirs, CredentialRecord, StoreContext};

use crate::output::ColorMode;

/// Top-level CLI command for cloudcreds
#[derive(Parser)]
#[command(name = "cloudcreds")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Native-format credential files for AWS and Azure tooling")]
#[command(
  long_about = "Cloudcreds writes already-authenticated AWS and Azure credentials into the files\n\
        the AWS CLI, the Azure CLI and MSAL-based tools read, so unmodified tools pick\n\
        them up. Shared files are updated under a file lock and never lose other identities."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  /// Use this directory instead of the platform config directory
  #[arg(long, global = true, value_name = "DIR")]
  pub config_dir: Option<PathBuf>,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for cloudcreds
#[derive(Subcommand)]
pub enum Commands {
  /// Write a credential record into the native files
  #[command(long_about = "Reads a credential record (JSON, tagged with \"kind\": \"aws\" or \"azure\")\n\
            and writes it into the provider's native files. AWS records become sections in the\n\
            shared credentials and config files; Azure records replace the provider's\n\
            credentials.json and can also update the Azure CLI files.")]
  Write(write::WriteArgs),

  /// Remove an identity's credentials
  #[command(alias = "rm")]
  Delete(delete::DeleteArgs),

  /// Print environment assignments for an identity
  #[command(long_about = "Prints shell export lines that point AWS or Azure tooling at the files\n\
            written for an identity. Intended for `eval \"$(cloudcreds env ...)\"`.")]
  Env(env::EnvArgs),

  /// Update the Azure CLI token cache and profile from a record
  #[command(name = "sync-azure-cli")]
  SyncAzureCli(sync::SyncArgs),

  /// Remove files for a provider, or everything
  Cleanup(cleanup::CleanupArgs),

  /// Show where files are written
  Paths(paths::PathsArgs),
}

/// Which cloud's files a command touches
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
  Aws,
  Azure,
  All,
}

impl Cloud {
  pub fn includes_aws(self) -> bool {
    matches!(self, Cloud::Aws | Cloud::All)
  }

  pub fn includes_azure(self) -> bool {
    matches!(self, Cloud::Azure | Cloud::All)
  }
}

/// Handle the parsed command line
pub fn handle_cli(cli: Cli) -> Result<()> {
  cli.colors.apply();

  let context = load_context(cli.config_dir.as_deref())?;

  match cli.command {
    Commands::Write(args) => write::handle_write_command(&context, args),
    Commands::Delete(args) => delete::handle_delete_command(&context, args),
    Commands::Env(args) => env::handle_env_command(&context, args),
    Commands::SyncAzureCli(args) => sync::handle_sync_command(&context, args),
    Commands::Cleanup(args) => cleanup::handle_cleanup_command(&context, args),
    Commands::Paths(args) => paths::handle_paths_command(&context, args),
  }
}

fn load_context(config_dir: Option<&Path>) -> Result<StoreContext> {
  match config_dir {
    Some(dir) => {
      let dirs = ConfigDirs::with_root(dir);
      let settings = dirs
        .load_settings()
        .with_context(|| format!("Failed to load settings from {}", dirs.settings_path().display()))?;
      Ok(StoreContext::new(dirs, settings))
    }
    None => StoreContext::load().context("Failed to load configuration"),
  }
}

/// Read a credential record from `path`, or stdin when `path` is `-`.
pub(crate) fn read_record(path: &Path) -> Result<CredentialRecord> {
  let contents = if path == Path::new("-") {
    let mut buffer = String::new();
    io::stdin()
      .read_to_string(&mut buffer)
      .context("Failed to read credential record from stdin")?;
    buffer
  } else {
    fs::read_to_string(path).with_context(|| format!("Failed to read credential record {}", path.display()))?
  };

  serde_json::from_str(&contents).context("Failed to parse credential record")
}
