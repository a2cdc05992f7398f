//! # Env Command
//!
//! Prints `export` lines for the files written for an identity.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use cloudcreds_core::{EnvVar, StoreContext, azure};

/// Print environment assignments
#[derive(Args)]
pub struct EnvArgs {
  /// Provider the identity authenticated through
  #[arg(long, short = 'p')]
  pub provider: String,

  /// Identity name
  #[arg(long, short = 'i')]
  pub identity: String,

  /// Which cloud to print variables for
  #[arg(long, value_enum)]
  pub cloud: EnvCloud,

  /// Print bare KEY=value pairs instead of shell exports
  #[arg(long)]
  pub plain: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCloud {
  Aws,
  Azure,
}

pub(crate) fn handle_env_command(context: &StoreContext, args: EnvArgs) -> Result<()> {
  let vars = match args.cloud {
    EnvCloud::Aws => context
      .aws_files(&args.provider)?
      .environment_variables(&args.provider, &args.identity),
    EnvCloud::Azure => {
      let manager = context.azure_files(&args.provider)?;
      let creds = manager
        .load_credentials(&args.provider)
        .with_context(|| format!("No Azure credentials stored for provider '{}'", args.provider))?;
      azure::environment_variables(&creds)
    }
  };

  print!("{}", render(&vars, args.plain));
  Ok(())
}

fn render(vars: &[EnvVar], plain: bool) -> String {
  vars
    .iter()
    .map(|var| {
      if plain {
        format!("{var}\n")
      } else {
        format!("{}\n", var.to_shell_export())
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn renders_exports_and_plain_pairs() {
    let vars = vec![EnvVar::new("AWS_PROFILE", "dev"), EnvVar::new("AWS_CONFIG_FILE", "/tmp/c")];

    assert_eq!(
      render(&vars, false),
      "export AWS_PROFILE='dev'\nexport AWS_CONFIG_FILE='/tmp/c'\n"
    );
    assert_eq!(render(&vars, true), "AWS_PROFILE=dev\nAWS_CONFIG_FILE=/tmp/c\n");
  }
}
