//! # Output Formatting
//!
//! Status lines with colors and emojis for the operator. Machine-readable
//! output (environment assignments) goes to stdout unadorned.

use owo_colors::OwoColorize;

/// When colored output is used
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Enable colored output
  Yes,
  /// Enable colored output (alias for Yes)
  Always,
  /// Detect from the terminal
  Auto,
  /// Disable colored output
  No,
  /// Disable colored output (alias for No)
  Never,
}

impl ColorMode {
  pub fn apply(self) {
    match self {
      ColorMode::Always | ColorMode::Yes => owo_colors::set_override(true),
      ColorMode::Never | ColorMode::No => owo_colors::set_override(false),
      ColorMode::Auto => {}
    }
  }
}

/// Emoji for `name`, or `default` when the shortcode is unknown
pub fn get_emoji_or_default(name: &str, default: &str) -> String {
  match emojis::get_by_shortcode(name) {
    Some(emoji) => emoji.to_string(),
    None => default.to_string(),
  }
}

pub fn print_success(message: &str) {
  let check = get_emoji_or_default("check_mark", "✓");
  eprintln!("{} {}", check.green().bold(), message);
}

pub fn print_warning(message: &str) {
  let warning = get_emoji_or_default("warning", "⚠");
  eprintln!("{} {}", warning.yellow().bold(), message);
}

pub fn print_info(message: &str) {
  let info = get_emoji_or_default("information", "ℹ");
  eprintln!("{} {}", info.blue().bold(), message);
}

/// Format a file or directory path
pub fn format_path(path: &str) -> String {
  path.bright_green().to_string()
}

/// Format a provider or identity name
pub fn format_name(name: &str) -> String {
  name.bright_cyan().bold().to_string()
}
