//! # INI Documents
//!
//! A small reader/writer for the INI dialect used by the AWS CLI `credentials`
//! and `config` files. Section order, key order and comments survive a
//! load/save cycle, so rewriting one identity's section leaves every other
//! section as it was. Comment lines directly above a section header belong to
//! that section; comment lines above a key belong to that key.

use thiserror::Error;

/// Name of the implicit section holding keys that appear before any header.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Errors raised while parsing INI text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IniError {
  #[error("line {line}: unterminated section header")]
  UnterminatedHeader { line: usize },
  #[error("line {line}: key-value delimiter not found")]
  MissingDelimiter { line: usize },
  #[error("line {line}: empty key name")]
  EmptyKey { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Key {
  name: String,
  value: String,
  comment: Option<String>,
}

/// A named `[name]` block of `key = value` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
  name: String,
  comment: Option<String>,
  keys: Vec<Key>,
}

impl Section {
  fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      comment: None,
      keys: Vec::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Comment text shown above the header, one entry per line.
  pub fn comment(&self) -> Option<&str> {
    self.comment.as_deref()
  }

  /// Replace the header comment. `None` or an empty string clears it.
  pub fn set_comment(&mut self, comment: Option<String>) {
    self.comment = comment.filter(|c| !c.is_empty());
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.keys().find(|(name, _)| *name == key).map(|(_, value)| value)
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.get(key).is_some()
  }

  /// Set a key, keeping its position if it already exists.
  pub fn set(&mut self, key: &str, value: &str) {
    match self.keys.iter_mut().find(|k| k.name == key) {
      Some(existing) => existing.value = value.to_string(),
      None => self.keys.push(Key {
        name: key.to_string(),
        value: value.to_string(),
        comment: None,
      }),
    }
  }

  /// Delete a key and its comment. Returns whether it was present.
  pub fn remove(&mut self, key: &str) -> bool {
    let before = self.keys.len();
    self.keys.retain(|k| k.name != key);
    before != self.keys.len()
  }

  pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .keys
      .iter()
      .filter(|k| !k.name.is_empty())
      .map(|k| (k.name.as_str(), k.value.as_str()))
  }

  fn is_empty(&self) -> bool {
    self.keys.is_empty() && self.comment.is_none()
  }
}

/// An ordered collection of sections plus the implicit default section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniDocument {
  default: Section,
  sections: Vec<Section>,
}

impl Default for IniDocument {
  fn default() -> Self {
    Self {
      default: Section::new(DEFAULT_SECTION),
      sections: Vec::new(),
    }
  }
}

impl IniDocument {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse INI text. Repeated headers merge into the first occurrence.
  ///
  /// Keys may use `=` or `:` as the delimiter, text after a header's closing
  /// `]` is ignored, and a `;` or `#` preceded by whitespace starts an inline
  /// comment. Inline comments are kept as comment lines above their header
  /// or key. Comment lines directly below a section's last key stay with that
  /// section unless a blank line separates them from what follows.
  pub fn parse(text: &str) -> Result<Self, IniError> {
    let mut doc = Self::new();
    let mut current: Option<usize> = None;
    let mut pending: Vec<&str> = Vec::new();
    // Set while the pending comments directly follow a key line.
    let mut trailing = false;
    let mut after_key = false;

    for (index, raw) in text.lines().enumerate() {
      let line_no = index + 1;
      let line = raw.trim();

      if line.is_empty() {
        if trailing {
          doc.push_trailing_comment(current, &mut pending);
          trailing = false;
        }
        after_key = false;
        continue;
      }
      if line.starts_with(';') || line.starts_with('#') {
        if pending.is_empty() {
          trailing = after_key;
        }
        pending.push(line);
        continue;
      }

      if let Some(rest) = line.strip_prefix('[') {
        let end = rest.rfind(']').ok_or(IniError::UnterminatedHeader { line: line_no })?;
        let name = rest[..end].trim();
        if trailing {
          doc.push_trailing_comment(current, &mut pending);
          trailing = false;
        }
        after_key = false;

        let rest_of_line = rest[end + 1..].trim();
        if rest_of_line.starts_with(';') || rest_of_line.starts_with('#') {
          pending.push(rest_of_line);
        }
        let comment = take_comment(&mut pending);

        if name == DEFAULT_SECTION {
          current = None;
          if comment.is_some() {
            doc.default.comment = comment;
          }
          continue;
        }
        let index = doc.section_index_or_insert(name);
        if comment.is_some() {
          doc.sections[index].comment = comment;
        }
        current = Some(index);
        continue;
      }

      let delimiter = line.find(['=', ':']).ok_or(IniError::MissingDelimiter { line: line_no })?;
      let key = line[..delimiter].trim();
      if key.is_empty() {
        return Err(IniError::EmptyKey { line: line_no });
      }
      let (value, inline_comment) = split_inline_comment(&line[delimiter + 1..]);
      pending.extend(inline_comment);
      trailing = false;
      after_key = true;

      let comment = take_comment(&mut pending);
      let section = doc.section_at(current);
      section.set(key, value);
      if let Some(entry) = section.keys.iter_mut().find(|k| k.name == key) {
        entry.comment = comment;
      }
    }

    // Comments with nothing below them stay with the last section.
    doc.push_trailing_comment(current, &mut pending);

    Ok(doc)
  }

  fn section_at(&mut self, current: Option<usize>) -> &mut Section {
    match current {
      Some(index) => &mut self.sections[index],
      None => &mut self.default,
    }
  }

  /// Attach `pending` comment lines to the end of the current section.
  fn push_trailing_comment(&mut self, current: Option<usize>, pending: &mut Vec<&str>) {
    if let Some(comment) = take_comment(pending) {
      self.section_at(current).keys.push(Key {
        name: String::new(),
        value: String::new(),
        comment: Some(comment),
      });
    }
  }

  fn section_index_or_insert(&mut self, name: &str) -> usize {
    match self.sections.iter().position(|s| s.name == name) {
      Some(index) => index,
      None => {
        self.sections.push(Section::new(name));
        self.sections.len() - 1
      }
    }
  }

  pub fn section(&self, name: &str) -> Option<&Section> {
    if name == DEFAULT_SECTION {
      return Some(&self.default);
    }
    self.sections.iter().find(|s| s.name == name)
  }

  /// Get a section for mutation, appending an empty one if absent.
  pub fn section_mut_or_insert(&mut self, name: &str) -> &mut Section {
    if name == DEFAULT_SECTION {
      return &mut self.default;
    }
    let index = self.section_index_or_insert(name);
    &mut self.sections[index]
  }

  /// Delete a named section. Returns whether it was present.
  pub fn remove_section(&mut self, name: &str) -> bool {
    if name == DEFAULT_SECTION {
      let had_content = !self.default.is_empty();
      self.default = Section::new(DEFAULT_SECTION);
      return had_content;
    }
    let before = self.sections.len();
    self.sections.retain(|s| s.name != name);
    before != self.sections.len()
  }

  /// Names of the explicit sections, in file order.
  pub fn section_names(&self) -> impl Iterator<Item = &str> {
    self.sections.iter().map(|s| s.name.as_str())
  }

  /// True when any section other than the implicit default exists.
  pub fn has_named_sections(&self) -> bool {
    !self.sections.is_empty()
  }

  /// Render the document back to INI text.
  pub fn render(&self) -> String {
    let mut out = String::new();

    if !self.default.is_empty() {
      write_comment(&mut out, self.default.comment.as_deref());
      write_keys(&mut out, &self.default.keys);
    }

    for section in &self.sections {
      if !out.is_empty() {
        out.push('\n');
      }
      write_comment(&mut out, section.comment.as_deref());
      out.push('[');
      out.push_str(&section.name);
      out.push_str("]\n");
      write_keys(&mut out, &section.keys);
    }

    out
  }
}

/// Split `value` at the first `;` or `#` that follows whitespace.
fn split_inline_comment(value: &str) -> (&str, Option<&str>) {
  let mut previous_is_space = false;
  for (index, ch) in value.char_indices() {
    if (ch == ';' || ch == '#') && previous_is_space {
      return (value[..index].trim(), Some(value[index..].trim_end()));
    }
    previous_is_space = ch.is_whitespace();
  }
  (value.trim(), None)
}

fn take_comment(pending: &mut Vec<&str>) -> Option<String> {
  if pending.is_empty() {
    return None;
  }
  let comment = pending.join("\n");
  pending.clear();
  Some(comment)
}

fn write_comment(out: &mut String, comment: Option<&str>) {
  let Some(comment) = comment else {
    return;
  };
  for line in comment.lines() {
    if !(line.starts_with(';') || line.starts_with('#')) {
      out.push_str("; ");
    }
    out.push_str(line);
    out.push('\n');
  }
}

fn write_keys(out: &mut String, keys: &[Key]) {
  for key in keys {
    write_comment(out, key.comment.as_deref());
    if key.name.is_empty() {
      continue;
    }
    out.push_str(&key.name);
    out.push_str(" = ");
    out.push_str(&key.value);
    out.push('\n');
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_sections_keys_and_header_comments() {
    let text = "; atmos: expiration=2030-01-01T00:00:00Z\n[dev]\naws_access_key_id = AKIA1\naws_secret_access_key=s1\n\n[prod]\nregion = us-east-1\n";

    let doc = IniDocument::parse(text).unwrap();
    let dev = doc.section("dev").unwrap();

    assert_eq!(dev.comment(), Some("; atmos: expiration=2030-01-01T00:00:00Z"));
    assert_eq!(dev.get("aws_access_key_id"), Some("AKIA1"));
    assert_eq!(dev.get("aws_secret_access_key"), Some("s1"));
    assert_eq!(doc.section("prod").unwrap().get("region"), Some("us-east-1"));
    assert_eq!(doc.section_names().collect::<Vec<_>>(), vec!["dev", "prod"]);
  }

  #[test]
  fn values_keep_embedded_equals_signs() {
    let doc = IniDocument::parse("[dev]\naws_session_token = abc/def+ghi==\n").unwrap();
    assert_eq!(doc.section("dev").unwrap().get("aws_session_token"), Some("abc/def+ghi=="));
  }

  #[test]
  fn keys_before_any_header_land_in_default_section() {
    let doc = IniDocument::parse("region = eu-west-1\n[dev]\noutput = json\n").unwrap();
    assert_eq!(doc.section(DEFAULT_SECTION).unwrap().get("region"), Some("eu-west-1"));
    assert!(doc.has_named_sections());
  }

  #[test]
  fn repeated_headers_merge() {
    let doc = IniDocument::parse("[dev]\na = 1\n[prod]\nb = 2\n[dev]\nc = 3\n").unwrap();
    let dev = doc.section("dev").unwrap();
    assert_eq!(dev.get("a"), Some("1"));
    assert_eq!(dev.get("c"), Some("3"));
    assert_eq!(doc.section_names().count(), 2);
  }

  #[test]
  fn rejects_malformed_lines() {
    assert_eq!(
      IniDocument::parse("[dev\n").unwrap_err(),
      IniError::UnterminatedHeader { line: 1 }
    );
    assert_eq!(
      IniDocument::parse("[dev]\nnot a pair\n").unwrap_err(),
      IniError::MissingDelimiter { line: 2 }
    );
    assert_eq!(IniDocument::parse("[dev]\n = x\n").unwrap_err(), IniError::EmptyKey { line: 2 });
  }

  #[test]
  fn set_updates_in_place_and_remove_deletes() {
    let mut doc = IniDocument::parse("[dev]\na = 1\nb = 2\n").unwrap();
    let dev = doc.section_mut_or_insert("dev");
    dev.set("a", "10");
    dev.set("c", "3");
    assert!(dev.remove("b"));
    assert!(!dev.remove("missing"));

    assert_eq!(doc.render(), "[dev]\na = 10\nc = 3\n");
  }

  #[test]
  fn render_round_trips_comments() {
    let text = "# managed file\n[dev]\n; rotated weekly\naws_access_key_id = AKIA1\n\n; atmos: expiration=2030-01-01T00:00:00Z\n[ops]\naws_access_key_id = AKIA2\n";
    let doc = IniDocument::parse(text).unwrap();
    assert_eq!(doc.render(), text);
  }

  #[test]
  fn set_comment_prefixes_plain_text() {
    let mut doc = IniDocument::new();
    let section = doc.section_mut_or_insert("dev");
    section.set_comment(Some("atmos: expiration=2030-01-01T00:00:00Z".to_string()));
    section.set("aws_access_key_id", "AKIA1");

    insta::assert_snapshot!(doc.render(), @r"
    ; atmos: expiration=2030-01-01T00:00:00Z
    [dev]
    aws_access_key_id = AKIA1
    ");

    doc.section_mut_or_insert("dev").set_comment(None);
    assert_eq!(doc.render(), "[dev]\naws_access_key_id = AKIA1\n");
  }

  #[test]
  fn removing_last_named_section_leaves_only_default() {
    let mut doc = IniDocument::parse("[dev]\na = 1\n").unwrap();
    assert!(doc.remove_section("dev"));
    assert!(!doc.remove_section("dev"));
    assert!(!doc.has_named_sections());
    assert_eq!(doc.render(), "");
  }

  #[test]
  fn header_text_after_closing_bracket_is_ignored() {
    let doc = IniDocument::parse("[legacy] ; rotated by hand\naws_access_key_id = AKIA0\n").unwrap();
    let legacy = doc.section("legacy").unwrap();

    assert_eq!(legacy.get("aws_access_key_id"), Some("AKIA0"));
    assert_eq!(legacy.comment(), Some("; rotated by hand"));
    assert_eq!(doc.render(), "; rotated by hand\n[legacy]\naws_access_key_id = AKIA0\n");
  }

  #[test]
  fn colon_delimits_keys_when_it_comes_first() {
    let doc = IniDocument::parse("[profile legacy]\nregion: us-east-1\nendpoint_url = http://localhost:4566\n").unwrap();
    let legacy = doc.section("profile legacy").unwrap();

    assert_eq!(legacy.get("region"), Some("us-east-1"));
    assert_eq!(legacy.get("endpoint_url"), Some("http://localhost:4566"));
  }

  #[test]
  fn inline_comments_need_leading_whitespace() {
    let doc = IniDocument::parse("[dev]\noutput = json ; team default\ntoken = abc;def#ghi\n").unwrap();
    let dev = doc.section("dev").unwrap();

    assert_eq!(dev.get("output"), Some("json"));
    assert_eq!(dev.get("token"), Some("abc;def#ghi"));
    assert_eq!(doc.render(), "[dev]\n; team default\noutput = json\ntoken = abc;def#ghi\n");
  }

  #[test]
  fn comments_below_last_key_stay_with_their_section() {
    let mut doc = IniDocument::parse("[a]\nk = v\n; end of a\n[b]\nx = 1\n").unwrap();
    assert_eq!(doc.section("b").unwrap().comment(), None);

    doc.section_mut_or_insert("b").set_comment(None);
    assert_eq!(doc.render(), "[a]\nk = v\n; end of a\n\n[b]\nx = 1\n");
  }

  #[test]
  fn blank_line_hands_comments_to_the_next_header() {
    let doc = IniDocument::parse("[a]\nk = v\n\n; about b\n[b]\nx = 1\n").unwrap();
    assert_eq!(doc.section("b").unwrap().comment(), Some("; about b"));
  }
}
