//! Minimal os-release(5) parser.
//!
//! Only `KEY=value` assignments are understood. Values may be wrapped in
//! single or double quotes; backslash escapes inside double quotes are
//! unescaped. Comments and blank lines are skipped.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
  fields: BTreeMap<String, String>,
}

impl OsRelease {
  pub fn get(&self, key: &str) -> Option<&str> {
    self.fields.get(key).map(String::as_str)
  }

  /// The `ID` field, if present and non-empty.
  pub fn id(&self) -> Option<&str> {
    self.get("ID").filter(|id| !id.is_empty())
  }
}

pub fn parse(content: &str) -> OsRelease {
  let mut fields = BTreeMap::new();

  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let Some((key, value)) = line.split_once('=') else {
      continue;
    };
    fields.insert(key.trim().to_string(), unquote(value.trim()));
  }

  OsRelease { fields }
}

fn unquote(value: &str) -> String {
  if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
    return value[1..value.len() - 1].to_string();
  }
  if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
    let inner = &value[1..value.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
      if c == '\\' {
        if let Some(next) = chars.next() {
          out.push(next);
        }
      } else {
        out.push(c);
      }
    }
    return out;
  }
  value.to_string()
}
