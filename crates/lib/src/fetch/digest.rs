//! Digest parsing, hashing and checksum-list lookup.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256, Sha512};

use super::IntegrityError;

/// A known-good digest for an artifact.
///
/// The algorithm is inferred from the hex length: 64 characters for SHA-256,
/// 128 for SHA-512. Hex is stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "algorithm", content = "hex", rename_all = "lowercase")]
pub enum ExpectedDigest {
  Sha256(String),
  Sha512(String),
}

impl ExpectedDigest {
  pub fn parse(value: &str) -> Result<Self, IntegrityError> {
    let hex = value.trim().to_ascii_lowercase();
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(IntegrityError::MalformedDigest { value: value.to_string() });
    }
    match hex.len() {
      64 => Ok(Self::Sha256(hex)),
      128 => Ok(Self::Sha512(hex)),
      _ => Err(IntegrityError::MalformedDigest { value: value.to_string() }),
    }
  }

  pub fn algorithm(&self) -> &'static str {
    match self {
      Self::Sha256(_) => "sha256",
      Self::Sha512(_) => "sha512",
    }
  }

  pub fn hex(&self) -> &str {
    match self {
      Self::Sha256(hex) | Self::Sha512(hex) => hex,
    }
  }

  /// Hash `data` with this digest's algorithm.
  pub fn compute(&self, data: &[u8]) -> String {
    match self {
      Self::Sha256(_) => sha256_hex(data),
      Self::Sha512(_) => sha512_hex(data),
    }
  }

  /// Compare `data` against this digest, returning the actual hex on mismatch.
  pub fn check(&self, data: &[u8]) -> Result<(), String> {
    let actual = self.compute(data);
    if actual == self.hex() { Ok(()) } else { Err(actual) }
  }
}

impl fmt::Display for ExpectedDigest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.algorithm(), self.hex())
  }
}

pub fn sha256_hex(data: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}

pub fn sha512_hex(data: &[u8]) -> String {
  let mut hasher = Sha512::new();
  hasher.update(data);
  hex::encode(hasher.finalize())
}

/// Find the digest for `file_name` in a `sha*sum`-style checksum list.
///
/// Lines look like `<hex>  <name>` or `<hex> *<name>` (binary mode). A list
/// with exactly one entry is accepted whatever name it carries, since
/// upstream lists sometimes record a path rather than a bare file name.
pub fn lookup_sums(content: &str, file_name: &str, sums_url: &str) -> Result<ExpectedDigest, IntegrityError> {
  let mut entries = Vec::new();

  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }
    let mut parts = line.split_whitespace();
    let (Some(hex), name) = (parts.next(), parts.next()) else {
      continue;
    };
    let name = name.map(|n| n.trim_start_matches('*'));
    entries.push((hex, name));
  }

  let matched = entries.iter().find(|(_, name)| {
    name
      .map(|n| n == file_name || n.rsplit('/').next() == Some(file_name))
      .unwrap_or(false)
  });

  match (matched, entries.as_slice()) {
    (Some((hex, _)), _) => ExpectedDigest::parse(hex),
    (None, [(hex, _)]) => ExpectedDigest::parse(hex),
    _ => Err(IntegrityError::MissingDigest {
      sums_url: sums_url.to_string(),
      file_name: file_name.to_string(),
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

  #[test]
  fn algorithm_from_length() {
    assert_eq!(ExpectedDigest::parse(HELLO_SHA256).unwrap().algorithm(), "sha256");
    let sha512 = sha512_hex(b"hello");
    assert_eq!(ExpectedDigest::parse(&sha512).unwrap().algorithm(), "sha512");
  }

  #[test]
  fn rejects_bad_digests() {
    assert!(ExpectedDigest::parse("abc").is_err());
    assert!(ExpectedDigest::parse(&"z".repeat(64)).is_err());
  }

  #[test]
  fn uppercase_hex_is_normalised() {
    let digest = ExpectedDigest::parse(&HELLO_SHA256.to_ascii_uppercase()).unwrap();
    assert!(digest.check(b"hello").is_ok());
    assert_eq!(digest.to_string(), format!("sha256:{HELLO_SHA256}"));
  }

  #[test]
  fn check_reports_actual_on_mismatch() {
    let digest = ExpectedDigest::parse(HELLO_SHA256).unwrap();
    let actual = digest.check(b"goodbye").unwrap_err();
    assert_eq!(actual, sha256_hex(b"goodbye"));
  }

  #[test]
  fn lookup_matches_file_name() {
    let a = sha512_hex(b"a");
    let b = sha512_hex(b"b");
    let sums = format!("{a}  other.yaml\n{b} *docker-compose-ce.yaml\n");
    let digest = lookup_sums(&sums, "docker-compose-ce.yaml", "https://x/sums").unwrap();
    assert_eq!(digest.hex(), b);
  }

  #[test]
  fn lookup_accepts_single_entry() {
    let a = sha512_hex(b"a");
    let sums = format!("{a}  ./dist/artifact.sh\n");
    assert_eq!(lookup_sums(&sums, "passbolt-repo-setup.ce.sh", "u").unwrap().hex(), a);
  }

  #[test]
  fn lookup_accepts_path_entries() {
    let a = sha512_hex(b"a");
    let b = sha512_hex(b"b");
    let sums = format!("{a}  dist/one.sh\n{b}  dist/two.sh\n");
    assert_eq!(lookup_sums(&sums, "two.sh", "u").unwrap().hex(), b);
  }

  #[test]
  fn lookup_fails_without_entry() {
    let a = sha512_hex(b"a");
    let b = sha512_hex(b"b");
    let sums = format!("{a}  one.sh\n{b}  two.sh\n");
    assert!(matches!(
      lookup_sums(&sums, "three.sh", "u"),
      Err(IntegrityError::MissingDigest { .. })
    ));
    assert!(matches!(lookup_sums("", "x", "u"), Err(IntegrityError::MissingDigest { .. })));
  }
}
