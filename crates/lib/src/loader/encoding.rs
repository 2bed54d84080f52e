//! Content encodings declared by loaders.
//!
//! A loader declares the encoding it wants its content in; the transform
//! engine decodes buffers into text before invoking the loader and encodes the
//! text back into bytes afterwards. `None` in [`super::LoaderMetadata`] is the
//! binary sentinel: content stays as raw bytes.

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
  Utf8,
  Utf16Le,
  Latin1,
  Ascii,
  Base64,
  Hex,
}

/// Text could not be turned back into bytes.
#[derive(Debug, Clone, Error)]
#[error("invalid {encoding} text: {message}")]
pub struct EncodingError {
  pub encoding: Encoding,
  pub message: String,
}

impl Encoding {
  /// Canonical name.
  pub fn as_str(&self) -> &'static str {
    match self {
      Encoding::Utf8 => "utf-8",
      Encoding::Utf16Le => "utf-16le",
      Encoding::Latin1 => "latin1",
      Encoding::Ascii => "ascii",
      Encoding::Base64 => "base64",
      Encoding::Hex => "hex",
    }
  }

  /// Turn bytes into text.
  ///
  /// Malformed UTF-8/UTF-16 sequences are replaced with U+FFFD; everything else
  /// is total.
  pub fn decode(&self, bytes: &[u8]) -> String {
    match self {
      Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
      Encoding::Utf16Le => {
        let units: Vec<u16> = bytes
          .chunks_exact(2)
          .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
          .collect();
        String::from_utf16_lossy(&units)
      }
      Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
      Encoding::Ascii => bytes.iter().map(|&b| (b & 0x7f) as char).collect(),
      Encoding::Base64 => BASE64.encode(bytes),
      Encoding::Hex => hex::encode(bytes),
    }
  }

  /// Turn text back into bytes.
  pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
    match self {
      Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
      Encoding::Utf16Le => Ok(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()),
      // Code points above 0xff are truncated to their low byte.
      Encoding::Latin1 | Encoding::Ascii => Ok(text.chars().map(|c| (c as u32 & 0xff) as u8).collect()),
      Encoding::Base64 => BASE64.decode(text.trim()).map_err(|e| self.error(e.to_string())),
      Encoding::Hex => hex::decode(text.trim()).map_err(|e| self.error(e.to_string())),
    }
  }

  fn error(&self, message: String) -> EncodingError {
    EncodingError {
      encoding: *self,
      message,
    }
  }
}

impl std::fmt::Display for Encoding {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Encoding {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "utf8" | "utf-8" => Ok(Encoding::Utf8),
      "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
      "latin1" | "binary" => Ok(Encoding::Latin1),
      "ascii" => Ok(Encoding::Ascii),
      "base64" => Ok(Encoding::Base64),
      "hex" => Ok(Encoding::Hex),
      other => Err(format!("unknown encoding '{}'", other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &[u8] = &[0x00, 0x41, 0x7f, 0x80, 0xc3, 0xa9, 0xff];

  #[test]
  fn lossless_encodings_preserve_bytes() {
    for encoding in [Encoding::Latin1, Encoding::Base64, Encoding::Hex] {
      let text = encoding.decode(SAMPLE);
      assert_eq!(encoding.encode(&text).unwrap(), SAMPLE, "{} lost bytes", encoding);
    }
  }

  #[test]
  fn utf8_preserves_valid_text() {
    let bytes = "héllo wörld ✓".as_bytes();
    let text = Encoding::Utf8.decode(bytes);
    assert_eq!(text, "héllo wörld ✓");
    assert_eq!(Encoding::Utf8.encode(&text).unwrap(), bytes);
  }

  #[test]
  fn utf8_replaces_invalid_sequences() {
    assert_eq!(Encoding::Utf8.decode(&[0x61, 0xff, 0x62]), "a\u{fffd}b");
  }

  #[test]
  fn utf16le_preserves_text() {
    let bytes = Encoding::Utf16Le.encode("aé✓").unwrap();
    assert_eq!(bytes, vec![0x61, 0x00, 0xe9, 0x00, 0x13, 0x27]);
    assert_eq!(Encoding::Utf16Le.decode(&bytes), "aé✓");
  }

  #[test]
  fn ascii_masks_high_bit() {
    assert_eq!(Encoding::Ascii.decode(&[0x41, 0xc1]), "AA");
  }

  #[test]
  fn invalid_hex_is_an_error() {
    let result = Encoding::Hex.encode("zz");
    assert!(result.is_err());
  }

  #[test]
  fn parses_node_style_names() {
    assert_eq!("utf8".parse::<Encoding>().unwrap(), Encoding::Utf8);
    assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
    assert_eq!("ucs2".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
    assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Latin1);
    assert!("ebcdic".parse::<Encoding>().is_err());
  }
}
