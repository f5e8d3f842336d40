// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Charset preservation for edited text files.
//!
//! ```text
//! old blob (first 1024 bytes) --detect--> DetectedCharset { encoding, bom }
//!                                              |
//! new content (UTF-8) -----------encode-------+--> bytes to commit
//!
//!   UTF-8 + BOM      BOM re-applied
//!   UTF-16LE/BE      re-encoded, BOM kept
//!   legacy (1252..)  re-encoded; unmappable text stays UTF-8
//! ```

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use tracing::warn;

/// Bytes of the old blob inspected by [`detect`].
pub const SNIFF_LEN: usize = 1024;

pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Encoding of an existing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedCharset {
    pub encoding: &'static Encoding,
    pub bom: bool,
}

impl DetectedCharset {
    pub const UTF8: Self = Self {
        encoding: UTF_8,
        bom: false,
    };

    #[must_use]
    pub fn is_plain_utf8(&self) -> bool {
        *self == Self::UTF8
    }
}

impl Default for DetectedCharset {
    fn default() -> Self {
        Self::UTF8
    }
}

/// Looks up an encoding by WHATWG label, e.g. `windows-1252` or `latin1`.
#[must_use]
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Guesses the charset of `prefix`, the start of a file.
///
/// A BOM wins; valid UTF-8 (possibly cut mid-character at the end) is UTF-8;
/// anything else is assumed to be `fallback`.
#[must_use]
pub fn detect(prefix: &[u8], fallback: &'static Encoding) -> DetectedCharset {
    if let Some((encoding, _)) = Encoding::for_bom(prefix) {
        return DetectedCharset {
            encoding,
            bom: true,
        };
    }
    match std::str::from_utf8(prefix) {
        Ok(_) => DetectedCharset::UTF8,
        Err(e) if e.error_len().is_none() => DetectedCharset::UTF8,
        Err(_) => DetectedCharset {
            encoding: fallback,
            bom: false,
        },
    }
}

/// Converts UTF-8 `content` into `charset`.
///
/// Content that is not UTF-8 text is returned untouched, as is text the
/// target encoding cannot represent.
#[must_use]
pub fn encode<'a>(content: &'a [u8], charset: DetectedCharset, path: &str) -> Cow<'a, [u8]> {
    if charset.is_plain_utf8() {
        return Cow::Borrowed(content);
    }
    let Ok(text) = std::str::from_utf8(content) else {
        return Cow::Borrowed(content);
    };
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if charset.encoding == UTF_8 {
        let mut out = Vec::with_capacity(UTF8_BOM.len() + text.len());
        out.extend_from_slice(UTF8_BOM);
        out.extend_from_slice(text.as_bytes());
        return Cow::Owned(out);
    }
    if charset.encoding == UTF_16LE || charset.encoding == UTF_16BE {
        return Cow::Owned(encode_utf16(text, charset));
    }

    let (bytes, _, had_errors) = charset.encoding.encode(text);
    if had_errors {
        warn!(
            path,
            encoding = charset.encoding.name(),
            "content not representable in original encoding, keeping UTF-8"
        );
        return Cow::Borrowed(content);
    }
    Cow::Owned(bytes.into_owned())
}

fn encode_utf16(text: &str, charset: DetectedCharset) -> Vec<u8> {
    let big_endian = charset.encoding == UTF_16BE;
    let units = charset.bom.then_some(0xFEFF_u16).into_iter().chain(text.encode_utf16());
    units
        .flat_map(|unit| {
            if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
