// repofiles-rs: Repository file mutation engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

use encoding_rs::{UTF_8, UTF_16LE, WINDOWS_1252};

use super::{DetectedCharset, UTF8_BOM, detect, encode, encoding_for_label};

#[test]
fn test_detect_plain_utf8() {
    assert_eq!(detect("héllo".as_bytes(), WINDOWS_1252), DetectedCharset::UTF8);
    assert_eq!(detect(b"", WINDOWS_1252), DetectedCharset::UTF8);
}

#[test]
fn test_detect_tolerates_cut_character() {
    let bytes = "ab€".as_bytes();
    let cut = &bytes[..bytes.len() - 1];
    assert_eq!(detect(cut, WINDOWS_1252), DetectedCharset::UTF8);
}

#[test]
fn test_detect_bom() {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(b"text");
    assert_eq!(
        detect(&bytes, WINDOWS_1252),
        DetectedCharset {
            encoding: UTF_8,
            bom: true
        }
    );
    assert_eq!(detect(&[0xFF, 0xFE, b'a', 0], WINDOWS_1252).encoding, UTF_16LE);
}

#[test]
fn test_detect_legacy_falls_back() {
    let charset = detect(b"caf\xe9", WINDOWS_1252);
    assert_eq!(charset.encoding, WINDOWS_1252);
    assert!(!charset.bom);
}

#[test]
fn test_encode_reapplies_utf8_bom_once() {
    let charset = DetectedCharset {
        encoding: UTF_8,
        bom: true,
    };
    let out = encode(b"new", charset, "a.txt");
    assert_eq!(out.as_ref(), b"\xEF\xBB\xBFnew");
    let again = encode(&out, charset, "a.txt");
    assert_eq!(again.as_ref(), out.as_ref());
}

#[test]
fn test_encode_legacy() {
    let charset = detect(b"caf\xe9", WINDOWS_1252);
    assert_eq!(encode("déjà".as_bytes(), charset, "a.txt").as_ref(), b"d\xe9j\xe0");
}

#[test]
fn test_encode_unmappable_keeps_utf8() {
    let charset = detect(b"caf\xe9", WINDOWS_1252);
    let content = "snow ☃".as_bytes();
    assert_eq!(encode(content, charset, "a.txt").as_ref(), content);
}

#[test]
fn test_encode_utf16_with_bom() {
    let charset = detect(&[0xFF, 0xFE, b'a', 0], WINDOWS_1252);
    assert_eq!(encode(b"hi", charset, "a.txt").as_ref(), &[0xFF, 0xFE, b'h', 0, b'i', 0]);
}

#[test]
fn test_plain_utf8_is_borrowed() {
    let out = encode(b"\xff\xfe binary", DetectedCharset::UTF8, "bin");
    assert!(matches!(out, std::borrow::Cow::Borrowed(_)));
}

#[test]
fn test_label_lookup() {
    assert_eq!(encoding_for_label("windows-1252"), Some(WINDOWS_1252));
    assert_eq!(encoding_for_label(" latin1 "), Some(WINDOWS_1252));
    assert_eq!(encoding_for_label("klingon"), None);
}
