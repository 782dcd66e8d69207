// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message bytes from files, stdin or hex strings, and hex dumps.

use anyhow::{bail, Context};
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

/// Read raw bytes from `path`, or stdin when `path` is `-`.
pub fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("failed to read stdin")?;
        return Ok(bytes);
    }
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse a hex string; whitespace, `:` separators and `0x` prefixes are
/// ignored.
pub fn parse_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let digits: String = text
        .split_whitespace()
        .flat_map(|word| word.split(':'))
        .map(|word| word.trim_start_matches("0x").trim_start_matches("0X"))
        .collect();
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits ({})", digits.len());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Classic 16-column hex dump with an ASCII gutter.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08x}  ", i * 16);
        for (j, b) in chunk.iter().enumerate() {
            if j == 8 {
                out.push(' ');
            }
            let _ = write!(out, "{:02x} ", b);
        }
        for j in chunk.len()..16 {
            if j == 8 {
                out.push(' ');
            }
            out.push_str("   ");
        }
        out.push_str(" |");
        for b in chunk {
            out.push(if b.is_ascii_graphic() || *b == b' ' {
                *b as char
            } else {
                '.'
            });
        }
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_separators() {
        assert_eq!(parse_hex("0a 0B:ff").unwrap(), vec![0x0a, 0x0b, 0xff]);
        assert_eq!(parse_hex("0x10 0x20").unwrap(), vec![0x10, 0x20]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_hex_dump_layout() {
        let dump = hex_dump(b"::Demo");
        assert!(dump.starts_with("00000000  3a 3a 44 65 6d 6f"));
        assert!(dump.trim_end().ends_with("|::Demo|"));
    }

    #[test]
    fn test_read_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [1u8, 2, 3]).unwrap();
        assert_eq!(read_file(file.path()).unwrap(), vec![1, 2, 3]);
    }
}
