use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

const REPORT_FILE_PREFIX: &str = "contact-audit-";

/// Report file name carrying a minute-resolution creation timestamp.
pub fn report_file_name(ts: DateTime<Local>) -> String {
    format!("{REPORT_FILE_PREFIX}{}.tsv", ts.format("%Y-%m-%dT%H:%M"))
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn quote_str(value: &str) -> String {
    quote_bytes(value.as_bytes())
}

/// Double-quoted, backslash-escaped rendering that matches Go's `%q` verb,
/// which downstream report tooling parses. Invalid UTF-8 bytes come out as `\xNN`.
pub fn quote_bytes(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for chunk in raw.utf8_chunks() {
        for c in chunk.valid().chars() {
            push_escaped_char(&mut out, c);
        }
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{byte:02x}");
        }
    }
    out.push('"');
    out
}

fn push_escaped_char(out: &mut String, c: char) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{0c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0b}' => out.push_str("\\v"),
        c if is_printable(c) => out.push(c),
        c if (c as u32) < 0x20 || c == '\u{7f}' => {
            let _ = write!(out, "\\x{:02x}", c as u32);
        }
        c if (c as u32) < 0x1_0000 => {
            let _ = write!(out, "\\u{:04x}", c as u32);
        }
        c => {
            let _ = write!(out, "\\U{:08x}", c as u32);
        }
    }
}

// Close to unicode.IsPrint: graphic characters plus ASCII space only.
fn is_printable(c: char) -> bool {
    if c.is_ascii() {
        return (' '..='~').contains(&c);
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c as u32,
        0x00AD
            | 0x0600..=0x0605
            | 0x061C
            | 0x06DD
            | 0x070F
            | 0x180E
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x2064
            | 0x2066..=0x206F
            | 0xE000..=0xF8FF
            | 0xFEFF
            | 0xFFF9..=0xFFFB
            | 0xFFFE..=0xFFFF
            | 0xF_0000..=0x10_FFFF
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn quote_str_escapes_quotes_and_control_characters() {
        assert_eq!(quote_str("mailto:a@b.org"), r#""mailto:a@b.org""#);
        assert_eq!(quote_str(r#"say "hi"\"#), r#""say \"hi\"\\""#);
        assert_eq!(quote_str("a\tb\nc\r"), r#""a\tb\nc\r""#);
        assert_eq!(quote_str("\u{0}\u{1b}\u{7f}"), r#""\x00\x1b\x7f""#);
    }

    #[test]
    fn quote_str_keeps_printable_unicode_and_escapes_invisible_ones() {
        assert_eq!(quote_str("josé@exämple.de"), "\"josé@exämple.de\"");
        assert_eq!(quote_str("a\u{a0}b"), r#""a\u00a0b""#);
        assert_eq!(quote_str("zero\u{200b}width"), r#""zero\u200bwidth""#);
        assert_eq!(quote_str("\u{f0000}"), r#""\U000f0000""#);
    }

    #[test]
    fn quote_bytes_renders_invalid_utf8_bytewise() {
        assert_eq!(quote_bytes(b"[\"a\xff\xfe\"]"), r#""[\"a\xff\xfe\"]""#);
    }

    #[test]
    fn report_file_name_uses_minute_resolution() {
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 59).unwrap();
        assert_eq!(report_file_name(ts), "contact-audit-2024-03-09T07:05.tsv");
    }
}
