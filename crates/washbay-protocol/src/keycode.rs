//! USB-HID keycode decoding for keyboard-emulating RFID readers.
//!
//! The reader "types" the card identifier followed by Enter. Each keystroke
//! arrives as an 8-byte boot keyboard report whose byte 2 carries the usage
//! code; the following release report carries code 0.
//!
//! ```text
//! report:  [mod, 0, code, 0, 0, 0, 0, 0]
//!                    │
//!                    ├── 0      no key (release), skipped
//!                    ├── 40     Enter, ends the record
//!                    └── other  appended to the record buffer
//! ```
//!
//! # Examples
//!
//! ```
//! use washbay_protocol::keycode::{decode_keycodes, KeyReportAssembler};
//!
//! assert_eq!(decode_keycodes(&[4, 5, 6]), "abc");
//!
//! let mut assembler = KeyReportAssembler::new();
//! assert_eq!(assembler.push_report(&[0, 0, 4, 0, 0, 0, 0, 0]), None);
//! assert_eq!(assembler.push_report(&[0, 0, 0, 0, 0, 0, 0, 0]), None);
//! assert_eq!(
//!     assembler.push_report(&[0, 0, 40, 0, 0, 0, 0, 0]),
//!     Some("a".to_string())
//! );
//! ```

use washbay_core::constants::{HID_KEYCODE_OFFSET, KEYCODE_ENTER, KEYCODE_NONE};

/// Map one HID usage code to its character, if the reader can emit it.
///
/// Covers lowercase letters, digits, space, hyphen and period. The Enter
/// code is not mapped; it is a terminator, never part of the payload.
#[must_use]
pub fn keycode_char(code: u8) -> Option<char> {
    match code {
        4..=29 => Some(char::from(b'a' + (code - 4))),
        30..=38 => Some(char::from(b'1' + (code - 30))),
        39 => Some('0'),
        44 => Some(' '),
        45 => Some('-'),
        55 => Some('.'),
        _ => None,
    }
}

/// Decode a buffer of usage codes into text.
///
/// Unmapped codes (including the terminator) are dropped; the result is
/// trimmed of leading and trailing whitespace.
#[must_use]
pub fn decode_keycodes(codes: &[u8]) -> String {
    let decoded: String = codes.iter().filter_map(|&code| keycode_char(code)).collect();
    decoded.trim().to_string()
}

/// Accumulates keycodes from successive HID reports until Enter.
///
/// One assembler serves a single read attempt; create a fresh one per
/// attempt so no partial record leaks into the next.
#[derive(Debug, Default)]
pub struct KeyReportAssembler {
    codes: Vec<u8>,
}

impl KeyReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one report.
    ///
    /// Returns the decoded record when the report carries the terminator,
    /// `None` otherwise. Reports too short to carry a keycode are ignored.
    pub fn push_report(&mut self, report: &[u8]) -> Option<String> {
        let code = *report.get(HID_KEYCODE_OFFSET)?;
        match code {
            KEYCODE_NONE => None,
            KEYCODE_ENTER => {
                let record = decode_keycodes(&self.codes);
                self.codes.clear();
                Some(record)
            }
            other => {
                self.codes.push(other);
                None
            }
        }
    }

    /// Number of keycodes buffered since the last terminator.
    pub fn pending(&self) -> usize {
        self.codes.len()
    }
}

/// Build the press/release report pair a reader emits for one keycode.
///
/// Useful for simulating a reader.
#[must_use]
pub fn keystroke_reports(code: u8) -> [[u8; 8]; 2] {
    let mut press = [0u8; 8];
    press[HID_KEYCODE_OFFSET] = code;
    [press, [0u8; 8]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(4, Some('a'))]
    #[case(29, Some('z'))]
    #[case(30, Some('1'))]
    #[case(38, Some('9'))]
    #[case(39, Some('0'))]
    #[case(44, Some(' '))]
    #[case(45, Some('-'))]
    #[case(55, Some('.'))]
    #[case(0, None)]
    #[case(40, None)]
    #[case(41, None)]
    #[case(255, None)]
    fn test_keycode_table(#[case] code: u8, #[case] expected: Option<char>) {
        assert_eq!(keycode_char(code), expected);
    }

    #[test]
    fn test_decode_drops_unmapped() {
        assert_eq!(decode_keycodes(&[4, 200, 5, 1, 6]), "abc");
    }

    #[test]
    fn test_decode_never_emits_terminator() {
        assert_eq!(decode_keycodes(&[4, 40, 5]), "ab");
    }

    #[test]
    fn test_decode_trims_spaces() {
        assert_eq!(decode_keycodes(&[44, 44, 4, 44, 5, 44]), "a b");
    }

    #[test]
    fn test_decode_uuid() {
        // "1f-0." covers digits, letters, hyphen and period
        assert_eq!(decode_keycodes(&[30, 9, 45, 39, 55]), "1f-0.");
    }

    #[test]
    fn test_assembler_scenario_abc() {
        let mut assembler = KeyReportAssembler::new();
        let mut result = None;
        for code in [4, 5, 6, 40] {
            for report in keystroke_reports(code) {
                if let Some(record) = assembler.push_report(&report) {
                    result = Some(record);
                }
            }
        }
        assert_eq!(result.as_deref(), Some("abc"));
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_assembler_ignores_short_reports() {
        let mut assembler = KeyReportAssembler::new();
        assert_eq!(assembler.push_report(&[0, 0]), None);
        assert_eq!(assembler.push_report(&[]), None);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_assembler_empty_record() {
        let mut assembler = KeyReportAssembler::new();
        let [press, _] = keystroke_reports(40);
        assert_eq!(assembler.push_report(&press), Some(String::new()));
    }
}
