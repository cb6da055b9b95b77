//! Wire framing
//!
//! Request:  `ESC 'R' code[5] checksum[2] '&'`
//! Response: 10 ASCII bytes, a 4-hex value at `[1..5]` or an 8-hex status word at `[1..9]`

use crate::command::CommandCode;
use crate::constants::{CODE_LEN, FRAME_END, FRAME_PREFIX, FRAME_START, RESPONSE_LEN};

/// Request frame length
pub const FRAME_LEN: usize = CODE_LEN + 5;

/// `(sum of ASCII of "R" + code) & 0xFF`
pub fn checksum_byte(code: &CommandCode) -> u8 {
    code.as_bytes()
        .iter()
        .fold(FRAME_PREFIX, |acc, b| acc.wrapping_add(*b))
}

/// Checksum as two uppercase hex digits
pub fn checksum(code: &CommandCode) -> String {
    format!("{:02X}", checksum_byte(code))
}

/// Build the request frame for a command
pub fn encode_frame(code: &CommandCode) -> [u8; FRAME_LEN] {
    let sum = checksum(code);
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_START;
    frame[1] = FRAME_PREFIX;
    frame[2..2 + CODE_LEN].copy_from_slice(code.as_bytes());
    frame[2 + CODE_LEN..FRAME_LEN - 1].copy_from_slice(sum.as_bytes());
    frame[FRAME_LEN - 1] = FRAME_END;
    frame
}

/// Validate a request frame and extract its code; `None` on any framing or checksum mismatch
pub fn decode_frame(frame: &[u8]) -> Option<CommandCode> {
    if frame.len() != FRAME_LEN
        || frame[0] != FRAME_START
        || frame[1] != FRAME_PREFIX
        || frame[FRAME_LEN - 1] != FRAME_END
    {
        return None;
    }

    let code: CommandCode = std::str::from_utf8(&frame[2..2 + CODE_LEN])
        .ok()?
        .parse()
        .ok()?;
    let sum = std::str::from_utf8(&frame[2 + CODE_LEN..FRAME_LEN - 1]).ok()?;
    (sum == checksum(&code)).then_some(code)
}

fn hex_field(response: &[u8], end: usize) -> Option<&str> {
    let field = response.get(1..end)?;
    std::str::from_utf8(field).ok().map(str::trim)
}

/// Register value from a response; malformed input reads as 0
pub fn parse_value(response: &[u8]) -> i32 {
    hex_field(response, 5)
        .and_then(|s| i32::from_str_radix(s, 16).ok())
        .unwrap_or(0)
}

/// Status word from a response; malformed input reads as 0
pub fn parse_status(response: &[u8]) -> u32 {
    hex_field(response, 9)
        .and_then(|s| u32::from_str_radix(s, 16).ok())
        .unwrap_or(0)
}

/// Response carrying a 4-hex register value
pub fn encode_value_response(value: u16) -> [u8; RESPONSE_LEN] {
    response_from(&format!("R{:04X}0000&", value))
}

/// Response carrying an 8-hex status word
pub fn encode_status_response(status: u32) -> [u8; RESPONSE_LEN] {
    response_from(&format!("R{:08X}&", status))
}

fn response_from(text: &str) -> [u8; RESPONSE_LEN] {
    let mut buf = [0u8; RESPONSE_LEN];
    let len = text.len().min(RESPONSE_LEN);
    buf[..len].copy_from_slice(&text.as_bytes()[..len]);
    buf
}

/// Space-separated uppercase hex for frame logging
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    // ========================================================================
    // Checksum and Framing Tests
    // ========================================================================

    #[test]
    fn test_checksum_status_read() {
        // 'R'(82) + 'D'(68) + '9'(57) + '0'(48) * 3 = 351 -> 0x5F
        assert_eq!(checksum(&CommandCode::GET_STATUS), "5F");
    }

    #[test]
    fn test_checksum_matches_ascii_sum() {
        for code in CommandCode::POLL_SEQUENCE {
            let sum: u32 = std::iter::once(b'R')
                .chain(code.as_bytes().iter().copied())
                .map(u32::from)
                .sum();
            assert_eq!(checksum(&code), format!("{:02X}", sum & 0xFF));
        }
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(&CommandCode::GET_STATUS);
        assert_eq!(frame[0], 0x1B);
        assert_eq!(&frame[1..7], b"RD9000");
        assert_eq!(&frame[7..9], b"5F");
        assert_eq!(frame[9], b'&');
    }

    #[test]
    fn test_decode_frame_accepts_encoded() {
        let code = CommandCode::set_target_temperature(21.0);
        assert_eq!(decode_frame(&encode_frame(&code)), Some(code));
    }

    #[test]
    fn test_decode_frame_rejects_bad_checksum() {
        let mut frame = encode_frame(&CommandCode::GET_STATUS);
        frame[8] = b'0';
        assert_eq!(decode_frame(&frame), None);
    }

    #[test]
    fn test_decode_frame_rejects_bad_delimiters() {
        let mut frame = encode_frame(&CommandCode::GET_STATUS);
        frame[0] = b'R';
        assert_eq!(decode_frame(&frame), None);

        let frame = encode_frame(&CommandCode::GET_STATUS);
        assert_eq!(decode_frame(&frame[..9]), None);
    }

    // ========================================================================
    // Response Parsing Tests
    // ========================================================================

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(b"X00FF?????"), 255);
        assert_eq!(parse_value(b"R00D20000&"), 210);
        assert_eq!(parse_value(b"R00ff0000&"), 255);
    }

    #[test]
    fn test_parse_value_malformed_is_zero() {
        assert_eq!(parse_value(b"RZZZZ0000&"), 0);
        assert_eq!(parse_value(b"R0"), 0);
        assert_eq!(parse_value(b""), 0);
        assert_eq!(parse_value(&[b'R', 0xFF, 0xFE, b'0', b'0']), 0);
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(b"R02000000&"), 0x0200_0000);
        assert_eq!(parse_status(b"R00000020&"), 0x20);
        assert_eq!(parse_status(b"RFFFFFFFF&"), u32::MAX);
    }

    #[test]
    fn test_parse_status_malformed_is_zero() {
        assert_eq!(parse_status(b"R0200000"), 0);
        assert_eq!(parse_status(b"R0200G000&"), 0);
    }

    #[test]
    fn test_encoded_responses_parse_back() {
        assert_eq!(parse_value(&encode_value_response(0x01C2)), 0x01C2);
        assert_eq!(
            parse_status(&encode_status_response(0x0300_0020)),
            0x0300_0020
        );
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x1B, 0x52, 0x26]), "1B 52 26");
        assert_eq!(hex_dump(&[]), "");
    }
}
