/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! CheckSum (10) helpers.
//!
//! The value covers every byte from `8=` up to and including the SOH that
//! precedes `10=`, summed modulo 256 and written as three digits.

/// Width of the digits in a CheckSum value.
pub const CHECKSUM_DIGITS: usize = 3;

/// Sums `data` modulo 256.
///
/// ```
/// use fixgate_tagvalue::calculate_checksum;
///
/// assert_eq!(calculate_checksum(b"\x01\x02"), 3);
/// ```
#[inline]
#[must_use]
pub fn calculate_checksum(data: &[u8]) -> u8 {
    let sum: u32 = data.iter().map(|&b| u32::from(b)).sum();
    (sum % 256) as u8
}

/// Renders a checksum as three zero-padded ASCII digits.
#[inline]
#[must_use]
pub fn format_checksum(checksum: u8) -> [u8; CHECKSUM_DIGITS] {
    let mut digits = [b'0'; CHECKSUM_DIGITS];
    let mut rest = checksum;
    for slot in digits.iter_mut().rev() {
        *slot += rest % 10;
        rest /= 10;
    }
    digits
}

/// Reads three ASCII digits back into a checksum.
///
/// Anything that is not exactly three digits in `0..=255` yields `None`.
#[must_use]
pub fn parse_checksum(bytes: &[u8]) -> Option<u8> {
    if bytes.len() != CHECKSUM_DIGITS || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value = bytes
        .iter()
        .fold(0u16, |acc, &b| acc * 10 + u16::from(b - b'0'));
    u8::try_from(value).ok()
}
