//! Segment encoding and number formatting
//!
//! Pure lookup and formatting helpers that turn numbers and characters into
//! the per-digit segment bitmasks sent during the data phase. Nothing in this
//! module touches the bus.
//!
//! Bit layout of a segment byte (`XGFEDCBA`, `X` being the decimal point):
//!
//! ```text
//!      A
//!     ---
//!  F |   | B
//!     -G-
//!  E |   | C
//!     ---
//!      D   . DP
//! ```

/// Number of digit positions on the module.
pub const DIGIT_COUNT: usize = 4;

pub const SEG_A: u8 = 0b0000_0001;
pub const SEG_B: u8 = 0b0000_0010;
pub const SEG_C: u8 = 0b0000_0100;
pub const SEG_D: u8 = 0b0000_1000;
pub const SEG_E: u8 = 0b0001_0000;
pub const SEG_F: u8 = 0b0010_0000;
pub const SEG_G: u8 = 0b0100_0000;
/// Decimal point
pub const SEG_DP: u8 = 0b1000_0000;

/// All segments off.
pub const BLANK: u8 = 0;

/// Minus sign (middle bar only).
pub const MINUS: u8 = SEG_G;

/// Segment patterns for hex digits `0`-`F`.
pub const DIGITS: [u8; 16] = [
    // XGFEDCBA
    0b0011_1111, // 0
    0b0000_0110, // 1
    0b0101_1011, // 2
    0b0100_1111, // 3
    0b0110_0110, // 4
    0b0110_1101, // 5
    0b0111_1101, // 6
    0b0000_0111, // 7
    0b0111_1111, // 8
    0b0110_1111, // 9
    0b0111_0111, // A
    0b0111_1100, // b
    0b0011_1001, // C
    0b0101_1110, // d
    0b0111_1001, // E
    0b0111_0001, // F
];

/// Segment patterns for letters `A`-`Z`.
///
/// Letters that have no readable upper-case form use their lower-case shape.
const LETTERS: [u8; 26] = [
    0b0111_0111, // A
    0b0111_1100, // b
    0b0011_1001, // C
    0b0101_1110, // d
    0b0111_1001, // E
    0b0111_0001, // F
    0b0011_1101, // G
    0b0111_0110, // H
    0b0011_0000, // I
    0b0001_1110, // J
    0b0111_0101, // K
    0b0011_1000, // L
    0b0001_0101, // M
    0b0101_0100, // n
    0b0011_1111, // O
    0b0111_0011, // P
    0b0110_0111, // q
    0b0101_0000, // r
    0b0110_1101, // S
    0b0111_1000, // t
    0b0011_1110, // U
    0b0001_1100, // v
    0b0010_1010, // W
    0b0111_0110, // X
    0b0110_1110, // y
    0b0101_1011, // Z
];

/// Letter shown after the value in the thousands range of
/// [`char_and_number`].
const THOUSANDS_SUFFIX: char = 'k';

/// Largest value [`char_and_number`] can render; larger values saturate.
pub const CHAR_AND_NUMBER_MAX: u32 = 99_999;

/// Numeric base used by [`format_number`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Radix {
    Decimal,
    Hex,
}

impl Radix {
    const fn base(self) -> u32 {
        match self {
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }
}

/// Encode a digit (`0`-`15`) into its segment pattern.
///
/// Only the low nibble is used.
pub const fn encode_digit(digit: u8) -> u8 {
    DIGITS[(digit & 0x0f) as usize]
}

/// Encode a character into its segment pattern.
///
/// Letters are case-folded. Digits, space and `-` are supported as well;
/// everything else renders blank.
pub const fn encode_char(c: char) -> u8 {
    match c {
        'A'..='Z' => LETTERS[(c as u8 - b'A') as usize],
        'a'..='z' => LETTERS[(c as u8 - b'a') as usize],
        '0'..='9' => DIGITS[(c as u8 - b'0') as usize],
        '-' => MINUS,
        _ => BLANK,
    }
}

/// Clamp a field length to `1..=4`.
pub(crate) fn clamp_length(length: u8) -> usize {
    usize::from(length).clamp(1, DIGIT_COUNT)
}

/// Format `magnitude` into a right-aligned field of `length` digits.
///
/// Digits are extracted least-significant first, so only
/// `magnitude mod base^length` is shown. Without `leading_zero` the leading
/// zero positions are blanked, but a zero value always keeps its last digit.
///
/// When `negative` is set the minus sign takes the first free position left
/// of the most significant digit. If every position holds a significant
/// digit there is no room and the sign is dropped.
///
/// Positions past `length` are left blank.
pub fn format_number(
    radix: Radix,
    magnitude: u32,
    negative: bool,
    leading_zero: bool,
    length: u8,
) -> [u8; DIGIT_COUNT] {
    let length = clamp_length(length);
    let base = radix.base();
    let mut digits = [BLANK; DIGIT_COUNT];

    if magnitude == 0 && !leading_zero {
        digits[length - 1] = encode_digit(0);
        return digits;
    }

    let mut remaining = magnitude;
    let mut negative = negative;
    for slot in digits[..length].iter_mut().rev() {
        // remaining == 0 means this and every position to its left is a
        // leading zero
        let exhausted = remaining == 0;
        #[allow(clippy::cast_possible_truncation)]
        let digit = (remaining % base) as u8;

        *slot = if exhausted && !leading_zero {
            BLANK
        } else {
            encode_digit(digit)
        };

        if exhausted && negative {
            *slot = MINUS;
            negative = false;
        }

        remaining /= base;
    }

    digits
}

/// Format a signed decimal value.
pub fn format_decimal(value: i32, leading_zero: bool, length: u8) -> [u8; DIGIT_COUNT] {
    format_number(
        Radix::Decimal,
        value.unsigned_abs(),
        value < 0,
        leading_zero,
        length,
    )
}

/// Format an unsigned hexadecimal value.
pub fn format_hex(value: u16, leading_zero: bool, length: u8) -> [u8; DIGIT_COUNT] {
    format_number(Radix::Hex, u32::from(value), false, leading_zero, length)
}

/// OR the decimal point into the digits selected by `dots`.
///
/// The most significant bit of `dots` maps to position 0, the next bit to
/// position 1 and so on. The low nibble is ignored.
pub fn apply_dots(dots: u8, digits: &mut [u8; DIGIT_COUNT]) {
    let mut mask = dots;
    for digit in digits.iter_mut() {
        *digit |= mask & SEG_DP;
        mask <<= 1;
    }
}

/// Compose a character followed by a scaled three digit number.
///
/// | value | rendering |
/// |---|---|
/// | `0..=999` | `c` then the value, leading blanks |
/// | `1000..=9999` | `c` `d.` `d` `k` (hundreds scaled, e.g. `1.2k`) |
/// | `10000..` | `c` `dd.d` (hundreds scaled, e.g. `12.3` for 12345) |
///
/// Values above [`CHAR_AND_NUMBER_MAX`] saturate.
pub fn char_and_number(c: char, number: u32) -> [u8; DIGIT_COUNT] {
    let number = number.min(CHAR_AND_NUMBER_MAX);
    let mut out = [BLANK; DIGIT_COUNT];
    out[0] = encode_char(c);

    if number < 1_000 {
        let digits = format_number(Radix::Decimal, number, false, false, 3);
        out[1..].copy_from_slice(&digits[..3]);
        return out;
    }

    let scaled = number / 100;
    if number < 10_000 {
        out[1] = digit_of(scaled / 10) | SEG_DP;
        out[2] = digit_of(scaled % 10);
        out[3] = encode_char(THOUSANDS_SUFFIX);
    } else {
        out[1] = digit_of(scaled / 100);
        out[2] = digit_of((scaled / 10) % 10) | SEG_DP;
        out[3] = digit_of(scaled % 10);
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn digit_of(value: u32) -> u8 {
    encode_digit((value % 10) as u8)
}
