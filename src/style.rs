//! Style-run model: the per-span formatting records carried in the binary
//! format block of a BotAPI message.
//!
//! Two record kinds exist on the wire:
//!
//! ```text
//! text run (6 bytes)            image placeholder (13 bytes)
//!  offset: u16 LE                offset:   u16 LE
//!  flags:  u8                    marker:   u8 = 0x80
//!  r, g, b: u8 each              subtype:  u8 = 0x09
//!                                flags:    u8 = 0x01
//!                                length:   u32 LE
//!                                crc32:    u32 LE
//! ```
//!
//! Offsets count Unicode scalar values of the plain-text buffer at the
//! moment the record was appended, truncated mod 2^16.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Wire flag bit: the run's color bytes are meaningful.
///
/// The gateway protocol sets this bit on every text run, even when the
/// color is default black. This is load-bearing for rendering
/// compatibility and must never be elided.
pub const COLOR_PRESENT: u8 = 0x08;

/// Wire marker byte opening an image-placeholder record.
pub const IMAGE_MARKER: u8 = 0x80;

/// Image-placeholder record sub-type byte.
pub const IMAGE_SUBTYPE: u8 = 0x09;

/// Image-placeholder record flags byte.
pub const IMAGE_FLAGS: u8 = 0x01;

/// Byte length of a text style-run record.
pub const TEXT_RUN_LEN: usize = 6;

/// Byte length of an image-placeholder record.
pub const IMAGE_RUN_LEN: usize = 13;

/// Caller-facing text style bits.
///
/// `BOLD`, `ITALIC` and `UNDERLINE` map directly to the low three wire
/// flag bits. `NEW_LINE` is an input-only convenience (append a CRLF to
/// the text being added) and is never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextStyle(u8);

impl TextStyle {
    /// No styling.
    pub const NONE: Self = Self(0);
    /// Bold text.
    pub const BOLD: Self = Self(0x01);
    /// Italic text.
    pub const ITALIC: Self = Self(0x02);
    /// Underlined text.
    pub const UNDERLINE: Self = Self(0x04);
    /// Append a trailing line break to the added text (input-only).
    pub const NEW_LINE: Self = Self(0x08);

    /// Raw bit pattern.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reconstruct from a raw bit pattern.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Whether every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// The bits that travel on the wire (bold/italic/underline only).
    pub const fn wire_bits(self) -> u8 {
        self.0 & 0x07
    }
}

impl BitOr for TextStyle {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TextStyle {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// An RGB text color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Rgb {
    /// Default text color.
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Construct from components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether all components are zero.
    pub const fn is_black(self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }

    /// Parse a 6-hex-digit color, with or without a leading `#`.
    ///
    /// Returns `None` for anything that is not exactly six hex digits
    /// after the optional prefix.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        })
    }
}

impl fmt::Display for Rgb {
    /// Lowercase `rrggbb` hex, as used in HTML color spans.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A text style run: from `offset` onward the given style and color apply
/// until the next run or end of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    /// Plain-text offset in Unicode scalar values, before the append.
    pub offset: u16,
    /// Bold/italic/underline bits.
    pub style: TextStyle,
    /// Text color (black when unset by the caller).
    pub color: Rgb,
}

impl StyleRun {
    /// The flags byte as serialized: style bits plus [`COLOR_PRESENT`],
    /// which is set unconditionally.
    pub const fn wire_flags(&self) -> u8 {
        self.style.wire_bits() | COLOR_PRESENT
    }
}

/// One record of the binary format block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatEntry {
    /// A text style run (6-byte record).
    Text(StyleRun),
    /// An image placeholder (13-byte record) referencing an attachment by
    /// its byte length and CRC-32.
    Image {
        /// Plain-text offset at the moment the image was added.
        offset: u16,
        /// Attachment size in bytes.
        length: u32,
        /// CRC-32 of the attachment content.
        crc: u32,
    },
}

impl FormatEntry {
    /// Serialized record length in bytes.
    pub const fn wire_len(&self) -> usize {
        match self {
            Self::Text(_) => TEXT_RUN_LEN,
            Self::Image { .. } => IMAGE_RUN_LEN,
        }
    }

    /// Append the little-endian record encoding to `buf`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Self::Text(run) => {
                buf.extend_from_slice(&run.offset.to_le_bytes());
                buf.push(run.wire_flags());
                buf.push(run.color.r);
                buf.push(run.color.g);
                buf.push(run.color.b);
            }
            Self::Image {
                offset,
                length,
                crc,
            } => {
                buf.extend_from_slice(&offset.to_le_bytes());
                buf.push(IMAGE_MARKER);
                buf.push(IMAGE_SUBTYPE);
                buf.push(IMAGE_FLAGS);
                buf.extend_from_slice(&length.to_le_bytes());
                buf.extend_from_slice(&crc.to_le_bytes());
            }
        }
    }
}
