//! Binary protocol payload: the length-prefixed blob the Botmaster gateway
//! consumes.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ HEADER (16 bytes, all u32 little-endian)      │
//! │  html byte length + 1                         │
//! │  plain-text byte length + 1                   │
//! │  reserved = 0                                 │
//! │  format block length (0, or runs length + 3)  │
//! ├───────────────────────────────────────────────┤
//! │ html bytes, NUL                               │
//! │ plain-text bytes, NUL                         │
//! ├───────────────────────────────────────────────┤
//! │ FORMAT BLOCK (only when length != 0)          │
//! │  marker = 0x02                                │
//! │  runs byte length: u16 LE                     │
//! │  flat run records (6 or 13 bytes each)        │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! [`serialize`] is a pure function of the message's current state: it
//! never mutates the builder and yields byte-identical output across
//! calls. [`ProtocolPayload::parse`] is the matching reader, used for
//! round-trip verification and diagnostics.

use std::sync::OnceLock;

use regex::Regex;

use crate::message::MessageBuilder;
use crate::style::{FormatEntry, Rgb, StyleRun, TextStyle, IMAGE_MARKER};

/// Opening tag of the default presentation wrapper. Every transmitted
/// message carries exactly one top-level span; the font and color values
/// are fixed by the gateway's renderer.
pub const DEFAULT_SPAN_OPEN: &str =
    "<span style=\"color:#000000; font-family:'MS Shell Dlg 2'; font-size:9pt; \">";

/// Marker byte opening the format block.
pub const FORMAT_BLOCK_MARKER: u8 = 0x02;

/// Errors raised while parsing a protocol payload.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Fewer bytes than the layout requires.
    #[error("payload truncated while reading {0}")]
    Truncated(&'static str),
    /// A text field was not NUL-terminated.
    #[error("{0} field missing NUL terminator")]
    MissingNul(&'static str),
    /// A text field held invalid UTF-8.
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 {
        /// Which field was malformed.
        field: &'static str,
        /// The decoding error.
        #[source]
        source: std::str::Utf8Error,
    },
    /// The format block did not open with 0x02.
    #[error("format block marker {0:#04x}, expected 0x02")]
    BadFormatMarker(u8),
    /// The header's block length disagrees with the block's own length.
    #[error("format block length {inner} disagrees with header {header}")]
    FormatLengthMismatch {
        /// Length from the 16-byte header.
        header: u32,
        /// Length from the block's u16 field, plus marker and field size.
        inner: u32,
    },
    /// Bytes remained after the last field.
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
}

/// Serialize a message into the gateway payload.
///
/// The HTML buffer is wrapped in [`DEFAULT_SPAN_OPEN`] unless it already
/// consists of one single enclosing span; the wrap happens on a local
/// copy, the builder is never touched.
pub fn serialize(message: &MessageBuilder) -> Vec<u8> {
    let html = wrap_html(message.html());
    let text = message.text();

    let mut runs = Vec::new();
    for entry in message.format().unwrap_or(&[]) {
        entry.encode_into(&mut runs);
    }
    let format_block_len = if runs.is_empty() {
        0u32
    } else {
        (runs.len() & 0xFFFF_FFFF) as u32 + 3
    };

    let mut out = Vec::with_capacity(16 + html.len() + text.len() + runs.len() + 5);
    out.extend_from_slice(&((html.len() as u32) + 1).to_le_bytes());
    out.extend_from_slice(&((text.len() as u32) + 1).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&format_block_len.to_le_bytes());
    out.extend_from_slice(html.as_bytes());
    out.push(0);
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    if !runs.is_empty() {
        out.push(FORMAT_BLOCK_MARKER);
        out.extend_from_slice(&((runs.len() & 0xFFFF) as u16).to_le_bytes());
        out.extend_from_slice(&runs);
    }
    out
}

fn wrapper_regex() -> &'static Regex {
    static WRAPPER: OnceLock<Regex> = OnceLock::new();
    WRAPPER.get_or_init(|| {
        Regex::new(r"(?s)^<span[^>]*>.+</span>$").expect("wrapper pattern is valid")
    })
}

/// Apply the top-level wrapper rule to an HTML buffer.
fn wrap_html(html: &str) -> String {
    if wrapper_regex().is_match(html) {
        html.to_owned()
    } else {
        format!("{DEFAULT_SPAN_OPEN}{html}</span>")
    }
}

/// A decoded protocol payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolPayload {
    /// The HTML rendering, wrapper included.
    pub html: String,
    /// The plain-text fallback.
    pub text: String,
    /// Decoded format records; empty when the payload carried no block.
    pub entries: Vec<FormatEntry>,
}

impl ProtocolPayload {
    /// Parse a payload produced by [`serialize`].
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] describing the first layout violation.
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        let mut r = Reader { bytes, pos: 0 };

        let html_len = r
            .u32("header")?
            .checked_sub(1)
            .ok_or(WireError::Truncated("html length"))?;
        let text_len = r
            .u32("header")?
            .checked_sub(1)
            .ok_or(WireError::Truncated("text length"))?;
        let _reserved = r.u32("header")?;
        let format_block_len = r.u32("header")?;

        let html = r.string(html_len as usize, "html")?;
        let text = r.string(text_len as usize, "text")?;

        let mut entries = Vec::new();
        if format_block_len != 0 {
            let marker = r.u8("format marker")?;
            if marker != FORMAT_BLOCK_MARKER {
                return Err(WireError::BadFormatMarker(marker));
            }
            let runs_len = r.u16("format length")?;
            let inner = u32::from(runs_len) + 3;
            if inner != format_block_len {
                return Err(WireError::FormatLengthMismatch {
                    header: format_block_len,
                    inner,
                });
            }
            let runs = r.take(usize::from(runs_len), "format records")?;
            entries = decode_entries(runs)?;
        }

        let trailing = bytes.len() - r.pos;
        if trailing != 0 {
            return Err(WireError::TrailingBytes(trailing));
        }

        Ok(Self {
            html,
            text,
            entries,
        })
    }
}

/// Decode the flat record concatenation. Record size is dictated by the
/// byte after the offset: [`IMAGE_MARKER`] opens a 13-byte image record,
/// anything else is a 6-byte text run.
fn decode_entries(runs: &[u8]) -> Result<Vec<FormatEntry>, WireError> {
    let mut entries = Vec::new();
    let mut r = Reader {
        bytes: runs,
        pos: 0,
    };
    while r.pos < runs.len() {
        let offset = r.u16("run offset")?;
        let flags = r.u8("run flags")?;
        if flags == IMAGE_MARKER {
            let _subtype = r.u8("image subtype")?;
            let _flags = r.u8("image flags")?;
            let length = r.u32("image length")?;
            let crc = r.u32("image crc")?;
            entries.push(FormatEntry::Image {
                offset,
                length,
                crc,
            });
        } else {
            let color = Rgb::new(r.u8("red")?, r.u8("green")?, r.u8("blue")?);
            entries.push(FormatEntry::Text(StyleRun {
                offset,
                style: TextStyle::from_bits(flags & 0x07),
                color,
            }));
        }
    }
    Ok(entries)
}

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], WireError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(WireError::Truncated(what))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, WireError> {
        Ok(self.take(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, WireError> {
        let b = self.take(2, what)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, WireError> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read `len` bytes plus the mandatory NUL terminator.
    fn string(&mut self, len: usize, field: &'static str) -> Result<String, WireError> {
        let raw = self.take(len, field)?;
        let nul = self.u8(field).map_err(|_| WireError::MissingNul(field))?;
        if nul != 0 {
            return Err(WireError::MissingNul(field));
        }
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|source| WireError::InvalidUtf8 { field, source })
    }
}
