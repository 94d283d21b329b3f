//! Message construction: the mutable builder that accumulates the three
//! byte-consistent views of a rich-text message — HTML, plain text and the
//! binary style-run stream — plus content-addressed image attachments.
//!
//! A builder starts in tracked mode. [`MessageBuilder::set_alternative_text`]
//! switches it one-way into alternate-text mode, where only a flat fallback
//! string is carried and no style runs are recorded; [`MessageBuilder::clear`]
//! is the only way back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::markup;
use crate::style::{FormatEntry, Rgb, StyleRun, TextStyle};
use crate::wire;

/// Errors raised while building a message.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// An attached image file could not be read.
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Style-run tracking state.
///
/// Modeled as a tagged variant rather than a nullable run list: alternate-
/// text mode is a different kind of message, not a message with a missing
/// field.
#[derive(Debug, Clone)]
enum Tracking {
    /// Normal mode: every text append records a style run.
    Tracked(Vec<FormatEntry>),
    /// Alternate-text mode: flat fallback text only.
    Untracked,
}

/// Builder for a single BotAPI message.
///
/// All mutators return `&mut Self` and may be chained. The builder owns
/// its buffers and image map exclusively; serializing it (via
/// [`MessageBuilder::protocol_message`]) never mutates it, so it can be
/// amended and re-serialized freely.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    recipients: Vec<u64>,
    send_to_offline: bool,
    html: String,
    text: String,
    tracking: Tracking,
    images: BTreeMap<String, Vec<u8>>,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// Create an empty message in tracked mode, delivered to offline
    /// recipients by default.
    pub fn new() -> Self {
        Self {
            recipients: Vec::new(),
            send_to_offline: true,
            html: String::new(),
            text: String::new(),
            tracking: Tracking::Tracked(Vec::new()),
            images: BTreeMap::new(),
        }
    }

    /// Reset the whole message to its initial state, including back to
    /// tracked mode.
    pub fn clear(&mut self) -> &mut Self {
        *self = Self::new();
        self
    }

    /// Append styled text.
    ///
    /// Line endings are normalized to CRLF first (idempotently); a
    /// [`TextStyle::NEW_LINE`] bit appends one trailing CRLF. In tracked
    /// mode a style run is recorded at the pre-append offset and the text
    /// joins the plain-text buffer; in alternate-text mode neither
    /// happens. The HTML buffer reflects the call in both modes.
    pub fn add_text(&mut self, text: &str, style: TextStyle, color: Rgb) -> &mut Self {
        let mut text = text.to_owned();
        if style.contains(TextStyle::NEW_LINE) {
            text.push_str("\r\n");
        }
        let normalized = normalize_line_endings(&text);

        if let Tracking::Tracked(entries) = &mut self.tracking {
            entries.push(FormatEntry::Text(StyleRun {
                offset: char_offset(&self.text),
                // Input-only bits (NEW_LINE) stop here.
                style: TextStyle::from_bits(style.wire_bits()),
                color,
            }));
            self.text.push_str(&normalized);
        }

        let mut html = escape_html(&normalized).replace("\r\n", "<br>");
        if !color.is_black() {
            html = format!("<span style=\"color:#{color};\">{html}</span>");
        }
        if style.contains(TextStyle::BOLD) {
            html = format!("<b>{html}</b>");
        }
        if style.contains(TextStyle::ITALIC) {
            html = format!("<i>{html}</i>");
        }
        if style.contains(TextStyle::UNDERLINE) {
            html = format!("<u>{html}</u>");
        }
        self.html.push_str(&html);

        self
    }

    /// Append unstyled text.
    pub fn add_plain(&mut self, text: &str) -> &mut Self {
        self.add_text(text, TextStyle::NONE, Rgb::BLACK)
    }

    /// Parse BBCode markup and append every resulting span.
    pub fn add_markup(&mut self, bbcode: &str) -> &mut Self {
        for span in markup::parse(bbcode) {
            self.add_text(&span.text, span.style, span.color);
        }
        self
    }

    /// Append raw HTML without touching the plain text or style runs.
    pub fn add_raw_html(&mut self, html: &str) -> &mut Self {
        self.html.push_str(html);
        self
    }

    /// Replace the HTML buffer outright.
    pub fn set_raw_html(&mut self, html: &str) -> &mut Self {
        self.html.clear();
        self.html.push_str(html);
        self
    }

    /// Switch to alternate-text mode and set the fallback plain text.
    ///
    /// Discards any recorded style runs; later `add_text` calls keep
    /// updating the HTML only. The transition is one-way — only
    /// [`MessageBuilder::clear`] restores run tracking.
    pub fn set_alternative_text(&mut self, text: &str) -> &mut Self {
        self.tracking = Tracking::Untracked;
        self.text.clear();
        self.text.push_str(text);
        self
    }

    /// Attach image bytes.
    ///
    /// The content hash (CRC-32 + byte length, 16 lowercase hex digits)
    /// keys the image map, so attaching identical bytes twice keeps one
    /// copy while each call still records its own placeholder: a format
    /// entry at the current offset (tracked mode only) and an
    /// `<img name="...">` reference in the HTML.
    pub fn add_image(&mut self, bytes: Vec<u8>) -> &mut Self {
        let crc = crc32fast::hash(&bytes);
        let length = (bytes.len() & 0xFFFF_FFFF) as u32;
        let hash = format!("{crc:08x}{length:08x}");

        if let Tracking::Tracked(entries) = &mut self.tracking {
            entries.push(FormatEntry::Image {
                offset: char_offset(&self.text),
                length,
                crc,
            });
        }

        self.images.insert(hash.clone(), bytes);
        self.add_raw_html(&format!("<img name=\"{hash}\">"))
    }

    /// Attach an image read from a file, failing fast when it cannot be
    /// read.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::ImageRead`] on any I/O failure; the message
    /// is left untouched in that case.
    pub fn add_image_file(&mut self, path: &Path) -> Result<&mut Self, MessageError> {
        let bytes = std::fs::read(path).map_err(|source| MessageError::ImageRead {
            path: path.to_owned(),
            source,
        })?;
        Ok(self.add_image(bytes))
    }

    /// Replace the recipient list, keeping first-occurrence order and
    /// dropping duplicates.
    pub fn set_recipients(&mut self, numbers: &[u64]) -> &mut Self {
        self.recipients.clear();
        for &number in numbers {
            self.add_recipient(number);
        }
        self
    }

    /// Add one recipient unless already present.
    pub fn add_recipient(&mut self, number: u64) -> &mut Self {
        if !self.recipients.contains(&number) {
            self.recipients.push(number);
        }
        self
    }

    /// Whether the message should also reach recipients that are offline.
    pub fn set_send_to_offline(&mut self, send_to_offline: bool) -> &mut Self {
        self.send_to_offline = send_to_offline;
        self
    }

    /// Serialize into the binary gateway payload.
    pub fn protocol_message(&self) -> Vec<u8> {
        wire::serialize(self)
    }

    /// Accumulated HTML buffer (without the outer default wrapper, which
    /// is applied at serialization time).
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Accumulated plain-text buffer (or the alternate text).
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Recorded format entries, `None` in alternate-text mode.
    pub fn format(&self) -> Option<&[FormatEntry]> {
        match &self.tracking {
            Tracking::Tracked(entries) => Some(entries),
            Tracking::Untracked => None,
        }
    }

    /// Attached images keyed by content hash.
    pub fn images(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.images
    }

    /// Recipient GG numbers in insertion order.
    pub fn recipients(&self) -> &[u64] {
        &self.recipients
    }

    /// Whether offline recipients receive the message too.
    pub fn send_to_offline(&self) -> bool {
        self.send_to_offline
    }
}

/// Convert lone LFs to CRLF, then collapse the CRCR this produces from
/// pre-existing CRLFs, so already-normalized input passes through
/// unchanged.
fn normalize_line_endings(text: &str) -> String {
    text.replace('\n', "\r\n").replace("\r\r", "\r")
}

/// Plain-text offset for the next format entry: Unicode scalar values,
/// truncated exactly like the 16-bit wire field.
fn char_offset(text: &str) -> u16 {
    (text.chars().count() & 0xFFFF) as u16
}

/// Escape `&`, `<`, `>` and `"` for HTML. Ampersands are replaced first,
/// so already-escaped input would be escaped again — callers pass raw
/// text, never HTML.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
