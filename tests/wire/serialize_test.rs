//! Binary payload layout, round-trip and purity.

use gg_botapi::message::MessageBuilder;
use gg_botapi::style::{FormatEntry, Rgb, TextStyle, COLOR_PRESENT};
use gg_botapi::wire::{serialize, ProtocolPayload, DEFAULT_SPAN_OPEN, FORMAT_BLOCK_MARKER};

fn header_u32(payload: &[u8], index: usize) -> u32 {
    let base = index * 4;
    u32::from_le_bytes([
        payload[base],
        payload[base + 1],
        payload[base + 2],
        payload[base + 3],
    ])
}

#[test]
fn golden_layout_for_a_bold_greeting() {
    let mut message = MessageBuilder::new();
    message.add_text("Hi", TextStyle::BOLD, Rgb::BLACK);
    let payload = serialize(&message);

    let html = format!("{DEFAULT_SPAN_OPEN}<b>Hi</b></span>");
    let mut expected = Vec::new();
    expected.extend_from_slice(&((html.len() as u32) + 1).to_le_bytes());
    expected.extend_from_slice(&3u32.to_le_bytes()); // "Hi" + NUL
    expected.extend_from_slice(&0u32.to_le_bytes()); // reserved
    expected.extend_from_slice(&9u32.to_le_bytes()); // one 6-byte run + 3
    expected.extend_from_slice(html.as_bytes());
    expected.push(0);
    expected.extend_from_slice(b"Hi");
    expected.push(0);
    expected.push(FORMAT_BLOCK_MARKER);
    expected.extend_from_slice(&6u16.to_le_bytes());
    expected.extend_from_slice(&[0, 0, 0x01 | COLOR_PRESENT, 0, 0, 0]);

    assert_eq!(payload, expected);
}

#[test]
fn round_trip_reproduces_every_field() {
    let mut message = MessageBuilder::new();
    message.add_markup("[b]Hi[/b] [color=#FF0000]there[/color][br]bye");
    message.add_image(vec![1, 2, 3, 4, 5]);

    let payload = serialize(&message);
    let decoded = ProtocolPayload::parse(&payload).expect("own output parses");

    assert_eq!(
        decoded.html,
        format!("{}{}</span>", DEFAULT_SPAN_OPEN, message.html())
    );
    assert_eq!(decoded.text, message.text());
    assert_eq!(decoded.entries, message.format().expect("tracked"));
}

#[test]
fn serialize_is_pure_and_idempotent() {
    let mut message = MessageBuilder::new();
    message.add_markup("[u]once[/u]");
    let first = serialize(&message);
    let second = serialize(&message);
    assert_eq!(first, second);

    // Serialization never caches: mutating and re-serializing reflects
    // the new state.
    message.add_plain(" twice");
    let third = serialize(&message);
    assert_ne!(first, third);
    let decoded = ProtocolPayload::parse(&third).expect("parses");
    assert_eq!(decoded.text, "once twice");
}

#[test]
fn alternate_text_payload_has_no_format_block() {
    let mut message = MessageBuilder::new();
    message.add_plain("styled");
    message.set_alternative_text("fallback");
    let payload = serialize(&message);

    assert_eq!(header_u32(&payload, 3), 0);
    // Payload ends right after the plain-text NUL.
    let html_len = header_u32(&payload, 0) as usize;
    let text_len = header_u32(&payload, 1) as usize;
    assert_eq!(payload.len(), 16 + html_len + text_len);

    let decoded = ProtocolPayload::parse(&payload).expect("parses");
    assert_eq!(decoded.text, "fallback");
    assert!(decoded.entries.is_empty());
}

#[test]
fn already_wrapped_html_is_not_wrapped_again() {
    let mut message = MessageBuilder::new();
    message.set_raw_html("<span style=\"color:#123456;\">custom</span>");
    message.set_alternative_text("alt");
    let payload = serialize(&message);
    let decoded = ProtocolPayload::parse(&payload).expect("parses");
    assert_eq!(decoded.html, "<span style=\"color:#123456;\">custom</span>");
    assert!(!decoded.html.contains("MS Shell Dlg"));
}

#[test]
fn image_entries_survive_the_round_trip() {
    let bytes = vec![9u8; 300];
    let mut message = MessageBuilder::new();
    message.add_plain("pic:");
    message.add_image(bytes.clone());

    let payload = serialize(&message);
    let decoded = ProtocolPayload::parse(&payload).expect("parses");

    let image = decoded
        .entries
        .iter()
        .find(|entry| matches!(entry, FormatEntry::Image { .. }))
        .expect("image entry");
    match image {
        FormatEntry::Image {
            offset,
            length,
            crc,
        } => {
            assert_eq!(*offset, 4);
            assert_eq!(*length, 300);
            assert_eq!(*crc, crc32fast::hash(&bytes));
        }
        FormatEntry::Text(_) => unreachable!(),
    }
}

#[test]
fn mixed_record_sizes_decode_by_marker_byte() {
    let mut message = MessageBuilder::new();
    message.add_text("a", TextStyle::BOLD, Rgb::BLACK);
    message.add_image(vec![1, 2, 3]);
    message.add_text("b", TextStyle::NONE, Rgb::new(0, 0, 255));

    let payload = serialize(&message);
    let decoded = ProtocolPayload::parse(&payload).expect("parses");
    assert_eq!(decoded.entries.len(), 3);
    assert!(matches!(decoded.entries[0], FormatEntry::Text(_)));
    assert!(matches!(decoded.entries[1], FormatEntry::Image { .. }));
    assert!(matches!(decoded.entries[2], FormatEntry::Text(_)));
}
