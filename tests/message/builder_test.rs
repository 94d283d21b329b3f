//! MessageBuilder accumulation: plain text, HTML and style runs staying
//! consistent with each other.

use gg_botapi::message::MessageBuilder;
use gg_botapi::style::{FormatEntry, Rgb, StyleRun, TextStyle, COLOR_PRESENT};

fn text_runs(message: &MessageBuilder) -> Vec<StyleRun> {
    message
        .format()
        .expect("tracked mode")
        .iter()
        .filter_map(|entry| match entry {
            FormatEntry::Text(run) => Some(*run),
            FormatEntry::Image { .. } => None,
        })
        .collect()
}

#[test]
fn plain_text_records_one_run_at_offset_zero() {
    let mut message = MessageBuilder::new();
    message.add_plain("hello");

    assert_eq!(message.text(), "hello");
    let runs = text_runs(&message);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].offset, 0);
    assert_eq!(runs[0].style, TextStyle::NONE);
    assert_eq!(runs[0].wire_flags(), COLOR_PRESENT);
}

#[test]
fn lf_is_normalized_to_crlf() {
    let mut message = MessageBuilder::new();
    message.add_plain("a\nb");
    assert_eq!(message.text(), "a\r\nb");
    assert!(message.html().contains("a<br>b"));
}

#[test]
fn crlf_input_is_not_doubled() {
    let mut message = MessageBuilder::new();
    message.add_plain("a\r\nb");
    assert_eq!(message.text(), "a\r\nb");
}

#[test]
fn new_line_style_appends_one_crlf() {
    let mut message = MessageBuilder::new();
    message.add_text("line", TextStyle::NEW_LINE, Rgb::BLACK);
    assert_eq!(message.text(), "line\r\n");
    assert!(message.html().ends_with("line<br>"));
    // The NEW_LINE bit itself never reaches the recorded run.
    assert_eq!(text_runs(&message)[0].style, TextStyle::NONE);
}

#[test]
fn offsets_advance_by_scalar_values() {
    let mut message = MessageBuilder::new();
    message.add_plain("zażółć");
    message.add_text("gęślą", TextStyle::BOLD, Rgb::BLACK);

    let runs = text_runs(&message);
    assert_eq!(runs[0].offset, 0);
    assert_eq!(runs[1].offset, 6);
}

#[test]
fn each_call_records_its_own_run_never_merged() {
    let mut message = MessageBuilder::new();
    message.add_plain("aa").add_plain("bb");
    let runs = text_runs(&message);
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[1].offset, 2);
}

#[test]
fn html_escapes_without_double_escaping() {
    let mut message = MessageBuilder::new();
    message.add_plain("a & b < c > \"d\"");
    assert!(message
        .html()
        .contains("a &amp; b &lt; c &gt; &quot;d&quot;"));
    assert!(!message.html().contains("&amp;amp;"));
}

#[test]
fn html_wrap_order_is_u_i_b_around_color() {
    let mut message = MessageBuilder::new();
    message.add_text(
        "x",
        TextStyle::BOLD | TextStyle::ITALIC | TextStyle::UNDERLINE,
        Rgb::new(255, 0, 0),
    );
    assert_eq!(
        message.html(),
        "<u><i><b><span style=\"color:#ff0000;\">x</span></b></i></u>"
    );
}

#[test]
fn black_text_gets_no_color_span() {
    let mut message = MessageBuilder::new();
    message.add_text("x", TextStyle::BOLD, Rgb::BLACK);
    assert_eq!(message.html(), "<b>x</b>");
}

#[test]
fn markup_scenario_produces_expected_views() {
    let mut message = MessageBuilder::new();
    message.add_markup("[b]Hi[/b] [color=#FF0000]there[/color]");

    assert_eq!(message.text(), "Hi there");

    let runs = text_runs(&message);
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0].offset, 0);
    assert_eq!(runs[0].style, TextStyle::BOLD);
    assert_eq!(runs[0].color, Rgb::BLACK);
    assert_eq!(runs[2].offset, 3);
    assert_eq!(runs[2].style, TextStyle::NONE);
    assert_eq!(runs[2].color, Rgb::new(255, 0, 0));

    assert!(message.html().contains("<b>Hi</b>"));
    assert!(message
        .html()
        .contains("<span style=\"color:#ff0000;\">there</span>"));
}

#[test]
fn alternate_text_disables_run_tracking_for_good() {
    let mut message = MessageBuilder::new();
    message.add_plain("tracked");
    message.set_alternative_text("fallback only");
    assert_eq!(message.text(), "fallback only");
    assert!(message.format().is_none());

    // Later appends keep updating the HTML but not the text or runs.
    message.add_text("more", TextStyle::BOLD, Rgb::BLACK);
    assert_eq!(message.text(), "fallback only");
    assert!(message.format().is_none());
    assert!(message.html().ends_with("<b>more</b>"));
}

#[test]
fn clear_restores_tracking() {
    let mut message = MessageBuilder::new();
    message.set_alternative_text("alt");
    message.clear();
    assert!(message.format().is_some());
    assert_eq!(message.text(), "");
    assert_eq!(message.html(), "");
    assert!(message.send_to_offline());
}

#[test]
fn raw_html_append_and_replace() {
    let mut message = MessageBuilder::new();
    message.add_raw_html("<hr>").add_raw_html("<hr>");
    assert_eq!(message.html(), "<hr><hr>");
    message.set_raw_html("<p>fresh</p>");
    assert_eq!(message.html(), "<p>fresh</p>");
    // Raw HTML never touches text or runs.
    assert_eq!(message.text(), "");
    assert!(message.format().expect("tracked").is_empty());
}

#[test]
fn recipients_behave_as_an_ordered_set() {
    let mut message = MessageBuilder::new();
    message.set_recipients(&[3, 1, 3, 2, 1]);
    assert_eq!(message.recipients(), &[3, 1, 2]);
    message.add_recipient(1).add_recipient(4);
    assert_eq!(message.recipients(), &[3, 1, 2, 4]);
}
