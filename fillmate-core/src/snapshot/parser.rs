//! Page Snapshot Parser
//!
//! Parses the XHTML snapshot a content script records into a PageDocument.
//! Real pages are rarely well-formed XML, so the reader runs in a tolerant
//! mode:
//! - HTML void elements (`<input>`, `<br>`, ...) never open a scope
//! - valueless and unquoted attributes are accepted (`disabled`, `type=text`)
//! - end tags close the nearest matching open element; stray ones are dropped
//! - `<script>` and `<style>` bodies are skipped

use crate::snapshot::document::PageDocument;
use crate::types::ElementHandle;
use anyhow::{anyhow, Result};
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use std::borrow::Cow;

const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn html_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        "copy" => Some("©"),
        "reg" => Some("®"),
        "hellip" => Some("…"),
        "middot" => Some("·"),
        "mdash" => Some("—"),
        "ndash" => Some("–"),
        "rsquo" => Some("’"),
        "lsquo" => Some("‘"),
        "ldquo" => Some("“"),
        "rdquo" => Some("”"),
        _ => None,
    }
}

/// Parse snapshot markup into a PageDocument.
pub fn parse_snapshot(markup: &str) -> Result<PageDocument> {
    let mut reader = Reader::from_str(markup);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut document = PageDocument::new();
    // Open elements, innermost last: (handle, tag)
    let mut stack: Vec<(ElementHandle, String)> = vec![(document.root(), "#document".to_string())];
    let mut focused: Option<ElementHandle> = None;
    let mut autofocus: Option<ElementHandle> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            anyhow!(
                "snapshot parse error at byte {}: {e}",
                reader.buffer_position()
            )
        })?;

        match event {
            Event::Start(start) => {
                let (handle, tag) = open_element(&mut document, &stack, &start);
                track_focus(&document, handle, &mut focused, &mut autofocus);
                if !is_void(&tag) {
                    stack.push((handle, tag));
                }
            }
            Event::Empty(start) => {
                let (handle, _) = open_element(&mut document, &stack, &start);
                track_focus(&document, handle, &mut focused, &mut autofocus);
            }
            Event::End(end) => {
                let tag = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                if is_void(&tag) {
                    continue;
                }
                if let Some(pos) = stack.iter().rposition(|(_, open)| *open == tag) {
                    if pos > 0 {
                        stack.truncate(pos);
                    }
                }
            }
            Event::Text(text) => {
                if inside_raw_text(&stack) {
                    continue;
                }
                let content = decode_text(&text);
                if !content.is_empty() {
                    let parent = current_parent(&stack);
                    document.append_text(parent, &content);
                }
            }
            Event::CData(data) => {
                if inside_raw_text(&stack) {
                    continue;
                }
                let content = String::from_utf8_lossy(&data.into_inner()).into_owned();
                let parent = current_parent(&stack);
                document.append_text(parent, &content);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no fields
            _ => {}
        }
    }

    document.set_focused(focused.or(autofocus));

    tracing::debug!(
        "✅ Snapshot parsed: {} elements, {} form fields",
        document.elements().len(),
        document.form_fields().len()
    );

    Ok(document)
}

fn current_parent(stack: &[(ElementHandle, String)]) -> ElementHandle {
    stack.last().map(|(h, _)| *h).unwrap_or(ElementHandle(0))
}

fn inside_raw_text(stack: &[(ElementHandle, String)]) -> bool {
    matches!(
        stack.last().map(|(_, tag)| tag.as_str()),
        Some("script") | Some("style")
    )
}

fn open_element(
    document: &mut PageDocument,
    stack: &[(ElementHandle, String)],
    start: &BytesStart,
) -> (ElementHandle, String) {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
    let mut attributes = Vec::new();

    for attr in start.html_attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = match attr.unescape_value_with(html_entity) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attributes.push((key, value));
    }

    let handle = document.append_element(current_parent(stack), &tag, attributes);
    (handle, tag)
}

fn decode_text(text: &BytesText) -> String {
    match text.unescape_with(html_entity) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => String::from_utf8_lossy(text).into_owned(),
    }
}

fn track_focus(
    document: &PageDocument,
    handle: ElementHandle,
    focused: &mut Option<ElementHandle>,
    autofocus: &mut Option<ElementHandle>,
) {
    if let Some(flag) = document.attr(handle, "data-focused") {
        if !flag.eq_ignore_ascii_case("false") {
            *focused = Some(handle);
        }
    }
    if autofocus.is_none() && document.has_attr(handle, "autofocus") {
        *autofocus = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::FieldKind;

    #[test]
    fn test_parses_void_inputs_without_closing_slash() {
        let doc = parse_snapshot(
            r#"<html><body><form><label for="e">Email</label><input id="e" type="email"><input name="q"></form></body></html>"#,
        )
        .unwrap();
        let fields = doc.form_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].1, FieldKind::Email);
        assert_eq!(doc.label_text(fields[0].0).as_deref(), Some("Email"));
        // The second input is a sibling, not a child of the first
        assert_eq!(doc.parent(fields[1].0), doc.parent(fields[0].0));
    }

    #[test]
    fn test_valueless_attributes() {
        let doc = parse_snapshot(r#"<body><input name="a" disabled><input name="b" readonly/></body>"#)
            .unwrap();
        let fields = doc.form_fields();
        assert!(!doc.is_editable(fields[0].0));
        assert!(!doc.is_editable(fields[1].0));
    }

    #[test]
    fn test_entities_and_textarea_value() {
        let doc = parse_snapshot("<body><textarea name=\"bio\">Hi&nbsp;there &amp; all</textarea></body>")
            .unwrap();
        let (area, _) = doc.form_fields()[0];
        assert_eq!(doc.value(area), "Hi\u{a0}there & all");
    }

    #[test]
    fn test_stray_end_tags_are_ignored() {
        let doc = parse_snapshot("<body><div><p>Name</div></span><input name=\"n\"></body>").unwrap();
        let (input, _) = doc.form_fields()[0];
        assert_eq!(doc.tag(doc.parent(input).unwrap()), Some("body"));
    }

    #[test]
    fn test_script_bodies_skipped() {
        let doc = parse_snapshot("<body><script>var x = 1;</script><div>Question</div></body>").unwrap();
        let body = doc.elements()[0];
        assert_eq!(doc.text_content(body), "Question");
    }

    #[test]
    fn test_focus_tracking_prefers_data_focused() {
        let doc = parse_snapshot(
            r#"<body><input name="a" autofocus><textarea name="b" data-focused="true"></textarea></body>"#,
        )
        .unwrap();
        let focused = doc.focused().unwrap();
        assert_eq!(doc.attr(focused, "name"), Some("b"));
    }
}
