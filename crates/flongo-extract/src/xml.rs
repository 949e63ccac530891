//! XML and HTML bodies.
//!
//! Documents are converted into nested maps:
//!
//! - an element with only text becomes a string
//! - an empty element becomes `null`
//! - attributes become `@name` keys, and mixed text lands under `#text`
//! - repeated sibling elements collect into an array

use flongo_core::Payload;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Self {
        let mut children = Map::new();
        for attr in start.attributes().flatten() {
            let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            children.insert(key, Value::String(value));
        }
        Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children,
            text: String::new(),
        }
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim();
        let value = if self.children.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        } else {
            let mut children = self.children;
            if !text.is_empty() {
                children.insert("#text".to_string(), Value::String(text.to_string()));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

fn attach(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// Converts an XML or HTML document into a payload.
///
/// Returns `None` if the document is malformed.
///
/// ```rust
/// use flongo_extract::xml_to_map;
///
/// let payload = xml_to_map(r#"<item id="7"><name>Widget</name></item>"#).unwrap();
/// assert_eq!(payload["item"]["@id"], "7");
/// assert_eq!(payload["item"]["name"], "Widget");
/// ```
#[must_use]
pub fn xml_to_map(document: &str) -> Option<Payload> {
    let mut reader = Reader::from_str(document);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut root = Frame {
        name: String::new(),
        children: Map::new(),
        text: String::new(),
    };
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, position = reader.buffer_position(), "malformed markup body");
                return None;
            }
        };

        match event {
            Event::Start(start) => stack.push(Frame::open(&start)),
            Event::Empty(start) => {
                let (name, value) = Frame::open(&start).close();
                let parent = stack.last_mut().unwrap_or(&mut root);
                attach(&mut parent.children, name, value);
            }
            Event::End(_) => {
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.close();
                    let parent = stack.last_mut().unwrap_or(&mut root);
                    attach(&mut parent.children, name, value);
                }
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    match text.unescape() {
                        Ok(unescaped) => frame.text.push_str(&unescaped),
                        Err(_) => frame.text.push_str(&String::from_utf8_lossy(&text)),
                    }
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
    }

    // Unclosed elements, as is common in HTML, are folded into their parents.
    while let Some(frame) = stack.pop() {
        let (name, value) = frame.close();
        let parent = stack.last_mut().unwrap_or(&mut root);
        attach(&mut parent.children, name, value);
    }

    Some(root.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_document() {
        let payload = xml_to_map("<?xml version=\"1.0\"?><record><_id>5</_id></record>").unwrap();
        assert_eq!(Value::Object(payload), json!({"record": {"_id": "5"}}));
    }

    #[test]
    fn test_repeated_children_become_array() {
        let payload = xml_to_map("<list><item>a</item><item>b</item><item>c</item></list>").unwrap();
        assert_eq!(payload["list"]["item"], json!(["a", "b", "c"]));
    }

    #[test]
    fn test_attributes_and_mixed_text() {
        let payload = xml_to_map(r#"<price currency="EUR">9.99</price>"#).unwrap();
        assert_eq!(payload["price"], json!({"@currency": "EUR", "#text": "9.99"}));
    }

    #[test]
    fn test_empty_elements_are_null() {
        let payload = xml_to_map("<root><a/><b></b></root>").unwrap();
        assert_eq!(payload["root"], json!({"a": null, "b": null}));
    }

    #[test]
    fn test_entities_and_cdata() {
        let payload = xml_to_map("<r><t>a &amp; b</t><c><![CDATA[<raw>]]></c></r>").unwrap();
        assert_eq!(payload["r"]["t"], json!("a & b"));
        assert_eq!(payload["r"]["c"], json!("<raw>"));
    }

    #[test]
    fn test_html_with_unclosed_tags() {
        let payload = xml_to_map("<html><body><p>hello</body></html>").unwrap();
        assert!(payload.contains_key("html"));
    }
}
