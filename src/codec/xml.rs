use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use super::{CodecError, ContentKind};

const ROOT: &str = "root";

fn encode_error(reason: impl ToString) -> CodecError {
    CodecError::Encode {
        kind: ContentKind::Xml,
        reason: reason.to_string(),
    }
}

fn decode_error(reason: impl ToString) -> CodecError {
    CodecError::Decode {
        kind: ContentKind::Xml,
        reason: reason.to_string(),
    }
}

/// Encode a map or text as an XML document.
///
/// A map with a single key uses that key as the root element; anything else
/// is wrapped in `<root>`. List items repeat the name of the element holding
/// the list.
pub(super) fn encode(value: &Value, pretty: bool) -> Result<String, CodecError> {
    let mut writer = if pretty {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let single = match value {
        Value::Object(map) if map.len() == 1 => map.iter().next(),
        _ => None,
    };
    match single {
        Some((key, inner)) => element(&mut writer, &element_name(key, ROOT), inner)?,
        None => element(&mut writer, ROOT, value)?,
    }

    String::from_utf8(writer.into_inner()).map_err(encode_error)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), CodecError> {
    writer.write_event(event).map_err(encode_error)
}

fn element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => write(writer, Event::Empty(BytesStart::new(name))),
        Value::Object(map) if map.is_empty() => write(writer, Event::Empty(BytesStart::new(name))),
        Value::Array(items) if items.is_empty() => {
            write(writer, Event::Empty(BytesStart::new(name)))
        }
        Value::Object(map) => {
            write(writer, Event::Start(BytesStart::new(name)))?;
            children(writer, name, map)?;
            write(writer, Event::End(BytesEnd::new(name)))
        }
        Value::Array(items) => {
            write(writer, Event::Start(BytesStart::new(name)))?;
            for item in items {
                element(writer, name, item)?;
            }
            write(writer, Event::End(BytesEnd::new(name)))
        }
        Value::String(text) => text_element(writer, name, text),
        scalar => text_element(writer, name, &scalar.to_string()),
    }
}

fn children(
    writer: &mut Writer<Vec<u8>>,
    parent: &str,
    map: &Map<String, Value>,
) -> Result<(), CodecError> {
    for (key, value) in map {
        let name = element_name(key, parent);
        match value {
            Value::Array(items) => {
                for item in items {
                    element(writer, &name, item)?;
                }
            }
            other => element(writer, &name, other)?,
        }
    }
    Ok(())
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), CodecError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// Element name for a map key. Numeric keys take the parent's name; other
/// keys keep only `[A-Za-z0-9_.:-]`.
fn element_name(key: &str, parent: &str) -> String {
    if key.chars().all(|c| c.is_ascii_digit()) {
        return parent.to_string();
    }
    let mut name: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
        .collect();
    if name.is_empty() {
        return parent.to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '-') {
        name.insert(0, '_');
    }
    name
}

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
    has_children: bool,
}

impl Frame {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Map::new(),
            text: String::new(),
            has_children: false,
        }
    }

    fn into_value(self) -> (String, Value) {
        let value = if self.has_children {
            Value::Object(self.children)
        } else {
            let text = self.text.trim();
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            }
        };
        (self.name, value)
    }
}

/// Decode an XML document into `{root_name: content}`.
///
/// Elements with children become maps, repeated siblings become lists and
/// leaves become their trimmed text, or `null` when empty. Attributes are
/// ignored.
pub(super) fn decode(body: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::from_reader(body);
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if root.is_some() {
                    return Err(decode_error("content after the root element"));
                }
                stack.push(Frame::new(tag_name(&e)));
            }
            Ok(Event::End(_)) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| decode_error("unexpected closing tag"))?;
                let (name, value) = frame.into_value();
                attach(&mut stack, &mut root, name, value);
            }
            Ok(Event::Empty(e)) => {
                if root.is_some() {
                    return Err(decode_error("content after the root element"));
                }
                attach(&mut stack, &mut root, tag_name(&e), Value::Null);
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(decode_error)?;
                match stack.last_mut() {
                    Some(frame) => frame.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(decode_error("text outside the root element")),
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(decode_error(e)),
        }
    }

    if !stack.is_empty() {
        return Err(decode_error("unclosed element"));
    }
    let (name, value) = root.ok_or_else(|| decode_error("no root element"))?;
    let mut map = Map::new();
    map.insert(name, value);
    Ok(Value::Object(map))
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attach(stack: &mut [Frame], root: &mut Option<(String, Value)>, name: String, value: Value) {
    let Some(parent) = stack.last_mut() else {
        *root = Some((name, value));
        return;
    };
    parent.has_children = true;
    match parent.children.get_mut(&name) {
        Some(Value::Array(siblings)) => siblings.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.children.insert(name, value);
        }
    }
}
