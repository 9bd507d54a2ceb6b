//! XML document codec
//!
//! Documents are written as:
//!
//! ```xml
//! <conversionDocument created=".." id=".." updated="..">
//!   <dataSource name="rows" elementType="row">
//!     <value kind="object"><entry key="id" kind="number">1</entry></value>
//!   </dataSource>
//! </conversionDocument>
//! ```
//!
//! Absent optional fields are omitted. Every value element carries a `kind`
//! attribute so records decode back to the exact JSON value they came from.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Number, Value};

use crate::domain::DomainError;
use crate::domain::conversion::{
    ConversionDocument, DataSource, DocumentCodec, DocumentFormat, DocumentId, DocumentParts,
};

const ROOT: &str = "conversionDocument";
const DATA_SOURCE: &str = "dataSource";
const VALUE: &str = "value";
const ITEM: &str = "item";
const ENTRY: &str = "entry";

/// Maximum nesting of array and object values
const MAX_DEPTH: usize = 128;

/// Codec for the XML markup
#[derive(Debug, Clone, Default)]
pub struct XmlDocumentCodec;

impl XmlDocumentCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for XmlDocumentCodec {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Xml
    }

    fn encode(&self, document: &ConversionDocument) -> Result<Vec<u8>, DomainError> {
        let mut writer = Writer::new(Vec::new());
        write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;

        let mut root = BytesStart::new(ROOT);
        root.push_attribute(("created", timestamp(document.created()).as_str()));
        if let Some(finished) = document.finished() {
            root.push_attribute(("finished", timestamp(finished).as_str()));
        }
        if let Some(id) = document.id() {
            root.push_attribute(("id", id.to_string().as_str()));
        }
        if let Some(started) = document.started() {
            root.push_attribute(("started", timestamp(started).as_str()));
        }
        root.push_attribute(("updated", timestamp(document.updated()).as_str()));
        write(&mut writer, Event::Start(root))?;

        for source in document.data_sources() {
            write_data_source(&mut writer, source)?;
        }

        write(&mut writer, Event::End(BytesEnd::new(ROOT)))?;
        Ok(writer.into_inner())
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConversionDocument, DomainError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DomainError::serialization(format!("XML document is not UTF-8: {}", e)))?;
        let mut reader = Reader::from_str(text);

        let (root_attributes, has_children) = match next_significant(&mut reader)? {
            Event::Start(e) if e.name().as_ref() == ROOT.as_bytes() => (attributes(&e)?, true),
            Event::Empty(e) if e.name().as_ref() == ROOT.as_bytes() => (attributes(&e)?, false),
            other => return Err(unexpected(&other, ROOT)),
        };

        let mut parts = DocumentParts {
            created: optional_timestamp(&root_attributes, "created")?.unwrap_or_else(Utc::now),
            data_sources: Vec::new(),
            finished: optional_timestamp(&root_attributes, "finished")?,
            id: root_attributes
                .get("id")
                .map(|id| DocumentId::new(id))
                .transpose()?,
            started: optional_timestamp(&root_attributes, "started")?,
            updated: optional_timestamp(&root_attributes, "updated")?.unwrap_or_else(Utc::now),
        };

        if has_children {
            loop {
                match next_significant(&mut reader)? {
                    Event::Start(e) if e.name().as_ref() == DATA_SOURCE.as_bytes() => {
                        let source = read_data_source(&mut reader, &attributes(&e)?)?;
                        parts.data_sources.push(source);
                    }
                    Event::Empty(e) if e.name().as_ref() == DATA_SOURCE.as_bytes() => {
                        let source = data_source_from(&attributes(&e)?, Vec::new())?;
                        parts.data_sources.push(source);
                    }
                    Event::End(_) => break,
                    other => return Err(unexpected(&other, DATA_SOURCE)),
                }
            }
        }

        ConversionDocument::try_from(parts)
    }
}

// Encoding

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DomainError> {
    writer
        .write_event(event)
        .map_err(|e| DomainError::serialization(format!("Failed to write XML: {}", e)))
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn write_data_source(writer: &mut Writer<Vec<u8>>, source: &DataSource) -> Result<(), DomainError> {
    let mut element = BytesStart::new(DATA_SOURCE);
    element.push_attribute(("name", source.name()));
    if let Some(element_type) = source.element_type() {
        element.push_attribute(("elementType", element_type));
    }

    if source.is_empty() {
        return write(writer, Event::Empty(element));
    }

    write(writer, Event::Start(element))?;
    for record in source.records() {
        write_value(writer, VALUE, None, record)?;
    }
    write(writer, Event::End(BytesEnd::new(DATA_SOURCE)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn write_value(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    key: Option<&str>,
    value: &Value,
) -> Result<(), DomainError> {
    let mut element = BytesStart::new(tag);
    if let Some(key) = key {
        element.push_attribute(("key", key));
    }
    element.push_attribute(("kind", kind_of(value)));

    let text = match value {
        Value::Null => return write(writer, Event::Empty(element)),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::String(s) if s.is_empty() => return write(writer, Event::Empty(element)),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Array(items) => {
            if items.is_empty() {
                return write(writer, Event::Empty(element));
            }
            write(writer, Event::Start(element))?;
            for item in items {
                write_value(writer, ITEM, None, item)?;
            }
            return write(writer, Event::End(BytesEnd::new(tag)));
        }
        Value::Object(entries) => {
            if entries.is_empty() {
                return write(writer, Event::Empty(element));
            }
            write(writer, Event::Start(element))?;
            for (entry_key, entry) in entries {
                write_value(writer, ENTRY, Some(entry_key), entry)?;
            }
            return write(writer, Event::End(BytesEnd::new(tag)));
        }
    };

    write(writer, Event::Start(element))?;
    write(writer, Event::Text(BytesText::new(&text)))?;
    write(writer, Event::End(BytesEnd::new(tag)))
}

// Decoding

fn xml_error(e: impl Display) -> DomainError {
    DomainError::serialization(format!("Invalid XML document: {}", e))
}

fn unexpected(event: &Event<'_>, expected: &str) -> DomainError {
    let found = match event {
        Event::Start(e) | Event::Empty(e) => {
            format!("element <{}>", String::from_utf8_lossy(e.name().as_ref()))
        }
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Eof => "end of input".to_string(),
        _ => "text".to_string(),
    };
    xml_error(format!("expected <{}>, found {}", expected, found))
}

/// Next event that is not a declaration, comment or whitespace
fn next_significant<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, DomainError> {
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            Event::Text(t) if t.iter().all(|b| b.is_ascii_whitespace()) => continue,
            event => return Ok(event),
        }
    }
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, DomainError> {
    let mut map = HashMap::new();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = std::str::from_utf8(attribute.key.as_ref()).map_err(xml_error)?;
        let value = attribute.unescape_value().map_err(xml_error)?;
        map.insert(key.to_string(), value.into_owned());
    }

    Ok(map)
}

fn optional_timestamp(
    attributes: &HashMap<String, String>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, DomainError> {
    attributes
        .get(name)
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| xml_error(format!("attribute '{}' is not RFC 3339: {}", name, e)))
        })
        .transpose()
}

fn data_source_from(
    attributes: &HashMap<String, String>,
    records: Vec<Value>,
) -> Result<DataSource, DomainError> {
    let name = attributes
        .get("name")
        .ok_or_else(|| xml_error("<dataSource> is missing its 'name' attribute"))?;

    Ok(DataSource::from_parts(
        name.clone(),
        attributes.get("elementType").cloned(),
        records,
    ))
}

fn read_data_source(
    reader: &mut Reader<&[u8]>,
    attributes: &HashMap<String, String>,
) -> Result<DataSource, DomainError> {
    let mut records = Vec::new();

    loop {
        match next_significant(reader)? {
            Event::Start(e) if e.name().as_ref() == VALUE.as_bytes() => {
                let kind = kind_attribute(&e)?;
                records.push(read_value(reader, &kind, 0)?);
            }
            Event::Empty(e) if e.name().as_ref() == VALUE.as_bytes() => {
                records.push(empty_value(&kind_attribute(&e)?)?);
            }
            Event::End(_) => break,
            other => return Err(unexpected(&other, VALUE)),
        }
    }

    data_source_from(attributes, records)
}

fn kind_attribute(element: &BytesStart<'_>) -> Result<String, DomainError> {
    attributes(element)?
        .remove("kind")
        .ok_or_else(|| xml_error("value element is missing its 'kind' attribute"))
}

/// Value of a self-closing element
fn empty_value(kind: &str) -> Result<Value, DomainError> {
    match kind {
        "null" => Ok(Value::Null),
        "string" => Ok(Value::String(String::new())),
        "array" => Ok(Value::Array(Vec::new())),
        "object" => Ok(Value::Object(Map::new())),
        other => Err(xml_error(format!("empty element cannot hold a '{}' value", other))),
    }
}

/// Value of an element whose start tag has just been read
fn read_value(reader: &mut Reader<&[u8]>, kind: &str, depth: usize) -> Result<Value, DomainError> {
    if depth > MAX_DEPTH {
        return Err(xml_error("values are nested too deeply"));
    }

    match kind {
        "null" => {
            match next_significant(reader)? {
                Event::End(_) => Ok(Value::Null),
                other => Err(unexpected(&other, "/value")),
            }
        }
        "bool" => match read_text(reader)?.trim() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            other => Err(xml_error(format!("'{}' is not a boolean", other))),
        },
        "number" => {
            let text = read_text(reader)?;
            serde_json::from_str::<Number>(text.trim())
                .map(Value::Number)
                .map_err(|_| xml_error(format!("'{}' is not a number", text)))
        }
        "string" => read_text(reader).map(Value::String),
        "array" => {
            let mut items = Vec::new();
            loop {
                match next_significant(reader)? {
                    Event::Start(e) if e.name().as_ref() == ITEM.as_bytes() => {
                        let kind = kind_attribute(&e)?;
                        items.push(read_value(reader, &kind, depth + 1)?);
                    }
                    Event::Empty(e) if e.name().as_ref() == ITEM.as_bytes() => {
                        items.push(empty_value(&kind_attribute(&e)?)?);
                    }
                    Event::End(_) => return Ok(Value::Array(items)),
                    other => return Err(unexpected(&other, ITEM)),
                }
            }
        }
        "object" => {
            let mut entries = Map::new();
            loop {
                match next_significant(reader)? {
                    Event::Start(e) if e.name().as_ref() == ENTRY.as_bytes() => {
                        let (key, kind) = entry_attributes(&e)?;
                        entries.insert(key, read_value(reader, &kind, depth + 1)?);
                    }
                    Event::Empty(e) if e.name().as_ref() == ENTRY.as_bytes() => {
                        let (key, kind) = entry_attributes(&e)?;
                        entries.insert(key, empty_value(&kind)?);
                    }
                    Event::End(_) => return Ok(Value::Object(entries)),
                    other => return Err(unexpected(&other, ENTRY)),
                }
            }
        }
        other => Err(xml_error(format!("unknown value kind '{}'", other))),
    }
}

fn entry_attributes(element: &BytesStart<'_>) -> Result<(String, String), DomainError> {
    let mut attributes = attributes(element)?;
    let key = attributes
        .remove("key")
        .ok_or_else(|| xml_error("<entry> is missing its 'key' attribute"))?;
    let kind = attributes
        .remove("kind")
        .ok_or_else(|| xml_error("<entry> is missing its 'kind' attribute"))?;
    Ok((key, kind))
}

/// Text content up to the closing tag of the current element
fn read_text(reader: &mut Reader<&[u8]>) -> Result<String, DomainError> {
    let mut text = String::new();

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => {
                let raw = c.into_inner();
                text.push_str(std::str::from_utf8(&raw).map_err(xml_error)?);
            }
            Event::Comment(_) => continue,
            Event::End(_) => return Ok(text),
            other => return Err(unexpected(&other, "text")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use crate::domain::conversion::SourceRecord;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: u64,
        label: String,
        tags: Vec<String>,
        score: Option<f64>,
    }

    impl SourceRecord for Row {
        const ELEMENT_TYPE: &'static str = "row";
    }

    fn sample_document() -> ConversionDocument {
        let mut doc = ConversionDocument::new()
            .with_data_source(
                "rows",
                vec![
                    Row {
                        id: 1,
                        label: "a <b> & \"c\"".to_string(),
                        tags: vec!["x".to_string(), String::new()],
                        score: Some(1.5),
                    },
                    Row {
                        id: 2,
                        label: "  padded  ".to_string(),
                        tags: Vec::new(),
                        score: None,
                    },
                ],
            )
            .unwrap()
            .with_data_source(
                "Mixed",
                vec![
                    json!(null),
                    json!(true),
                    json!(-12),
                    json!(""),
                    json!({}),
                    json!([[], {"nested": [1, 2.25, "three"]}]),
                ],
            )
            .unwrap()
            .with_data_source("empty", Vec::<String>::new())
            .unwrap();
        doc.stamp_persisted(Utc::now());
        doc.mark_started();
        doc
    }

    #[test]
    fn test_round_trip() {
        let codec = XmlDocumentCodec::new();
        let doc = sample_document();

        let bytes = codec.encode(&doc).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        assert_eq!(decoded, doc);
        assert_eq!(
            decoded.get_data_source::<Row>("rows").unwrap().records()[0].label,
            "a <b> & \"c\""
        );
    }

    #[test]
    fn test_encoded_shape() {
        let doc = ConversionDocument::new()
            .with_data_source("ids", vec![7i64])
            .unwrap();

        let xml = String::from_utf8(XmlDocumentCodec::new().encode(&doc).unwrap()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<conversionDocument created=\""));
        assert!(!xml.contains(" id=\""));
        assert!(!xml.contains("started="));
        assert!(xml.contains(
            "<dataSource name=\"ids\" elementType=\"int64\"><value kind=\"number\">7</value></dataSource>"
        ));
    }

    #[test]
    fn test_decode_tolerates_whitespace_and_comments() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<conversionDocument created="2024-05-01T10:00:00Z" id="11111111-1111-1111-1111-111111111111" updated="2024-05-01T10:05:00Z">
  <dataSource name="names" elementType="string">
    <value kind="string"> spaced </value>
    <value kind="string"/>
  </dataSource>
  <dataSource name="none"/>
</conversionDocument>
"#;

        let doc = XmlDocumentCodec::new().decode(xml.as_bytes()).unwrap();
        let names = doc.get_data_source::<String>("NAMES").unwrap();

        assert_eq!(names.records(), &[" spaced ".to_string(), String::new()]);
        assert!(doc.data_source("none").unwrap().is_empty());
        assert_eq!(
            doc.id().unwrap().to_string(),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn test_decode_rejects_unknown_root() {
        let result = XmlDocumentCodec::new().decode(b"<document/>");
        assert!(matches!(result, Err(DomainError::Serialization { .. })));
    }

    #[test]
    fn test_decode_rejects_missing_kind() {
        let xml = br#"<conversionDocument><dataSource name="a"><value>1</value></dataSource></conversionDocument>"#;
        assert!(XmlDocumentCodec::new().decode(xml).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_number() {
        let xml = br#"<conversionDocument><dataSource name="a"><value kind="number">abc</value></dataSource></conversionDocument>"#;
        assert!(XmlDocumentCodec::new().decode(xml).is_err());
    }

    #[test]
    fn test_decode_rejects_duplicate_sources() {
        let xml = br#"<conversionDocument><dataSource name="a"/><dataSource name="A"/></conversionDocument>"#;
        let result = XmlDocumentCodec::new().decode(xml);
        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_json_and_xml_share_shape() {
        let doc = sample_document();
        let xml = XmlDocumentCodec::new();
        let json = crate::infrastructure::codec::JsonDocumentCodec::new();

        let via_xml = xml.decode(&xml.encode(&doc).unwrap()).unwrap();
        let via_json = json.decode(&json.encode(&doc).unwrap()).unwrap();

        assert_eq!(via_xml, via_json);
    }
}
