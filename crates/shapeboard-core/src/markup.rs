//! Minimal element tree used as the persistence document model.
//!
//! Entities serialize to an [`Element`]; storage turns the root element into
//! XML text and back with `quick-xml`.

use crate::storage::{StorageError, StorageResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::fmt::Display;
use std::str::FromStr;

/// One markup element: a tag, ordered attributes and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attr(&mut self, name: &str, value: impl Display) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parse an attribute, falling back to the type's default when absent.
    pub fn attr_or_default<T: FromStr + Default>(&self, name: &str) -> StorageResult<T> {
        match self.attr(name) {
            None => Ok(T::default()),
            Some(value) => value.trim().parse().map_err(|_| {
                StorageError::InvalidDocument(format!(
                    "<{}> attribute {name}={value:?} is not a number",
                    self.tag
                ))
            }),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Render as an indented XML document.
    pub fn to_xml(&self) -> StorageResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(xml_error)?;
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Parse an XML document into its root element.
    pub fn parse(text: &str) -> StorageResult<Element> {
        let mut reader = Reader::from_str(text);
        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(start) => open.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    close_element(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| {
                        StorageError::Serialization("unexpected closing tag".to_string())
                    })?;
                    close_element(&mut open, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(StorageError::Serialization(format!(
                "unclosed element <{}>",
                unclosed.tag
            )));
        }
        root.ok_or_else(|| StorageError::Serialization("document has no root element".to_string()))
    }
}

fn xml_error(error: impl Display) -> StorageError {
    StorageError::Serialization(error.to_string())
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &Element) -> StorageResult<()> {
    let mut start = BytesStart::new(element.tag.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_error);
    }

    writer.write_event(Event::Start(start)).map_err(xml_error)?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.tag.as_str())))
        .map_err(xml_error)
}

fn element_from_start(start: &BytesStart<'_>) -> StorageResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(xml_error)?;
        element.attributes.push((name, value.into_owned()));
    }
    Ok(element)
}

/// Attach a finished element to its parent, or make it the root.
fn close_element(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> StorageResult<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(StorageError::Serialization(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        let mut root = Element::new("storage");
        let mut items = Element::new("items");
        items.set_attr("count_elements", 1);
        let mut circle = Element::new("Circle");
        circle.set_attr("color", "#ff8800");
        circle.set_attr("id", 4);
        let mut rect = Element::new("rect");
        rect.set_attr("left", 10);
        rect.set_attr("top", -3);
        circle.push(rect);
        items.push(circle);
        root.push(items);
        root
    }

    #[test]
    fn test_xml_round_trip() {
        let root = sample();
        let xml = root.to_xml().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<items count_elements=\"1\">"));
        assert_eq!(Element::parse(&xml).unwrap(), root);
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut element = Element::new("rect");
        element.set_attr("left", 1);
        element.set_attr("left", 2);
        assert_eq!(element.attr("left"), Some("2"));
        assert_eq!(element.attributes().count(), 1);
    }

    #[test]
    fn test_attr_or_default() {
        let mut element = Element::new("rect");
        element.set_attr("left", " 12 ");
        element.set_attr("top", "x");
        assert_eq!(element.attr_or_default::<i32>("left").unwrap(), 12);
        assert_eq!(element.attr_or_default::<i32>("width").unwrap(), 0);
        assert!(element.attr_or_default::<i32>("top").is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Element::parse("<storage><items></storage>").is_err());
        assert!(Element::parse("<storage>").is_err());
        assert!(Element::parse("").is_err());
        assert!(Element::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_attribute_escaping() {
        let mut element = Element::new("note");
        element.set_attr("text", "a<b & \"c\"");
        let xml = element.to_xml().unwrap();
        assert_eq!(Element::parse(&xml).unwrap().attr("text"), Some("a<b & \"c\""));
    }
}
