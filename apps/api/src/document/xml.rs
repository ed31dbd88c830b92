//! Small element-oriented wrapper over `quick_xml::Writer`, used for every
//! part of the package. Attribute values and text are escaped by quick-xml;
//! text additionally loses any character XML 1.0 cannot represent.

use std::borrow::Cow;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

pub type XmlResult = Result<(), quick_xml::Error>;

pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Starts a standalone UTF-8 part.
    pub fn new() -> Result<Self, quick_xml::Error> {
        let mut inner = Writer::new(Vec::new());
        inner.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { inner })
    }

    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        self.inner.write_event(Event::Start(start_tag(name, attrs)))
    }

    pub fn close(&mut self, name: &str) -> XmlResult {
        self.inner.write_event(Event::End(BytesEnd::new(name)))
    }

    /// `<name attr="..."/>`
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> XmlResult {
        self.inner.write_event(Event::Empty(start_tag(name, attrs)))
    }

    pub fn text(&mut self, text: &str) -> XmlResult {
        let text = xml_chars_only(text);
        self.inner
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(&text))))
    }

    /// Writes `name` with `body` as its content.
    pub fn element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        body: impl FnOnce(&mut Self) -> XmlResult,
    ) -> XmlResult {
        self.open(name, attrs)?;
        body(self)?;
        self.close(name)
    }

    pub fn finish(self) -> Vec<u8> {
        self.inner.into_inner()
    }
}

fn start_tag<'a>(name: &'a str, attrs: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut tag = BytesStart::new(name);
    for &attr in attrs {
        tag.push_attribute(attr);
    }
    tag
}

/// `Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Drops characters outside the XML 1.0 `Char` production.
pub fn xml_chars_only(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}
