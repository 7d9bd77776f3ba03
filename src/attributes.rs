use super::*;

/// How an attribute value was delimited in the source markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quote {
  Double,
  Single,
  Backtick,
  None,
}

impl Quote {
  fn from_byte(byte: u8) -> Self {
    match byte {
      b'"' => Self::Double,
      b'\'' => Self::Single,
      b'`' => Self::Backtick,
      _ => Self::None,
    }
  }
}

/// A single attribute lifted out of a tag's attribute section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Attribute<'a> {
  pub(crate) name: &'a str,
  pub(crate) value: Option<&'a str>,
  pub(crate) quote: Quote,
  pub(crate) span: Range<usize>,
}

impl Attribute<'_> {
  pub(crate) fn name_lowercase(&self) -> String {
    self.name.to_ascii_lowercase()
  }
}

/// Iterates over the `name=value` pairs of a raw attribute section, skipping
/// junk that does not look like an attribute.
pub(crate) struct Attributes<'a> {
  source: &'a str,
  position: usize,
}

impl<'a> Attributes<'a> {
  pub(crate) fn new(source: &'a str) -> Self {
    Self {
      source,
      position: 0,
    }
  }
}

impl<'a> Iterator for Attributes<'a> {
  type Item = Attribute<'a>;

  fn next(&mut self) -> Option<Self::Item> {
    let bytes = self.source.as_bytes();

    loop {
      let start = self.position;

      let &byte = bytes.get(start)?;

      if !byte.is_ascii_alphabetic() || !follows_separator(bytes, start) {
        self.position += 1;
        continue;
      }

      let name_end = scan_while(bytes, start, is_name_byte);

      let equals = skip_whitespace(bytes, name_end);

      if bytes.get(equals) != Some(&b'=') {
        self.position = name_end;

        return Some(Attribute {
          name: &self.source[start..name_end],
          value: None,
          quote: Quote::None,
          span: start..name_end,
        });
      }

      let value_start = skip_whitespace(bytes, equals + 1);

      let (value, quote, end) = match bytes.get(value_start) {
        Some(&quote @ (b'"' | b'\'' | b'`')) => {
          let inner = value_start + 1;

          match memchr::memchr(quote, &bytes[inner..]) {
            Some(offset) => (
              &self.source[inner..inner + offset],
              Quote::from_byte(quote),
              inner + offset + 1,
            ),
            None => (
              &self.source[inner..],
              Quote::from_byte(quote),
              bytes.len(),
            ),
          }
        }
        _ => {
          let end = scan_while(bytes, value_start, |byte| !is_space(byte));

          (&self.source[value_start..end], Quote::None, end)
        }
      };

      self.position = end;

      return Some(Attribute {
        name: &self.source[start..name_end],
        value: Some(value),
        quote,
        span: start..end,
      });
    }
  }
}

/// Values accepted by [`render_attributes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
  /// `true` renders `name="name"`, `false` drops the attribute.
  Flag(bool),
  Text(String),
  /// Joined with a space for `class`, `;` for `style` and event handlers,
  /// and `, ` otherwise.
  List(Vec<String>),
}

impl From<&str> for AttributeValue {
  fn from(value: &str) -> Self {
    Self::Text(value.to_string())
  }
}

impl From<String> for AttributeValue {
  fn from(value: String) -> Self {
    Self::Text(value)
  }
}

impl From<bool> for AttributeValue {
  fn from(value: bool) -> Self {
    Self::Flag(value)
  }
}

impl From<Vec<String>> for AttributeValue {
  fn from(value: Vec<String>) -> Self {
    Self::List(value)
  }
}

/// Renders attributes as a space separated `name="value"` list.
pub fn render_attributes<I, K, V>(attributes: I) -> String
where
  I: IntoIterator<Item = (K, V)>,
  K: AsRef<str>,
  V: Into<AttributeValue>,
{
  let mut rendered = Vec::new();

  for (name, value) in attributes {
    let name = name.as_ref().to_ascii_lowercase();

    let value = match value.into() {
      AttributeValue::Flag(false) => continue,
      AttributeValue::Flag(true) => name.clone(),
      AttributeValue::Text(text) => text,
      AttributeValue::List(items) => {
        let separator = if name == "class" {
          " "
        } else if name == "style" || name.starts_with("on") {
          ";"
        } else {
          ", "
        };

        items.join(separator)
      }
    };

    rendered.push(render_attribute(&name, &value));
  }

  rendered.join(" ")
}

/// Renders a self-closing tag, e.g. `<img src="a.png" />`.
pub fn render_tag<I, K, V>(name: &str, attributes: I) -> String
where
  I: IntoIterator<Item = (K, V)>,
  K: AsRef<str>,
  V: Into<AttributeValue>,
{
  let attributes = render_attributes(attributes);

  if attributes.is_empty() {
    format!("<{name} />")
  } else {
    format!("<{name} {attributes} />")
  }
}

pub(crate) fn render_attribute(name: &str, value: &str) -> String {
  format!("{name}=\"{}\"", entities::escape_attribute(value))
}

/// Returns the index of the `>` that closes a tag whose attribute section
/// starts at `from`.
///
/// Quoted values may contain `>`, but a quote only opens a value when it
/// follows `=` or whitespace. When the quoted scan breaks down the first `>`
/// after the break point closes the tag.
pub(crate) fn attributes_end(bytes: &[u8], from: usize) -> Option<usize> {
  let mut position = from;

  while let Some(&byte) = bytes.get(position) {
    match byte {
      b'>' => return Some(position),
      b'"' | b'\'' | b'`' => {
        if !opens_value(bytes, position) {
          break;
        }

        match memchr::memchr(byte, &bytes[position + 1..]) {
          Some(offset) => position += offset + 2,
          None => break,
        }
      }
      _ => position += 1,
    }
  }

  memchr::memchr(b'>', &bytes[position..]).map(|offset| position + offset)
}

/// Whitespace as far as the attribute grammar is concerned: ASCII control
/// characters, space, and DEL.
pub(crate) fn is_space(byte: u8) -> bool {
  byte <= 0x20 || byte == 0x7f
}

pub(crate) fn is_space_char(character: char) -> bool {
  character <= '\x20' || character == '\x7f' || character == '\u{a0}'
}

pub(crate) fn trim_controls(value: &str) -> &str {
  value.trim_matches(|character: char| character <= '\x20' || character == '\x7f')
}

fn follows_separator(bytes: &[u8], position: usize) -> bool {
  match position.checked_sub(1).map(|index| bytes[index]) {
    None => true,
    Some(b'"' | b'\'' | b'`' | b'/') => true,
    Some(0xa0) => position >= 2 && bytes[position - 2] == 0xc2,
    Some(byte) => is_space(byte),
  }
}

fn is_name_byte(byte: u8) -> bool {
  byte.is_ascii_alphanumeric() || matches!(byte, b':' | b'_' | b'-' | b'.')
}

fn opens_value(bytes: &[u8], position: usize) -> bool {
  match position.checked_sub(1).map(|index| bytes[index]) {
    Some(b'=') => true,
    Some(0xa0) => position >= 2 && bytes[position - 2] == 0xc2,
    Some(byte) => is_space(byte),
    None => false,
  }
}

fn scan_while(bytes: &[u8], from: usize, accept: impl Fn(u8) -> bool) -> usize {
  bytes[from..]
    .iter()
    .position(|&byte| !accept(byte))
    .map_or(bytes.len(), |offset| from + offset)
}

fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
  scan_while(bytes, from, is_space)
}
