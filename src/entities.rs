//! HTML entity decoding and encoding.

use super::*;

/// Decodes character references in `text`.
///
/// With `special_only`, only `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;` and
/// numeric references are decoded; named references such as `&nbsp;` are left
/// alone.
pub fn decode(text: &str, special_only: bool) -> Cow<'_, str> {
  if !text.contains('&') {
    return Cow::Borrowed(text);
  }

  if !special_only {
    return html_escape::decode_html_entities(text);
  }

  re::SPECIAL_ENTITY.replace_all(text, |captures: &Captures| {
    html_escape::decode_html_entities(&captures[0]).into_owned()
  })
}

/// Encodes `text` for use in markup.
///
/// `&`, `<`, `>`, `"` and `'` are always escaped. Unless `special_only` is
/// set, non-ASCII characters are written as hexadecimal references too.
pub fn encode(text: &str, special_only: bool) -> Cow<'_, str> {
  let escaped = html_escape::encode_quoted_attribute(text);

  if special_only || escaped.is_ascii() {
    return escaped;
  }

  let mut encoded = String::with_capacity(escaped.len() * 2);

  for character in escaped.chars() {
    if character.is_ascii() {
      encoded.push(character);
    } else {
      let _ = write!(encoded, "&#x{:x};", u32::from(character));
    }
  }

  Cow::Owned(encoded)
}

pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
  html_escape::encode_double_quoted_attribute(value)
}

pub(crate) fn escape_text(text: &str) -> Cow<'_, str> {
  html_escape::encode_text(text)
}
