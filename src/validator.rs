use super::*;

/// Outcome of [`GrammarValidator::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Validity {
  Valid,
  /// `offset` is the byte offset where the grammar stopped matching.
  Invalid { offset: usize },
}

impl Validity {
  pub fn error_offset(self) -> Option<usize> {
    match self {
      Self::Valid => None,
      Self::Invalid { offset } => Some(offset),
    }
  }

  pub fn is_valid(self) -> bool {
    self == Self::Valid
  }
}

/// Checks markup against a tag grammar without building a tree.
///
/// The strict grammar accepts case-sensitive XHTML: known tags only, quoted
/// values of known attributes, every non-empty tag closed by a matching
/// closing tag. The loose grammar accepts any tag name and attribute syntax
/// but still requires proper nesting. Neither grammar backtracks into an
/// element once it has matched.
#[derive(Debug, Clone)]
pub struct GrammarValidator {
  attributes: HashSet<String>,
  empty_tags: HashSet<String>,
  pair_tags: HashSet<String>,
  strict: bool,
}

impl GrammarValidator {
  const CORE_ATTRIBUTES: &'static [&'static str] = &[
    "id", "class", "style", "title", "lang", "xml:lang", "dir",
  ];

  const EMPTY_TAGS: &'static [&'static str] = &[
    "br", "param", "hr", "input", "col", "img", "area", "frame", "meta",
    "link", "base",
  ];

  const EVENT_ATTRIBUTES: &'static [&'static str] = &[
    "onabort", "onactivate", "onafterprint", "onafterupdate",
    "onbeforeactivate", "onbeforecopy", "onbeforecut", "onbeforedeactivate",
    "onbeforeeditfocus", "onbeforepaste", "onbeforeprint", "onbeforeunload",
    "onbeforeupdate", "onblur", "onbounce", "oncellchange", "onchange",
    "onclick", "oncontextmenu", "oncontrolselect", "oncopy", "oncut",
    "ondataavailable", "ondatasetchanged", "ondatasetcomplete", "ondblclick",
    "ondeactivate", "ondrag", "ondragend", "ondragenter", "ondragleave",
    "ondragover", "ondragstart", "ondrop", "onerror", "onerrorupdate",
    "onfilterchange", "onfinish", "onfocus", "onfocusin", "onfocusout",
    "onhelp", "onkeydown", "onkeypress", "onkeyup", "onlayoutcomplete",
    "onload", "onlosecapture", "onmousedown", "onmouseenter", "onmouseleave",
    "onmousemove", "onmouseout", "onmouseover", "onmouseup", "onmousewheel",
    "onmove", "onmoveend", "onmovestart", "onpaste", "onpropertychange",
    "onreadystatechange", "onreset", "onresize", "onresizeend",
    "onresizestart", "onrowenter", "onrowexit", "onrowsdelete",
    "onrowsinserted", "onscroll", "onselect", "onselectionchange",
    "onselectstart", "onstart", "onstop", "onsubmit", "onunload",
  ];

  const LEGACY_ATTRIBUTES: &'static [&'static str] = &[
    "color", "face", "id", "size", "compact", "prompt", "alink",
    "background", "bgcolor", "link", "text", "vlink", "clear", "align",
    "noshade", "nowrap", "width", "height", "border", "hspace", "vspace",
    "type", "value", "start", "language",
  ];

  const LEGACY_EMPTY_TAGS: &'static [&'static str] = &["basefont", "isindex"];

  const LEGACY_PAIR_TAGS: &'static [&'static str] =
    &["center", "dir", "font", "menu", "s", "strike", "u"];

  const MAX_DEPTH: usize = 512;

  const MODULE_ATTRIBUTES: &'static [&'static str] = &[
    "xmlns", "profile", "http-equiv", "name", "content", "scheme", "cite",
    "datetime", "href", "hreflang", "type", "rel", "rev", "charset",
    "accesskey", "tabindex", "shape", "coords", "target", "src", "alt",
    "longdesc", "height", "width", "usemap", "ismap", "border", "vspace",
    "hspace", "align", "action", "method", "enctype", "accept",
    "accept-charset", "for", "checked", "disabled", "readonly", "maxlength",
    "size", "value", "multiple", "selected", "label", "rows", "cols",
    "declare", "classid", "codebase", "data", "codetype", "archive",
    "standby", "valuetype", "code", "object", "summary", "frame", "rules",
    "cellspacing", "cellpadding", "span", "abbr", "axis", "headers", "scope", "rowspan",
    "colspan", "char", "charoff", "valign", "frameborder", "marginwidth",
    "marginheight", "noresize", "scrolling", "defer", "event", "media",
    "xml:space", "nohref", "version", "start",
  ];

  const OPAQUE_TAGS: &'static [&'static str] =
    &["script", "style", "option", "textarea", "title"];

  const PAIR_TAGS: &'static [&'static str] = &[
    "body", "head", "html", "abbr", "acronym", "address", "blockquote",
    "cite", "code", "dfn", "div", "em", "h1", "h2", "h3", "h4", "h5", "h6",
    "kbd", "p", "pre", "q", "samp", "span", "strong", "var", "a", "dl", "dt",
    "dd", "ol", "ul", "li", "b", "big", "i", "small", "sub", "sup", "tt",
    "del", "ins", "bdo", "button", "fieldset", "form", "label", "legend",
    "select", "optgroup", "caption", "colgroup", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "map", "object", "frameset", "noframes",
    "iframe", "noscript",
  ];

  pub fn new(options: &GrammarOptions) -> Self {
    let owned = |items: &[&str]| -> Vec<String> {
      items.iter().map(|item| (*item).to_string()).collect()
    };

    let mut attributes = owned(Self::CORE_ATTRIBUTES);
    let mut empty_tags = owned(Self::EMPTY_TAGS);
    let mut pair_tags = owned(Self::PAIR_TAGS);

    attributes.extend(owned(Self::EVENT_ATTRIBUTES));
    attributes.extend(owned(Self::MODULE_ATTRIBUTES));

    if options.legacy {
      attributes.extend(owned(Self::LEGACY_ATTRIBUTES));
      empty_tags.extend(owned(Self::LEGACY_EMPTY_TAGS));
      pair_tags.extend(owned(Self::LEGACY_PAIR_TAGS));
    }

    attributes.extend(options.extra_attributes.iter().cloned());
    empty_tags.extend(options.extra_empty_tags.iter().cloned());
    pair_tags.extend(options.extra_pair_tags.iter().cloned());

    Self {
      attributes: attributes.into_iter().collect(),
      empty_tags: empty_tags.into_iter().collect(),
      pair_tags: pair_tags.into_iter().collect(),
      strict: options.strict,
    }
  }

  pub fn validate(&self, text: &str) -> Validity {
    if !scanner::has_tag_brackets(text) {
      return Validity::Valid;
    }

    let end = Parser {
      bytes: text.as_bytes(),
      grammar: self,
      text,
    }
    .content(0, 0);

    if end == text.len() {
      Validity::Valid
    } else {
      Validity::Invalid { offset: end }
    }
  }
}

struct Parser<'a> {
  bytes: &'a [u8],
  grammar: &'a GrammarValidator,
  text: &'a str,
}

impl Parser<'_> {
  /// Consumes items for as long as one matches, returning where it stopped.
  fn content(&self, mut position: usize, depth: usize) -> usize {
    while position < self.bytes.len() {
      let item = if self.grammar.strict {
        self.strict_item(position, depth)
      } else {
        self.loose_item(position, depth)
      };

      match item {
        Some(end) => position = end,
        None => break,
      }
    }

    position
  }

  fn closing_tag(
    &self,
    position: usize,
    name: &str,
    case_sensitive: bool,
  ) -> Option<usize> {
    let rest = self.bytes.get(position..)?;

    let end = 2 + name.len();

    let matches = rest.starts_with(b"</")
      && rest.get(2..end).is_some_and(|candidate| {
        if case_sensitive {
          candidate == name.as_bytes()
        } else {
          candidate.eq_ignore_ascii_case(name.as_bytes())
        }
      })
      && rest.get(end) == Some(&b'>');

    matches.then_some(position + end + 1)
  }

  fn construct(&self, construct: Construct, position: usize) -> Option<usize> {
    construct.match_at(self.bytes, position)
  }

  /// `<!` followed by an uppercase letter, up to the first `>`.
  fn declaration(&self, position: usize) -> Option<usize> {
    match self.bytes.get(position..)? {
      [b'<', b'!', letter, ..] if letter.is_ascii_uppercase() => {
        memchr::memchr(b'>', &self.bytes[position + 3..])
          .map(|offset| position + 3 + offset + 1)
      }
      _ => None,
    }
  }

  fn instruction(&self, position: usize) -> Option<usize> {
    self.construct(Construct::Code, position)
  }

  fn strict_space(&self, position: usize) -> Option<usize> {
    match self.bytes.get(position..)? {
      [byte, ..] if attributes::is_space(*byte) => Some(position + 1),
      [0xc2, 0xa0, ..] => Some(position + 2),
      _ => None,
    }
  }

  fn loose_item(&self, position: usize, depth: usize) -> Option<usize> {
    self
      .loose_pair(position, depth)
      .or_else(|| self.loose_opaque(position))
      .or_else(|| self.loose_self_closing(position))
      .or_else(|| self.text_until(position, |byte| byte == b'<'))
      .or_else(|| self.lone_bracket(position))
      .or_else(|| self.construct(Construct::Comment, position))
      .or_else(|| self.declaration(position))
      .or_else(|| self.instruction(position))
      .or_else(|| self.construct(Construct::Conditional, position))
  }

  fn loose_opaque(&self, position: usize) -> Option<usize> {
    let token = self.opening_tag(position)?;

    if token.self_closing || !Self::is_opaque(token.name) {
      return None;
    }

    let mut search = token.span.end;

    while let Some(offset) = memchr::memchr(b'<', &self.bytes[search..]) {
      let candidate = search + offset;

      if let Some(end) = self.closing_tag(candidate, token.name, false) {
        return Some(end);
      }

      search = candidate + 1;
    }

    None
  }

  fn loose_pair(&self, position: usize, depth: usize) -> Option<usize> {
    let token = self.opening_tag(position)?;

    if token.self_closing
      || Self::is_opaque(token.name)
      || depth >= GrammarValidator::MAX_DEPTH
    {
      return None;
    }

    let inner = self.content(token.span.end, depth + 1);

    self.closing_tag(inner, token.name, false)
  }

  fn loose_self_closing(&self, position: usize) -> Option<usize> {
    self
      .opening_tag(position)
      .filter(|token| token.self_closing)
      .map(|token| token.span.end)
  }

  /// A `<` that cannot start a tag, comment, declaration or instruction.
  fn lone_bracket(&self, position: usize) -> Option<usize> {
    let rest = self.bytes.get(position..)?;

    if rest.first() != Some(&b'<') {
      return None;
    }

    let starts_markup = match rest.get(1..).unwrap_or_default() {
      [b'/', letter, ..] | [letter, ..] if letter.is_ascii_alphabetic() => true,
      [b'!', letter, ..] if letter.is_ascii_uppercase() => true,
      [b'?' | b'%' | b'[', ..] => true,
      [b'!', b'-', b'-', ..] => true,
      _ => false,
    };

    (!starts_markup).then_some(position + 1)
  }

  fn opening_tag(&self, position: usize) -> Option<TagToken<'_>> {
    scanner::match_tag(self.text, position, false)
      .filter(|token| !token.closing && !token.bang)
  }

  fn is_opaque(name: &str) -> bool {
    GrammarValidator::OPAQUE_TAGS
      .iter()
      .any(|tag| tag.eq_ignore_ascii_case(name))
  }

  /// Reads a tag or attribute name made of ASCII letters, digits and
  /// `:_.-`, returning it with the position after it.
  fn strict_name(&self, position: usize) -> Option<(&str, usize)> {
    let end = self.bytes[position..]
      .iter()
      .position(|byte| {
        !(byte.is_ascii_alphanumeric()
          || matches!(byte, b':' | b'_' | b'.' | b'-'))
      })
      .map_or(self.bytes.len(), |offset| position + offset);

    (end > position).then(|| (&self.text[position..end], end))
  }

  /// Consumes `(ws+ name="value")* ws*` with known names and quoted values
  /// free of `<` and `>`.
  fn strict_attributes(&self, mut position: usize) -> usize {
    loop {
      let Some(mut cursor) = self.strict_space(position) else {
        break;
      };

      while let Some(next) = self.strict_space(cursor) {
        cursor = next;
      }

      let Some(end) = self.strict_attribute(cursor) else {
        return cursor;
      };

      position = end;
    }

    position
  }

  fn strict_attribute(&self, position: usize) -> Option<usize> {
    let (name, end) = self.strict_name(position)?;

    if !self.grammar.attributes.contains(name)
      || self.bytes.get(end) != Some(&b'=')
    {
      return None;
    }

    let quote = *self.bytes.get(end + 1)?;

    if quote != b'"' && quote != b'\'' {
      return None;
    }

    let value_start = end + 2;

    let close = self.bytes[value_start..]
      .iter()
      .position(|&byte| byte == quote || byte == b'<' || byte == b'>')
      .map(|offset| value_start + offset)?;

    (self.bytes[close] == quote).then_some(close + 1)
  }

  fn strict_empty(&self, position: usize) -> Option<usize> {
    let (name, end) = self.strict_tag_start(position)?;

    if !self.grammar.empty_tags.contains(name) {
      return None;
    }

    let end = self.strict_attributes(end);

    self.bytes[end..].starts_with(b"/>").then_some(end + 2)
  }

  fn strict_item(&self, position: usize, depth: usize) -> Option<usize> {
    self
      .strict_pair(position, depth)
      .or_else(|| self.construct(Construct::Cdata, position))
      .or_else(|| self.strict_opaque(position))
      .or_else(|| self.strict_empty(position))
      .or_else(|| {
        self.text_until(position, |byte| byte == b'<' || byte == b'>')
      })
      .or_else(|| self.construct(Construct::Comment, position))
      .or_else(|| self.declaration(position))
      .or_else(|| self.instruction(position))
  }

  fn strict_opaque(&self, position: usize) -> Option<usize> {
    let (name, end) = self.strict_tag_start(position)?;

    if !GrammarValidator::OPAQUE_TAGS.contains(&name) {
      return None;
    }

    let end = self.strict_attributes(end);

    if self.bytes.get(end) != Some(&b'>') {
      return None;
    }

    let markup_free = |from: usize| {
      self.bytes[from..]
        .iter()
        .position(|&byte| byte == b'<' || byte == b'>')
        .map_or(self.bytes.len(), |offset| from + offset)
    };

    let mut cursor = markup_free(end + 1);

    if let Some(cdata) = self.construct(Construct::Cdata, cursor) {
      cursor = markup_free(cdata);
    }

    self.closing_tag(cursor, name, true)
  }

  fn strict_pair(&self, position: usize, depth: usize) -> Option<usize> {
    let (name, end) = self.strict_tag_start(position)?;

    if !self.grammar.pair_tags.contains(name) {
      return None;
    }

    let end = self.strict_attributes(end);

    if self.bytes.get(end) != Some(&b'>')
      || depth >= GrammarValidator::MAX_DEPTH
    {
      return None;
    }

    let inner = self.content(end + 1, depth + 1);

    self.closing_tag(inner, name, true)
  }

  fn strict_tag_start(&self, position: usize) -> Option<(&str, usize)> {
    if self.bytes.get(position) != Some(&b'<') {
      return None;
    }

    self.strict_name(position + 1)
  }

  fn text_until(
    &self,
    position: usize,
    stop: impl Fn(u8) -> bool,
  ) -> Option<usize> {
    let end = self.bytes[position..]
      .iter()
      .position(|&byte| stop(byte))
      .map_or(self.bytes.len(), |offset| position + offset);

    (end > position).then_some(end)
  }
}
