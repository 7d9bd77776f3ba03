use super::*;

/// Opaque markup constructs recognized without tokenizing the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Construct {
  /// Server-side code islands: `<?…?>` and `<%…%>`.
  Code,
  Cdata,
  Comment,
  /// Conditional brackets such as `<!--[if IE]>` and `<![endif]-->`.
  Conditional,
  /// Legacy `<![word …]>` declarations emitted by office software.
  Bracket,
}

impl Construct {
  /// Returns the end of the construct starting at `at`, if one starts there.
  pub(crate) fn match_at(self, bytes: &[u8], at: usize) -> Option<usize> {
    self.match_with(bytes, at, &mut Misses::default())
  }

  /// Like [`Construct::match_at`], skipping the terminator search when
  /// `misses` already knows it fails.
  pub(crate) fn match_with(
    self,
    bytes: &[u8],
    at: usize,
    misses: &mut Misses,
  ) -> Option<usize> {
    let rest = bytes.get(at..)?;

    match self {
      Self::Code => {
        let terminator: &'static [u8] = match rest {
          [b'<', b'?', ..] => b"?>",
          [b'<', b'%', ..] => b"%>",
          _ => return None,
        };

        misses.find(bytes, at + 2, terminator).map(|found| found + 2)
      }
      Self::Cdata => {
        if !rest.starts_with(b"<![CDATA[") {
          return None;
        }

        misses.find(bytes, at + 9, b"]]>").map(|found| found + 3)
      }
      Self::Comment => {
        if !rest.starts_with(b"<!--") {
          return None;
        }

        misses.find(bytes, at + 4, b"-->").map(|found| found + 3)
      }
      Self::Conditional => Self::conditional(bytes, at),
      Self::Bracket => match rest {
        [b'<', b'!', b'[', letter, ..] if letter.is_ascii_alphabetic() => {
          misses.find(bytes, at + 4, b"]>").map(|found| found + 2)
        }
        _ => None,
      },
    }
  }

  fn conditional(bytes: &[u8], at: usize) -> Option<usize> {
    if !bytes[at..].starts_with(b"<!") {
      return None;
    }

    let mut position = at + 2;

    if bytes[position..].starts_with(b"--") {
      position += 2;
    }

    if bytes.get(position) != Some(&b'[') {
      return None;
    }

    position += 1;

    loop {
      match *bytes.get(position)? {
        b']' => break,
        quote @ (b'"' | b'\'' | b'`') => {
          position += memchr::memchr(quote, &bytes[position + 1..])? + 2;
        }
        _ => position += 1,
      }
    }

    position += 1;

    if bytes[position..].starts_with(b"--") {
      position += 2;
    }

    (bytes.get(position) == Some(&b'>')).then_some(position + 1)
  }
}

/// A closing sequence whose absence can be remembered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Terminator {
  Needle(&'static [u8]),
  Pair {
    name: String,
    closer: Closer,
    balanced: bool,
  },
}

/// Offsets from which a terminator is known to be missing.
///
/// Valid for one text only. Once a search from some offset fails, every
/// later opener in the same text fails without scanning the rest again.
#[derive(Debug, Default)]
pub(crate) struct Misses {
  absent: BTreeMap<Terminator, usize>,
}

impl Misses {
  pub(crate) fn is_absent(&self, terminator: &Terminator, from: usize) -> bool {
    self
      .absent
      .get(terminator)
      .is_some_and(|&absent| from >= absent)
  }

  fn record(&mut self, terminator: Terminator, from: usize) {
    let absent = self.absent.entry(terminator).or_insert(from);
    *absent = (*absent).min(from);
  }

  fn find(
    &mut self,
    bytes: &[u8],
    from: usize,
    needle: &'static [u8],
  ) -> Option<usize> {
    let terminator = Terminator::Needle(needle);

    if self.is_absent(&terminator, from) {
      return None;
    }

    let found = find(bytes, from, needle);

    if found.is_none() {
      self.record(terminator, from);
    }

    found
  }
}

/// A tag recognized by [`match_tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagToken<'a> {
  pub(crate) name: &'a str,
  pub(crate) attributes: &'a str,
  pub(crate) closing: bool,
  pub(crate) bang: bool,
  pub(crate) self_closing: bool,
  pub(crate) span: Range<usize>,
}

impl TagToken<'_> {
  pub(crate) fn name_lowercase(&self) -> String {
    self.name.to_ascii_lowercase()
  }

  pub(crate) fn is_opening(&self) -> bool {
    !self.closing && !self.bang
  }

  /// Whether the attribute section holds anything besides whitespace and a
  /// self-closing slash.
  pub(crate) fn has_attributes(&self) -> bool {
    !self
      .attributes
      .trim_end_matches('/')
      .trim_matches(attributes::is_space_char)
      .trim_end_matches('/')
      .is_empty()
  }
}

/// Matches `<name attrs>`, `</name attrs>` or `<!name attrs>` at `at`.
///
/// Names are `[a-zA-Z][a-zA-Z0-9]*`, optionally followed by a `:name`
/// namespace suffix when `namespaced` is set.
pub(crate) fn match_tag<'a>(
  text: &'a str,
  at: usize,
  namespaced: bool,
) -> Option<TagToken<'a>> {
  let bytes = text.as_bytes();

  if bytes.get(at) != Some(&b'<') {
    return None;
  }

  let mut position = at + 1;

  let closing = bytes.get(position) == Some(&b'/');
  let bang = bytes.get(position) == Some(&b'!');

  if closing || bang {
    position += 1;
  }

  let name_start = position;

  position = name_end(bytes, position)?;

  if namespaced
    && bytes.get(position) == Some(&b':')
    && let Some(end) = name_end(bytes, position + 1)
  {
    position = end;
  }

  let name = &text[name_start..position];

  let close = attributes::attributes_end(bytes, position)?;

  Some(TagToken {
    name,
    attributes: &text[position..close],
    closing,
    bang,
    self_closing: close > position && bytes[close - 1] == b'/',
    span: at..close + 1,
  })
}

/// How the closing tag of a paired block is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Closer {
  /// `</name>` with nothing between the name and `>`.
  Exact,
  /// `</name …>`, tolerating junk attributes.
  Lenient,
}

/// Matches an opening tag accepted by `accept` together with everything up
/// to the first matching closing tag.
///
/// With `balanced`, nested openers of the same name must be closed first; an
/// unbalanced block falls back to the first closer.
pub(crate) fn match_pair(
  text: &str,
  at: usize,
  accept: impl Fn(&str) -> bool,
  closer: Closer,
  balanced: bool,
  misses: &mut Misses,
) -> Option<usize> {
  let opener = match_tag(text, at, false)?;

  if !opener.is_opening() || opener.self_closing {
    return None;
  }

  let name = opener.name_lowercase();

  if !accept(&name) {
    return None;
  }

  let bytes = text.as_bytes();

  let start = opener.span.end;

  let terminator = Terminator::Pair {
    name: name.clone(),
    closer,
    balanced,
  };

  if misses.is_absent(&terminator, start) {
    return None;
  }

  let mut first = None;
  let mut depth = 0usize;
  let mut position = start;

  while let Some(offset) = memchr::memchr(b'<', &bytes[position..]) {
    let candidate = position + offset;

    if let Some(end) = close_tag_at(text, candidate, &name, closer) {
      if depth == 0 {
        return Some(end);
      }

      first.get_or_insert(end);
      depth -= 1;
      position = end;
      continue;
    }

    if balanced
      && let Some(nested) = match_tag(text, candidate, false)
      && nested.is_opening()
      && !nested.self_closing
      && nested.name.eq_ignore_ascii_case(&name)
    {
      depth += 1;
      position = nested.span.end;
      continue;
    }

    position = candidate + 1;
  }

  if first.is_none() {
    misses.record(terminator, start);
  }

  first
}

fn close_tag_at(
  text: &str,
  at: usize,
  name: &str,
  closer: Closer,
) -> Option<usize> {
  let bytes = text.as_bytes();

  let start = at + 2;
  let end = start + name.len();

  if !bytes[at..].starts_with(b"</")
    || !bytes.get(start..end)?.eq_ignore_ascii_case(name.as_bytes())
  {
    return None;
  }

  match closer {
    Closer::Exact => (bytes.get(end) == Some(&b'>')).then_some(end + 1),
    Closer::Lenient => {
      if bytes.get(end).is_some_and(u8::is_ascii_alphanumeric) {
        return None;
      }

      attributes::attributes_end(bytes, end).map(|close| close + 1)
    }
  }
}

/// A stretch of text between matches, or a match itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Piece<'a, T> {
  Text(&'a str),
  Match { span: Range<usize>, value: T },
}

/// Walks `text`, offering every `<` to `matcher`, which returns the end of
/// the match and a record describing it.
pub(crate) struct Pieces<'a, T, M> {
  text: &'a str,
  cursor: usize,
  pending: Option<(Range<usize>, T)>,
  matcher: M,
}

impl<'a, T, M> Iterator for Pieces<'a, T, M>
where
  M: FnMut(usize) -> Option<(usize, T)>,
{
  type Item = Piece<'a, T>;

  fn next(&mut self) -> Option<Self::Item> {
    if let Some((span, value)) = self.pending.take() {
      self.cursor = span.end;
      return Some(Piece::Match { span, value });
    }

    if self.cursor >= self.text.len() {
      return None;
    }

    let text = self.text;
    let bytes = text.as_bytes();

    let mut search = self.cursor;

    while let Some(offset) = memchr::memchr(b'<', &bytes[search..]) {
      let at = search + offset;

      if let Some((end, value)) = (self.matcher)(at) {
        if at == self.cursor {
          self.cursor = end;
          return Some(Piece::Match {
            span: at..end,
            value,
          });
        }

        let segment = &text[self.cursor..at];

        self.pending = Some((at..end, value));
        self.cursor = at;

        return Some(Piece::Text(segment));
      }

      search = at + 1;
    }

    let segment = &text[self.cursor..];

    self.cursor = text.len();

    Some(Piece::Text(segment))
  }
}

pub(crate) fn pieces<T, M>(text: &str, matcher: M) -> Pieces<'_, T, M>
where
  M: FnMut(usize) -> Option<(usize, T)>,
{
  Pieces {
    text,
    cursor: 0,
    pending: None,
    matcher,
  }
}

/// Replaces every match with whatever `visitor` returns for it, copying the
/// text in between unchanged.
pub(crate) fn replace_all<'a, T, M, V>(
  text: &'a str,
  matcher: M,
  mut visitor: V,
) -> Cow<'a, str>
where
  M: FnMut(usize) -> Option<(usize, T)>,
  V: FnMut(&'a str, T) -> Cow<'a, str>,
{
  let mut output = String::with_capacity(text.len());

  let mut changed = false;

  for piece in pieces(text, matcher) {
    match piece {
      Piece::Text(segment) => output.push_str(segment),
      Piece::Match { span, value } => {
        let matched = &text[span];
        let replacement = visitor(matched, value);
        changed |= replacement != matched;
        output.push_str(&replacement);
      }
    }
  }

  if changed {
    Cow::Owned(output)
  } else {
    Cow::Borrowed(text)
  }
}

/// Deletes every occurrence of `construct`.
pub(crate) fn remove(text: &str, construct: Construct) -> Cow<'_, str> {
  let bytes = text.as_bytes();

  let mut misses = Misses::default();

  replace_all(
    text,
    |at| {
      construct
        .match_with(bytes, at, &mut misses)
        .map(|end| (end, ()))
    },
    |_, ()| Cow::Borrowed(""),
  )
}

/// Whether `text` has a `<` followed somewhere later by a `>`.
pub(crate) fn has_tag_brackets(text: &str) -> bool {
  let bytes = text.as_bytes();

  memchr::memchr(b'<', bytes)
    .is_some_and(|open| memchr::memchr(b'>', &bytes[open..]).is_some())
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
  memchr::memmem::find(bytes.get(from..)?, needle).map(|found| from + found)
}

fn name_end(bytes: &[u8], from: usize) -> Option<usize> {
  if !bytes.get(from)?.is_ascii_alphabetic() {
    return None;
  }

  Some(
    bytes[from..]
      .iter()
      .position(|byte| !byte.is_ascii_alphanumeric())
      .map_or(bytes.len(), |offset| from + offset),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pair(
    text: &str,
    tag: &str,
    closer: Closer,
    balanced: bool,
  ) -> Option<usize> {
    match_pair(
      text,
      0,
      |name| name == tag,
      closer,
      balanced,
      &mut Misses::default(),
    )
  }

  fn construct(construct: Construct, text: &str) -> Option<&str> {
    construct
      .match_at(text.as_bytes(), 0)
      .map(|end| &text[..end])
  }

  #[test]
  fn code_islands() {
    assert_eq!(construct(Construct::Code, "<?php echo 1 ?>x"), Some("<?php echo 1 ?>"));
    assert_eq!(construct(Construct::Code, "<% x %>y"), Some("<% x %>"));
    assert_eq!(construct(Construct::Code, "<?>"), None);
    assert_eq!(construct(Construct::Code, "<? never closed"), None);
  }

  #[test]
  fn cdata_and_comments() {
    assert_eq!(
      construct(Construct::Cdata, "<![CDATA[a]]>b]]>"),
      Some("<![CDATA[a]]>")
    );
    assert_eq!(construct(Construct::Comment, "<!-- a -->b-->"), Some("<!-- a -->"));
    assert_eq!(construct(Construct::Comment, "<!-->"), None);
    assert_eq!(construct(Construct::Comment, "<!--->"), None);
  }

  #[test]
  fn conditional_brackets() {
    assert_eq!(
      construct(Construct::Conditional, "<!--[if IE]>x"),
      Some("<!--[if IE]>")
    );
    assert_eq!(
      construct(Construct::Conditional, "<![endif]-->x"),
      Some("<![endif]-->")
    );
    assert_eq!(
      construct(Construct::Conditional, r#"<![if "a]" ]>"#),
      Some(r#"<![if "a]" ]>"#)
    );
    assert_eq!(construct(Construct::Conditional, "<![if x] >"), None);
    assert_eq!(construct(Construct::Conditional, r#"<![if "x]>"#), None);
  }

  #[test]
  fn bracket_declarations() {
    assert_eq!(
      construct(Construct::Bracket, "<![if !supportLists]>x"),
      Some("<![if !supportLists]>")
    );
    assert_eq!(construct(Construct::Bracket, "<![1]>"), None);
  }

  #[test]
  fn tags_are_tokenized() {
    let token = match_tag(r#"<A href="x>y" />z"#, 0, false).unwrap();

    assert_eq!(token.name, "A");
    assert_eq!(token.attributes, r#" href="x>y" /"#);
    assert!(token.is_opening());
    assert!(token.self_closing);
    assert!(token.has_attributes());
    assert_eq!(token.span, 0..16);
  }

  #[test]
  fn closing_and_bang_tags() {
    let closing = match_tag("</b >", 0, false).unwrap();

    assert!(closing.closing);
    assert!(!closing.has_attributes());

    let bang = match_tag("<!DOCTYPE html>", 0, false).unwrap();

    assert!(bang.bang);
    assert_eq!(bang.name, "DOCTYPE");
  }

  #[test]
  fn namespaced_names() {
    assert_eq!(match_tag("<o:p>", 0, true).unwrap().name, "o:p");
    assert_eq!(match_tag("<o:p>", 0, false).unwrap().name, "o");
  }

  #[test]
  fn non_tags() {
    assert_eq!(match_tag("< b>", 0, false), None);
    assert_eq!(match_tag("<1>", 0, false), None);
    assert_eq!(match_tag("<b", 0, false), None);
  }

  #[test]
  fn pairs_are_lazy_and_case_insensitive() {
    let text = "<script>a</SCRIPT>b</script>";

    assert_eq!(pair(text, "script", Closer::Exact, false), Some(18));
  }

  #[test]
  fn lenient_closers_accept_junk() {
    let text = "<style>a</style foo>b";

    assert_eq!(
      pair(text, "style", Closer::Exact, false),
      None
    );
    assert_eq!(
      pair(text, "style", Closer::Lenient, false),
      Some(20)
    );
  }

  #[test]
  fn balanced_pairs_swallow_nested_blocks() {
    let text = "<object><object>x</object>y</object>z";

    assert_eq!(
      pair(text, "object", Closer::Lenient, true),
      Some(36)
    );
    assert_eq!(
      pair(text, "object", Closer::Lenient, false),
      Some(26)
    );
  }

  #[test]
  fn unbalanced_pairs_fall_back_to_first_closer() {
    let text = "<object><object>x</object>y";

    assert_eq!(
      pair(text, "object", Closer::Lenient, true),
      Some(26)
    );
  }

  #[test]
  fn missing_terminators_are_remembered() {
    let text = "<!--a<!--b<?c";
    let bytes = text.as_bytes();

    let mut misses = Misses::default();

    assert_eq!(Construct::Comment.match_with(bytes, 0, &mut misses), None);
    assert!(misses.is_absent(&Terminator::Needle(b"-->"), 5));
    assert!(!misses.is_absent(&Terminator::Needle(b"?>"), 0));
    assert_eq!(Construct::Comment.match_with(bytes, 5, &mut misses), None);
    assert_eq!(Construct::Code.match_with(bytes, 10, &mut misses), None);
    assert!(misses.is_absent(&Terminator::Needle(b"?>"), 12));
  }

  #[test]
  fn missing_closers_are_remembered() {
    let text = "<object>a<object>b";

    let mut misses = Misses::default();

    let object = |at, misses: &mut Misses| {
      match_pair(
        text,
        at,
        |name| name == "object",
        Closer::Lenient,
        true,
        misses,
      )
    };

    assert_eq!(object(0, &mut misses), None);

    let terminator = Terminator::Pair {
      name: "object".into(),
      closer: Closer::Lenient,
      balanced: true,
    };

    assert!(misses.is_absent(&terminator, 17));
    assert_eq!(object(9, &mut misses), None);
  }

  #[test]
  fn unclosed_openers_stay_linear() {
    let comments = "<!--".repeat(50_000);

    assert!(matches!(
      remove(&comments, Construct::Comment),
      Cow::Borrowed(_)
    ));
  }

  #[test]
  fn pieces_alternate_text_and_matches() {
    let text = "a<!--x-->b<!--y--><!--z";

    let bytes = text.as_bytes();

    let collected = pieces(text, |at| {
      Construct::Comment.match_at(bytes, at).map(|end| (end, ()))
    })
    .map(|piece| match piece {
      Piece::Text(text) => format!("text:{text}"),
      Piece::Match { span, .. } => format!("match:{}", &text[span]),
    })
    .collect::<Vec<String>>();

    assert_eq!(
      collected,
      vec![
        "text:a",
        "match:<!--x-->",
        "text:b",
        "match:<!--y-->",
        "text:<!--z",
      ]
    );
  }

  #[test]
  fn remove_deletes_constructs() {
    assert_eq!(remove("a<?x?>b<%y%>c", Construct::Code), "abc");
    assert!(matches!(remove("plain", Construct::Code), Cow::Borrowed(_)));
  }

  #[test]
  fn tag_brackets() {
    assert!(has_tag_brackets("a < b > c"));
    assert!(!has_tag_brackets("a > b < c"));
    assert!(!has_tag_brackets("plain"));
  }
}
