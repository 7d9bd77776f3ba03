use super::*;

/// Paired blocks whose content never gets highlighted.
const OPAQUE_BLOCKS: &[&str] = &[
  "noindex", "script", "style", "comment", "button", "map", "iframe",
  "frameset", "object", "applet",
];

const SKIPPED_CONSTRUCTS: &[Construct] = &[
  Construct::Code,
  Construct::Cdata,
  Construct::Conditional,
  Construct::Comment,
];

/// Whether `text` contains markup: a tag, a closing tag, a comment, a
/// declaration, CDATA, a code island or a conditional bracket.
///
/// Tags named in `no_html_tags` (such as `notypo`) don't count. Entities
/// alone don't make text HTML.
pub fn is_html(text: &str, no_html_tags: &[&str]) -> bool {
  if !scanner::has_tag_brackets(text) {
    return false;
  }

  let bytes = text.as_bytes();

  let excluded =
    |name: &str| no_html_tags.iter().any(|tag| tag.eq_ignore_ascii_case(name));

  let mut misses = Misses::default();

  memchr::memchr_iter(b'<', bytes).any(|at| {
    if let Some(token) = scanner::match_tag(text, at, true) {
      if token.bang {
        return token.name.starts_with(|c: char| c.is_ascii_uppercase());
      }

      if !excluded(token.name)
        && (!token.closing || token.attributes.trim().is_empty())
      {
        return true;
      }
    }

    SKIPPED_CONSTRUCTS.iter().any(|construct| {
      construct.match_with(bytes, at, &mut misses).is_some()
    })
  })
}

/// Turns plain text into HTML paragraphs.
///
/// Blank lines and lines starting with whitespace begin a new paragraph;
/// other line breaks become `<br />`. With `single`, even one paragraph is
/// wrapped in `<p>`. Text that already is HTML comes back unchanged.
pub fn paragraphs(text: &str, single: bool) -> String {
  if is_html(text, &["notypo"]) {
    return text.to_string();
  }

  let normalized = text.trim().replace("\r\n", "\n").replace('\r', "\n");

  let parts = re::PARAGRAPH_BREAK
    .split(&normalized)
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .map(|part| re::LINE_BREAKS.replace_all(part, "<br />\n").into_owned())
    .collect::<Vec<String>>();

  let minimum = if single { 0 } else { 1 };

  let joined = if parts.len() > minimum {
    format!("<p>{}</p>", parts.join("</p>\n\n<p>"))
  } else {
    parts.concat()
  };

  re::DUPLICATE_SPACES.replace_all(&joined, " ").into_owned()
}

/// Wraps the tail of `text` in `open_tag` and `close_tag` so that its last
/// word can't be left alone on a line.
///
/// The tail starts at the leftmost word followed by at most `chars_max`
/// characters, not counting trailing punctuation. A one- or two-letter word
/// right before it is kept with it.
pub fn unhang_words(
  text: &str,
  chars_max: usize,
  open_tag: &str,
  close_tag: &str,
) -> String {
  const SEPARATORS: &[char] =
    &[';', ',', '.', '!', '?', ')', '%', '\u{a0}', '»', '…', '®'];

  const TRAILING: &[char] = &[';', '.', '!', '?', ')', '%', '»', '…', '®'];

  let chars = text.char_indices().collect::<Vec<(usize, char)>>();

  let count = chars.len();

  let mut run_end = vec![count; count + 1];
  let mut trailing_only = vec![true; count + 1];

  for (index, &(_, character)) in chars.iter().enumerate().rev() {
    if character.is_whitespace() || SEPARATORS.contains(&character) {
      run_end[index] = index;
    } else {
      run_end[index] = run_end[index + 1];
    }

    trailing_only[index] =
      TRAILING.contains(&character) && trailing_only[index + 1];
  }

  let short_word = |start: usize| -> Option<usize> {
    if start == 0 || !chars[start - 1].1.is_whitespace() {
      return None;
    }

    let letters = chars[start..]
      .iter()
      .take(2)
      .take_while(|(_, character)| character.is_alphabetic())
      .count();

    (letters > 0
      && chars
        .get(start + letters)
        .is_some_and(|(_, character)| character.is_whitespace()))
    .then_some(start + letters + 1)
  };

  let tail = (0..count).find(|&start| {
    let word_end = run_end[short_word(start).unwrap_or(start)];

    let remaining = count - word_end;

    remaining > 0 && trailing_only[word_end + remaining.min(chars_max)]
  });

  match tail {
    Some(start) if chars_max > 0 => {
      let (head, tail) = text.split_at(chars[start].0);
      format!("{head}{open_tag}{tail}{close_tag}")
    }
    _ => text.to_string(),
  }
}

/// Wraps whole-word occurrences of `words` in `template`, where `%s` stands
/// for the matched text.
///
/// A word ending in `*` also matches any longer word it begins. Markup,
/// entities and the content of script-like blocks are left alone. When two
/// words match at the same position, the one listed first wins.
pub fn highlight_words(
  text: &str,
  words: &[&str],
  case_sensitive: bool,
  template: &str,
) -> String {
  let Some(highlighter) = Highlighter::new(text, words, case_sensitive) else {
    return text.to_string();
  };

  let mut output = String::with_capacity(text.len());

  let mut misses = Misses::default();

  let skipped = |at| skipped_markup(text, at, &mut misses);

  for piece in scanner::pieces(text, skipped) {
    match piece {
      Piece::Text(segment) => {
        highlighter.highlight(segment, template, &mut output);
      }
      Piece::Match { span, .. } => output.push_str(&text[span]),
    }
  }

  output
}

fn skipped_markup(
  text: &str,
  at: usize,
  misses: &mut Misses,
) -> Option<(usize, ())> {
  let bytes = text.as_bytes();

  SKIPPED_CONSTRUCTS
    .iter()
    .find_map(|construct| construct.match_with(bytes, at, misses))
    .or_else(|| {
      scanner::match_pair(
        text,
        at,
        |name| OPAQUE_BLOCKS.contains(&name),
        Closer::Lenient,
        false,
        misses,
      )
    })
    .or_else(|| scanner::match_tag(text, at, true).map(|token| token.span.end))
    .map(|end| (end, ()))
}

#[derive(Debug)]
struct SearchWord {
  mask: bool,
  numeric: bool,
}

#[derive(Debug)]
struct Highlighter {
  pattern: Regex,
  words: Vec<SearchWord>,
}

impl Highlighter {
  fn new(text: &str, words: &[&str], case_sensitive: bool) -> Option<Self> {
    let haystack = text.to_lowercase();

    let mut candidates = words
      .iter()
      .filter_map(|word| {
        let word = word.trim();
        let (stem, mask) = match word.strip_suffix('*') {
          Some(stem) => (stem, true),
          None => (word, false),
        };

        (!stem.is_empty() && haystack.contains(&stem.to_lowercase()))
          .then_some((stem, mask))
      })
      .collect::<Vec<(&str, bool)>>();

    if candidates.is_empty() {
      return None;
    }

    let mut alternatives = Vec::with_capacity(candidates.len());
    let mut search_words = Vec::with_capacity(candidates.len());

    for (stem, mask) in candidates {
      let numeric = stem.bytes().all(|byte| byte.is_ascii_digit());

      let mut alternative = regex::escape(stem);

      if mask {
        alternative.push_str(if numeric { "[0-9]*" } else { r"\p{L}*" });
      }

      alternatives.push(if case_sensitive || numeric {
        format!("({alternative})")
      } else {
        format!("((?i:{alternative}))")
      });

      search_words.push(SearchWord { mask, numeric });
    }

    let pattern = Regex::new(&alternatives.join("|")).ok()?;

    Some(Self {
      pattern,
      words: search_words,
    })
  }

  fn highlight(&self, segment: &str, template: &str, output: &mut String) {
    let mut copied = 0;

    for entity in re::WORD_ENTITY.find_iter(segment) {
      self.highlight_part(&segment[copied..entity.start()], template, output);
      output.push_str(entity.as_str());
      copied = entity.end();
    }

    self.highlight_part(&segment[copied..], template, output);
  }

  fn highlight_part(&self, part: &str, template: &str, output: &mut String) {
    let mut copied = 0;
    let mut position = 0;

    while let Some(captures) = self.pattern.captures_at(part, position) {
      let Some((index, found)) = captures
        .iter()
        .skip(1)
        .enumerate()
        .find_map(|(index, group)| group.map(|found| (index, found)))
      else {
        break;
      };

      let word = &self.words[index];

      if found.is_empty() {
        break;
      }

      if Self::is_bounded(part, found.range(), word) {
        output.push_str(&part[copied..found.start()]);
        output.push_str(&template.replace("%s", found.as_str()));

        copied = found.end();
        position = found.end();
      } else {
        position = found.start()
          + part[found.start()..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
      }
    }

    output.push_str(&part[copied..]);
  }

  fn is_bounded(part: &str, range: Range<usize>, word: &SearchWord) -> bool {
    let joins = |character: char| {
      if word.numeric {
        character.is_ascii_digit()
      } else {
        character.is_alphabetic()
      }
    };

    let before = part[..range.start].chars().next_back();
    let after = part[range.end..].chars().next();

    !before.is_some_and(joins) && (word.mask || !after.is_some_and(joins))
  }
}
