use super::*;

/// Reduces markup to plain text, optionally keeping a set of tags.
///
/// Opaque constructs and pair tags (scripts, styles, form controls) go away
/// with their content; paragraph-level tags become blank lines and `<br>`
/// becomes a line break. Passes repeat until the text stops changing, so tags
/// reassembled by an earlier removal are caught by a later pass.
#[derive(Debug, Clone)]
pub struct StripTagsStage {
  allowed: HashSet<String>,
  allowed_bare: HashSet<String>,
  pair_tags: HashSet<String>,
  paragraph_tags: HashSet<String>,
  reformat: bool,
}

impl Stage for StripTagsStage {
  fn name(&self) -> &'static str {
    "strip_tags"
  }

  fn run(&self, document: &mut Document) -> Result {
    let stripped = self.strip(document.text());

    document.set_text(stripped);

    Ok(())
  }
}

impl StripTagsStage {
  const MAX_PASSES: usize = 99;

  const OPAQUE_CONSTRUCTS: &'static [Construct] = &[
    Construct::Code,
    Construct::Cdata,
    Construct::Comment,
    Construct::Conditional,
  ];

  const PRESERVED_BLOCKS: &'static [&'static str] = &["pre", "textarea"];

  pub fn new(options: StripOptions) -> Self {
    let lowercase = |tags: &[String]| -> HashSet<String> {
      tags.iter().map(|tag| tag.to_ascii_lowercase()).collect()
    };

    let (bare, allowed): (Vec<String>, Vec<String>) = options
      .allowed_tags
      .iter()
      .map(|tag| tag.trim().to_ascii_lowercase())
      .partition(|tag| tag.starts_with('<') && tag.ends_with('>'));

    Self {
      allowed: allowed.into_iter().collect(),
      allowed_bare: bare
        .iter()
        .map(|tag| tag[1..tag.len() - 1].to_string())
        .collect(),
      pair_tags: lowercase(&options.pair_tags),
      paragraph_tags: lowercase(&options.paragraph_tags),
      reformat: options.reformat,
    }
  }

  /// Strips tags from `text`.
  pub fn strip(&self, text: &str) -> String {
    if !scanner::has_tag_brackets(text) {
      return text.to_string();
    }

    let mut current = text.to_string();

    let mut is_html = false;
    let mut converged = false;

    for pass in 0..Self::MAX_PASSES {
      let mut next = self.remove_opaque(&current);

      if pass == 0 {
        is_html = next != current || Self::contains_tag(&next);

        if is_html && self.reformat {
          next = Self::collapse_whitespace(&next);
        }
      }

      if is_html {
        next = self.replace_tags(&next).into_owned();
      }

      if next == current {
        converged = true;
        break;
      }

      current = next;
    }

    if !converged {
      warn!(
        passes = Self::MAX_PASSES,
        "tag stripping did not settle, removing leftover tags"
      );

      current = re::LEFTOVER_TAG.replace_all(&current, "").into_owned();
    }

    if self.reformat && current.len() != text.len() {
      current = Self::tidy(&current);
    }

    current
  }

  /// Collapses runs of tabs and line breaks into a space, except inside
  /// `<pre>` and `<textarea>` blocks.
  fn collapse_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());

    let mut misses = Misses::default();

    let preserved = |at| {
      scanner::match_pair(
        text,
        at,
        |name| Self::PRESERVED_BLOCKS.contains(&name),
        Closer::Lenient,
        false,
        &mut misses,
      )
      .map(|end| (end, ()))
    };

    for piece in scanner::pieces(text, preserved) {
      match piece {
        Piece::Text(segment) => {
          output.push_str(&re::VERTICAL_WHITESPACE.replace_all(segment, " "));
        }
        Piece::Match { span, .. } => output.push_str(&text[span]),
      }
    }

    output
  }

  fn contains_tag(text: &str) -> bool {
    let bytes = text.as_bytes();

    memchr::memchr_iter(b'<', bytes)
      .any(|at| scanner::match_tag(text, at, true).is_some())
  }

  fn remove_opaque(&self, text: &str) -> String {
    let mut current = text.to_string();

    for construct in Self::OPAQUE_CONSTRUCTS {
      let removed = match scanner::remove(&current, *construct) {
        Cow::Owned(removed) => Some(removed),
        Cow::Borrowed(_) => None,
      };

      if let Some(removed) = removed {
        current = removed;
      }
    }

    if self.pair_tags.is_empty() {
      return current;
    }

    let mut misses = Misses::default();

    scanner::replace_all(
      &current,
      |at| {
        scanner::match_pair(
          &current,
          at,
          |name| self.pair_tags.contains(name),
          Closer::Lenient,
          false,
          &mut misses,
        )
        .map(|end| (end, ()))
      },
      |_, ()| Cow::Borrowed(""),
    )
    .into_owned()
  }

  fn replace_tags<'a>(&self, text: &'a str) -> Cow<'a, str> {
    scanner::replace_all(
      text,
      |at| {
        scanner::match_tag(text, at, true).map(|token| (token.span.end, token))
      },
      |matched, token| {
        let name = token.name_lowercase();

        if self.allowed.contains(&name) {
          return Cow::Borrowed(matched);
        }

        if self.allowed_bare.contains(&name) {
          return Cow::Owned(if token.closing {
            format!("</{name}>")
          } else if token.self_closing {
            format!("<{name} />")
          } else {
            format!("<{name}>")
          });
        }

        if name == "br" {
          return Cow::Borrowed("\n");
        }

        if self.paragraph_tags.contains(&name) {
          return Cow::Borrowed("\n\n");
        }

        Cow::Borrowed("")
      },
    )
  }

  fn tidy(text: &str) -> String {
    let trimmed = text.trim_matches(|character: char| {
      matches!(character, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0b')
    });

    let collapsed = re::DUPLICATE_SPACES.replace_all(trimmed, " ");

    let joined = collapsed.replace("\n ", "\n").replace(" \n", "\n");

    re::BLANK_LINE_RUNS.replace_all(&joined, "\n\n").into_owned()
  }
}
