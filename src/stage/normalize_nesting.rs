use super::*;

/// The result of [`NormalizeNestingStage::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nesting {
  pub text: String,
  /// Tags whose opening and closing counts still differ.
  pub invalid_tags: Vec<String>,
  /// Redundant nested tags removed, per tag.
  pub deleted_tags: BTreeMap<String, usize>,
}

/// Removes nested duplicates of tags that must not nest, such as a `<b>`
/// inside a `<b>`, keeping only the outermost pair.
#[derive(Debug, Clone)]
pub struct NormalizeNestingStage {
  pattern: Regex,
}

impl Stage for NormalizeNestingStage {
  fn name(&self) -> &'static str {
    "normalize_nesting"
  }

  fn run(&self, document: &mut Document) -> Result {
    let mut nesting = self.normalize(document.text());

    document.set_text(mem::take(&mut nesting.text));
    document.report_mut().merge_nesting(nesting);

    Ok(())
  }
}

impl NormalizeNestingStage {
  const PASSTHROUGH: &'static [Construct] = &[
    Construct::Code,
    Construct::Cdata,
    Construct::Conditional,
    Construct::Comment,
  ];

  /// Builds the stage from tag name patterns. Fails when a pattern is not a
  /// valid regular expression.
  pub fn new(options: &NestingOptions) -> Result<Self> {
    let pattern = format!("^(?i:{})$", options.tags.join("|"));

    let pattern =
      Regex::new(&pattern).map_err(|source| Error::InvalidPattern {
        pattern: options.tags.join("|"),
        source,
      })?;

    Ok(Self { pattern })
  }

  pub fn normalize(&self, text: &str) -> Nesting {
    if !scanner::has_tag_brackets(text) {
      return Nesting {
        text: text.to_string(),
        ..Nesting::default()
      };
    }

    let mut context = Context::default();

    let mut misses = Misses::default();

    let normalized = scanner::replace_all(
      text,
      |at| self.match_at(text, at, &mut misses),
      |matched, tag| match tag {
        Some((name, closing)) => {
          let keep = if closing {
            context.close(&name)
          } else {
            context.open(&name)
          };

          if keep {
            Cow::Borrowed(matched)
          } else {
            Cow::Borrowed("")
          }
        }
        None => Cow::Borrowed(matched),
      },
    )
    .into_owned();

    let invalid_tags = context.unbalanced_tags();

    if !invalid_tags.is_empty() {
      debug!(tags = ?invalid_tags, "unbalanced tags");
    }

    Nesting {
      text: normalized,
      invalid_tags,
      deleted_tags: context.deleted_tags,
    }
  }

  /// Matches a tracked opening or closing tag, or an opaque construct that
  /// must be skipped as a whole.
  fn match_at(
    &self,
    text: &str,
    at: usize,
    misses: &mut Misses,
  ) -> Option<(usize, Option<(String, bool)>)> {
    if let Some(token) = scanner::match_tag(text, at, false)
      && !token.bang
      && (if token.closing {
        token.attributes.is_empty()
      } else {
        !token.self_closing
      })
      && self.pattern.is_match(token.name)
    {
      return Some((
        token.span.end,
        Some((token.name_lowercase(), token.closing)),
      ));
    }

    let bytes = text.as_bytes();

    Self::PASSTHROUGH
      .iter()
      .find_map(|construct| construct.match_with(bytes, at, misses))
      .map(|end| (end, None))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn normalize(text: &str) -> Nesting {
    NormalizeNestingStage::new(&NestingOptions::default())
      .unwrap()
      .normalize(text)
  }

  #[test]
  fn nested_duplicates_are_removed() {
    let nesting = normalize(
      "<noindex>a<noindex>b</noindex>c</noindex>",
    );

    assert_eq!(nesting.text, "<noindex>abc</noindex>");
    assert_eq!(nesting.deleted_tags.get("noindex"), Some(&2));
    assert!(nesting.invalid_tags.is_empty());
  }

  #[test]
  fn patterns_match_tag_families_case_insensitively() {
    let nesting = normalize("<H1>a<h1>b</h1>c</H1><B>x<b>y</b></B>");

    assert_eq!(nesting.text, "<H1>abc</H1><B>xy</B>");
    assert_eq!(nesting.deleted_tags.get("h1"), Some(&2));
    assert_eq!(nesting.deleted_tags.get("b"), Some(&2));
  }

  #[test]
  fn untracked_tags_nest_freely() {
    let text = "<ul><li>a<ul><li>b</li></ul></li></ul>";

    assert_eq!(normalize(text).text, text);
  }

  #[test]
  fn unbalanced_tags_are_reported() {
    let nesting = normalize("<b>x</i><span>y");

    assert_eq!(nesting.text, "<b>x</i><span>y");
    assert_eq!(nesting.invalid_tags, vec!["b", "i", "span"]);
  }

  #[test]
  fn self_closing_and_closers_with_attributes_are_ignored() {
    let text = "<b>x<b/>y</b class=\"z\"></b>";

    let nesting = normalize(text);

    assert_eq!(nesting.text, text);
    assert!(nesting.invalid_tags.is_empty());
  }

  #[test]
  fn comments_are_skipped() {
    let text = "<b>x<!-- <b> -->y</b>";

    let nesting = normalize(text);

    assert_eq!(nesting.text, text);
    assert!(nesting.deleted_tags.is_empty());
  }

  #[test]
  fn invalid_patterns_are_rejected() {
    let options = NestingOptions {
      tags: vec!["b(".into()],
    };

    assert!(matches!(
      NormalizeNestingStage::new(&options),
      Err(Error::InvalidPattern { .. })
    ));
  }

  test! {
    name: stage_rewrites_document_text,
    stage: NormalizeNestingStage::new(&NestingOptions::default()).unwrap(),
    content: "<i>a<i>b</i></i>",
    expected: "<i>ab</i>",
  }
}
