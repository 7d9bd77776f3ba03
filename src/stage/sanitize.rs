use super::*;

/// Reduces markup to an allow-list of tags and attributes.
///
/// Every tag that survives is re-emitted in canonical form with its
/// attribute values escaped, and all text between tags is re-escaped, so the
/// output is stable under repeated sanitization.
#[derive(Debug, Clone)]
pub struct SanitizeStage {
  attributes: HashSet<String>,
  protocols: HashSet<String>,
  tags: HashSet<String>,
  url_attributes: HashSet<String>,
}

impl Stage for SanitizeStage {
  fn name(&self) -> &'static str {
    "sanitize"
  }

  fn run(&self, document: &mut Document) -> Result {
    let sanitized = self.sanitize(document.text());

    document.set_text(sanitized);

    Ok(())
  }
}

impl SanitizeStage {
  /// Removed with their content regardless of the policy.
  const DANGEROUS_TAGS: &'static [&'static str] = &[
    "title", "script", "style", "comment", "button", "map", "iframe",
    "frameset", "object", "applet",
  ];

  const MAX_PASSES: usize = 99;

  const OPAQUE_CONSTRUCTS: &'static [Construct] = &[
    Construct::Code,
    Construct::Cdata,
    Construct::Bracket,
    Construct::Comment,
    Construct::Conditional,
  ];

  pub fn new(policy: &Policy) -> Self {
    let lowercase = |items: &[String]| -> HashSet<String> {
      items.iter().map(|item| item.to_ascii_lowercase()).collect()
    };

    Self {
      attributes: lowercase(&policy.attributes),
      protocols: lowercase(&policy.protocols),
      tags: lowercase(&policy.tags)
        .into_iter()
        .filter(|tag| !Self::DANGEROUS_TAGS.contains(&tag.as_str()))
        .collect(),
      url_attributes: lowercase(&policy.url_attributes),
    }
  }

  /// Sanitizes `text` against the policy.
  pub fn sanitize(&self, text: &str) -> String {
    let text = Self::remove_dangerous(text);

    let mut output = String::with_capacity(text.len());

    let tags = scanner::pieces(&text, |at| {
      scanner::match_tag(&text, at, false).map(|token| (token.span.end, token))
    });

    for piece in tags {
      match piece {
        Piece::Text(segment) => {
          output.push_str(&entities::escape_text(&entities::decode(
            segment, false,
          )));
        }
        Piece::Match { value: token, .. } => {
          if let Some(tag) = self.rewrite_tag(&token) {
            output.push_str(&tag);
          }
        }
      }
    }

    attributes::trim_controls(&output).to_string()
  }

  fn allows_url(&self, value: &str) -> bool {
    let compact = value
      .chars()
      .filter(|character| !character.is_control() && !character.is_whitespace())
      .collect::<String>();

    re::URL_SCHEME_PREFIX
      .captures(&compact)
      .is_none_or(|captures| {
        self.protocols.contains(&captures[1].to_ascii_lowercase())
      })
  }

  /// Drops opaque constructs and dangerous blocks until none are left, so
  /// that a block reassembled by removing another is removed as well.
  fn remove_dangerous(text: &str) -> String {
    let mut current = text.to_string();

    for _ in 0..Self::MAX_PASSES {
      let mut next = current.clone();

      for construct in Self::OPAQUE_CONSTRUCTS {
        let removed = match scanner::remove(&next, *construct) {
          Cow::Owned(removed) => Some(removed),
          Cow::Borrowed(_) => None,
        };

        if let Some(removed) = removed {
          next = removed;
        }
      }

      let mut misses = Misses::default();

      let next = scanner::replace_all(
        &next,
        |at| {
          scanner::match_pair(
            &next,
            at,
            |name| Self::DANGEROUS_TAGS.contains(&name),
            Closer::Lenient,
            true,
            &mut misses,
          )
          .map(|end| (end, ()))
        },
        |_, ()| Cow::Borrowed(""),
      )
      .into_owned();

      if next == current {
        return current;
      }

      current = next;
    }

    warn!(
      passes = Self::MAX_PASSES,
      "dangerous block removal did not settle"
    );

    current
  }

  fn rewrite_tag(&self, token: &TagToken<'_>) -> Option<String> {
    let name = token.name_lowercase();

    if !self.tags.contains(&name) {
      return None;
    }

    let prefix = if token.closing {
      "/"
    } else if token.bang {
      "!"
    } else {
      ""
    };

    let mut tag = format!("<{prefix}{name}");

    if !token.closing {
      let mut seen = HashSet::new();

      for attribute in Attributes::new(token.attributes) {
        let Some(value) = attribute.value else {
          continue;
        };

        let attribute_name = attribute.name_lowercase();

        if !self.attributes.contains(&attribute_name)
          || seen.contains(&attribute_name)
        {
          continue;
        }

        let value = entities::decode(attributes::trim_controls(value), false);

        if self.url_attributes.contains(&attribute_name)
          && !self.allows_url(&value)
        {
          continue;
        }

        tag.push(' ');
        tag.push_str(&attributes::render_attribute(&attribute_name, &value));

        seen.insert(attribute_name);
      }
    }

    tag.push_str(if token.self_closing { " />" } else { ">" });

    Some(tag)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sanitize(text: &str) -> String {
    SanitizeStage::new(&Policy::default()).sanitize(text)
  }

  test! {
    name: scripts_are_removed_with_content,
    stage: SanitizeStage::new(&Policy::default()),
    content: "<p onclick=\"x()\">hi<script>alert(1)</script></p>",
    expected: "<p>hi</p>",
  }

  test! {
    name: javascript_links_lose_their_href,
    stage: SanitizeStage::new(&Policy::default()),
    content: "<a href=\"javascript:alert(1)\">x</a>",
    expected: "<a>x</a>",
  }

  #[test]
  fn allowed_links_are_canonicalized() {
    assert_eq!(
      sanitize("<A HREF='http://example.com/?a=1&amp;b=2' Title=T>x</A>"),
      r#"<a href="http://example.com/?a=1&amp;b=2" title="T">x</a>"#
    );
  }

  #[test]
  fn obfuscated_protocols_are_caught() {
    assert_eq!(
      sanitize("<a href=\"jav&#x09;ascript:alert(1)\">x</a>"),
      "<a>x</a>"
    );
    assert_eq!(
      sanitize("<a href=\"&#106;avascript:alert(1)\">x</a>"),
      "<a>x</a>"
    );
    assert_eq!(
      sanitize("<img src=\" javascript:alert(1)\" alt=\"a\">"),
      r#"<img alt="a">"#
    );
  }

  #[test]
  fn relative_urls_are_kept() {
    assert_eq!(
      sanitize(r#"<a href="/path/to:thing">x</a>"#),
      r#"<a href="/path/to:thing">x</a>"#
    );
  }

  #[test]
  fn unknown_tags_are_removed_but_text_stays() {
    assert_eq!(sanitize("<div><span>text</span></div>"), "text");
  }

  #[test]
  fn dangerous_tags_cannot_be_allowed() {
    let stage = SanitizeStage::new(
      &Policy::builder().tags(["b", "script"]).build(),
    );

    assert_eq!(stage.sanitize("<b>x</b><script>y</script>"), "<b>x</b>");
  }

  #[test]
  fn nested_dangerous_blocks_vanish_entirely() {
    assert_eq!(
      sanitize("<object><object>x</object>y</object>z"),
      "z"
    );
  }

  #[test]
  fn reassembled_blocks_vanish() {
    assert_eq!(
      sanitize("<scr<script></script>ipt>alert(1)</script>ok"),
      "ok"
    );
  }

  #[test]
  fn fake_tags_become_inert_text() {
    assert_eq!(
      sanitize("<<b>script>alert(1)<</b>/script>"),
      "&lt;<b>script&gt;alert(1)&lt;</b>/script&gt;"
    );
  }

  #[test]
  fn comments_and_cdata_are_removed() {
    assert_eq!(sanitize("a<!-- <b>x</b> -->b<![CDATA[<i>]]>c"), "abc");
  }

  #[test]
  fn valueless_and_duplicate_attributes_are_dropped() {
    assert_eq!(
      sanitize(r#"<img src="a.png" src="b.png" border alt="x" />"#),
      r#"<img src="a.png" alt="x" />"#
    );
  }

  #[test]
  fn closing_tags_lose_attributes() {
    assert_eq!(sanitize(r#"<b>x</b class="y">"#), "<b>x</b>");
  }

  #[test]
  fn text_is_escaped_once() {
    assert_eq!(sanitize("1 < 2 &amp; 3 > 2"), "1 &lt; 2 &amp; 3 &gt; 2");
  }

  #[test]
  fn output_is_trimmed() {
    assert_eq!(sanitize("  <b>x</b>\n"), "<b>x</b>");
  }

  #[test]
  fn sanitizing_twice_changes_nothing() {
    for input in [
      r#"<p class="a" onclick="b">x &amp; y</p>"#,
      "<a href='http://example.com/?q=\"x\"'>q</a>",
      "<<b>script>alert(1)<</b>/script>",
      "1 &lt; 2 <br> &amp;lt;",
      "<img src=x alt=\"&quot;\" />",
    ] {
      let once = sanitize(input);
      assert_eq!(sanitize(&once), once, "input: {input}");
    }
  }
}
