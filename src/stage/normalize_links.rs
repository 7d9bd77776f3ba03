use super::*;

/// The result of [`NormalizeLinksStage::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
  pub text: String,
  /// Valid links without their fragment, each with the first title seen.
  pub valid_links: BTreeMap<String, Option<String>>,
  /// Link values that could not be understood, with occurrence counts.
  pub broken_links: BTreeMap<String, usize>,
}

/// Rewrites URL-bearing attributes into a canonical form relative to the
/// current origin.
#[derive(Debug, Clone)]
pub struct NormalizeLinksStage {
  add_extra: bool,
  add_host: bool,
  host_translations: BTreeMap<String, String>,
  origin: Origin,
  our_links: Option<Regex>,
  path_rewrite: Option<(String, String)>,
  services: BTreeMap<String, u16>,
  typo_rules: Vec<(Regex, String)>,
  url_tags: BTreeMap<String, Vec<String>>,
}

impl Stage for NormalizeLinksStage {
  fn name(&self) -> &'static str {
    "normalize_links"
  }

  fn run(&self, document: &mut Document) -> Result {
    let mut links = self.normalize(document.text());

    document.set_text(mem::take(&mut links.text));
    document.report_mut().merge_links(links);

    Ok(())
  }
}

impl NormalizeLinksStage {
  const EXTERNAL_LINK_TAGS: &'static [&'static str] = &["a", "area", "link"];

  /// Builds the stage, validating the path rewrite and compiling patterns.
  pub fn new(options: &LinkOptions) -> Result<Self> {
    if let Some(path) = &options.path_search
      && !re::PATH_PREFIX.is_match(path)
    {
      warn!(path = %path, "rejecting path prefix");
      return Err(Error::InvalidPathSearch { path: path.clone() });
    }

    if let Some(path) = &options.path_replace
      && !re::PATH_REPLACEMENT.is_match(path)
    {
      warn!(path = %path, "rejecting path replacement");
      return Err(Error::InvalidPathReplace { path: path.clone() });
    }

    let compile = |pattern: &str| {
      Regex::new(pattern).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
      })
    };

    Ok(Self {
      add_extra: options.add_extra,
      add_host: options.add_host,
      host_translations: options
        .host_translations
        .iter()
        .map(|(from, to)| (from.to_ascii_lowercase(), to.clone()))
        .collect(),
      origin: options.origin.clone(),
      our_links: options.our_links.as_deref().map(compile).transpose()?,
      path_rewrite: options
        .path_search
        .clone()
        .zip(options.path_replace.clone()),
      services: options.services.clone(),
      typo_rules: options
        .typo_rules
        .iter()
        .map(|rule| Ok((compile(&rule.pattern)?, rule.replacement.clone())))
        .collect::<Result<Vec<(Regex, String)>>>()?,
      url_tags: options
        .url_tags
        .iter()
        .map(|(tag, attributes)| {
          (
            tag.to_ascii_lowercase(),
            attributes
              .iter()
              .map(|attribute| attribute.to_ascii_lowercase())
              .collect(),
          )
        })
        .collect(),
    })
  }

  pub fn normalize(&self, text: &str) -> Links {
    if !scanner::has_tag_brackets(text) {
      return Links {
        text: text.to_string(),
        ..Links::default()
      };
    }

    let mut context = Context::default();

    let normalized = scanner::replace_all(
      text,
      |at| {
        scanner::match_tag(text, at, false)
          .filter(|token| {
            token.is_opening()
              && token.has_attributes()
              && self.url_tags.contains_key(&token.name_lowercase())
          })
          .map(|token| (token.span.end, token))
      },
      |_, token| Cow::Owned(self.rewrite_tag(&token, &mut context)),
    )
    .into_owned();

    Links {
      text: normalized,
      valid_links: context.valid_links,
      broken_links: context.broken_links,
    }
  }

  fn extras(&self, tag: &str, state: &TagState) -> String {
    let external = Self::EXTERNAL_LINK_TAGS.contains(&tag)
      && state.link.as_ref().is_some_and(|link| {
        !self.origin.is_current_host(link, false, false)
          && !self
            .our_links
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(&link.build()))
      });

    let mut extras = String::new();

    if external && tag != "link" {
      extras.push_str(" target=\"_blank\"");
    } else if let Some(target) = &state.target {
      extras.push(' ');
      extras.push_str(&attributes::render_attribute("target", target));
    }

    let mut rel = Vec::new();

    if external {
      rel.push("nofollow");
    }

    if let Some(tokens) = &state.rel {
      rel.extend(
        tokens
          .split_whitespace()
          .filter(|token| !token.eq_ignore_ascii_case("nofollow")),
      );
    }

    if !rel.is_empty() {
      extras.push(' ');
      extras.push_str(&attributes::render_attribute("rel", &rel.join(" ")));
    }

    extras
  }

  fn repair(&self, value: &str) -> String {
    self
      .typo_rules
      .iter()
      .fold(value.to_string(), |value, (pattern, replacement)| {
        pattern.replacen(&value, 1, replacement.as_str()).into_owned()
      })
  }

  /// Canonicalizes a parsed link. Returns `None` for a broken link, otherwise
  /// the rewritten link and whether it only points within the page.
  fn resolve(&self, mut link: Link) -> Option<(Link, bool)> {
    if let Some(scheme) = &mut link.scheme {
      scheme.make_ascii_lowercase();

      if link.host.is_none() && link.path.is_none() {
        return None;
      }
    }

    if let Some(host) = link.host.take() {
      let host = host.trim_matches('.').to_ascii_lowercase();

      link.host = Some(
        self
          .host_translations
          .get(&host)
          .cloned()
          .unwrap_or(host),
      );
    }

    let current = self.origin.is_current_host(&link, true, true);

    let fragment_only = (current
      && link.fragment.is_some()
      && link.path.is_none()
      && link.query.is_none())
      || link.is_empty();

    if self.add_host && !fragment_only {
      if link.scheme.is_none() && link.host.is_none() {
        link.host = Some(self.origin.host.clone());
        link.port = link.port.or(self.origin.explicit_port());
      }

      if link.scheme.is_none() {
        link.scheme = Some(self.origin.scheme.clone());
      }
    }

    if link.scheme.as_deref().is_some_and(|scheme| scheme != "mailto")
      && link.host.is_some()
      && link.path.is_none()
      && link.query.is_none()
      && link.fragment.is_none()
    {
      link.path = Some("/".into());
    }

    if let Some(path) = &link.path {
      if !path.starts_with('/') {
        return None;
      }

      if current
        && let Some((search, replace)) = &self.path_rewrite
        && let Some(rest) = path.strip_prefix(search.as_str())
      {
        link.path = Some(format!("{replace}{rest}"));
      }
    }

    if !self.add_host && current {
      link.scheme = None;
      link.user = None;
      link.pass = None;
      link.host = None;
      link.port = None;
    }

    if !link.is_empty() && !link.check(None, &self.services) {
      return None;
    }

    Some((link, fragment_only))
  }

  /// Rewrites one URL-bearing attribute. Returns `None` when the attribute is
  /// held back to be re-emitted after the others.
  fn rewrite_attribute(
    &self,
    name: &str,
    raw: &str,
    context: &mut Context,
  ) -> Option<String> {
    let value = entities::decode(attributes::trim_controls(raw), true);

    match name {
      "rel" | "target" => {
        if !self.add_extra {
          return Some(attributes::render_attribute(name, &value));
        }

        let slot = if name == "rel" {
          &mut context.tag().rel
        } else {
          &mut context.tag().target
        };

        slot.get_or_insert_with(|| value.into_owned());

        return None;
      }
      "title" | "alt" => {
        context
          .tag()
          .title
          .get_or_insert_with(|| value.to_string());

        return Some(attributes::render_attribute(name, &value));
      }
      _ => {}
    }

    let resolved = Link::parse(&self.repair(&value))
      .and_then(|link| self.resolve(link));

    let Some((link, fragment_only)) = resolved else {
      context.record_broken_link(&value);
      return Some(attributes::render_attribute(name, &value));
    };

    let rendered = attributes::render_attribute(name, &link.build());

    if !fragment_only {
      context.tag().link = Some(link);
    }

    Some(rendered)
  }

  fn rewrite_tag(&self, token: &TagToken<'_>, context: &mut Context) -> String {
    let tag = token.name_lowercase();

    let Some(url_attributes) = self.url_tags.get(&tag) else {
      return format!("<{}{}>", token.name, token.attributes);
    };

    context.begin_tag();

    let source = token.attributes;

    let mut blob = String::with_capacity(source.len());
    let mut last = 0;

    for attribute in Attributes::new(source) {
      let name = attribute.name_lowercase();

      let Some(value) = attribute.value.filter(|value| !value.is_empty()) else {
        continue;
      };

      if !url_attributes.contains(&name) {
        continue;
      }

      let gap = &source[last..attribute.span.start];
      let before = gap.trim_end_matches(attributes::is_space_char);

      blob.push_str(before);

      last = attribute.span.end;

      if let Some(rendered) = self.rewrite_attribute(&name, value, context) {
        match &gap[before.len()..] {
          "" => blob.push(' '),
          whitespace => blob.push_str(whitespace),
        }

        blob.push_str(&rendered);
      }
    }

    let state = context.finish_tag();

    let rest = &source[last..];

    let closing_slash = rest
      .trim_end_matches(attributes::is_space_char)
      .ends_with('/');

    let (rest, suffix) = if closing_slash {
      let body = rest
        .trim_end_matches(attributes::is_space_char)
        .strip_suffix('/')
        .unwrap_or_default()
        .trim_end_matches(attributes::is_space_char);

      (body, &rest[body.len()..])
    } else {
      (rest, "")
    };

    blob.push_str(rest);

    if self.add_extra {
      blob.push_str(&self.extras(&tag, &state));
    }

    blob.push_str(suffix);

    format!("<{tag}{blob}>")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn stage(options: LinkOptionsBuilder) -> NormalizeLinksStage {
    NormalizeLinksStage::new(&options.build()).unwrap()
  }

  fn origin() -> LinkOptionsBuilder {
    LinkOptions::builder(Origin::new("http", "example.com", None))
  }

  #[test]
  fn same_origin_links_become_relative() {
    let links = stage(origin())
      .normalize(r#"<a href="http://example.com/path">x</a>"#);

    assert_eq!(links.text, r#"<a href="/path">x</a>"#);
    assert_eq!(links.valid_links.get("/path"), Some(&None));
  }

  #[test]
  fn relative_links_become_absolute_with_add_host() {
    let links = stage(origin().add_host(true))
      .normalize(r#"<a href="/path" title="Home">x</a>"#);

    assert_eq!(
      links.text,
      r#"<a href="http://example.com/path" title="Home">x</a>"#
    );
    assert_eq!(
      links.valid_links.get("http://example.com/path"),
      Some(&Some("Home".to_string()))
    );
  }

  #[test]
  fn non_default_origin_ports_are_kept() {
    let links = stage(
      LinkOptions::builder(Origin::new("http", "example.com", Some(8080)))
        .add_host(true),
    )
    .normalize(r#"<img src="/a.png">"#);

    assert_eq!(links.text, r#"<img src="http://example.com:8080/a.png">"#);
  }

  #[test]
  fn fragment_links_are_kept_but_not_recorded() {
    let links = stage(origin().add_host(true))
      .normalize(r##"<a href="#top">up</a>"##);

    assert_eq!(links.text, r##"<a href="#top">up</a>"##);
    assert!(links.valid_links.is_empty());
  }

  #[test]
  fn hosts_are_normalized_and_translated() {
    let links = stage(origin().host_translation("www.example.org", "example.org"))
      .normalize(r#"<a href="HTTP://WWW.Example.org.">x</a>"#);

    assert_eq!(links.text, r#"<a href="http://example.org/">x</a>"#);
  }

  #[test]
  fn scheme_typos_are_repaired() {
    let links = stage(origin())
      .normalize(r#"<a href="http:/other.com/a">x</a><a href="htp://other.com/b">y</a>"#);

    assert_eq!(
      links.text,
      r#"<a href="http://other.com/a">x</a><a href="http://other.com/b">y</a>"#
    );
  }

  #[test]
  fn broken_links_are_left_alone_and_counted() {
    let links = stage(origin()).normalize(
      r#"<a href="javascript:void(0)">x</a><a href="javascript:void(0)">y</a>"#,
    );

    assert_eq!(
      links.text,
      r#"<a href="javascript:void(0)">x</a><a href="javascript:void(0)">y</a>"#
    );
    assert_eq!(links.broken_links.get("javascript:void(0)"), Some(&2));
  }

  #[test]
  fn scheme_without_host_is_broken() {
    let links = stage(origin())
      .normalize(r#"<a href="http://">x</a><a href="mailto:">y</a>"#);

    assert_eq!(links.text, r#"<a href="http://">x</a><a href="mailto:">y</a>"#);
    assert!(links.valid_links.is_empty());
    assert_eq!(links.broken_links.get("http://"), Some(&1));
    assert_eq!(links.broken_links.get("mailto:"), Some(&1));
  }

  #[test]
  fn same_origin_paths_are_rewritten() {
    let links = stage(origin().path_rewrite("/old/", "/new/"))
      .normalize(r#"<a href="http://example.com/old/page">x</a><a href="http://other.com/old/page">y</a>"#);

    assert_eq!(
      links.text,
      r#"<a href="/new/page">x</a><a href="http://other.com/old/page">y</a>"#
    );
  }

  #[test]
  fn invalid_path_prefixes_are_rejected() {
    assert!(matches!(
      NormalizeLinksStage::new(&origin().path_rewrite("old/", "/new/").build()),
      Err(Error::InvalidPathSearch { .. })
    ));

    assert!(matches!(
      NormalizeLinksStage::new(&origin().path_rewrite("/old/", "a b").build()),
      Err(Error::InvalidPathReplace { .. })
    ));
  }

  #[test]
  fn external_links_get_extras() {
    let links = stage(origin().add_extra(true)).normalize(
      r#"<a href="http://other.com/" rel="NOFOLLOW noopener" target="_self">x</a>"#,
    );

    assert_eq!(
      links.text,
      r#"<a href="http://other.com/" target="_blank" rel="nofollow noopener">x</a>"#
    );
  }

  #[test]
  fn internal_links_keep_their_target() {
    let links = stage(origin().add_extra(true))
      .normalize(r#"<a target="_self" href="/a" rel="help">x</a>"#);

    assert_eq!(
      links.text,
      r#"<a href="/a" target="_self" rel="help">x</a>"#
    );
  }

  #[test]
  fn our_links_are_not_external() {
    let links = stage(origin().add_extra(true).our_links(r"^https?://partner\.com/"))
      .normalize(r#"<a href="http://partner.com/x">x</a>"#);

    assert_eq!(links.text, r#"<a href="http://partner.com/x">x</a>"#);
  }

  #[test]
  fn extras_go_before_the_self_closing_slash() {
    let links = stage(origin().add_extra(true))
      .normalize(r#"<link href="http://other.com/feed" />"#);

    assert_eq!(
      links.text,
      r#"<link href="http://other.com/feed" rel="nofollow" />"#
    );
  }

  #[test]
  fn tags_without_attributes_are_untouched() {
    let links = stage(origin()).normalize("<a>x</a><p>y</p>");

    assert_eq!(links.text, "<a>x</a><p>y</p>");
  }

  #[test]
  fn other_attributes_are_kept_verbatim() {
    let links = stage(origin())
      .normalize(r#"<IMG class=photo SRC='http://example.com/a.png' width=10>"#);

    assert_eq!(links.text, r#"<img class=photo src="/a.png" width=10>"#);
  }

  #[test]
  fn mailto_links_are_valid() {
    let links = stage(origin())
      .normalize(r#"<a href="mailto:someone@example.com">mail</a>"#);

    assert_eq!(links.text, r#"<a href="mailto:someone@example.com">mail</a>"#);
    assert!(links.broken_links.is_empty());
  }
}
