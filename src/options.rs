use super::*;

fn strings(items: &[&str]) -> Vec<String> {
  items.iter().map(|item| (*item).to_string()).collect()
}

fn collect<I, S>(items: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  items.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripOptions {
  /// Tags kept verbatim. An entry written as `<b>` keeps the tag but drops
  /// its attributes.
  pub allowed_tags: Vec<String>,
  /// Removed together with their content.
  pub pair_tags: Vec<String>,
  /// Replaced with a blank line.
  pub paragraph_tags: Vec<String>,
  /// Collapse markup whitespace and tidy the plain-text result.
  pub reformat: bool,
}

impl Default for StripOptions {
  fn default() -> Self {
    Self {
      allowed_tags: Vec::new(),
      pair_tags: strings(&[
        "script", "style", "map", "iframe", "frameset", "object", "applet",
        "comment", "button", "textarea", "select",
      ]),
      paragraph_tags: strings(&[
        "address",
        "blockquote",
        "caption",
        "center",
        "dd",
        "div",
        "dl",
        "dt",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "li",
        "menu",
        "ol",
        "p",
        "pre",
        "table",
        "tbody",
        "td",
        "tfoot",
        "th",
        "thead",
        "tr",
        "ul",
        "form",
        "title",
      ]),
      reformat: true,
    }
  }
}

impl StripOptions {
  #[must_use]
  pub fn builder() -> StripOptionsBuilder {
    StripOptionsBuilder::default()
  }
}

#[derive(Default)]
pub struct StripOptionsBuilder {
  inner: StripOptions,
}

impl StripOptionsBuilder {
  #[must_use]
  pub fn allowed_tags<I, S>(self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: StripOptions {
        allowed_tags: collect(tags),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn build(self) -> StripOptions {
    self.inner
  }

  #[must_use]
  pub fn pair_tags<I, S>(self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: StripOptions {
        pair_tags: collect(tags),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn paragraph_tags<I, S>(self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: StripOptions {
        paragraph_tags: collect(tags),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn reformat(self, reformat: bool) -> Self {
    Self {
      inner: StripOptions {
        reformat,
        ..self.inner
      },
    }
  }
}

/// The allow-list applied by the sanitizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
  pub tags: Vec<String>,
  pub attributes: Vec<String>,
  /// Attributes whose values are URLs and must use an allowed protocol.
  pub url_attributes: Vec<String>,
  pub protocols: Vec<String>,
}

impl Default for Policy {
  fn default() -> Self {
    Self {
      tags: strings(&[
        "p",
        "a",
        "b",
        "strong",
        "i",
        "em",
        "u",
        "s",
        "br",
        "wbr",
        "ol",
        "ul",
        "li",
        "tt",
        "sup",
        "sub",
        "pre",
        "code",
        "img",
        "nobr",
        "font",
        "blockquote",
        "noindex",
      ]),
      attributes: strings(&[
        "class", "align", "target", "title", "href", "src", "border", "alt",
        "type", "color",
      ]),
      url_attributes: strings(&[
        "action",
        "background",
        "codebase",
        "dynsrc",
        "lowsrc",
        "href",
        "src",
      ]),
      protocols: strings(&[
        "ed2k", "file", "ftp", "gopher", "http", "https", "irc", "mailto",
        "news", "nntp", "telnet", "webcal", "xmpp", "callto",
      ]),
    }
  }
}

impl Policy {
  #[must_use]
  pub fn builder() -> PolicyBuilder {
    PolicyBuilder::default()
  }
}

#[derive(Default)]
pub struct PolicyBuilder {
  inner: Policy,
}

impl PolicyBuilder {
  #[must_use]
  pub fn attributes<I, S>(self, attributes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: Policy {
        attributes: collect(attributes),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn build(self) -> Policy {
    self.inner
  }

  #[must_use]
  pub fn protocols<I, S>(self, protocols: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: Policy {
        protocols: collect(protocols),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn tags<I, S>(self, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: Policy {
        tags: collect(tags),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn url_attributes<I, S>(self, attributes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      inner: Policy {
        url_attributes: collect(attributes),
        ..self.inner
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestingOptions {
  /// Case-insensitive name patterns of tags that must not nest, e.g. `h[1-6]`.
  pub tags: Vec<String>,
}

impl Default for NestingOptions {
  fn default() -> Self {
    Self {
      tags: strings(&[
        "html", "head", "body", "title", "h[1-6]", "span", "div", "form",
        "textarea", "button", "option", "label", "select", "strong", "em",
        "big", "small", "sub", "sup", "tt", "[abius]", "bdo", "caption",
        "del", "ins", "script", "noscript", "style", "map", "applet",
        "object", "table", "t[rhd]", "nobr", "noindex", "wiki", "notypo",
        "comment",
      ]),
    }
  }
}

/// A rewrite applied to URL values before parsing, fixing common scheme
/// typos such as `http:/example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypoRule {
  pub pattern: String,
  pub replacement: String,
}

impl TypoRule {
  pub fn new(pattern: &str, replacement: &str) -> Self {
    Self {
      pattern: pattern.to_string(),
      replacement: replacement.to_string(),
    }
  }
}

const URL_TAGS: &[(&str, &[&str])] = &[
  ("a", &["href", "title", "rel", "target"]),
  ("applet", &["codebase", "alt"]),
  ("area", &["href", "alt", "rel", "target"]),
  ("base", &["href"]),
  ("blockquote", &["cite"]),
  ("body", &["background"]),
  ("del", &["cite"]),
  ("form", &["action"]),
  ("frame", &["src", "longdesc"]),
  ("head", &["profile"]),
  ("iframe", &["src", "longdesc"]),
  ("img", &["src", "longdesc", "alt"]),
  ("input", &["src", "alt"]),
  ("ins", &["cite"]),
  ("link", &["href", "title", "rel"]),
  ("object", &["classid", "codebase", "data", "usemap"]),
  ("q", &["cite"]),
  ("script", &["src"]),
  ("table", &["background"]),
  ("td", &["background"]),
  ("tr", &["background"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
  /// Make links absolute against the origin instead of relative.
  pub add_host: bool,
  /// Mark external links with `rel="nofollow"` and `target="_blank"`.
  pub add_extra: bool,
  /// Maps a link host to the host it should be rewritten to.
  pub host_translations: BTreeMap<String, String>,
  pub origin: Origin,
  /// Links matching this pattern are never treated as external.
  pub our_links: Option<String>,
  /// Path prefix of same-origin links to replace with `path_replace`.
  pub path_search: Option<String>,
  pub path_replace: Option<String>,
  /// Known schemes and their default ports.
  pub services: BTreeMap<String, u16>,
  pub typo_rules: Vec<TypoRule>,
  /// Per tag, the attributes that carry URLs.
  pub url_tags: BTreeMap<String, Vec<String>>,
}

impl Default for LinkOptions {
  fn default() -> Self {
    Self {
      add_host: false,
      add_extra: false,
      host_translations: BTreeMap::new(),
      origin: Origin::default(),
      our_links: None,
      path_search: None,
      path_replace: None,
      services: link::default_services(),
      typo_rules: vec![
        TypoRule::new(
          r"(?i)^([a-z][-a-z0-9_]{1,18}[a-z0-9]):/([^/]|$)",
          "${1}://${2}",
        ),
        TypoRule::new(r"(?i)^htt?p:?//", "http://"),
        TypoRule::new(r"(?i)^htt?ps:?//", "https://"),
      ],
      url_tags: URL_TAGS
        .iter()
        .map(|(tag, attributes)| ((*tag).to_string(), strings(attributes)))
        .collect(),
    }
  }
}

impl LinkOptions {
  #[must_use]
  pub fn builder(origin: Origin) -> LinkOptionsBuilder {
    LinkOptionsBuilder {
      inner: LinkOptions {
        origin,
        ..LinkOptions::default()
      },
    }
  }
}

pub struct LinkOptionsBuilder {
  inner: LinkOptions,
}

impl LinkOptionsBuilder {
  #[must_use]
  pub fn add_extra(self, add_extra: bool) -> Self {
    Self {
      inner: LinkOptions {
        add_extra,
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn add_host(self, add_host: bool) -> Self {
    Self {
      inner: LinkOptions {
        add_host,
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn build(self) -> LinkOptions {
    self.inner
  }

  #[must_use]
  pub fn host_translation(mut self, from: &str, to: &str) -> Self {
    self
      .inner
      .host_translations
      .insert(from.to_ascii_lowercase(), to.to_string());

    self
  }

  #[must_use]
  pub fn our_links(self, pattern: &str) -> Self {
    Self {
      inner: LinkOptions {
        our_links: Some(pattern.to_string()),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn path_rewrite(self, search: &str, replace: &str) -> Self {
    Self {
      inner: LinkOptions {
        path_search: Some(search.to_string()),
        path_replace: Some(replace.to_string()),
        ..self.inner
      },
    }
  }

  #[must_use]
  pub fn typo_rules(self, typo_rules: Vec<TypoRule>) -> Self {
    Self {
      inner: LinkOptions {
        typo_rules,
        ..self.inner
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarOptions {
  /// Require well-formed, case-sensitive XHTML with quoted attributes.
  pub strict: bool,
  /// Accept transitional tags and attributes in strict mode.
  pub legacy: bool,
  pub extra_pair_tags: Vec<String>,
  pub extra_empty_tags: Vec<String>,
  pub extra_attributes: Vec<String>,
}

impl Default for GrammarOptions {
  fn default() -> Self {
    Self {
      strict: true,
      legacy: true,
      extra_pair_tags: strings(&["nobr", "notypo", "wiki"]),
      extra_empty_tags: strings(&["typo", "page"]),
      extra_attributes: strings(&[
        "md5",
        "time",
        "speed",
        "length",
        "char_length",
        "created",
        "version",
      ]),
    }
  }
}

/// Everything a [`Scrubber`] needs, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Runs the tag stripper ahead of the sanitizer when present.
  pub strip: Option<StripOptions>,
  pub policy: Policy,
  pub nesting: NestingOptions,
  /// Runs the link normalizer last when present.
  pub links: Option<LinkOptions>,
  pub grammar: GrammarOptions,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builders_override_single_fields() {
    let options = StripOptions::builder()
      .allowed_tags(["b", "<i>"])
      .reformat(false)
      .build();

    assert_eq!(options.allowed_tags, vec!["b", "<i>"]);
    assert!(!options.reformat);
    assert_eq!(options.pair_tags, StripOptions::default().pair_tags);
  }

  #[test]
  fn link_builder_keeps_origin() {
    let options = LinkOptions::builder(Origin::new("https", "example.com", None))
      .add_host(true)
      .path_rewrite("/old/", "/new/")
      .host_translation("WWW.example.com", "example.com")
      .build();

    assert_eq!(options.origin.host, "example.com");
    assert!(options.add_host);
    assert_eq!(options.path_search.as_deref(), Some("/old/"));
    assert_eq!(
      options.host_translations.get("www.example.com").map(String::as_str),
      Some("example.com")
    );
  }

  #[test]
  fn config_deserializes_with_defaults() {
    let config = serde_json::from_str::<Config>(
      r#"{
        "policy": { "tags": ["b", "i"] },
        "links": { "origin": "https://example.com", "add_host": true }
      }"#,
    )
    .unwrap();

    assert_eq!(config.policy.tags, vec!["b", "i"]);
    assert_eq!(config.policy.protocols, Policy::default().protocols);

    let links = config.links.unwrap();

    assert_eq!(links.origin, Origin::new("https", "example.com", None));
    assert!(links.add_host);
    assert_eq!(links.url_tags["a"], vec!["href", "title", "rel", "target"]);
    assert_eq!(config.strip, None);
  }

  #[test]
  fn config_rejects_invalid_origin() {
    assert!(
      serde_json::from_str::<Config>(r#"{ "links": { "origin": "nope" } }"#)
        .is_err()
    );
  }
}
