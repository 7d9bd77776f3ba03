use super::*;

/// Scratch state for a single rewrite invocation.
///
/// Nothing here outlives the call that created it, so concurrent rewrites
/// with the same stage never observe each other.
#[derive(Debug, Default)]
pub(crate) struct Context {
  pub(crate) broken_links: BTreeMap<String, usize>,
  pub(crate) deleted_tags: BTreeMap<String, usize>,
  open_tags: BTreeMap<String, i64>,
  tag: TagState,
  pub(crate) valid_links: BTreeMap<String, Option<String>>,
}

/// What the link normalizer learned about the tag it is rewriting.
#[derive(Debug, Default)]
pub(crate) struct TagState {
  pub(crate) link: Option<Link>,
  pub(crate) rel: Option<String>,
  pub(crate) target: Option<String>,
  pub(crate) title: Option<String>,
}

impl Context {
  pub(crate) fn begin_tag(&mut self) {
    self.tag = TagState::default();
  }

  /// Records a closing tag. Returns whether the tag should be kept.
  pub(crate) fn close(&mut self, tag: &str) -> bool {
    let open = self.open_tags.entry(tag.to_string()).or_default();

    *open -= 1;

    if *open > 0 {
      *self.deleted_tags.entry(tag.to_string()).or_default() += 1;
      return false;
    }

    true
  }

  pub(crate) fn finish_tag(&mut self) -> TagState {
    let state = mem::take(&mut self.tag);

    if let Some(link) = &state.link {
      self
        .valid_links
        .entry(link.without_fragment().build())
        .or_insert_with(|| state.title.clone());
    }

    state
  }

  /// Records an opening tag. Returns whether the tag should be kept.
  pub(crate) fn open(&mut self, tag: &str) -> bool {
    let open = self.open_tags.entry(tag.to_string()).or_default();

    *open += 1;

    if *open > 1 {
      *self.deleted_tags.entry(tag.to_string()).or_default() += 1;
      return false;
    }

    true
  }

  pub(crate) fn record_broken_link(&mut self, value: &str) {
    debug!(link = value, "broken link");

    *self.broken_links.entry(value.to_string()).or_default() += 1;
  }

  pub(crate) fn tag(&mut self) -> &mut TagState {
    &mut self.tag
  }

  /// Names of tags whose opening and closing counts differ.
  pub(crate) fn unbalanced_tags(&self) -> Vec<String> {
    self
      .open_tags
      .iter()
      .filter(|(_, count)| **count != 0)
      .map(|(tag, _)| tag.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nested_openers_are_deleted() {
    let mut context = Context::default();

    assert!(context.open("b"));
    assert!(!context.open("b"));
    assert!(!context.close("b"));
    assert!(context.close("b"));

    assert_eq!(context.deleted_tags.get("b"), Some(&2));
    assert!(context.unbalanced_tags().is_empty());
  }

  #[test]
  fn stray_closers_are_kept_and_reported() {
    let mut context = Context::default();

    assert!(context.close("i"));
    assert!(context.close("i"));

    assert_eq!(context.unbalanced_tags(), vec!["i"]);
    assert!(context.deleted_tags.is_empty());
  }

  #[test]
  fn finished_tags_record_their_link_once() {
    let mut context = Context::default();

    for title in ["first", "second"] {
      context.begin_tag();
      context.tag().title = Some(title.into());
      context.tag().link = Link::parse("http://example.com/a#top");
      context.finish_tag();
    }

    assert_eq!(
      context.valid_links.get("http://example.com/a"),
      Some(&Some("first".to_string()))
    );
  }

  #[test]
  fn broken_links_are_counted() {
    let mut context = Context::default();

    context.record_broken_link("javascript:void(0)");
    context.record_broken_link("javascript:void(0)");

    assert_eq!(context.broken_links.get("javascript:void(0)"), Some(&2));
  }
}
