use super::*;

/// What the rewriting stages noticed while processing a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  /// Tags left with unequal opening and closing counts.
  pub invalid_tags: Vec<String>,
  /// Nested duplicates removed, per tag.
  pub deleted_tags: BTreeMap<String, usize>,
  /// Every valid link found, without its fragment, mapped to the first title
  /// seen for it.
  pub valid_links: BTreeMap<String, Option<String>>,
  /// Unusable link values and how often each occurred.
  pub broken_links: BTreeMap<String, usize>,
}

impl Report {
  pub fn is_clean(&self) -> bool {
    self.invalid_tags.is_empty() && self.broken_links.is_empty()
  }

  pub(crate) fn merge_links(&mut self, links: Links) {
    for (link, title) in links.valid_links {
      self.valid_links.entry(link).or_insert(title);
    }

    for (link, count) in links.broken_links {
      *self.broken_links.entry(link).or_default() += count;
    }
  }

  pub(crate) fn merge_nesting(&mut self, nesting: Nesting) {
    for tag in nesting.invalid_tags {
      if !self.invalid_tags.contains(&tag) {
        self.invalid_tags.push(tag);
      }
    }

    for (tag, count) in nesting.deleted_tags {
      *self.deleted_tags.entry(tag).or_default() += count;
    }
  }
}

/// The output of [`Scrubber::scrub`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrubbed {
  pub content: String,
  pub report: Report,
}
