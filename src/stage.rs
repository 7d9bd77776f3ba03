use super::*;

mod nobr;
mod noindex;
mod normalize_links;
mod normalize_nesting;
mod sanitize;
mod strip_tags;

pub use {
  nobr::NobrStage,
  noindex::NoindexStage,
  normalize_links::{Links, NormalizeLinksStage},
  normalize_nesting::{Nesting, NormalizeNestingStage},
  sanitize::SanitizeStage,
  strip_tags::StripTagsStage,
};

pub(crate) trait Stage {
  fn name(&self) -> &'static str;

  fn run(&self, document: &mut Document) -> Result;
}
