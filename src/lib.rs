//! Sanitizes and normalizes untrusted HTML markup without building a DOM.
//!
//! Each rewrite is a stage that can be used on its own, or combined through a
//! [`Scrubber`]:
//!
//! - [`StripTagsStage`] reduces markup to plain text.
//! - [`SanitizeStage`] keeps only allow-listed tags and attributes.
//! - [`NormalizeNestingStage`] removes nested duplicates of non-nestable tags.
//! - [`NormalizeLinksStage`] repairs, resolves and validates URLs.
//!
//! [`GrammarValidator`] checks markup against a tag grammar instead of
//! rewriting it.

use {
  attributes::Attributes,
  context::{Context, TagState},
  document::Document,
  pipeline::Pipeline,
  regex::{Captures, Regex},
  scanner::{Closer, Construct, Misses, Piece, TagToken},
  serde::{Deserialize, Serialize},
  stage::Stage,
  std::{
    borrow::Cow,
    collections::{BTreeMap, HashSet},
    fmt::{self, Display, Formatter, Write as _},
    mem,
    ops::Range,
    sync::LazyLock,
  },
  tracing::{debug, warn},
  url::Url,
};

pub use crate::{
  attributes::{AttributeValue, Quote, render_attributes, render_tag},
  error::Error,
  link::{Link, Origin},
  markup::{highlight_words, is_html, paragraphs, unhang_words},
  options::{
    Config, GrammarOptions, LinkOptions, LinkOptionsBuilder, NestingOptions,
    Policy, PolicyBuilder, StripOptions, StripOptionsBuilder, TypoRule,
  },
  report::{Report, Scrubbed},
  scrubber::Scrubber,
  stage::{
    Links, Nesting, NobrStage, NoindexStage, NormalizeLinksStage,
    NormalizeNestingStage, SanitizeStage, StripTagsStage,
  },
  validator::{GrammarValidator, Validity},
};

#[cfg(test)]
macro_rules! test {
  (
    name: $name:ident,
    stage: $stage:expr,
    content: $content:expr,
    expected: $expected:expr $(,)?
  ) => {
    #[test]
    fn $name() {
      let mut document = Document::new($content);

      $stage.run(&mut document).unwrap();

      assert_eq!(document.text(), $expected);
    }
  };
}

mod attributes;
mod context;
mod document;
pub mod entities;
mod error;
mod link;
mod markup;
mod options;
mod pipeline;
mod re;
mod report;
mod scanner;
mod scrubber;
mod stage;
mod validator;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
