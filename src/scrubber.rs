use super::*;

/// Runs the configured stages over untrusted markup.
///
/// ```
/// use markup_sanitizer::{Config, Scrubber};
///
/// let scrubber = Scrubber::new(Config::default()).unwrap();
///
/// let scrubbed = scrubber
///   .scrub("<p onclick=\"x()\">hi<script>alert(1)</script></p>")
///   .unwrap();
///
/// assert_eq!(scrubbed.content, "<p>hi</p>");
/// ```
#[derive(Debug, Clone)]
pub struct Scrubber {
  links: Option<NormalizeLinksStage>,
  nesting: NormalizeNestingStage,
  sanitize: SanitizeStage,
  strip: Option<StripTagsStage>,
  validator: GrammarValidator,
}

impl Scrubber {
  /// Builds every stage up front, so configuration errors surface here
  /// rather than halfway through a document.
  pub fn new(config: Config) -> Result<Self> {
    Ok(Self {
      links: config
        .links
        .as_ref()
        .map(NormalizeLinksStage::new)
        .transpose()?,
      nesting: NormalizeNestingStage::new(&config.nesting)?,
      sanitize: SanitizeStage::new(&config.policy),
      strip: config.strip.map(StripTagsStage::new),
      validator: GrammarValidator::new(&config.grammar),
    })
  }

  pub(crate) fn links(&self) -> Option<&NormalizeLinksStage> {
    self.links.as_ref()
  }

  pub(crate) fn nesting(&self) -> &NormalizeNestingStage {
    &self.nesting
  }

  pub(crate) fn sanitize(&self) -> &SanitizeStage {
    &self.sanitize
  }

  pub fn scrub(&self, text: &str) -> Result<Scrubbed> {
    Ok(
      Pipeline::with_default_stages(Document::new(text), self)
        .run()?
        .into(),
    )
  }

  pub(crate) fn strip(&self) -> Option<&StripTagsStage> {
    self.strip.as_ref()
  }

  /// Checks `text` against the configured grammar.
  pub fn validate(&self, text: &str) -> Validity {
    self.validator.validate(text)
  }
}
