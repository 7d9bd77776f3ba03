use super::*;

/// Turns `<noindex>` blocks into the `<!--noindex-->` comment markers search
/// engines understand, after removing nested and adjacent duplicates.
#[derive(Debug, Clone)]
pub struct NoindexStage {
  nesting: NormalizeNestingStage,
}

impl Stage for NoindexStage {
  fn name(&self) -> &'static str {
    "noindex"
  }

  fn run(&self, document: &mut Document) -> Result {
    let rewritten = self.rewrite(document.text());

    document.set_text(rewritten);

    Ok(())
  }
}

impl NoindexStage {
  pub fn new() -> Result<Self> {
    Ok(Self {
      nesting: NormalizeNestingStage::new(&NestingOptions {
        tags: vec!["noindex".into()],
      })?,
    })
  }

  pub fn rewrite(&self, text: &str) -> String {
    let nesting = self.nesting.normalize(text);

    re::NOINDEX_TOUCHING
      .replace_all(&nesting.text, "$1")
      .replace("<noindex>", "<!--noindex-->")
      .replace("</noindex>", "<!--/noindex-->")
  }
}
