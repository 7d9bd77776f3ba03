use super::*;

/// Replaces the non-standard `<nobr>` tag with an equivalent styled span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NobrStage;

impl Stage for NobrStage {
  fn name(&self) -> &'static str {
    "nobr"
  }

  fn run(&self, document: &mut Document) -> Result {
    let rewritten = self.rewrite(document.text());

    document.set_text(rewritten);

    Ok(())
  }
}

impl NobrStage {
  const REPLACEMENT: &'static str = r#"<span style="white-space:nowrap">"#;

  pub fn rewrite(&self, text: &str) -> String {
    text
      .replace("<nobr>", Self::REPLACEMENT)
      .replace("</nobr>", "</span>")
  }
}
