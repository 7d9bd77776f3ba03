use super::*;

/// The markup flowing through a pipeline, along with what the stages have
/// reported about it so far.
#[derive(Debug, Default)]
pub(crate) struct Document {
  report: Report,
  text: String,
}

impl Document {
  pub(crate) fn new(text: &str) -> Self {
    Self {
      report: Report::default(),
      text: text.to_string(),
    }
  }

  pub(crate) fn report_mut(&mut self) -> &mut Report {
    &mut self.report
  }

  pub(crate) fn set_text(&mut self, text: String) {
    self.text = text;
  }

  pub(crate) fn text(&self) -> &str {
    &self.text
  }
}

impl From<Document> for Scrubbed {
  fn from(document: Document) -> Self {
    Self {
      content: document.text,
      report: document.report,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn converts_into_scrubbed_output() {
    let mut document = Document::new("<b>x</b>");

    document.set_text("x".into());
    document.report_mut().invalid_tags.push("b".into());

    let scrubbed = Scrubbed::from(document);

    assert_eq!(scrubbed.content, "x");
    assert_eq!(scrubbed.report.invalid_tags, vec!["b"]);
  }
}
