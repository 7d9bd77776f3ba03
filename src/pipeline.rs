use super::*;

pub(crate) struct Pipeline<'a> {
  document: Document,
  stages: Vec<&'a dyn Stage>,
}

impl<'a> Pipeline<'a> {
  fn add_stage(&mut self, stage: &'a dyn Stage) {
    self.stages.push(stage);
  }

  pub(crate) fn new(document: Document) -> Self {
    Self {
      document,
      stages: Vec::new(),
    }
  }

  pub(crate) fn run(mut self) -> Result<Document> {
    for stage in &self.stages {
      stage.run(&mut self.document)?;

      debug!(
        stage = stage.name(),
        length = self.document.text().len(),
        "stage finished"
      );
    }

    Ok(self.document)
  }

  pub(crate) fn with_default_stages(
    document: Document,
    scrubber: &'a Scrubber,
  ) -> Self {
    let mut pipeline = Self::new(document);

    if let Some(strip) = scrubber.strip() {
      pipeline.add_stage(strip);
    }

    pipeline.add_stage(scrubber.sanitize());
    pipeline.add_stage(scrubber.nesting());

    if let Some(links) = scrubber.links() {
      pipeline.add_stage(links);
    }

    pipeline
  }
}
