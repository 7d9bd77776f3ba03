use {
  markup_sanitizer::{Config, Scrubber},
  pretty_assertions::assert_eq,
  scraper::{Html, Selector},
  std::{fs, path::PathBuf},
};

macro_rules! test {
  ($name:expr) => {
    paste::paste! {
      #[test]
      fn [<test_ $name>]() {
        TestFixture::load($name).run();
      }
    }
  };
}

struct TestFixture {
  config: Config,
  expected_html: String,
  source_html: String,
}

impl TestFixture {
  fn load(name: &str) -> Self {
    let base_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
      .join("tests/fixtures")
      .join(name);

    let source_html = fs::read_to_string(base_path.join("source.html"))
      .expect("Failed to read source.html");

    let expected_html = fs::read_to_string(base_path.join("expected.html"))
      .expect("Failed to read expected.html");

    let config_path = base_path.join("config.json");

    let config = if config_path.exists() {
      let config_str =
        fs::read_to_string(config_path).expect("Failed to read config.json");

      serde_json::from_str(&config_str).expect("Failed to parse config JSON")
    } else {
      Config::default()
    };

    Self {
      config,
      expected_html,
      source_html,
    }
  }

  fn run(&self) {
    let scrubber = Scrubber::new(self.config.clone())
      .expect("Failed to create Scrubber instance");

    let scrubbed = scrubber
      .scrub(&self.source_html)
      .expect("Failed to scrub source");

    assert_eq!(scrubbed.content, self.expected_html.trim_end());

    let fragment = Html::parse_fragment(&scrubbed.content);

    let script = Selector::parse("script, iframe, object").unwrap();

    assert_eq!(fragment.select(&script).count(), 0);
  }
}

test!("blog_post");
test!("link_rewriting");
test!("xss_vectors");
