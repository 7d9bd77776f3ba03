use {
  anyhow::Context,
  clap::{Parser, ValueEnum},
  markup_sanitizer::{Config, SanitizeStage, Scrubber, StripTagsStage, Validity},
  std::{fs, io, path::PathBuf, process},
  tracing_subscriber::EnvFilter,
};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Mode {
  /// Run the configured pipeline and report what it found
  #[default]
  Scrub,
  /// Reduce the input to plain text
  Strip,
  /// Apply the allow-list only
  Sanitize,
  /// Check the input against the tag grammar
  Validate,
}

#[derive(Parser)]
#[command(name = "markup-sanitizer")]
#[command(about = "Sanitize and normalize untrusted HTML", long_about = None)]
struct Arguments {
  /// JSON configuration file
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,
  /// Print the result as JSON
  #[arg(long)]
  json: bool,
  #[arg(long, value_enum, default_value_t)]
  mode: Mode,
  /// Path to the HTML file to process
  #[arg(value_name = "FILE")]
  input: PathBuf,
}

impl Arguments {
  fn config(&self) -> Result<Config> {
    let Some(path) = &self.config else {
      return Ok(Config::default());
    };

    let content = fs::read_to_string(path).with_context(|| {
      format!("failed to read config from `{}`", path.display())
    })?;

    serde_json::from_str(&content).with_context(|| {
      format!("failed to parse config from `{}`", path.display())
    })
  }

  /// Returns whether the input passed, which only `validate` can deny.
  fn run(self) -> Result<bool> {
    let html = fs::read_to_string(&self.input).with_context(|| {
      format!("failed to read file from `{}`", self.input.display())
    })?;

    let config = self.config()?;

    match self.mode {
      Mode::Scrub => {
        let scrubbed = Scrubber::new(config)
          .context("failed to configure scrubber")?
          .scrub(&html)
          .context("failed to scrub markup")?;

        if self.json {
          println!("{}", serde_json::to_string_pretty(&scrubbed)?);
        } else {
          println!("{}", scrubbed.content);
        }
      }
      Mode::Strip => {
        let text =
          StripTagsStage::new(config.strip.unwrap_or_default()).strip(&html);

        self.print_text(&text)?;
      }
      Mode::Sanitize => {
        let text = SanitizeStage::new(&config.policy).sanitize(&html);

        self.print_text(&text)?;
      }
      Mode::Validate => {
        let validity = Scrubber::new(config)
          .context("failed to configure scrubber")?
          .validate(&html);

        if self.json {
          println!("{}", serde_json::to_string_pretty(&validity)?);
        } else {
          match validity {
            Validity::Valid => println!("valid"),
            Validity::Invalid { offset } => println!("invalid at byte {offset}"),
          }
        }

        return Ok(validity.is_valid());
      }
    }

    Ok(true)
  }

  fn print_text(&self, text: &str) -> Result {
    if self.json {
      println!("{}", serde_json::to_string(text)?);
    } else {
      println!("{text}");
    }

    Ok(())
  }
}

type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn")),
    )
    .with_writer(io::stderr)
    .init();

  match Arguments::parse().run() {
    Ok(true) => {}
    Ok(false) => process::exit(1),
    Err(error) => {
      eprintln!("error: {error}");
      process::exit(1);
    }
  }
}
