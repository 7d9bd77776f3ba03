#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("invalid request origin `{origin}`")]
  InvalidOrigin { origin: String },
  #[error("invalid path prefix `{path}`; expected an absolute directory path")]
  InvalidPathSearch { path: String },
  #[error("invalid path replacement `{path}`")]
  InvalidPathReplace { path: String },
  #[error("invalid pattern `{pattern}`: {source}")]
  InvalidPattern {
    pattern: String,
    #[source]
    source: regex::Error,
  },
}
