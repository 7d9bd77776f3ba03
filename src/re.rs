use super::*;

macro_rules! re {
  ($pat:expr) => {
    LazyLock::new(|| Regex::new(concat!("^", $pat, "$")).unwrap())
  };
}

pub(crate) static BLANK_LINE_RUNS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?:\r?\n|\r){3,}").unwrap());

pub(crate) static DOMAIN_NAME: LazyLock<Regex> = re!(concat!(
  r"(?:[a-z0-9_](?:[a-z0-9_\-]*[a-z0-9_])?\.)*",
  r"[a-z0-9](?:[a-z0-9\-]*[a-z0-9])?"
));

pub(crate) static DUPLICATE_SPACES: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\x20{2,}").unwrap());

pub(crate) static FRAGMENT_CHARS: LazyLock<Regex> =
  re!(r"[^\x00-\x20\x7f<>\x22\\^`{|}#]*");

pub(crate) static LEFTOVER_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?s)<[^>]*(?:>|$)").unwrap());

pub(crate) static LINE_BREAKS: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n+").unwrap());

pub(crate) static NOINDEX_TOUCHING: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)</?noindex>([\x00-\x20\x7f]*)</?noindex>").unwrap()
});

pub(crate) static PARAGRAPH_BREAK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n[\x20\t\n]+").unwrap());

pub(crate) static PATH_CHARS: LazyLock<Regex> =
  re!(r"/[^\x00-\x20\x7f<>\x22\\^`{|}#?]*");

pub(crate) static PATH_PREFIX: LazyLock<Regex> =
  re!(r"/(?:[^\x00-\x20\x7f/\\]+/)*");

pub(crate) static PATH_REPLACEMENT: LazyLock<Regex> =
  re!(r"[^\x00-\x20\x7f]+");

pub(crate) static QUERY_CHARS: LazyLock<Regex> =
  re!(r"[^\x00-\x20\x7f<>\x22\\^`{|}#]*");

pub(crate) static SCHEME: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([a-zA-Z][a-zA-Z0-9+.\-]*):").unwrap());

pub(crate) static SPECIAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"&(?:amp|lt|gt|quot|apos|#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6});")
    .unwrap()
});

pub(crate) static URL_SCHEME_PREFIX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^([^:/?#]+):").unwrap());

pub(crate) static VERTICAL_WHITESPACE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[\t\n\x0c\r]+").unwrap());

pub(crate) static WORD_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"&(?:[a-zA-Z][a-zA-Z0-9]+|#(?:[0-9]{1,4}|x[0-9a-fA-F]{2,4}));")
    .unwrap()
});
