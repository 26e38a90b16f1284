//! Scraping of mkcert's human-readable output.
//!
//! mkcert has no machine-readable output mode, so the phrases below are the
//! only integration point. They track mkcert's wording and break if it
//! changes; swap in another [`OutputParser`] when that happens.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// What a parser recovered from one mkcert run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Parsed {
    pub ca_root: String,
    pub trusted: bool,
    pub cert_file: String,
    pub key_file: String,
}

/// Turns the combined output of an mkcert run into a [`Parsed`].
pub trait OutputParser {
    fn parse(&self, output: &[u8]) -> Parsed;
}

/// Parser for the output of the stock mkcert CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct MkcertOutput;

impl OutputParser for MkcertOutput {
    fn parse(&self, output: &[u8]) -> Parsed {
        let (cert_file, key_file) = parse_files(output);
        Parsed {
            ca_root: parse_ca_root(output),
            trusted: parse_trusted(output),
            cert_file,
            key_file,
        }
    }
}

static CA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"local CA at "(.+?)" [💥✨]\n"#).expect("valid CA regex"));

static NOT_INSTALLED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("not installed").expect("valid trust regex"));

static FILES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)The certificate is at "(.+?)" and the key at "(.+?)""#)
        .expect("valid files regex")
});

/// The CA directory, or an empty string when mkcert didn't mention it.
pub fn parse_ca_root(output: &[u8]) -> String {
    CA_RE
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| lossy(m.as_bytes()))
        .unwrap_or_default()
}

/// True unless mkcert complained that its CA is "not installed" somewhere.
pub fn parse_trusted(output: &[u8]) -> bool {
    !NOT_INSTALLED_RE.is_match(output)
}

/// Certificate and key paths, both empty when the line is missing.
pub fn parse_files(output: &[u8]) -> (String, String) {
    match FILES_RE.captures(output) {
        Some(c) => match (c.get(1), c.get(2)) {
            (Some(cert), Some(key)) => (lossy(cert.as_bytes()), lossy(key.as_bytes())),
            _ => Default::default(),
        },
        None => Default::default(),
    }
}

fn lossy(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}
