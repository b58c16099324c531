use url::Url;

use crate::error::{Error, Result};

/// Prefix a root-relative link with `base_origin`. Anything else is returned
/// untouched, absolute or not.
pub fn absolutize(link: &str, base_origin: &str) -> String {
    if link.starts_with('/') {
        format!("{}{}", base_origin, link)
    } else {
        link.to_string()
    }
}

/// Reduce a configured base URL to its origin: scheme, host and any
/// non-default port, without a trailing slash.
pub fn origin_of(base: &str) -> Result<String> {
    let url = Url::parse(base.trim())
        .map_err(|e| Error::Config(format!("base origin {:?}: {}", base, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::Config(format!(
            "base origin {:?} must be an http(s) URL with a host",
            base
        )));
    }
    Ok(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://site.example";

    #[test]
    fn root_relative_gets_origin() {
        assert_eq!(absolutize("/post/1", ORIGIN), "https://site.example/post/1");
        assert_eq!(absolutize("/", ORIGIN), "https://site.example/");
    }

    #[test]
    fn everything_else_passes_through() {
        for link in [
            "https://ext.example/post/2",
            "http://site.example/a",
            "post/3",
            "../up",
            "mailto:someone@site.example",
            "",
        ] {
            assert_eq!(absolutize(link, ORIGIN), link);
        }
    }

    #[test]
    fn origin_strips_path_and_slash() {
        assert_eq!(origin_of("https://site.example/").unwrap(), ORIGIN);
        assert_eq!(origin_of("https://site.example/news/?q=1").unwrap(), ORIGIN);
        assert_eq!(
            origin_of("http://localhost:8080/").unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(origin_of("https://site.example:443").unwrap(), ORIGIN);
    }

    #[test]
    fn origin_rejects_non_http() {
        assert!(origin_of("ftp://site.example").is_err());
        assert!(origin_of("site.example").is_err());
        assert!(origin_of("").is_err());
    }
}
