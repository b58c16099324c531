pub mod extract;
pub mod normalize;
pub mod selectors;

use serde::Serialize;
use tracing::warn;

use crate::error::RecordError;
use selectors::{CompiledSelectors, LINK, TITLE};

/// A record ready to be persisted: title present, link absolutized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub link: String,
}

/// Markup → raw field maps → candidates with normalized links.
///
/// Entries lacking a title or link are skipped and reported; the rest of the
/// page is still returned.
pub fn process_markup(
    markup: &str,
    selectors: &CompiledSelectors,
    base_origin: &str,
) -> (Vec<Candidate>, Vec<RecordError>) {
    let mut candidates = Vec::new();
    let mut errors = Vec::new();

    for (index, raw) in extract::extract(markup, selectors).into_iter().enumerate() {
        match (raw.get(TITLE), raw.get(LINK)) {
            (Some(title), Some(link)) => candidates.push(Candidate {
                title: title.to_string(),
                link: normalize::absolutize(link, base_origin),
            }),
            (title, _) => {
                let field = if title.is_none() { TITLE } else { LINK };
                warn!("Skipping candidate #{}: no {}", index, field);
                errors.push(RecordError::Extraction {
                    index,
                    field: field.to_string(),
                });
            }
        }
    }

    (candidates, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::selectors::SelectorConfig;

    #[test]
    fn fixture_candidates() {
        let html = std::fs::read_to_string("tests/fixtures/comicsalliance.html").unwrap();
        let sel = SelectorConfig::default().compile().unwrap();
        let (candidates, errors) = process_markup(&html, &sel, "http://comicsalliance.com");

        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0].link,
            "http://comicsalliance.com/week-in-comics-capes/"
        );
        assert_eq!(
            candidates[1].link,
            "https://comicsalliance.com/interview-cover-artist/"
        );
        assert_eq!(candidates[2].title, "Best Graphic Novels of the Year");
        assert_eq!(
            errors,
            vec![RecordError::Extraction {
                index: 2,
                field: "title".into()
            }]
        );
    }

    #[test]
    fn missing_link_only() {
        let html = r#"<h2 class="title"><a title="Orphan">Orphan</a></h2>"#;
        let sel = SelectorConfig::default().compile().unwrap();
        let (candidates, errors) = process_markup(html, &sel, "https://site.example");
        assert!(candidates.is_empty());
        assert!(matches!(&errors[0], RecordError::Extraction { field, .. } if field == "link"));
    }
}
