use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::selectors::{CompiledField, CompiledSelectors};

/// Field values read from one container element. A field whose
/// sub-element or attribute was absent (or blank) maps to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub fields: BTreeMap<String, Option<String>>,
}

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_deref())
    }
}

/// Run the container selector over `markup` and read every configured field
/// from each match, in document order.
pub fn extract(markup: &str, selectors: &CompiledSelectors) -> Vec<RawRecord> {
    let document = Html::parse_document(markup);

    document
        .select(&selectors.container)
        .map(|container| RawRecord {
            fields: selectors
                .fields
                .iter()
                .map(|field| (field.name.clone(), read_field(container, field)))
                .collect(),
        })
        .collect()
}

fn read_field(container: ElementRef<'_>, field: &CompiledField) -> Option<String> {
    let target = match &field.selector {
        Some(sel) => container.select(sel).next()?,
        None => container,
    };

    let value = match &field.attribute {
        Some(attr) => target.value().attr(attr)?.trim().to_string(),
        None => collapse_whitespace(&target.text().collect::<String>()),
    };

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn collapse_whitespace(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\s+").unwrap());
    re.replace_all(text.trim(), " ").into_owned()
}
