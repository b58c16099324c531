use std::collections::HashSet;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const TITLE: &str = "title";
pub const LINK: &str = "link";

/// Selector set describing where records live in a page, as written in the
/// settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub container: String,
    pub fields: Vec<FieldSelector>,
}

/// One field read out of each container element. Without a `selector` the
/// container itself is read; without an `attribute` its text content is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelector {
    pub name: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldSelector {
    pub fn attr(name: &str, selector: &str, attribute: &str) -> Self {
        FieldSelector {
            name: name.to_string(),
            selector: Some(selector.to_string()),
            attribute: Some(attribute.to_string()),
        }
    }

    #[cfg(test)]
    pub fn text(name: &str, selector: &str) -> Self {
        FieldSelector {
            name: name.to_string(),
            selector: Some(selector.to_string()),
            attribute: None,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            container: "h2.title".into(),
            fields: vec![
                FieldSelector::attr(TITLE, "a", "title"),
                FieldSelector::attr(LINK, "a", "href"),
            ],
        }
    }
}

/// Validated, parsed form of a [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub container: Selector,
    pub fields: Vec<CompiledField>,
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub selector: Option<Selector>,
    pub attribute: Option<String>,
}

impl SelectorConfig {
    pub fn compile(&self) -> Result<CompiledSelectors> {
        let container = parse_selector("container", &self.container)?;

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let name = field.name.trim();
            if name.is_empty() {
                return Err(Error::Config("field with an empty name".into()));
            }
            if !seen.insert(name.to_string()) {
                return Err(Error::Config(format!("field `{}` declared twice", name)));
            }
            let selector = match &field.selector {
                Some(s) => Some(parse_selector(name, s)?),
                None => None,
            };
            let attribute = match &field.attribute {
                Some(a) if a.trim().is_empty() => {
                    return Err(Error::Config(format!("field `{}` has an empty attribute", name)))
                }
                Some(a) => Some(a.trim().to_string()),
                None => None,
            };
            fields.push(CompiledField {
                name: name.to_string(),
                selector,
                attribute,
            });
        }

        for required in [TITLE, LINK] {
            if !seen.contains(required) {
                return Err(Error::Config(format!("missing required field `{}`", required)));
            }
        }

        Ok(CompiledSelectors { container, fields })
    }
}

fn parse_selector(what: &str, raw: &str) -> Result<Selector> {
    if raw.trim().is_empty() {
        return Err(Error::Config(format!("empty selector for `{}`", what)));
    }
    Selector::parse(raw)
        .map_err(|e| Error::Config(format!("bad selector for `{}` ({:?}): {}", what, raw, e)))
}
