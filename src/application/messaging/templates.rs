//! Response templating
//!
//! Commands that produce structured values name a template; rendering
//! substitutes `{field}` placeholders with fields of the value. The
//! rendered output is treated as markup, the plain body is derived from it
//! by tag stripping.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_json::Value;
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("valid regex"));

/// Named template registry, populated at plugin activation time
#[derive(Default)]
pub struct Templates {
    templates: HashMap<String, String>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.templates.insert(name.into(), body.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    /// Render a structured value through a named template. An unknown
    /// template or a missing field degrades to something visible rather
    /// than failing the dispatch.
    pub fn render(&self, name: &str, value: &Value) -> String {
        let Some(template) = self.get(name) else {
            warn!("unknown response template '{}', sending raw value", name);
            return value.to_string();
        };
        PLACEHOLDER
            .replace_all(template, |caps: &regex_lite::Captures<'_>| {
                let key = &caps[1];
                match value.get(key) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => {
                        warn!("template '{}' references missing field '{}'", name, key);
                        String::new()
                    }
                }
            })
            .to_string()
    }
}
