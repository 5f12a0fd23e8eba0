//! Launchable application entries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where an [`AppEntry`] came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppSource {
    #[default]
    Bundled,
    UserConfig,
    Registry,
}

/// An application the shell can open in a window.
///
/// Fields other than the known ones are kept in `extra` so an entry passed
/// back to a window as launch context is the same document the source served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(default)]
    pub source: AppSource,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            url: None,
            args: None,
            source: AppSource::default(),
            extra: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_source(mut self, source: AppSource) -> Self {
        self.source = source;
        self
    }

    /// `args.scope`, if present.
    pub fn scope(&self) -> Option<&Value> {
        self.args.as_ref().and_then(|a| a.get("scope"))
    }
}

/// Document served by an app registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_keeps_unknown_fields() {
        let entry: AppEntry = serde_json::from_value(json!({
            "name": "hello-dapp",
            "url": "http://localhost:8080",
            "icon": "hello.png"
        }))
        .unwrap();
        assert_eq!(entry.source, AppSource::Bundled);
        assert_eq!(entry.extra.get("icon"), Some(&json!("hello.png")));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["icon"], "hello.png");
        assert_eq!(back["source"], "bundled");
    }

    #[test]
    fn test_scope() {
        let entry = AppEntry::new("grid-ui")
            .with_args(json!({"scope": {"client": "parity", "component": "terminal"}}));
        assert_eq!(entry.scope().unwrap()["component"], "terminal");
        assert!(AppEntry::new("x").scope().is_none());
    }

    #[test]
    fn test_registry_document_without_apps() {
        let doc: RegistryDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.apps.is_empty());
    }
}
