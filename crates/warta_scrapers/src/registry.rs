use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};
use warta_core::{Error, Result};

use crate::fetch::PageSource;
use crate::scrapers::{indonesia, Scraper};

/// One registered source as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub id: String,
    pub name: &'static str,
    pub emoji: &'static str,
    pub region: &'static str,
}

/// Maps source identifiers to extractors. Filled once at startup and shared
/// read-only afterwards.
#[derive(Default)]
pub struct SourceRegistry {
    entries: BTreeMap<String, Arc<dyn Scraper>>,
    primary: Vec<String>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in source, all fetching through `pages`.
    pub fn standard(pages: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_concurrency(pages, 1)
    }

    pub fn with_concurrency(pages: Arc<dyn PageSource>, concurrency: usize) -> Result<Self> {
        let mut registry = Self::new();
        for scraper in indonesia::get_scrapers(pages, concurrency)? {
            registry.register(Arc::new(scraper));
        }
        Ok(registry)
    }

    /// Registers `scraper` under each of its CLI names and under the
    /// region-qualified form (`indonesia/detik`).
    pub fn register(&mut self, scraper: Arc<dyn Scraper>) {
        let metadata = scraper.source_metadata();
        let names: Vec<String> = scraper.cli_names().into_iter().map(str::to_string).collect();

        for name in names {
            let qualified = format!("{}/{}", metadata.region.name, name);
            for key in [name.clone(), qualified] {
                if self.entries.insert(key.clone(), scraper.clone()).is_some() {
                    warn!(source = %key, "Source registered twice, keeping the latest");
                }
            }
            if !self.primary.contains(&name) {
                self.primary.push(name);
            }
        }
        debug!(source = metadata.name, "Registered source");
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Scraper>> {
        let key = name.trim().to_lowercase();
        self.entries
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::UnknownSource(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.trim().to_lowercase())
    }

    /// Every accepted identifier, qualified forms included.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn sources(&self) -> Vec<SourceEntry> {
        self.primary
            .iter()
            .filter_map(|id| {
                let metadata = self.entries.get(id)?.source_metadata();
                Some(SourceEntry {
                    id: id.clone(),
                    name: metadata.name,
                    emoji: metadata.emoji,
                    region: metadata.region.name,
                })
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakePages;

    fn registry() -> SourceRegistry {
        SourceRegistry::standard(Arc::new(FakePages::new())).unwrap()
    }

    #[test]
    fn test_resolve_registered_sources() {
        let registry = registry();
        for name in ["detik", "kompas", "liputan6"] {
            let scraper = registry.resolve(name).unwrap();
            assert_eq!(scraper.cli_names(), vec![name]);
        }
        assert_eq!(registry.resolve(" Detik ").unwrap().source_metadata().name, "Detik");
    }

    #[test]
    fn test_resolve_region_qualified() {
        let registry = registry();
        assert_eq!(
            registry.resolve("indonesia/kompas").unwrap().source_metadata().name,
            "Kompas"
        );
        assert!(registry.contains("indonesia/liputan6"));
        assert!(!registry.contains("argentina/detik"));
    }

    #[test]
    fn test_unknown_source() {
        let err = registry().resolve("tempo").err().unwrap();
        assert!(matches!(err, Error::UnknownSource(ref name) if name == "tempo"));
        assert!(err.is_invalid_input());
        assert!(SourceRegistry::new().is_empty());
    }

    #[test]
    fn test_names_and_sources() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "detik",
                "indonesia/detik",
                "indonesia/kompas",
                "indonesia/liputan6",
                "kompas",
                "liputan6"
            ]
        );

        let sources = registry.sources();
        let ids: Vec<&str> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["detik", "kompas", "liputan6"]);
        assert!(sources.iter().all(|s| s.region == "indonesia"));
    }
}
