//! Thread-safe in-memory template catalog.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use semver::Version;

use trellis_core::{
    application::{ApplicationError, ports::TemplateCatalog},
    domain::{TemplateDefinition, TemplateId},
    error::TrellisResult,
};

/// Thread-safe in-memory template catalog.
///
/// Stores every inserted version of a template; `get` answers with the
/// highest. Definitions are validated on insert so the resolver never sees
/// an inconsistent one.
#[derive(Clone)]
pub struct InMemoryCatalog {
    inner: Arc<RwLock<HashMap<TemplateId, BTreeMap<Version, TemplateDefinition>>>>,
}

impl InMemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a catalog pre-filled with `definitions`.
    pub fn with_definitions(
        definitions: impl IntoIterator<Item = TemplateDefinition>,
    ) -> TrellisResult<Self> {
        let catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Insert one definition, validating it first. Re-inserting an existing
    /// id and version replaces the stored definition.
    pub fn insert(&self, definition: TemplateDefinition) -> TrellisResult<()> {
        definition.validate()?;

        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        inner
            .entry(definition.id.clone())
            .or_default()
            .insert(definition.version.clone(), definition);
        Ok(())
    }

    /// Number of distinct template ids.
    pub fn len(&self) -> TrellisResult<usize> {
        Ok(self.inner.read().map_err(|_| lock_poisoned())?.len())
    }

    pub fn is_empty(&self) -> TrellisResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every version of a template. Returns whether the id was
    /// present.
    pub fn remove(&self, id: &TemplateId) -> TrellisResult<bool> {
        let mut inner = self.inner.write().map_err(|_| lock_poisoned())?;
        Ok(inner.remove(id).is_some())
    }

    /// Remove everything.
    pub fn clear(&self) -> TrellisResult<()> {
        self.inner.write().map_err(|_| lock_poisoned())?.clear();
        Ok(())
    }

    /// All known template ids, unordered.
    pub fn ids(&self) -> TrellisResult<Vec<TemplateId>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| lock_poisoned())?
            .keys()
            .cloned()
            .collect())
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_poisoned() -> ApplicationError {
    ApplicationError::CatalogAccess {
        reason: "catalog lock poisoned".into(),
    }
}

impl TemplateCatalog for InMemoryCatalog {
    fn get(&self, id: &TemplateId) -> TrellisResult<Option<TemplateDefinition>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .get(id)
            .and_then(|versions| versions.values().next_back())
            .cloned())
    }

    fn get_version(
        &self,
        id: &TemplateId,
        version: &Version,
    ) -> TrellisResult<Option<TemplateDefinition>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .get(id)
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    fn versions(&self, id: &TemplateId) -> TrellisResult<Vec<Version>> {
        let inner = self.inner.read().map_err(|_| lock_poisoned())?;
        Ok(inner
            .get(id)
            .map(|versions| versions.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(id: &str, version: &str) -> TemplateDefinition {
        TemplateDefinition::builder()
            .id(id)
            .version_str(version)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn get_returns_highest_version() {
        let catalog =
            InMemoryCatalog::with_definitions([def("web", "1.0.0"), def("web", "1.4.2")]).unwrap();

        let found = catalog.get(&"web".into()).unwrap().unwrap();
        assert_eq!(found.version.to_string(), "1.4.2");
    }

    #[test]
    fn get_version_is_exact() {
        let catalog =
            InMemoryCatalog::with_definitions([def("web", "1.0.0"), def("web", "1.4.2")]).unwrap();

        let wanted = Version::new(1, 0, 0);
        let found = catalog.get_version(&"web".into(), &wanted).unwrap().unwrap();
        assert_eq!(found.version, wanted);

        let missing = catalog
            .get_version(&"web".into(), &Version::new(9, 0, 0))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn versions_are_ascending() {
        let catalog = InMemoryCatalog::with_definitions([
            def("web", "2.0.0"),
            def("web", "1.0.0"),
            def("web", "1.5.0"),
        ])
        .unwrap();

        let versions: Vec<String> = catalog
            .versions(&"web".into())
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(versions, ["1.0.0", "1.5.0", "2.0.0"]);
    }

    #[test]
    fn remove_drops_every_version() {
        let catalog =
            InMemoryCatalog::with_definitions([def("web", "1.0.0"), def("web", "2.0.0")]).unwrap();

        assert!(catalog.remove(&"web".into()).unwrap());
        assert!(catalog.get(&"web".into()).unwrap().is_none());
        assert!(!catalog.remove(&"web".into()).unwrap());
    }

    #[test]
    fn unknown_id_is_absent_not_an_error() {
        let catalog = InMemoryCatalog::new();
        assert!(catalog.get(&"ghost".into()).unwrap().is_none());
        assert!(catalog.versions(&"ghost".into()).unwrap().is_empty());
    }

    #[test]
    fn invalid_definitions_are_rejected_on_insert() {
        // Self-dependency fails domain validation.
        let bad = TemplateDefinition::builder()
            .id("selfish")
            .version_str("1.0.0")
            .unwrap()
            .depends_on("selfish", ">=1.0.0")
            .unwrap()
            .build();

        // The builder itself validates; either way the catalog never holds it.
        let catalog = InMemoryCatalog::new();
        match bad {
            Ok(definition) => assert!(catalog.insert(definition).is_err()),
            Err(_) => {}
        }
        assert!(catalog.is_empty().unwrap());
    }
}
