//! Read-only catalog of control objectives.
//!
//! The catalog is a JSON document nested as family -> control -> objective
//! -> text:
//!
//! ```json
//! { "IA": { "IA.L2-3.5.1": { "IA.L2-3.5.1[a]": "system users are identified" } } }
//! ```
//!
//! Entries are kept sorted by family, control, then objective id.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

type RawCatalog = BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>;

/// One objective in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Control family, e.g. `IA`.
    pub family: String,
    /// Control identifier, e.g. `IA.L2-3.5.1`.
    pub control: String,
    /// Objective identifier.
    pub objective_id: String,
    /// Objective text.
    pub text: String,
}

/// Control objectives available for mapping.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveCatalog {
    entries: Vec<CatalogEntry>,
    by_id: HashMap<String, usize>,
}

impl ObjectiveCatalog {
    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Catalog`] if the text is not a three-level object of
    /// strings, or if an objective id appears twice.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawCatalog = serde_json::from_str(json).map_err(|e| Error::catalog(e.to_string()))?;

        let mut catalog = Self::default();
        for (family, controls) in raw {
            for (control, objectives) in controls {
                for (objective_id, text) in objectives {
                    catalog.push(CatalogEntry {
                        family: family.clone(),
                        control: control.clone(),
                        objective_id,
                        text,
                    })?;
                }
            }
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    fn push(&mut self, entry: CatalogEntry) -> Result<()> {
        if self.by_id.contains_key(&entry.objective_id) {
            return Err(Error::catalog(format!(
                "duplicate objective id '{}'",
                entry.objective_id
            )));
        }
        self.by_id
            .insert(entry.objective_id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Look up an objective.
    #[must_use]
    pub fn get(&self, objective_id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(objective_id).map(|&i| &self.entries[i])
    }

    /// Check whether an objective id is in the catalog.
    #[must_use]
    pub fn contains(&self, objective_id: &str) -> bool {
        self.by_id.contains_key(objective_id)
    }

    /// Family of an objective, if known.
    #[must_use]
    pub fn family_of(&self, objective_id: &str) -> Option<&str> {
        self.get(objective_id).map(|e| e.family.as_str())
    }

    /// All entries in catalog order.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of objectives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the catalog has no objectives.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
