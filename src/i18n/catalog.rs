use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::ConnectuiError;

pub const DEFAULT_LOCALE: &str = "en";

const BUNDLED: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("fr", include_str!("../../locales/fr.json")),
    ("pt", include_str!("../../locales/pt.json")),
    ("es", include_str!("../../locales/es.json")),
    ("de", include_str!("../../locales/de.json")),
];

/// Locale code to nested translation table. Loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleCatalog {
    tables: BTreeMap<String, Value>,
    default_locale: String,
}

impl LocaleCatalog {
    pub fn new(default_locale: &str) -> Self {
        Self {
            tables: BTreeMap::new(),
            default_locale: default_locale.to_string(),
        }
    }

    /// Tables shipped with the binary.
    pub fn bundled() -> Result<Self, ConnectuiError> {
        let mut catalog = Self::new(DEFAULT_LOCALE);
        for (code, raw) in BUNDLED {
            let table: Value = serde_json::from_str(raw)
                .map_err(|e| ConnectuiError::Locale(format!("bundled table {}: {}", code, e)))?;
            catalog.insert(code, table)?;
        }
        Ok(catalog)
    }

    /// Add a table, deep-merging it over any table already held for `code`.
    pub fn insert(&mut self, code: &str, table: Value) -> Result<(), ConnectuiError> {
        if !table.is_object() {
            return Err(ConnectuiError::Locale(format!(
                "table for {} must be a JSON object",
                code
            )));
        }
        match self.tables.get_mut(code) {
            Some(existing) => merge_tables(existing, table),
            None => {
                self.tables.insert(code.to_string(), table);
            }
        }
        Ok(())
    }

    /// Read every `<code>.json` in `dir` as an override table.
    pub fn load_overrides(&mut self, dir: &Path) -> Result<usize, ConnectuiError> {
        let mut loaded = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path)?;
            let table: Value = serde_json::from_str(&raw)
                .map_err(|e| ConnectuiError::Locale(format!("{}: {}", path.display(), e)))?;
            self.insert(code, table)?;
            log::info!("loaded locale overrides for {} from {}", code, path.display());
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn has_locale(&self, code: &str) -> bool {
        self.tables.contains_key(code)
    }

    pub fn table(&self, code: &str) -> Option<&Value> {
        self.tables.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

fn merge_tables(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_tables(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
