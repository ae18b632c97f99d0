use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};

use connectui::i18n::{resolve, resolve_plural, select_locale, LocaleCatalog, Params, Translator};
use connectui::params;

fn bundled() -> Arc<LocaleCatalog> {
    Arc::new(LocaleCatalog::bundled().unwrap())
}

#[test]
fn partial_locale_falls_back_to_english() {
    let t = Translator::new(bundled(), "pt");
    assert_eq!(t.t("home.title"), "Início");
    assert_eq!(t.t("common.confirm"), "Confirm");
}

#[test]
fn total_miss_is_the_key_itself() {
    let catalog = bundled();
    assert_eq!(
        resolve(&catalog, "nowhere.to.be.found", "de", &Params::new()),
        Value::String("nowhere.to.be.found".to_string())
    );
}

#[test]
fn plural_uses_count() {
    let t = Translator::new(bundled(), "en");
    assert_eq!(t.tp("notifications.unread", 1), "1 unread notification");
    assert_eq!(t.tp("notifications.unread", 0), "0 unread notifications");
    assert_eq!(
        resolve_plural(&bundled(), "notifications.unread", 3, "en", &Params::new()),
        json!("3 unread notifications")
    );
}

#[test]
fn interpolation_fills_named_slots() {
    let t = Translator::new(bundled(), "en");
    assert_eq!(
        t.t_with("messages.typing", &params!("handle" => "ana")),
        "ana is typing..."
    );
}

#[test]
fn override_directory_merges_over_bundled_tables() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fr.json"), r#"{"home": {"title": "Fil"}}"#).unwrap();
    fs::write(dir.path().join("it.json"), r#"{"home": {"title": "Inizio"}}"#).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut catalog = LocaleCatalog::bundled().unwrap();
    assert_eq!(catalog.load_overrides(dir.path()).unwrap(), 2);
    let catalog = Arc::new(catalog);

    let fr = Translator::new(Arc::clone(&catalog), "fr");
    assert_eq!(fr.t("home.title"), "Fil");
    assert_eq!(fr.t("home.dismiss"), "Ignorer");

    let it = Translator::new(Arc::clone(&catalog), "it");
    assert_eq!(it.t("home.title"), "Inizio");
    assert_eq!(it.t("home.dismiss"), "Dismiss");
}

#[test]
fn bad_override_is_a_locale_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("fr.json"), "[1, 2]").unwrap();
    let mut catalog = LocaleCatalog::bundled().unwrap();
    assert!(catalog.load_overrides(dir.path()).is_err());
}

#[test]
fn selection_order() {
    let catalog = bundled();
    assert_eq!(select_locale(Some("es"), Some("fr_FR.UTF-8"), &catalog), "es");
    assert_eq!(select_locale(None, Some("fr_FR.UTF-8"), &catalog), "fr");
    assert_eq!(select_locale(None, Some("ja_JP.UTF-8"), &catalog), "en");
    assert_eq!(select_locale(Some("  "), None, &catalog), "en");
}
