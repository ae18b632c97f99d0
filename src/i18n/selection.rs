use std::env;

use crate::i18n::catalog::LocaleCatalog;

/// Environment variables consulted for the runtime locale, in priority order.
const LOCALE_VARS: &[&str] = &["LC_ALL", "LC_MESSAGES", "LANG"];

/// Pick the session locale. A profile preference is taken as-is; otherwise
/// the runtime locale counts only when a table exists for it; otherwise the
/// catalog default.
pub fn select_locale(
    profile_locale: Option<&str>,
    runtime_locale: Option<&str>,
    catalog: &LocaleCatalog,
) -> String {
    if let Some(preferred) = profile_locale.map(str::trim).filter(|s| !s.is_empty()) {
        return preferred.to_string();
    }

    runtime_locale
        .and_then(two_letter_code)
        .filter(|code| catalog.has_locale(code))
        .unwrap_or_else(|| catalog.default_locale().to_string())
}

/// `fr_FR.UTF-8`, `pt-BR`, `de` → two-letter language code.
pub fn two_letter_code(raw: &str) -> Option<String> {
    let lang = raw
        .trim()
        .split(['-', '_', '.', '@'])
        .next()?
        .to_ascii_lowercase();
    (lang.len() == 2 && lang.chars().all(|c| c.is_ascii_alphabetic())).then_some(lang)
}

/// The locale reported by the process environment, if any.
pub fn runtime_locale() -> Option<String> {
    LOCALE_VARS
        .iter()
        .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()))
}
