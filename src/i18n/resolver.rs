use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::i18n::catalog::LocaleCatalog;

/// Interpolation parameters, `{{name}}` → value.
pub type Params = BTreeMap<String, String>;

/// Build [`Params`] from `key => value` pairs; values go through `ToString`.
#[macro_export]
macro_rules! params {
    () => {
        $crate::i18n::Params::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut params = $crate::i18n::Params::new();
        $( params.insert($key.to_string(), $value.to_string()); )+
        params
    }};
}

fn walk<'a>(table: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(table, |node, segment| node.as_object()?.get(*segment))
}

/// Look `key` up in `locale`, then in the default locale, then give up and
/// hand back the key itself. String leaves are interpolated when `params`
/// is non-empty; any other leaf comes back untouched.
pub fn resolve(catalog: &LocaleCatalog, key: &str, locale: &str, params: &Params) -> Value {
    let segments: Vec<&str> = key.split('.').collect();

    let found = catalog
        .table(locale)
        .and_then(|table| walk(table, &segments))
        .or_else(|| {
            catalog
                .table(catalog.default_locale())
                .and_then(|table| walk(table, &segments))
        });

    match found {
        None => Value::String(key.to_string()),
        Some(Value::String(text)) if !params.is_empty() => Value::String(interpolate(text, params)),
        Some(value) => value.clone(),
    }
}

/// Binary plural selection: `key` for exactly one, `key_plural` otherwise.
pub fn resolve_plural(
    catalog: &LocaleCatalog,
    key: &str,
    count: u64,
    locale: &str,
    params: &Params,
) -> Value {
    let mut params = params.clone();
    params.insert("count".to_string(), count.to_string());
    if count == 1 {
        resolve(catalog, key, locale, &params)
    } else {
        resolve(catalog, &format!("{key}_plural"), locale, &params)
    }
}

/// Replace `{{name}}` placeholders. Names are word characters; unknown
/// names are left verbatim.
pub fn interpolate(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let name_len = after
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
            .count();

        if name_len > 0 && after[name_len..].starts_with("}}") {
            let name = &after[..name_len];
            match params.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push_str("{{");
                    out.push_str(name);
                    out.push_str("}}");
                }
            }
            rest = &after[name_len + 2..];
        } else {
            out.push('{');
            rest = &rest[open + 1..];
        }
    }

    out.push_str(rest);
    out
}

/// Active-locale view over a shared catalog.
#[derive(Debug, Clone)]
pub struct Translator {
    catalog: Arc<LocaleCatalog>,
    locale: String,
}

impl Translator {
    pub fn new(catalog: Arc<LocaleCatalog>, locale: &str) -> Self {
        Self {
            catalog,
            locale: locale.to_string(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: &str) {
        if self.locale != locale {
            log::info!("locale changed from {} to {}", self.locale, locale);
            self.locale = locale.to_string();
        }
    }

    pub fn catalog(&self) -> &LocaleCatalog {
        &self.catalog
    }

    pub fn resolve(&self, key: &str, params: &Params) -> Value {
        resolve(&self.catalog, key, &self.locale, params)
    }

    pub fn resolve_plural(&self, key: &str, count: u64, params: &Params) -> Value {
        resolve_plural(&self.catalog, key, count, &self.locale, params)
    }

    pub fn t(&self, key: &str) -> String {
        self.t_with(key, &Params::new())
    }

    /// Text form of [`Translator::resolve`]: anything that is not a
    /// non-empty string degrades to the key.
    pub fn t_with(&self, key: &str, params: &Params) -> String {
        text_or_key(self.resolve(key, params), key)
    }

    pub fn tp(&self, key: &str, count: u64) -> String {
        self.tp_with(key, count, &Params::new())
    }

    pub fn tp_with(&self, key: &str, count: u64, params: &Params) -> String {
        text_or_key(self.resolve_plural(key, count, params), key)
    }

    /// Locale codes with their display names from `languages.<code>`.
    pub fn available_languages(&self) -> Vec<(String, String)> {
        self.catalog
            .codes()
            .map(|code| (code.to_string(), self.t(&format!("languages.{code}"))))
            .collect()
    }

    /// Compact age such as `now`, `5m`, `3h` or `2d`.
    pub fn format_relative_time(&self, then: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let elapsed = now.signed_duration_since(then);
        let minutes = elapsed.num_minutes();
        let hours = elapsed.num_hours();
        let days = elapsed.num_days();

        if minutes < 1 {
            self.t("home.now")
        } else if minutes < 60 {
            format!("{}{}", minutes, self.t("home.minutes"))
        } else if hours < 24 {
            format!("{}{}", hours, self.t("home.hours"))
        } else {
            format!("{}{}", days, self.t("home.days"))
        }
    }
}

fn text_or_key(value: Value, key: &str) -> String {
    match value {
        Value::String(text) if !text.is_empty() => text,
        _ => key.to_string(),
    }
}
