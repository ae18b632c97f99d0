pub mod catalog;
pub mod resolver;
pub mod selection;

pub use catalog::{LocaleCatalog, DEFAULT_LOCALE};
pub use resolver::{interpolate, resolve, resolve_plural, Params, Translator};
pub use selection::{runtime_locale, select_locale, two_letter_code};
