pub mod binder;

pub use binder::{TemplateBinder, ITEMS_JSON_VAR};
