//! Configuration access port.

/// Read-only access to sectioned key/value configuration.
///
/// Typed getters return `None` when the key is absent or does not parse;
/// callers that need to tell the two apart use `get_string` first.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str) -> Option<i64>;
    fn get_double(&self, section: &str, key: &str) -> Option<f64>;
    fn get_bool(&self, section: &str, key: &str) -> Option<bool>;

    fn has_key(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key).is_some()
    }
}
