use std::collections::HashMap;

/// Read access to the external key/value preference store.
pub trait ConfigSource {
    /// Returns the stored value for `key`, or `None` to fall back to the default.
    fn get_float(&self, key: &str) -> Option<f64>;
}

/// In-memory preference store.
#[derive(Clone, Debug, Default)]
pub struct MapSource {
    values: HashMap<String, f64>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: f64) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), value);
    }
}

impl ConfigSource for MapSource {
    fn get_float(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get_float(&self, key: &str) -> Option<f64> {
        (**self).get_float(key)
    }
}
