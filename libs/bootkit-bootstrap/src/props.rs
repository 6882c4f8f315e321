//! Property source: the typed key/value store backing all configuration.
//!
//! Keys are dotted paths (`web.port`, `app.name`). Values are untyped
//! `serde_json::Value`s; typed accessors coerce on read and fall back to the
//! caller's default when the stored value is neither the requested type nor a
//! parsable string of that type.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde_json::Value;

/// Typed key/value store consumed by the container, autoconfig and components.
pub trait PropertySource: Send + Sync {
    /// Raw lookup. Returns `None` when the key is absent.
    fn get_property(&self, key: &str) -> Option<Value>;

    /// Insert or overwrite a value.
    fn set_property(&self, key: &str, value: Value);

    fn has_property(&self, key: &str) -> bool {
        self.get_property(key).is_some()
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        match self.get_property(key) {
            Some(Value::String(s)) => s,
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_property(key) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => default,
            },
            _ => default,
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get_property(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.get_property(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }
}

/// In-memory property source guarded by a reader-writer lock.
#[derive(Default)]
pub struct MemoryPropertySource {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryPropertySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all keys, mainly for diagnostics.
    pub fn keys(&self) -> Vec<String> {
        self.values.read().keys().cloned().collect()
    }

    /// Load every `K=V` from the process environment under the key
    /// `lowercase(K)` with `_` replaced by `.`.
    pub fn load_env(&self) {
        for (k, v) in std::env::vars() {
            let key = k.to_ascii_lowercase().replace('_', ".");
            self.set_property(&key, Value::String(v));
        }
    }

    /// Merge a YAML document, flattening nested mappings into dotted keys.
    pub fn load_yaml_str(&self, text: &str) -> Result<()> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(text).context("invalid YAML in config file")?;
        let json = serde_json::to_value(doc).context("YAML not representable as JSON")?;
        let mut flat = HashMap::new();
        flatten_into("", &json, &mut flat);
        let mut values = self.values.write();
        for (k, v) in flat {
            values.insert(k, v);
        }
        Ok(())
    }
}

impl PropertySource for MemoryPropertySource {
    fn get_property(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set_property(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    fn has_property(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }
}

fn flatten_into(prefix: &str, value: &Value, out: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten_into(&key, v, out);
            }
        }
        Value::Null => {}
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Layered load: YAML file (if given) first, then environment variables on top.
pub fn load_property_source(config_path: Option<&Path>) -> Result<MemoryPropertySource> {
    let props = MemoryPropertySource::new();
    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        props.load_yaml_str(&text)?;
    }
    props.load_env();
    Ok(props)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_getters_coerce_strings() {
        let p = MemoryPropertySource::new();
        p.set_property("a.flag", json!("true"));
        p.set_property("a.port", json!("9090"));
        p.set_property("a.ratio", json!("0.5"));
        assert!(p.get_bool("a.flag", false));
        assert_eq!(p.get_int("a.port", 0), 9090);
        assert_eq!(p.get_float("a.ratio", 0.0), 0.5);
    }

    #[test]
    fn typed_getters_fall_back_on_garbage() {
        let p = MemoryPropertySource::new();
        p.set_property("a.flag", json!("yep"));
        p.set_property("a.port", json!("not-a-number"));
        assert!(!p.get_bool("a.flag", false));
        assert_eq!(p.get_int("a.port", 8080), 8080);
        assert_eq!(p.get_string("a.missing", "x"), "x");
    }

    #[test]
    fn get_string_renders_scalars() {
        let p = MemoryPropertySource::new();
        p.set_property("n", json!(42));
        p.set_property("b", json!(true));
        assert_eq!(p.get_string("n", ""), "42");
        assert_eq!(p.get_string("b", ""), "true");
    }

    #[test]
    fn yaml_is_flattened_to_dotted_keys() {
        let p = MemoryPropertySource::new();
        p.load_yaml_str("web:\n  enabled: true\n  port: 9090\napp:\n  name: demo\n")
            .unwrap();
        assert_eq!(p.get_bool("web.enabled", false), true);
        assert_eq!(p.get_int("web.port", 0), 9090);
        assert_eq!(p.get_string("app.name", ""), "demo");
    }

    #[test]
    fn load_property_source_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"app:\n  name: from-file\n").unwrap();

        let p = load_property_source(Some(file.path())).unwrap();
        assert_eq!(p.get_string("app.name", ""), "from-file");
    }

    #[test]
    fn load_property_source_rejects_missing_file() {
        assert!(load_property_source(Some(Path::new("/nonexistent/config.yaml"))).is_err());
    }

    #[test]
    fn env_convention_lowercases_and_dots() {
        std::env::set_var("BOOTKIT_PROPS_TEST_KEY", "hello");
        let p = MemoryPropertySource::new();
        p.load_env();
        assert_eq!(p.get_string("bootkit.props.test.key", ""), "hello");
        std::env::remove_var("BOOTKIT_PROPS_TEST_KEY");
    }
}
