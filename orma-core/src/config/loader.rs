use std::collections::HashMap;
use std::path::Path;

use super::value::ConfigValue;
use super::ConfigError;

/// Load and flatten a YAML file. A missing file contributes nothing.
pub(crate) fn load_yaml_file(
    path: &Path,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
}

pub(crate) fn load_yaml_str(
    content: &str,
    values: &mut HashMap<String, ConfigValue>,
) -> Result<(), ConfigError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten_yaml("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys. Sequences are stored whole
/// under their key and element-wise under `key.<index>`.
fn flatten_yaml(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, ConfigValue>) {
    let child = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                flatten_yaml(&child(&ConfigValue::yaml_key(k)), v, out);
            }
        }
        serde_yaml::Value::Sequence(seq) if !prefix.is_empty() => {
            out.insert(
                prefix.to_string(),
                ConfigValue::List(seq.iter().map(ConfigValue::from_yaml).collect()),
            );
            for (i, item) in seq.iter().enumerate() {
                flatten_yaml(&child(&i.to_string()), item, out);
            }
        }
        leaf if !prefix.is_empty() => {
            out.insert(prefix.to_string(), ConfigValue::from_yaml(leaf));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_nested_and_lists() {
        let mut values = HashMap::new();
        load_yaml_str(
            "orma:\n  database:\n    url: \"sqlite::memory:\"\n  tables: [a, b]\n",
            &mut values,
        )
        .unwrap();
        assert!(matches!(
            values.get("orma.database.url"),
            Some(ConfigValue::String(s)) if s == "sqlite::memory:"
        ));
        assert!(matches!(values.get("orma.tables"), Some(ConfigValue::List(l)) if l.len() == 2));
        assert!(matches!(values.get("orma.tables.1"), Some(ConfigValue::String(s)) if s == "b"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let mut values = HashMap::new();
        load_yaml_file(Path::new("/nonexistent/application.yaml"), &mut values).unwrap();
        assert!(values.is_empty());
    }
}
