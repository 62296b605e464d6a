use orb_core::{Config, Paths};
use serde_json::Value;

/// Keys whose values are masked when printed.
const SECRET_KEYS: &[&str] = &["apiKey"];

/// Show the current configuration as pretty-printed JSON, secrets masked.
pub async fn show() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let mut json = serde_json::to_value(&config)?;
    mask_secrets(&mut json);

    println!();
    println!("Current configuration");
    println!("  File: {}", paths.config_file().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Print a config value by dot-separated key path.
pub async fn get(key: &str) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let json = serde_json::to_value(&config)?;

    match resolve_json_path(&json, key) {
        Some(Value::String(s)) => println!("{}", s),
        Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
        None => anyhow::bail!("Key '{}' not found in config", key),
    }
    Ok(())
}

/// Set a config value by dot-separated key path and write the file back.
pub async fn set(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config_path = paths.config_file();
    // Start from the file, not the environment, so env keys are never persisted.
    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };
    let mut json = serde_json::to_value(&config)?;

    // JSON when it parses, plain string otherwise.
    let parsed: Value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    set_json_path(&mut json, key, parsed.clone());

    let updated: Config = serde_json::from_value(json)?;
    updated.save(&config_path)?;

    match parsed {
        Value::String(s) => println!("✓ Set {} = {}", key, s),
        other => println!("✓ Set {} = {}", key, serde_json::to_string(&other)?),
    }
    Ok(())
}

fn mask_secrets(json: &mut Value) {
    match json {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if SECRET_KEYS.contains(&k.as_str()) {
                    if let Value::String(s) = v {
                        if !s.is_empty() {
                            *s = "***".to_string();
                        }
                    }
                } else {
                    mask_secrets(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_secrets),
        _ => {}
    }
}

/// Navigate a JSON value by dot-separated path. Accepts snake_case segments.
fn resolve_json_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;
    for part in path.split('.') {
        current = current.get(to_camel_case(part)).or_else(|| current.get(part))?;
    }
    Some(current.clone())
}

/// Set a value in a JSON object by dot-separated path, creating objects along the way.
fn set_json_path(json: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = json;
    for (i, part) in parts.iter().enumerate() {
        let camel = to_camel_case(part);
        let key = if current.get(&camel).is_some() {
            camel
        } else {
            part.to_string()
        };

        if i == parts.len() - 1 {
            current[&key] = value;
            return;
        }

        if !current.get(&key).is_some_and(Value::is_object) {
            current[&key] = serde_json::json!({});
        }
        current = &mut current[&key];
    }
}

fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for ch in s.chars() {
        if ch == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(ch.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
