//! Support for `-c key=value` overrides shared by the chatbot binaries.
//!
//! Each override is a dotted TOML path plus a value. The value is parsed as
//! TOML when possible (`-c temperature=0.2`, `-c 'context_window_presets=[2048, 4096]'`)
//! and otherwise treated as a literal string (`-c model=llama3`).

use clap::ArgAction;
use clap::Parser;
use toml::Value;

#[derive(Parser, Debug, Default, Clone)]
pub struct CliConfigOverrides {
    /// Override a configuration value that would otherwise be loaded from
    /// `~/.chatbot-ollama/config.toml`. Use a dotted path (`foo.bar.baz`) to
    /// override nested values. The `value` portion is parsed as TOML. If it
    /// fails to parse as TOML, the raw string is used as a literal.
    #[arg(
        short = 'c',
        long = "config",
        value_name = "key=value",
        action = ArgAction::Append,
        global = true,
    )]
    pub raw_overrides: Vec<String>,
}

impl CliConfigOverrides {
    /// Parse the raw strings captured from the CLI into a list of
    /// `(path, value)` tuples.
    pub fn parse_overrides(&self) -> Result<Vec<(String, Value)>, String> {
        self.raw_overrides
            .iter()
            .map(|raw| {
                let Some((key, value_str)) = raw.split_once('=') else {
                    return Err(format!("Invalid override (missing '='): {raw}"));
                };
                let key = key.trim();
                if key.is_empty() {
                    return Err(format!("Empty key in override: {raw}"));
                }
                let value_str = value_str.trim();
                let value = match parse_toml_value(value_str) {
                    Ok(value) => value,
                    Err(_) => {
                        let trimmed = value_str.trim_matches(|c| c == '"' || c == '\'');
                        Value::String(trimmed.to_string())
                    }
                };
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Apply all parsed overrides onto `target`. Intermediate objects are
    /// created as necessary. Values are replaced wholesale.
    pub fn apply_on_value(&self, target: &mut Value) -> Result<(), String> {
        for (path, value) in self.parse_overrides()? {
            apply_single_override(target, &path, value);
        }
        Ok(())
    }
}

/// Apply a single override onto `root`, creating intermediate tables as
/// required.
pub(crate) fn apply_single_override(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let mut current = root;

    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;

        if is_last {
            match current {
                Value::Table(tbl) => {
                    tbl.insert((*part).to_string(), value);
                }
                _ => {
                    let mut tbl = toml::map::Map::new();
                    tbl.insert((*part).to_string(), value);
                    *current = Value::Table(tbl);
                }
            }
            return;
        }

        if !current.is_table() {
            *current = Value::Table(toml::map::Map::new());
        }
        let Value::Table(tbl) = current else {
            return;
        };
        current = tbl
            .entry((*part).to_string())
            .or_insert_with(|| Value::Table(toml::map::Map::new()));
    }
}

fn parse_toml_value(raw: &str) -> Result<Value, toml::de::Error> {
    let wrapped = format!("_x_ = {raw}");
    let mut table: toml::Table = toml::from_str(&wrapped)?;
    table
        .remove("_x_")
        .ok_or_else(|| serde::de::Error::custom("missing sentinel key"))
}
