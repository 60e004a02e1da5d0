//! Configuration loading.
//!
//! Processors read their settings through the [`Settings`] trait using dotted
//! keys (`mla.regionfilepath`). The stock implementation is a TOML file:
//!
//! ```toml
//! [mla]
//! regionfilepath = "/etc/seismag/mla_regions.bna"
//!
//! [msmax]
//! period_step = 3
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::SeismagError;

/// Key holding the MLa boundary file path.
pub const MLA_REGION_FILE_KEY: &str = "mla.regionfilepath";

/// Key holding the MSmax trial period step in seconds.
pub const MSMAX_PERIOD_STEP_KEY: &str = "msmax.period_step";

/// Read-only access to processor settings.
pub trait Settings {
    /// String value for a dotted key.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Integer value for a dotted key.
    fn get_integer(&self, key: &str) -> Option<i64>;
}

/// Settings parsed from a TOML document.
#[derive(Debug, Clone, Default)]
pub struct Config {
    table: toml::Table,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, SeismagError> {
        let contents = fs::read_to_string(path.as_ref())?;
        debug!("read configuration from {}", path.as_ref().display());
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self, SeismagError> {
        let table: toml::Table = contents.parse()?;
        Ok(Self { table })
    }

    /// Set a string value under a dotted key, creating tables as needed.
    #[must_use]
    pub fn with_string(mut self, key: &str, value: impl Into<String>) -> Self {
        let parts: Vec<&str> = key.split('.').collect();
        insert_path(&mut self.table, &parts, toml::Value::String(value.into()));
        self
    }

    fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let mut value = self.table.get(first)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }
}

impl Settings for Config {
    fn get_string(&self, key: &str) -> Option<String> {
        self.lookup(key)?.as_str().map(str::to_string)
    }

    fn get_integer(&self, key: &str) -> Option<i64> {
        self.lookup(key)?.as_integer()
    }
}

fn insert_path(table: &mut toml::Table, parts: &[&str], value: toml::Value) {
    match parts {
        [] => {}
        [leaf] => {
            table.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = table
                .entry((*head).to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            if !entry.is_table() {
                *entry = toml::Value::Table(toml::Table::new());
            }
            if let toml::Value::Table(t) = entry {
                insert_path(t, rest, value);
            }
        }
    }
}

/// Fetch a required, non-empty string setting.
///
/// # Errors
///
/// Returns [`SeismagError::Config`] if the key is missing or blank.
pub fn require_string(settings: &dyn Settings, key: &str) -> Result<String, SeismagError> {
    match settings.get_string(key) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(SeismagError::Config(format!("setting '{key}' is empty"))),
        None => Err(SeismagError::Config(format!("missing setting '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_dotted_lookup() {
        let config = Config::from_toml_str(
            r#"
[mla]
regionfilepath = "/data/regions.bna"

[msmax]
period_step = 2
"#,
        )
        .unwrap();

        assert_eq!(
            config.get_string(MLA_REGION_FILE_KEY).as_deref(),
            Some("/data/regions.bna")
        );
        assert_eq!(config.get_integer(MSMAX_PERIOD_STEP_KEY), Some(2));
        assert_eq!(config.get_string("mla.missing"), None);
        assert_eq!(config.get_string("msmax.period_step"), None);
    }

    #[test]
    fn test_require_string() {
        let config = Config::default();
        assert!(require_string(&config, MLA_REGION_FILE_KEY).is_err());

        let config = Config::default().with_string(MLA_REGION_FILE_KEY, "  ");
        assert!(require_string(&config, MLA_REGION_FILE_KEY).is_err());

        let config = Config::default().with_string(MLA_REGION_FILE_KEY, "a.bna");
        assert_eq!(require_string(&config, MLA_REGION_FILE_KEY).unwrap(), "a.bna");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[mla]\nregionfilepath = \"x.bna\"").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.get_string(MLA_REGION_FILE_KEY).as_deref(), Some("x.bna"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(matches!(
            Config::load_from_path("/nonexistent/seismag.toml"),
            Err(SeismagError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml_str("[mla\n"),
            Err(SeismagError::TomlParse(_))
        ));
    }
}
