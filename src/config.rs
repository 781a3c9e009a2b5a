use std::time::Duration;

/// Default archive location, next to the binary. The same file the original
/// dataset ships as; override with `BOUNDARY_SOURCE` (path or http(s) URL).
pub const DEFAULT_SOURCE: &str = "limites_departamentales.zip";
/// Attribute carrying the department name in the default dataset.
pub const DEFAULT_NAME_FIELD: &str = "NOMBRE_DEP";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: String,
    pub name_field: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_values(None, None, None)
    }
}

impl Config {
    /// Reads configuration from the environment. A `.env` file next to the
    /// binary works as well.
    pub fn from_env() -> Self {
        Self::from_values(
            dotenv::var("BOUNDARY_SOURCE").ok(),
            dotenv::var("BOUNDARY_NAME_FIELD").ok(),
            dotenv::var("BOUNDARY_TIMEOUT_SECS").ok(),
        )
    }

    fn from_values(
        source: Option<String>,
        name_field: Option<String>,
        timeout_secs: Option<String>,
    ) -> Self {
        let timeout_secs = timeout_secs
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            source: source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            name_field: name_field.unwrap_or_else(|| DEFAULT_NAME_FIELD.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
