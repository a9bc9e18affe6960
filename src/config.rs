use rusoto_signature::region::ParseRegionError;
use rusoto_signature::Region;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

pub const REGION_VAR: &str = "STOPPER_REGION";
pub const FALLBACK_REGION_VAR: &str = "AWS_REGION";
pub const INSTANCES_VAR: &str = "STOPPER_INSTANCES";
pub const ENDPOINT_VAR: &str = "STOPPER_ENDPOINT";

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StopperConfig {
    pub region: Region,
    pub instances: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidRegion(ParseRegionError),
}

impl From<ParseRegionError> for ConfigError {
    fn from(err: ParseRegionError) -> Self {
        ConfigError::InvalidRegion(err)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} not found in environment variables", var),
            ConfigError::InvalidRegion(err) => write!(f, "Invalid region: {}", err),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Missing(_) => None,
            ConfigError::InvalidRegion(err) => Some(err),
        }
    }
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl StopperConfig {
    /// Loads the configuration from the process environment. `main` loads
    /// `.env` into it first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region_name = lookup(REGION_VAR)
            .or_else(|| lookup(FALLBACK_REGION_VAR))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::Missing(REGION_VAR))?;

        let region = match lookup(ENDPOINT_VAR).filter(|endpoint| !endpoint.trim().is_empty()) {
            Some(endpoint) => Region::Custom {
                name: region_name,
                endpoint: endpoint.trim().to_string(),
            },
            None => Region::from_str(&region_name)?,
        };

        let instances = lookup(INSTANCES_VAR)
            .map(|raw| parse_instances(&raw))
            .ok_or(ConfigError::Missing(INSTANCES_VAR))?;

        Ok(StopperConfig { region, instances })
    }
}

/// Splits a comma separated identifier list. Order and duplicates are kept.
pub fn parse_instances(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
