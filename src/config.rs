use std::env;
use std::fmt;
use std::path::PathBuf;

const DEFAULT_ADDRESSEE: &str = "Директору;склада FMCG-СПб;Геращенко И.С.";
const DEFAULT_CONTRACT: &str = "приложения №5 к договору № РД-ТФД55-44 от 01.01.2024";

/// Error raised when the environment does not describe a runnable server.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} must be set", var),
            ConfigError::Invalid(var, value) => write!(f, "{} has invalid value {:?}", var, value),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Static text printed into generated service notes.
#[derive(Debug, Clone)]
pub struct ServiceNoteConfig {
    /// Right-aligned addressee lines at the top of the note.
    pub addressee: Vec<String>,
    /// Contract clause reference quoted in the violation paragraph.
    pub contract_reference: String,
}

impl Default for ServiceNoteConfig {
    fn default() -> Self {
        Self {
            addressee: split_lines(DEFAULT_ADDRESSEE),
            contract_reference: DEFAULT_CONTRACT.to_string(),
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Allowed CORS origins. Empty means any origin.
    pub frontend_origins: Vec<String>,
    pub uploads_dir: PathBuf,
    pub employees_csv_path: PathBuf,
    pub reporting_service_url: String,
    pub service_note: ServiceNoteConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so tests do not
    /// have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let server_port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("SERVER_PORT", raw))?,
            None => 5000,
        };
        let jwt_ttl_hours = match lookup("JWT_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => return Err(ConfigError::Invalid("JWT_TTL_HOURS", raw)),
            },
            None => 24,
        };

        let frontend_origins = lookup("FRONTEND_URL")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut service_note = ServiceNoteConfig::default();
        if let Some(addressee) = lookup("SERVICE_NOTE_ADDRESSEE") {
            service_note.addressee = split_lines(&addressee);
        }
        if let Some(contract) = lookup("SERVICE_NOTE_CONTRACT") {
            service_note.contract_reference = contract;
        }

        Ok(Self {
            database_url,
            server_port,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_ttl_hours,
            frontend_origins,
            uploads_dir: lookup("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            employees_csv_path: lookup("EMPLOYEES_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/employees.csv")),
            reporting_service_url: lookup("REPORTING_SERVICE_URL")
                .unwrap_or_else(|| "http://localhost:5050".to_string()),
            service_note,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn split_lines(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
