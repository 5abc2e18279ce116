/// Settings loading for dreamhostdns
///
/// The settings file is JSON:
/// ```json
/// {
///   "api_key": "6SHU5P2HLDAYECUM",
///   "domains": ["home.example.com", "vpn.example.com"]
/// }
/// ```
///
/// It lives at `<config dir>/dreamhostdns/settings.json` unless `--file` says
/// otherwise. Command line values take precedence over the file.
use crate::args::Args;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Timeout applied to every HTTP request when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// What the operator wants kept up to date, handed to the engine by value
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredConfig {
    pub api_key: String,
    pub domains: Vec<String>,
}

/// On-disk shape of settings.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, alias = "Domains")]
    pub domains: Option<Vec<String>>,
}

impl SettingsFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

// Main Config struct used throughout the codebase
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub domains: Vec<String>,
    pub ip: Option<String>,
    pub ip_service: Option<String>,
    pub server: Option<String>,
    pub timeout: u64,
    pub log_file: Option<PathBuf>,
    pub no_log_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            domains: Vec::new(),
            ip: None,
            ip_service: None,
            server: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            log_file: None,
            no_log_file: false,
        }
    }
}

impl Config {
    /// Combine an optional settings file with CLI arguments, CLI values winning.
    pub fn merge(file_config: Option<SettingsFile>, args: &Args) -> Self {
        let base = file_config.unwrap_or_default();

        let domains = match &args.domains {
            Some(list) => split_domains(list),
            None => base.domains.unwrap_or_default(),
        };

        Config {
            api_key: args
                .api_key
                .clone()
                .or(base.api_key)
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            domains: normalize_domains(domains),
            ip: args.ip.clone(),
            ip_service: args.ip_service.clone(),
            server: args.server.clone(),
            timeout: args.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            log_file: args.log_file.as_ref().map(PathBuf::from),
            no_log_file: args.no_log_file,
        }
    }

    /// Load the settings file (explicit `--file` or the default location) and merge it with CLI arguments.
    ///
    /// An explicitly named file must exist. A missing default file is tolerated so that
    /// everything can be given on the command line; `validate` reports what is lacking.
    pub fn load(args: &Args) -> Result<Self> {
        let file_config = match &args.file {
            Some(path) => Some(SettingsFile::from_file(Path::new(path)).map_err(|e| {
                Error::Config(format!("unable to read settings file {}: {}", path, e))
            })?),
            None => match default_settings_path() {
                Some(path) if path.exists() => {
                    log::debug!("Reading settings from {}", path.display());
                    Some(SettingsFile::from_file(&path).map_err(|e| {
                        Error::Config(format!("unable to read settings file {}: {}", path.display(), e))
                    })?)
                }
                Some(path) => {
                    log::debug!("No settings file at {}", path.display());
                    None
                }
                None => None,
            },
        };

        Ok(Self::merge(file_config, args))
    }

    /// Ensures an API key and at least one domain are present.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::Config(format!(
                "api_key is required (use --api-key or set it in {})",
                settings_hint()
            )));
        }
        if self.domains.is_empty() {
            return Err(Error::Config(format!(
                "at least one domain is required (use --domains or set it in {})",
                settings_hint()
            )));
        }
        if self.timeout == 0 {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }

    pub fn desired(&self) -> DesiredConfig {
        DesiredConfig {
            api_key: self.api_key.clone(),
            domains: self.domains.clone(),
        }
    }
}

/// `<config dir>/dreamhostdns/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dreamhostdns").join("settings.json"))
}

fn settings_hint() -> String {
    default_settings_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "settings.json".to_string())
}

/// Split a comma-separated domain list, trimming whitespace and dropping empty entries.
pub fn split_domains(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Trim, drop empties and remove duplicates keeping the first occurrence.
fn normalize_domains(domains: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(domains.len());
    for domain in domains {
        let domain = domain.trim().to_string();
        if !domain.is_empty() && !seen.contains(&domain) {
            seen.push(domain);
        }
    }
    seen
}
