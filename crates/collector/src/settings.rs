//! Audit settings.
//!
//! Layered as defaults, then an optional YAML file, then `VCEVIDENCE_*`
//! environment variables, then command-line flags (applied by the caller).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use vcevidence_common::{Error, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "VCEVIDENCE_";

/// Environment variable holding the session password.
pub const PASSWORD_ENV: &str = "VCEVIDENCE_PASSWORD";

/// Longest event window or snapshot age accepted, in days.
pub const MAX_WINDOW_DAYS: u32 = 3650;

const TEMPLATE_HEADER: &str = "\
# vcevidence settings
#
# Every key is optional; a missing key keeps its default. Values here are
# overridden by VCEVIDENCE_* environment variables and then by command-line
# flags. The session password is never read from this file: set
# VCEVIDENCE_PASSWORD instead.
";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Length of the event window in days.
    pub days_back: u32,
    /// Datastores below this free percentage warn.
    pub datastore_min_free_pct: f64,
    /// Snapshots older than this many days warn.
    pub snapshot_max_age_days: u32,
    /// Upper bound on events read from the window.
    pub max_event_samples: usize,
    pub export: bool,
    pub out_folder: PathBuf,
    /// Export file name prefix.
    pub prefix: String,
}

/// Values given on the command line. `None` (or `false` for `export`)
/// keeps the value from the lower layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub days_back: Option<u32>,
    pub datastore_min_free_pct: Option<f64>,
    pub snapshot_max_age_days: Option<u32>,
    pub max_event_samples: Option<usize>,
    pub export: bool,
    pub out_folder: Option<PathBuf>,
    pub prefix: Option<String>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            days_back: 30,
            datastore_min_free_pct: 15.0,
            snapshot_max_age_days: 14,
            max_event_samples: 5000,
            export: false,
            out_folder: PathBuf::from("./evidence"),
            prefix: "vcenter-evidence".to_string(),
        }
    }
}

impl AuditSettings {
    /// Read settings from a YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read settings file {}: {}", path.display(), e))
        })?;
        Ok(serde_yaml::from_str(&text)?)
    }

    /// Defaults, overlaid with the file (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        settings.apply_env(std::env::vars())?;
        Ok(settings)
    }

    /// Apply `VCEVIDENCE_*` overrides from the given variables.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "DAYS_BACK" => self.days_back = parse_env(&name, &value)?,
                "DATASTORE_MIN_FREE_PCT" => {
                    self.datastore_min_free_pct = parse_env(&name, &value)?
                }
                "SNAPSHOT_MAX_AGE_DAYS" => self.snapshot_max_age_days = parse_env(&name, &value)?,
                "MAX_EVENT_SAMPLES" => self.max_event_samples = parse_env(&name, &value)?,
                "EXPORT" => self.export = parse_flag(&name, &value)?,
                "OUT_FOLDER" => self.out_folder = PathBuf::from(value),
                "PREFIX" => self.prefix = value,
                _ => continue,
            }
            debug!("Setting overridden by {}", name);
        }
        Ok(())
    }

    /// Overlay command-line values, the highest-precedence layer.
    pub fn apply_overrides(&mut self, overrides: SettingsOverrides) {
        if let Some(days) = overrides.days_back {
            self.days_back = days;
        }
        if let Some(pct) = overrides.datastore_min_free_pct {
            self.datastore_min_free_pct = pct;
        }
        if let Some(days) = overrides.snapshot_max_age_days {
            self.snapshot_max_age_days = days;
        }
        if let Some(max) = overrides.max_event_samples {
            self.max_event_samples = max;
        }
        if overrides.export {
            self.export = true;
        }
        if let Some(folder) = overrides.out_folder {
            self.out_folder = folder;
        }
        if let Some(prefix) = overrides.prefix {
            self.prefix = prefix;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.days_back) {
            return Err(Error::Config(format!(
                "days_back must be between 1 and {}, got {}",
                MAX_WINDOW_DAYS, self.days_back
            )));
        }
        if self.snapshot_max_age_days > MAX_WINDOW_DAYS {
            return Err(Error::Config(format!(
                "snapshot_max_age_days must be at most {}, got {}",
                MAX_WINDOW_DAYS, self.snapshot_max_age_days
            )));
        }
        if !(0.0..=100.0).contains(&self.datastore_min_free_pct) {
            return Err(Error::Config(format!(
                "datastore_min_free_pct must be between 0 and 100, got {}",
                self.datastore_min_free_pct
            )));
        }
        if self.max_event_samples == 0 {
            return Err(Error::Config(
                "max_event_samples must be greater than 0".to_string(),
            ));
        }
        if self.prefix.trim().is_empty() {
            return Err(Error::Config("prefix must not be empty".to_string()));
        }
        Ok(())
    }

    /// Commented YAML rendering of these settings. Credentials are not
    /// part of the settings, so nothing secret can end up in the output.
    pub fn to_template(&self) -> Result<String> {
        Ok(format!("{}\n{}", TEMPLATE_HEADER, serde_yaml::to_string(self)?))
    }

    /// Write [`Self::to_template`] to `path`, creating parent directories.
    pub fn write_template(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_template()?)?;
        debug!("Settings template written to {}", path.display());
        Ok(())
    }

    /// One-line rendering for the evidence window record.
    pub fn describe(&self) -> String {
        format!(
            "DaysBack={}; DatastoreMinFreePct={}; SnapshotMaxAgeDays={}; MaxEventSamples={}",
            self.days_back,
            self.datastore_min_free_pct,
            self.snapshot_max_age_days,
            self.max_event_samples
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {}={}: {}", name, value, e)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("Invalid {}={}", name, value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = AuditSettings::default();
        assert_eq!(settings.days_back, 30);
        assert_eq!(settings.max_event_samples, 5000);
        assert_eq!(settings.prefix, "vcenter-evidence");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "days_back: 7\ndatastore_min_free_pct: 20\nprefix: lab").unwrap();

        let mut settings = AuditSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.days_back, 7);
        assert_eq!(settings.snapshot_max_age_days, 14);

        settings
            .apply_env(env(&[
                ("VCEVIDENCE_DAYS_BACK", "3"),
                ("VCEVIDENCE_EXPORT", "true"),
                ("HOME", "/root"),
            ]))
            .unwrap();
        assert_eq!(settings.days_back, 3);
        assert!(settings.export);
        assert_eq!(settings.datastore_min_free_pct, 20.0);
        assert_eq!(settings.prefix, "lab");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut settings = AuditSettings::default();
        let err = settings
            .apply_env(env(&[("VCEVIDENCE_MAX_EVENT_SAMPLES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut settings = AuditSettings {
            days_back: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        settings.days_back = 30;
        settings.datastore_min_free_pct = 120.0;
        assert!(settings.validate().is_err());

        settings.datastore_min_free_pct = 15.0;
        settings.max_event_samples = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_window_lengths() {
        let mut settings = AuditSettings {
            days_back: u32::MAX,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        settings.days_back = MAX_WINDOW_DAYS;
        assert!(settings.validate().is_ok());

        settings.snapshot_max_age_days = MAX_WINDOW_DAYS + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_overrides_beat_env_and_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "days_back: 7\nsnapshot_max_age_days: 21\nprefix: lab").unwrap();

        let mut settings = AuditSettings::from_file(file.path()).unwrap();
        settings
            .apply_env(env(&[
                ("VCEVIDENCE_DAYS_BACK", "3"),
                ("VCEVIDENCE_PREFIX", "env"),
            ]))
            .unwrap();
        settings.apply_overrides(SettingsOverrides {
            days_back: Some(1),
            export: true,
            ..Default::default()
        });

        assert_eq!(settings.days_back, 1);
        assert_eq!(settings.prefix, "env");
        assert_eq!(settings.snapshot_max_age_days, 21);
        assert!(settings.export);
        assert_eq!(settings.max_event_samples, 5000);
    }

    #[test]
    fn test_unset_overrides_keep_lower_layers() {
        let mut settings = AuditSettings {
            export: true,
            ..Default::default()
        };
        let before = settings.clone();
        settings.apply_overrides(SettingsOverrides::default());
        assert_eq!(settings, before);
    }

    #[test]
    fn test_template_round_trips_and_omits_password() {
        let mut settings = AuditSettings::default();
        settings
            .apply_env(env(&[(PASSWORD_ENV, "hunter2"), ("VCEVIDENCE_DAYS_BACK", "9")]))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("vcevidence.yaml");
        settings.write_template(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# vcevidence settings"));
        assert!(!text.contains("hunter2"));
        assert_eq!(AuditSettings::from_file(&path).unwrap(), settings);
    }
}
