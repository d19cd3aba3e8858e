use std::path::Path;

use crate::config::schema::Settings;
use crate::error::ConfigError;

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_str(content)?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", settings.version),
        });
    }

    if settings.max_concurrent_runs == 0 {
        return Err(ConfigError::Validation {
            message: "max_concurrent_runs must be greater than 0".to_string(),
        });
    }

    if settings.queue_poll_interval_ms == 0 {
        return Err(ConfigError::Validation {
            message: "queue_poll_interval_ms must be greater than 0".to_string(),
        });
    }

    if !(0.0..1.0).contains(&settings.enhance_progress_offset) {
        return Err(ConfigError::Validation {
            message: format!(
                "enhance_progress_offset must be in [0, 1), got {}",
                settings.enhance_progress_offset
            ),
        });
    }

    let services = [
        ("polish", Some(&settings.polish)),
        ("enhance", Some(&settings.enhance)),
        ("emotion", settings.emotion.as_ref()),
        ("compression", Some(&settings.compression)),
    ];
    for (name, service) in services
        .into_iter()
        .filter_map(|(name, service)| service.map(|s| (name, s)))
    {
        if service.model.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} service model must not be empty", name),
            });
        }
    }

    Ok(())
}
