use reynard_core::speech::VoiceSettings;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub chat_endpoint: String,
    pub data_dir: PathBuf,
    pub wake_token: String,
    pub voice: VoiceSettings,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let chat_endpoint = std::env::var("CHAT_ENDPOINT")
            .unwrap_or_else(|_| "http://127.0.0.1:8787/api/chat".to_string());

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let wake_token = std::env::var("WAKE_TOKEN").unwrap_or_else(|_| "reynard".to_string());

        let defaults = VoiceSettings::default();
        let voice = VoiceSettings {
            locale: std::env::var("VOICE_LOCALE").unwrap_or(defaults.locale),
            rate: parse_f32("VOICE_RATE", defaults.rate)?,
            pitch: parse_f32("VOICE_PITCH", defaults.pitch)?,
        };

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            chat_endpoint,
            data_dir,
            wake_token,
            voice,
            log_level,
        })
    }
}

fn parse_f32(var: &str, default: f32) -> Result<f32, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse::<f32>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("CHAT_ENDPOINT");
            env::remove_var("DATA_DIR");
            env::remove_var("WAKE_TOKEN");
            env::remove_var("VOICE_LOCALE");
            env::remove_var("VOICE_RATE");
            env::remove_var("VOICE_PITCH");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.chat_endpoint, "http://127.0.0.1:8787/api/chat");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.wake_token, "reynard");
        assert_eq!(config.voice, VoiceSettings::default());
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("CHAT_ENDPOINT", "http://10.0.0.5:9000/chat");
            env::set_var("DATA_DIR", "/var/lib/reynard");
            env::set_var("WAKE_TOKEN", "fox");
            env::set_var("VOICE_LOCALE", "ar-SA");
            env::set_var("VOICE_RATE", "0.95");
            env::set_var("VOICE_PITCH", "1.2");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.chat_endpoint, "http://10.0.0.5:9000/chat");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/reynard"));
        assert_eq!(config.wake_token, "fox");
        assert_eq!(config.voice.locale, "ar-SA");
        assert_eq!(config.voice.rate, 0.95);
        assert_eq!(config.voice.pitch, 1.2);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_invalid_voice_rate() {
        clear_env_vars();
        unsafe {
            env::set_var("VOICE_RATE", "fast");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "VOICE_RATE"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
        }
    }
}
