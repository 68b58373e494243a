//! Environment handling: `.env` loading and required startup values.

use super::ConfigError;
use std::env;
use tracing::{debug, warn};

/// Load environment variables from a `.env` file in the current directory.
///
/// A missing file is fine; a file that exists but cannot be parsed is logged
/// and otherwise ignored.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded environment from .env"),
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, "failed to load .env file"),
    }
}

/// Read a required, non-blank environment variable.
pub fn require_env(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnv {
            name: name.to_string(),
        }),
    }
}

/// Read an optional environment variable, treating blank values as unset.
pub fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvGuard {
        key: &'static str,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            unsafe {
                env::set_var(key, value);
            }
            Self { key }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            unsafe {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn require_env_rejects_blank_values() {
        let _guard = EnvGuard::set("MEMCHAT_TEST_BLANK_PROJECT", "   ");
        let err = require_env("MEMCHAT_TEST_BLANK_PROJECT").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv { ref name } if name == "MEMCHAT_TEST_BLANK_PROJECT"));
    }

    #[test]
    fn require_env_trims_value() {
        let _guard = EnvGuard::set("MEMCHAT_TEST_PROJECT", " demo-project \n");
        assert_eq!(require_env("MEMCHAT_TEST_PROJECT").unwrap(), "demo-project");
    }

    #[test]
    fn optional_env_ignores_missing() {
        assert_eq!(optional_env("MEMCHAT_TEST_DEFINITELY_UNSET"), None);
    }
}
