// Import necessary crates and modules
use keyring::Entry;
use serde::{Deserialize, Serialize};

use crate::error::GradingError;

/// Default base URL of the generative-AI service.
const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Structure to hold the generative-AI service credential.
///
/// The grading service requires a single API key; the base URL is only
/// overridden in tests or when routing through a proxy.
///
/// Fields:
/// - `api_url`: Base URL for the generative-AI API.
/// - `api_key`: API key for authentication.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct GeminiCredentials {
    pub api_url: String,
    pub api_key: String,
}

// Enum to represent the source of the loaded credential.
enum CredentialSource {
    None,                             // No credential available
    EnvVariables(GeminiCredentials),  // Credential loaded from environment variables
    SystemKeyring(GeminiCredentials), // Credential loaded from the system's keyring
}

impl GeminiCredentials {
    /// Builds credentials for the default API endpoint from a raw key.
    pub fn new(api_key: impl Into<String>) -> GeminiCredentials {
        GeminiCredentials {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Loads the credential from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; `GEMINI_API_URL` optionally overrides the
    /// default endpoint.
    ///
    /// Returns:
    /// - `Ok(GeminiCredentials)`: Credential assembled from the environment.
    /// - `Err(String)`: Error message if the key variable is missing.
    pub fn load_from_env() -> Result<GeminiCredentials, String> {
        match std::env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => {
                let url = std::env::var("GEMINI_API_URL")
                    .unwrap_or_else(|_| DEFAULT_API_URL.to_string());
                Ok(GeminiCredentials {
                    api_url: url,
                    api_key: key,
                })
            }
            Ok(_) => Err("GEMINI_API_KEY is set but empty".to_string()),
            Err(_) => Err("GEMINI_API_KEY not set".to_string()),
        }
    }

    /// Loads the credential from the system's keyring.
    ///
    /// Returns:
    /// - `Ok(GeminiCredentials)`: Credential retrieved from the keyring.
    /// - `Err(String)`: Error message if the keyring entry is missing or
    ///   inaccessible.
    pub fn load_from_system() -> Result<GeminiCredentials, String> {
        let app_name = env!("CARGO_PKG_NAME");
        match Entry::new(app_name, "GEMINI_API_KEY") {
            Ok(entry) => match entry.get_password() {
                Ok(key) => Ok(GeminiCredentials::new(key)),
                Err(_) => Err("Error retrieving API key from system keyring".to_string()),
            },
            Err(_) => Err("Error accessing system keyring".to_string()),
        }
    }

    /// Stores the API key in the system's keyring.
    ///
    /// Returns:
    /// - `Ok(())`: Key stored.
    /// - `Err(String)`: Error message if the keyring rejected the write.
    pub fn store_in_system(api_key: &str) -> Result<(), String> {
        let app_name = env!("CARGO_PKG_NAME");
        match Entry::new(app_name, "GEMINI_API_KEY") {
            Ok(entry) => entry
                .set_password(api_key)
                .map_err(|e| format!("Error saving API key: {}", e)),
            Err(e) => Err(format!("Error accessing system keyring: {}", e)),
        }
    }

    /// Loads the credential, attempting first the environment, then the
    /// system's keyring.
    fn load() -> CredentialSource {
        match Self::load_from_env() {
            Ok(credentials) => CredentialSource::EnvVariables(credentials),
            Err(_) => match Self::load_from_system() {
                Ok(credentials) => CredentialSource::SystemKeyring(credentials),
                Err(_) => CredentialSource::None,
            },
        }
    }

    /// Retrieves the credential from any configured source.
    ///
    /// This is the primary interface for obtaining the grading-service
    /// credential. Absence of a credential is a `GradingError::Config`, which
    /// callers must surface before attempting any network call. This function
    /// never prompts interactively; registering a key is the embedding
    /// application's concern (see [`GeminiCredentials::store_in_system`]).
    ///
    /// Returns:
    /// - `Ok(GeminiCredentials)`: The credential with URL and key.
    /// - `Err(GradingError::Config)`: No credential configured anywhere.
    pub fn credentials() -> Result<GeminiCredentials, GradingError> {
        match Self::load() {
            CredentialSource::EnvVariables(credentials) => {
                log::debug!("credentials loaded from environment");
                Ok(credentials)
            }
            CredentialSource::SystemKeyring(credentials) => {
                log::debug!("credentials loaded from system keyring");
                Ok(credentials)
            }
            CredentialSource::None => Err(GradingError::Config(
                "no API key in GEMINI_API_KEY or system keyring".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_initialization() {
        let credentials = GeminiCredentials::new("secret-key");

        assert_eq!(credentials.api_url, DEFAULT_API_URL);
        assert_eq!(credentials.api_key, "secret-key");
    }

    #[test]
    fn test_load_credentials_from_env() {
        use std::collections::HashMap;
        use std::env;

        let mut saved: HashMap<String, String> = HashMap::new();
        fn set_new_key(saved: &mut HashMap<String, String>, key: &str, value: &str) {
            if let Ok(value) = env::var(key) {
                saved.insert(key.to_string(), value);
            }
            env::set_var(key, value);
        }

        fn restore_key(saved: &HashMap<String, String>, key: &str) {
            if let Some(value) = saved.get(key) {
                env::set_var(key, value);
            } else {
                env::remove_var(key);
            }
        }

        let key_var = "GEMINI_API_KEY";
        let url_var = "GEMINI_API_URL";

        set_new_key(&mut saved, key_var, "secret-key");
        set_new_key(&mut saved, url_var, "https://example.com/v1beta");

        // Both key and URL override set
        let with_url = GeminiCredentials::load_from_env();

        // Key only: falls back to the default endpoint
        env::remove_var(url_var);
        let key_only = GeminiCredentials::load_from_env();

        // Empty key is rejected
        env::set_var(key_var, "");
        let empty_key = GeminiCredentials::load_from_env();

        // No key at all
        env::remove_var(key_var);
        let no_key = GeminiCredentials::load_from_env();

        restore_key(&saved, key_var);
        restore_key(&saved, url_var);

        let with_url = with_url.expect("key + url should load");
        assert_eq!(with_url.api_url, "https://example.com/v1beta");
        assert_eq!(with_url.api_key, "secret-key");

        let key_only = key_only.expect("key alone should load");
        assert_eq!(key_only.api_url, DEFAULT_API_URL);

        assert!(empty_key.is_err());
        assert!(no_key.is_err());
    }
}
