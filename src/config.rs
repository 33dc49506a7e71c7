use secrecy::SecretString;
use std::env;

/// Minutes allotted to an attempt when the test definition carries no usable duration.
pub const DEFAULT_DURATION_MINUTES: u32 = 10;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: SecretString,
    pub mongo_db_name: String,
    pub tests_collection: String,
    pub results_collection: String,
    pub surveys_collection: String,
    pub responses_collection: String,
    pub jwt_secret: SecretString,
    pub default_duration_minutes: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: SecretString::from(
                env::var("MONGO_CONN_STRING")
                    .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            ),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "brainbell-local".to_string()),
            tests_collection: env::var("TESTS_COLLECTION").unwrap_or_else(|_| "tests".to_string()),
            results_collection: env::var("RESULTS_COLLECTION")
                .unwrap_or_else(|_| "results".to_string()),
            surveys_collection: env::var("SURVEYS_COLLECTION")
                .unwrap_or_else(|_| "surveys".to_string()),
            responses_collection: env::var("RESPONSES_COLLECTION")
                .unwrap_or_else(|_| "responses".to_string()),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "dev_secret_key_change_in_production".to_string()),
            ),
            default_duration_minutes: env::var("DEFAULT_DURATION_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(DEFAULT_DURATION_MINUTES),
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: SecretString::from("mongodb://localhost:27017".to_string()),
            mongo_db_name: "brainbell-test".to_string(),
            tests_collection: "tests".to_string(),
            results_collection: "results".to_string(),
            surveys_collection: "surveys".to_string(),
            responses_collection: "responses".to_string(),
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_config_from_env_with_defaults() {
        let config = Config::from_env();

        // Should use env vars if set, or fall back to defaults
        assert!(!config.mongo_conn_string.expose_secret().is_empty());
        assert!(!config.mongo_db_name.is_empty());
        assert!(!config.results_collection.is_empty());
    }

    #[test]
    fn test_test_config() {
        let config = Config::test_config();

        assert_eq!(config.mongo_db_name, "brainbell-test");
        assert_eq!(config.tests_collection, "tests");
        assert_eq!(config.default_duration_minutes, 10);
    }
}
