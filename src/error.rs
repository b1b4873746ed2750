use std::path::PathBuf;

/// Errors raised while turning raw options into a run. All of them are
/// detected before any environment or network is built.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no environment given: set either env_name or env_problem_name")]
    MissingEnvironment,

    #[error("both env_name ({env_name}) and env_problem_name ({env_problem_name}) are set; use only one")]
    ConflictingEnvironments {
        env_name: String,
        env_problem_name: String,
    },

    #[error("config validation error: {0}")]
    Validation(String),

    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// A seed string that is not an integer. The resolver recovers from this by
/// running without an explicit seed.
#[derive(Debug, thiserror::Error)]
pub enum SeedParseError {
    #[error("no random seed given")]
    Unset,

    #[error("random seed {raw:?} is not an integer: {source}")]
    NotAnInteger {
        raw: String,
        source: std::num::ParseIntError,
    },
}

/// Errors raised by environment construction.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("batch size for '{name}' must be > 0")]
    InvalidBatchSize { name: String },

    #[error("image networks need [height, width, channels] observations, {name} has {shape:?}")]
    NotFrameObservations { name: String, shape: Vec<usize> },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by a training loop. The resolver never interprets these;
/// they surface unchanged at the process boundary.
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("{network} produced a non-finite output with debug_nans enabled")]
    NonFinite { network: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("training failed: {0}")]
    Other(String),
}

/// Everything that can stop a run from being assembled.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Env(#[from] EnvError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_environment_display() {
        let err = ConfigError::MissingEnvironment;
        assert_eq!(
            err.to_string(),
            "no environment given: set either env_name or env_problem_name"
        );
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation("learning_rate must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: learning_rate must be > 0"
        );
    }

    #[test]
    fn test_env_error_wraps_config_error() {
        let err: EnvError = ConfigError::MissingEnvironment.into();
        assert!(matches!(err, EnvError::Config(ConfigError::MissingEnvironment)));
        assert_eq!(err.to_string(), ConfigError::MissingEnvironment.to_string());
    }

    #[test]
    fn test_not_frame_observations_display() {
        let err = EnvError::NotFrameObservations {
            name: "ALE/Pong-v5".to_string(),
            shape: vec![4],
        };
        assert_eq!(
            err.to_string(),
            "image networks need [height, width, channels] observations, ALE/Pong-v5 has [4]"
        );
    }

    #[test]
    fn test_trainer_error_display() {
        let err = TrainerError::NonFinite {
            network: "policy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "policy produced a non-finite output with debug_nans enabled"
        );
    }
}
