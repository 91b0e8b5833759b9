use super::{
    types::{Config, SearcherBackend},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - search.max_results and search.concurrency are at least 1
/// - search.min_score is a similarity (0-100)
/// - the YouTube API backend has a non-empty api key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.search.max_results == 0 {
        return Err(ConfigError::ValidationError(
            "search.max_results must be at least 1".to_string(),
        ));
    }

    if config.search.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "search.concurrency must be at least 1".to_string(),
        ));
    }

    if config.search.channel_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "search.channel_capacity must be at least 1".to_string(),
        ));
    }

    if config.search.min_score > 100 {
        return Err(ConfigError::ValidationError(format!(
            "search.min_score must be between 0 and 100, got {}",
            config.search.min_score
        )));
    }

    if config.search.backend == SearcherBackend::YoutubeApi {
        match &config.youtube {
            Some(youtube) if !youtube.api_key.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "youtube.api_key is required when search.backend = \"youtube_api\""
                        .to_string(),
                ))
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YouTubeConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_max_results_fails() {
        let mut config = Config::default();
        config.search.max_results = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.search.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_min_score_out_of_range() {
        let mut config = Config::default();
        config.search.min_score = 101;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_youtube_backend_requires_key() {
        let mut config = Config::default();
        config.search.backend = SearcherBackend::YoutubeApi;
        assert!(validate_config(&config).is_err());

        config.youtube = Some(YouTubeConfig {
            api_key: "   ".to_string(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            timeout_secs: 30,
        });
        assert!(validate_config(&config).is_err());

        config.youtube.as_mut().unwrap().api_key = "key".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
