use crate::config::types::{Config, CrawlSettings, StopConditions, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Wikis with more than a million articles, as (language code, display name)
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("ceb", "Cebuano"),
    ("sv", "Swedish - Svenska"),
    ("de", "German - Deutsch"),
    ("fr", "French - Français"),
    ("nl", "Dutch - Nederlands"),
    ("ru", "Russian - Pусский"),
    ("it", "Italian - Italiano"),
    ("es", "Spanish - Español"),
    ("pl", "Polish - Polski"),
    ("war", "Waray - Winaray"),
    ("vi", "Vietnamese - Tiếng Việt"),
    ("ja", "Japanese - 日本語"),
    ("zh", "Chinese - 中文"),
    ("pt", "Portuguese - Português"),
];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_settings(&config.crawl)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates the parameters of a crawl session
///
/// The controller runs this again on every `start`.
pub fn validate_settings(settings: &CrawlSettings) -> Result<(), ConfigError> {
    if !SUPPORTED_LANGUAGES
        .iter()
        .any(|(code, _)| *code == settings.language)
    {
        return Err(ConfigError::UnsupportedLanguage(settings.language.clone()));
    }

    if !settings.delay_seconds.is_finite() || settings.delay_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-seconds must be a non-negative number, got {}",
            settings.delay_seconds
        )));
    }

    if let Some(title) = &settings.start_title {
        if title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "start-title cannot be empty (omit it to pick a random page)".to_string(),
            ));
        }
    }

    validate_stop_conditions(&settings.stop)
}

fn validate_stop_conditions(stop: &StopConditions) -> Result<(), ConfigError> {
    if let Some(title) = &stop.reach_page {
        if title.trim().is_empty() {
            return Err(ConfigError::Validation(
                "reach-page cannot be empty".to_string(),
            ));
        }
    }

    if let Some(max_page) = stop.max_page {
        if max_page < 1 {
            return Err(ConfigError::Validation(format!(
                "max-page must be >= 1, got {}",
                max_page
            )));
        }
    }

    if let Some(limit) = stop.time_limit_seconds {
        if !limit.is_finite() || limit <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "time-limit-seconds must be a positive number, got {}",
                limit
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    // Validate contact URL
    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    // Validate contact email (basic validation)
    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation: one '@' with a non-empty local part and a dotted domain
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ConfigError::Validation(format!(
            "Invalid contact_email: '{}'",
            email
        )));
    }

    Ok(())
}
