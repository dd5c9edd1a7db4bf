use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SiteEntry, SnapshotConfig, UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_snapshot_config(&config.snapshot)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.max_requests_per_host < 1 {
        return Err(ConfigError::Validation(format!(
            "max_requests_per_host must be >= 1, got {}",
            config.max_requests_per_host
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be > 0ms".to_string(),
        ));
    }

    if config.max_redirects > 50 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 50, got {}",
            config.max_redirects
        )));
    }

    if config.max_path_length < 32 {
        return Err(ConfigError::Validation(format!(
            "max_path_length must be >= 32, got {}",
            config.max_path_length
        )));
    }

    if config.max_urls == Some(0) {
        return Err(ConfigError::Validation(
            "max_urls must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "retry max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.backoff_multiplier < 1 || config.backoff_multiplier > 10 {
        return Err(ConfigError::Validation(format!(
            "retry backoff_multiplier must be between 1 and 10, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_backoff < config.initial_backoff {
        return Err(ConfigError::Validation(format!(
            "retry max_backoff ({}ms) must be >= initial_backoff ({}ms)",
            config.max_backoff, config.initial_backoff
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_snapshot_config(config: &SnapshotConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.retention_days < 1 {
        return Err(ConfigError::Validation(
            "retention_days must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("csv_dir", &config.csv_dir),
        ("report_path", &config.report_path),
        ("delta_path", &config.delta_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates site entries: regions, seeds and boundary patterns
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    if sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] must be configured".to_string(),
        ));
    }

    let mut regions = HashSet::new();
    for site in sites {
        validate_region(&site.region)?;
        if !regions.insert(site.region.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site region '{}'",
                site.region
            )));
        }

        let seed = Url::parse(&site.seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", site.seed, e))
        })?;

        if seed.scheme() != "https" && seed.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                site.seed
            )));
        }

        if seed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                site.seed
            )));
        }

        for pattern in &site.domains {
            validate_domain_pattern(pattern)?;
        }

        if site.exclude.iter().any(|pattern| pattern.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "Site '{}' has an empty exclude pattern",
                site.region
            )));
        }
    }

    Ok(())
}

/// Regions are short upper-case alphanumeric codes (AU, NZ, UK1)
fn validate_region(region: &str) -> Result<(), ConfigError> {
    if region.is_empty()
        || !region
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ConfigError::Validation(format!(
            "region must be upper-case alphanumeric, got '{}'",
            region
        )));
    }
    Ok(())
}

/// Validates a boundary pattern: `example.com` or `*.example.com`
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    let invalid = |reason: &str| {
        ConfigError::InvalidPattern(format!("Domain pattern '{}' {}", pattern, reason))
    };

    if domain.is_empty() {
        return Err(invalid("is empty"));
    }

    // localhost-style names are allowed so mock servers can be targeted
    if !domain.contains('.') && domain != "localhost" {
        return Err(invalid("needs at least one dot (e.g., 'example.com')"));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(invalid("has an empty label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(invalid("has a label starting or ending with '-'"));
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(invalid("contains invalid characters"));
        }
    }

    Ok(())
}

/// Requires `local@domain.tld`
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

    if valid {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!(
            "Invalid contact_email: '{}'",
            email
        )))
    }
}
