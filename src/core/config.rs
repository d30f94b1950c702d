use std::collections::HashSet;
use std::env;
use std::fmt;
use std::str::FromStr;

use super::models::UserId;

pub const MIN_ALLOWED_COOLDOWN: f64 = 0.5;
pub const MAX_ALLOWED_COOLDOWN: f64 = 3600.0;
pub const MAX_ALLOWED_SPAM_COUNT: u32 = 5000;

const DEFAULT_MIN_COOLDOWN: f64 = 1.0;
const DEFAULT_MAX_COOLDOWN: f64 = 3.0;
const DEFAULT_SPAM_COUNT: u32 = 100;
const DEFAULT_MAX_SPAM_COUNT: u32 = 1000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_user_token: String,
    pub slack_app_token: String,
    pub admin_ids: HashSet<UserId>,
    pub min_cooldown: f64,
    pub max_cooldown: f64,
    pub default_spam_count: u32,
    pub max_spam_count: u32,
    pub allow_parallel_commands: bool,
    pub debug_mode: bool,
}

/// Every problem found while loading configuration, reported together so the
/// operator can fix them in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub problems: Vec<String>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration errors found:")?;
        for problem in &self.problems {
            writeln!(f, "  - {problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// # Errors
    ///
    /// Returns every configuration problem found in the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] listing all missing or out-of-policy values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut problems = Vec::new();

        let slack_user_token = required(&lookup, "SLACK_USER_TOKEN", &mut problems);
        let slack_app_token = required(&lookup, "SLACK_APP_TOKEN", &mut problems);

        let admin_ids = lookup("ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default();
        if admin_ids.is_empty() {
            problems.push("ADMIN_IDS is not set or invalid".to_string());
        }

        let min_cooldown = parsed(&lookup, "MIN_COOLDOWN", DEFAULT_MIN_COOLDOWN, &mut problems);
        let max_cooldown = parsed(&lookup, "MAX_COOLDOWN", DEFAULT_MAX_COOLDOWN, &mut problems);
        let default_spam_count =
            parsed(&lookup, "DEFAULT_SPAM_COUNT", DEFAULT_SPAM_COUNT, &mut problems);
        let max_spam_count = parsed(&lookup, "MAX_SPAM_COUNT", DEFAULT_MAX_SPAM_COUNT, &mut problems);

        for (key, value) in [("MIN_COOLDOWN", min_cooldown), ("MAX_COOLDOWN", max_cooldown)] {
            if !value.is_finite() {
                problems.push(format!("{key} must be a finite number of seconds"));
            } else if value > MAX_ALLOWED_COOLDOWN {
                problems.push(format!(
                    "{key} is too high (maximum {MAX_ALLOWED_COOLDOWN} seconds)"
                ));
            }
        }
        if min_cooldown < MIN_ALLOWED_COOLDOWN {
            problems.push(format!(
                "MIN_COOLDOWN is too low (minimum {MIN_ALLOWED_COOLDOWN} seconds)"
            ));
        }
        if min_cooldown.is_finite() && max_cooldown.is_finite() && max_cooldown < min_cooldown {
            problems.push("MAX_COOLDOWN must not be lower than MIN_COOLDOWN".to_string());
        }
        if max_spam_count > MAX_ALLOWED_SPAM_COUNT {
            problems.push(format!(
                "MAX_SPAM_COUNT is too high (maximum {MAX_ALLOWED_SPAM_COUNT})"
            ));
        }
        if default_spam_count > max_spam_count {
            problems.push("DEFAULT_SPAM_COUNT must not exceed MAX_SPAM_COUNT".to_string());
        }

        if !problems.is_empty() {
            return Err(ConfigError { problems });
        }

        Ok(Self {
            slack_user_token,
            slack_app_token,
            admin_ids,
            min_cooldown,
            max_cooldown,
            default_spam_count,
            max_spam_count,
            allow_parallel_commands: flag(&lookup, "ALLOW_PARALLEL_COMMANDS"),
            debug_mode: flag(&lookup, "DEBUG_MODE"),
        })
    }

    /// Startup banner lines, with credentials masked.
    #[must_use]
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("User token: {}", mask(&self.slack_user_token)),
            format!("App token: {}", mask(&self.slack_app_token)),
            format!("Admin IDs: {} admin(s)", self.admin_ids.len()),
            format!("Cooldown: {}-{}s", self.min_cooldown, self.max_cooldown),
            format!("Default spam: {} messages", self.default_spam_count),
            format!("Max spam: {} messages", self.max_spam_count),
            format!("Parallel commands: {}", self.allow_parallel_commands),
            format!("Debug mode: {}", self.debug_mode),
        ]
    }
}

/// Parse a comma-separated id list, dropping blank and malformed entries.
#[must_use]
pub fn parse_admin_ids(raw: &str) -> HashSet<UserId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(UserId::new)
        .collect()
}

/// Truthy values: `true`, `yes`, `1`, `on`, `y` (case-insensitive).
#[must_use]
pub fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "on" | "y"
    )
}

fn required<F>(lookup: &F, key: &str, problems: &mut Vec<String>) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value,
        None => {
            problems.push(format!("{key} is not set"));
            String::new()
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T, problems: &mut Vec<String>) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().unwrap_or_else(|_| {
            problems.push(format!("{key} has an invalid value: {raw}"));
            default
        }),
        _ => default,
    }
}

fn flag<F>(lookup: &F, key: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).is_some_and(|raw| parse_flag(&raw))
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "NOT SET".to_string()
    } else {
        "*".repeat(8)
    }
}
