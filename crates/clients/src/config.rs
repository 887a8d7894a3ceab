//! Session configuration loaded from environment variables.

use std::time::Duration;

use wayfare_core::service_request::DEFAULT_EXPIRES_IN_HOURS;

/// Tunables for one wizard session and its collaborator clients.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Back-office API root (default: `http://localhost:8000/api`).
    pub api_url: String,
    /// Per-request HTTP timeout (default: 15 s).
    pub request_timeout: Duration,
    /// Autosave timer cadence (default: 30 s).
    pub autosave_interval: Duration,
    /// Window in which critical-field blur saves are coalesced (default: 1 s).
    pub critical_save_debounce: Duration,
    /// Client-side catalog page size (default: 10).
    pub catalog_page_size: usize,
    /// Maximum catalog records fetched per browse (default: 200).
    pub catalog_search_limit: usize,
    /// Step 2 requires at least one itinerary activity (default: true).
    pub require_activities: bool,
    /// Validity window for new service requests (default: 48 h).
    pub service_request_expiry_hours: u32,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".into(),
            request_timeout: Duration::from_secs(15),
            autosave_interval: Duration::from_secs(30),
            critical_save_debounce: Duration::from_millis(1000),
            catalog_page_size: 10,
            catalog_search_limit: 200,
            require_activities: true,
            service_request_expiry_hours: DEFAULT_EXPIRES_IN_HOURS,
        }
    }
}

impl WizardConfig {
    /// Load configuration from the environment (and `.env`, if present).
    ///
    /// | Env Var                                | Default                     |
    /// |----------------------------------------|-----------------------------|
    /// | `WAYFARE_API_URL`                      | `http://localhost:8000/api` |
    /// | `WAYFARE_REQUEST_TIMEOUT_SECS`         | `15`                        |
    /// | `WAYFARE_AUTOSAVE_INTERVAL_SECS`       | `30`                        |
    /// | `WAYFARE_CRITICAL_SAVE_DEBOUNCE_MS`    | `1000`                      |
    /// | `WAYFARE_CATALOG_PAGE_SIZE`            | `10`                        |
    /// | `WAYFARE_CATALOG_SEARCH_LIMIT`         | `200`                       |
    /// | `WAYFARE_REQUIRE_ACTIVITIES`           | `true`                      |
    /// | `WAYFARE_SERVICE_REQUEST_EXPIRY_HOURS` | `48`                        |
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Used by [`from_env`](Self::from_env)
    /// and by tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let api_url = lookup("WAYFARE_API_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.api_url);

        Self {
            api_url,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "WAYFARE_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            autosave_interval: Duration::from_secs(non_zero_or(
                parse_or(
                    &lookup,
                    "WAYFARE_AUTOSAVE_INTERVAL_SECS",
                    defaults.autosave_interval.as_secs(),
                ),
                "WAYFARE_AUTOSAVE_INTERVAL_SECS",
                defaults.autosave_interval.as_secs(),
            )),
            critical_save_debounce: Duration::from_millis(parse_or(
                &lookup,
                "WAYFARE_CRITICAL_SAVE_DEBOUNCE_MS",
                defaults.critical_save_debounce.as_millis() as u64,
            )),
            catalog_page_size: parse_or(
                &lookup,
                "WAYFARE_CATALOG_PAGE_SIZE",
                defaults.catalog_page_size,
            )
            .max(1),
            catalog_search_limit: parse_or(
                &lookup,
                "WAYFARE_CATALOG_SEARCH_LIMIT",
                defaults.catalog_search_limit,
            ),
            require_activities: parse_or(
                &lookup,
                "WAYFARE_REQUIRE_ACTIVITIES",
                defaults.require_activities,
            ),
            service_request_expiry_hours: parse_or(
                &lookup,
                "WAYFARE_SERVICE_REQUEST_EXPIRY_HOURS",
                defaults.service_request_expiry_hours,
            ),
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
    }
}

fn non_zero_or(value: u64, key: &str, default: u64) -> u64 {
    if value == 0 {
        tracing::warn!(key, "Configuration value must be non-zero, using default");
        default
    } else {
        value
    }
}
