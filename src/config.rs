#[derive(Debug)]
pub(crate) struct Config {
    pub(crate) api_base_url: String,
    pub(crate) item_page_url: String,
    pub(crate) request_timeout: std::time::Duration,
    pub(crate) max_concurrent_fetches: usize,

    pub(crate) log_dir: String,
    pub(crate) log_to_console: bool,

    // Set when a .env file exists but could not be loaded. Logged once tracing is up.
    pub(crate) env_file_error: Option<String>,
}

pub(crate) static CONFIG: std::sync::LazyLock<Config> = std::sync::LazyLock::new(|| {
    let env_file_error = env_file_error(dotenvy::dotenv());

    Config {
        api_base_url: var_or("HN_API_BASE_URL", "https://hacker-news.firebaseio.com/v0"),
        item_page_url: var_or("HN_ITEM_PAGE_URL", "https://news.ycombinator.com/item?id="),
        request_timeout: std::time::Duration::from_secs(parse_or("HN_REQUEST_TIMEOUT_SECS", 10)),
        max_concurrent_fetches: parse_or("HN_MAX_CONCURRENT_FETCHES", 30).max(1),
        log_dir: var_or("LOG_DIR", "./log"),
        log_to_console: parse_or("LOG_TO_CONSOLE", false),
        env_file_error,
    }
});

pub(crate) fn config() -> &'static Config {
    &CONFIG
}

/// The .env file is optional, every key has a default. Only a missing file is fine.
fn env_file_error(result: Result<std::path::PathBuf, dotenvy::Error>) -> Option<String> {
    match result {
        Ok(_) => None,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => Some(e.to_string()),
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
