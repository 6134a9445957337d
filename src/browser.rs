#[derive(Debug, thiserror::Error)]
#[error("could not open {url} in a browser: {source}")]
pub(crate) struct LaunchError {
    pub(crate) url: String,
    #[source]
    pub(crate) source: std::io::Error,
}

/// Opens a url in whatever handles urls on this machine.
pub(crate) trait Browser {
    fn open(&self, url: &str) -> Result<(), LaunchError>;
}

/// Hands the url to the OS default handler (`open` on macOS, `xdg-open` and
/// friends on Linux, `start` on Windows).
#[derive(Debug, Default)]
pub(crate) struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), LaunchError> {
        tracing::info!(url = url, "Opening in browser");
        open::that(url).map_err(|source| LaunchError {
            url: url.to_string(),
            source,
        })
    }
}

/// Discussion page for an item.
pub(crate) fn item_page_url(id: u64) -> String {
    format!("{}{}", crate::config::config().item_page_url, id)
}
