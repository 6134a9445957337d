/// One of the story rankings published by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Listing {
    Top,
    New,
    Best,
}

impl Listing {
    fn endpoint(self) -> &'static str {
        match self {
            Listing::Top => "topstories.json",
            Listing::New => "newstories.json",
            Listing::Best => "beststories.json",
        }
    }
}

impl std::fmt::Display for Listing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listing::Top => write!(f, "top"),
            Listing::New => write!(f, "new"),
            Listing::Best => write!(f, "best"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ItemKind {
    Story,
    Job,
    Comment,
    Poll,
    #[serde(rename = "pollopt")]
    PollOption,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub(crate) struct Record {
    pub(crate) id: u64,

    #[serde(rename = "type")]
    #[allow(unused)]
    pub(crate) kind: ItemKind,

    #[serde(rename = "by", default)]
    pub(crate) author: String,

    #[serde(rename = "time", default)]
    pub(crate) created_at: i64,

    #[serde(default)]
    pub(crate) url: Option<String>,

    #[serde(default)]
    pub(crate) score: i64,

    #[serde(default)]
    pub(crate) title: String,

    // Not included in json response. Rank within the listing, set by the page loader.
    #[serde(skip)]
    pub(crate) position: usize,
}

impl Record {
    /// Host of the linked url, `None` for self posts.
    pub(crate) fn host(&self) -> Option<String> {
        let url = self.url.as_deref().filter(|u| !u.is_empty())?;
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where page items come from. The loader only talks to this.
#[async_trait::async_trait]
pub(crate) trait ItemSource: Send + Sync {
    async fn story_ids(&self, listing: Listing) -> Result<Vec<u64>, FetchError>;

    async fn fetch(&self, id: u64) -> Result<Record, FetchError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HnClient {
    base_url: String,
    timeout: std::time::Duration,
}

impl HnClient {
    pub(crate) fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub(crate) fn from_config() -> Self {
        Self::new(
            crate::config::config().api_base_url.clone(),
            crate::config::config().request_timeout,
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, FetchError> {
        tracing::debug!(url = url.as_str(), "Requesting");
        let body = crate::CLIENT
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

#[async_trait::async_trait]
impl ItemSource for HnClient {
    async fn story_ids(&self, listing: Listing) -> Result<Vec<u64>, FetchError> {
        self.get_json(format!("{}/{}", self.base_url, listing.endpoint()))
            .await
    }

    async fn fetch(&self, id: u64) -> Result<Record, FetchError> {
        self.get_json(format!("{}/item/{}.json", self.base_url, id))
            .await
    }
}
