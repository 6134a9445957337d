use crate::hn_api::{FetchError, ItemSource, Listing, Record};

/// A loaded window of a listing, keyed by page position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Page {
    records: std::collections::BTreeMap<usize, Record>,
}

impl Page {
    pub(crate) fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(&position)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in position order.
    #[cfg(test)]
    pub(crate) fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl FromIterator<Record> for Page {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().map(|r| (r.position, r)).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum LoadError {
    #[error("could not load {listing} stories: {source}")]
    Listing {
        listing: Listing,
        #[source]
        source: FetchError,
    },

    #[error("could not load item {id} (#{position}): {source}")]
    Item {
        id: u64,
        position: usize,
        #[source]
        source: FetchError,
    },

    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Loads positions `offset + 1 ..= offset + page_size` of `listing`.
///
/// Every item of the page is fetched in its own task, at most `max_in_flight`
/// at a time. The first failure fails the whole load and aborts the fetches
/// still in flight.
pub(crate) async fn load(
    source: std::sync::Arc<dyn ItemSource>,
    listing: Listing,
    offset: usize,
    page_size: usize,
    max_in_flight: usize,
) -> Result<Page, LoadError> {
    let ids = source
        .story_ids(listing)
        .await
        .map_err(|source| LoadError::Listing { listing, source })?;

    tracing::info!(
        listing = %listing,
        offset = offset,
        num_ids = ids.len(),
        "Got story ids"
    );

    let slice: Vec<u64> = ids.into_iter().skip(offset).take(page_size).collect();
    if slice.is_empty() {
        return Ok(Page::default());
    }

    let permits = std::sync::Arc::new(tokio::sync::Semaphore::new(
        page_size.min(max_in_flight).max(1),
    ));

    let mut queries_set: tokio::task::JoinSet<Result<Record, LoadError>> =
        tokio::task::JoinSet::new();

    for (i, id) in slice.into_iter().enumerate() {
        let position = offset + i + 1;
        let source = source.clone();
        let permits = permits.clone();

        queries_set.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .expect("Semaphore is never closed");

            let mut record = source
                .fetch(id)
                .await
                .map_err(|source| LoadError::Item {
                    id,
                    position,
                    source,
                })?;
            record.position = position;
            Ok(record)
        });
    }

    let mut records = Vec::with_capacity(queries_set.len());
    while let Some(res) = queries_set.join_next().await {
        match res? {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::error!(error = %e, "Error getting story, aborting page load");
                queries_set.abort_all();
                return Err(e);
            }
        }
    }

    tracing::info!(listing = %listing, num_stories = records.len(), "Loaded page");

    Ok(records.into_iter().collect())
}
