use crate::hn_api::{Listing, Record};
use crate::page::Page;

const TIME_LAYOUT: &str = "%m/%d %H:%M";

/// Formats one screen of a listing: a header line, then one row per position
/// from `offset + 1` to `offset + page_size`. Positions missing from the page
/// render as blank rows.
pub(crate) fn render(page: &Page, listing: Listing, offset: usize, page_size: usize) -> String {
    render_at(page, listing, offset, page_size, chrono::Local::now())
}

fn render_at(
    page: &Page,
    listing: Listing,
    offset: usize,
    page_size: usize,
    now: chrono::DateTime<chrono::Local>,
) -> String {
    let mut out = format!(
        "item {} to {} of {} at {}\n",
        offset + 1,
        offset + page_size,
        listing,
        now.format(TIME_LAYOUT)
    );

    for position in offset + 1..=offset + page_size {
        let line = match page.get(position) {
            Some(record) => row(record),
            None => format!("[{:11} {:4} {:>15}] {:02}.", "", "", "", position),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out
}

fn row(record: &Record) -> String {
    format!(
        "[{} {:4} {:>15}] {:02}. {}",
        timestamp(record.created_at),
        record.score,
        record.author,
        record.position,
        title(record)
    )
}

fn timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&chrono::Local).format(TIME_LAYOUT).to_string())
        .unwrap_or_else(|| format!("{:11}", ""))
}

/// Title with the link's host appended, e.g. `Foo (example.com)`.
pub(crate) fn title(record: &Record) -> String {
    match record.host() {
        Some(host) => format!("{} ({})", record.title, host),
        None => record.title.clone(),
    }
}
