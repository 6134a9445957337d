use crate::browser::Browser;
use crate::hn_api::{ItemSource, Listing};
use crate::page::Page;

pub(crate) const PAGE_SIZE: usize = 30;

pub(crate) const PROMPT: &str =
    "enter your choice [<sno> | (m)ore | (t)op | (b)est | (n)ew | (q)uit | (r)efresh]: ";

/// Which window of which listing is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Navigation {
    pub(crate) listing: Listing,
    pub(crate) offset: usize,
    pub(crate) page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    More,
    Switch(Listing),
    Refresh,
    Quit,
    /// `token` is the input as typed, for the miss message.
    Open { position: usize, token: String },
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown option: {0}")]
pub(crate) struct UnknownCommand(pub(crate) String);

impl std::str::FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "m" | "more" => Ok(Command::More),
            "n" | "new" => Ok(Command::Switch(Listing::New)),
            "t" | "top" => Ok(Command::Switch(Listing::Top)),
            "b" | "best" => Ok(Command::Switch(Listing::Best)),
            "r" | "refresh" => Ok(Command::Refresh),
            "q" | "quit" => Ok(Command::Quit),
            _ => s
                .parse::<usize>()
                .map(|position| Command::Open {
                    position,
                    token: s.to_string(),
                })
                .map_err(|_| UnknownCommand(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Owns the navigation state and the page on screen. Every command runs to
/// completion, including any page load, before the next one is accepted.
pub(crate) struct Session {
    source: std::sync::Arc<dyn ItemSource>,
    browser: Box<dyn Browser>,
    navigation: Navigation,
    page: Page,
    max_in_flight: usize,
}

impl Session {
    pub(crate) fn new(
        source: std::sync::Arc<dyn ItemSource>,
        browser: Box<dyn Browser>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            source,
            browser,
            navigation: Navigation {
                listing: Listing::Top,
                offset: 0,
                page_size: PAGE_SIZE,
            },
            page: Page::default(),
            max_in_flight,
        }
    }

    pub(crate) fn navigation(&self) -> Navigation {
        self.navigation
    }

    #[cfg(test)]
    pub(crate) fn page(&self) -> &Page {
        &self.page
    }

    /// Initial load, same as typing `top`.
    pub(crate) async fn start(&mut self, out: &mut impl std::io::Write) -> anyhow::Result<()> {
        self.execute(Command::Switch(Listing::Top), out).await?;
        Ok(())
    }

    pub(crate) async fn handle_input(
        &mut self,
        input: &str,
        out: &mut impl std::io::Write,
    ) -> anyhow::Result<Flow> {
        match input.parse::<Command>() {
            Ok(command) => self.execute(command, out).await,
            Err(e) => {
                tracing::info!(input = e.0.as_str(), "Unknown command");
                writeln!(out, "{}", e)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub(crate) async fn execute(
        &mut self,
        command: Command,
        out: &mut impl std::io::Write,
    ) -> anyhow::Result<Flow> {
        tracing::info!(command =? command, navigation =? self.navigation, "Executing command");
        let current = self.navigation;

        match command {
            Command::More => {
                let next = Navigation {
                    offset: current.offset + current.page_size,
                    ..current
                };
                self.reload(next, out).await?;
            }
            Command::Switch(listing) => {
                let next = Navigation {
                    listing,
                    offset: 0,
                    ..current
                };
                self.reload(next, out).await?;
            }
            Command::Refresh => self.reload(current, out).await?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Open { position, token } => self.open(position, &token, out)?,
        }

        Ok(Flow::Continue)
    }

    /// Loads and renders `next`. On failure the previous state and page stay.
    async fn reload(
        &mut self,
        next: Navigation,
        out: &mut impl std::io::Write,
    ) -> anyhow::Result<()> {
        match crate::page::load(
            self.source.clone(),
            next.listing,
            next.offset,
            next.page_size,
            self.max_in_flight,
        )
        .await
        {
            Ok(page) => {
                self.navigation = next;
                self.page = page;
                tracing::info!(
                    navigation =? next,
                    num_stories = self.page.len(),
                    "Showing page"
                );
                write!(
                    out,
                    "{}",
                    crate::render::render(&self.page, next.listing, next.offset, next.page_size)
                )?;
            }
            Err(e) => {
                tracing::error!(
                    error =? e,
                    navigation =? next,
                    "Error loading page, keeping previous page"
                );
                writeln!(out, "error: {}", e)?;
            }
        }

        Ok(())
    }

    fn open(
        &self,
        position: usize,
        token: &str,
        out: &mut impl std::io::Write,
    ) -> anyhow::Result<()> {
        let Some(record) = self.page.get(position) else {
            writeln!(out, "{}", UnknownCommand(token.to_string()))?;
            return Ok(());
        };

        writeln!(out, "opening item {}: {}", position, record.title)?;
        if let Err(e) = self
            .browser
            .open(&crate::browser::item_page_url(record.id))
        {
            tracing::error!(error =? e, id = record.id, "Error opening browser");
            writeln!(out, "error: {}", e)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::LaunchError;
    use crate::page::tests::FakeSource;

    #[derive(Debug, Default, Clone)]
    struct FakeBrowser {
        opened: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Browser for FakeBrowser {
        fn open(&self, url: &str) -> Result<(), LaunchError> {
            if self.fail {
                return Err(LaunchError {
                    url: url.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no browser"),
                });
            }
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct Harness {
        session: Session,
        source: std::sync::Arc<FakeSource>,
        browser: FakeBrowser,
    }

    impl Harness {
        async fn started(count: u64) -> Self {
            let mut harness = Self::with_browser(count, FakeBrowser::default());
            let mut out = Vec::new();
            harness.session.start(&mut out).await.unwrap();
            harness
        }

        fn with_browser(count: u64, browser: FakeBrowser) -> Self {
            let source = std::sync::Arc::new(FakeSource::new(count));
            let session = Session::new(source.clone(), Box::new(browser.clone()), PAGE_SIZE);
            Self {
                session,
                source,
                browser,
            }
        }

        async fn input(&mut self, input: &str) -> (Flow, String) {
            let mut out = Vec::new();
            let flow = self.session.handle_input(input, &mut out).await.unwrap();
            (flow, String::from_utf8(out).unwrap())
        }

        fn opened(&self) -> Vec<String> {
            self.browser.opened.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("more".parse::<Command>(), Ok(Command::More));
        assert_eq!("m".parse::<Command>(), Ok(Command::More));
        assert_eq!(" top \n".parse::<Command>(), Ok(Command::Switch(Listing::Top)));
        assert_eq!("n".parse::<Command>(), Ok(Command::Switch(Listing::New)));
        assert_eq!("best".parse::<Command>(), Ok(Command::Switch(Listing::Best)));
        assert_eq!("r".parse::<Command>(), Ok(Command::Refresh));
        assert_eq!("quit".parse::<Command>(), Ok(Command::Quit));
        assert_eq!(
            "12".parse::<Command>(),
            Ok(Command::Open {
                position: 12,
                token: "12".to_string(),
            })
        );
        assert_eq!(
            " 007 ".parse::<Command>(),
            Ok(Command::Open {
                position: 7,
                token: "007".to_string(),
            })
        );
        assert_eq!(
            "-3".parse::<Command>(),
            Err(UnknownCommand("-3".to_string()))
        );
        assert_eq!(
            "bogus".parse::<Command>(),
            Err(UnknownCommand("bogus".to_string()))
        );
    }

    #[tokio::test]
    async fn test_start_loads_first_top_page() {
        let mut harness = Harness::with_browser(40, FakeBrowser::default());
        let mut out = Vec::new();
        harness.session.start(&mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert_eq!(
            harness.session.navigation(),
            Navigation {
                listing: Listing::Top,
                offset: 0,
                page_size: PAGE_SIZE,
            }
        );
        assert!(out.starts_with("item 1 to 30 of top at "));
        assert_eq!(harness.session.page().len(), 30);
        assert_eq!(harness.session.page().get(1).unwrap().id, 11);
        assert_eq!(harness.session.page().get(30).unwrap().id, 40);
    }

    #[tokio::test]
    async fn test_more_advances_by_page_size() {
        let mut harness = Harness::started(40).await;

        let (flow, out) = harness.input("more").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(harness.session.navigation().offset, 30);
        assert_eq!(harness.session.navigation().listing, Listing::Top);

        // 10 items left, the rest of the window is blank.
        assert_eq!(harness.session.page().len(), 10);
        assert_eq!(harness.session.page().get(31).unwrap().id, 41);
        assert_eq!(harness.session.page().get(40).unwrap().id, 50);
        assert!(out.starts_with("item 31 to 60 of top at "));
        assert!(out.contains("] 40. Story 50 (example.com)"));
        assert!(out.contains("] 41.\n"));
        assert!(out.contains("] 60.\n"));

        harness.input("m").await;
        assert_eq!(harness.session.navigation().offset, 60);
        assert!(harness.session.page().is_empty());
    }

    #[tokio::test]
    async fn test_switching_listing_resets_offset() {
        let mut harness = Harness::started(100).await;
        harness.input("more").await;
        harness.input("more").await;
        assert_eq!(harness.session.navigation().offset, 60);

        let (_, out) = harness.input("new").await;
        assert_eq!(harness.session.navigation().listing, Listing::New);
        assert_eq!(harness.session.navigation().offset, 0);
        assert!(out.starts_with("item 1 to 30 of new at "));
        assert_eq!(harness.session.page().get(1).unwrap().id, 1_000);

        harness.input("more").await;
        harness.input("b").await;
        assert_eq!(harness.session.navigation().listing, Listing::Best);
        assert_eq!(harness.session.navigation().offset, 0);
    }

    #[tokio::test]
    async fn test_refresh_keeps_navigation_and_reloads() {
        let mut harness = Harness::started(100).await;
        harness.input("more").await;
        let before = harness.session.navigation();
        let fetches = harness
            .source
            .fetches
            .load(std::sync::atomic::Ordering::SeqCst);

        harness.input("refresh").await;

        assert_eq!(harness.session.navigation(), before);
        assert_eq!(
            harness
                .source
                .fetches
                .load(std::sync::atomic::Ordering::SeqCst),
            fetches + PAGE_SIZE
        );
        assert_eq!(harness.session.page().get(31).unwrap().id, 41);
    }

    #[tokio::test]
    async fn test_open_known_position() {
        let mut harness = Harness::started(40).await;

        let (flow, out) = harness.input("3").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "opening item 3: Story 13\n");

        let opened = harness.opened();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].ends_with("13"));
    }

    #[tokio::test]
    async fn test_open_position_outside_page() {
        let mut harness = Harness::started(40).await;
        let before = harness.session.navigation();

        let (flow, out) = harness.input("31").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "unknown option: 31\n");
        assert_eq!(harness.session.navigation(), before);
        assert!(harness.opened().is_empty());

        let (_, out) = harness.input("0").await;
        assert_eq!(out, "unknown option: 0\n");

        // The miss message echoes what was typed, not the parsed number.
        let (_, out) = harness.input("0031").await;
        assert_eq!(out, "unknown option: 0031\n");
        assert!(harness.opened().is_empty());
    }

    #[tokio::test]
    async fn test_open_with_leading_zeros() {
        let mut harness = Harness::started(40).await;

        let (_, out) = harness.input("007").await;
        assert_eq!(out, "opening item 7: Story 17\n");
        assert_eq!(harness.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let mut harness = Harness::started(40).await;
        let before = harness.session.navigation();
        let page_before = harness.session.page().clone();

        let (flow, out) = harness.input("older").await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "unknown option: older\n");
        assert_eq!(harness.session.navigation(), before);
        assert_eq!(harness.session.page(), &page_before);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut harness = Harness::started(40).await;

        let (flow, out) = harness.input("q").await;
        assert_eq!(flow, Flow::Quit);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_page() {
        let mut harness = Harness::started(100).await;
        let page_before = harness.session.page().clone();

        // Position 45 of the next page.
        harness.source.fail_item(Some(55));
        let (flow, out) = harness.input("more").await;

        assert_eq!(flow, Flow::Continue);
        assert!(out.starts_with("error: could not load item 55 (#45)"));
        assert_eq!(out.lines().count(), 1);
        assert_eq!(harness.session.navigation().offset, 0);
        assert_eq!(harness.session.page(), &page_before);

        // Recovers once the item is available again.
        harness.source.fail_item(None);
        harness.input("more").await;
        assert_eq!(harness.session.navigation().offset, 30);
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_previous_listing() {
        let mut harness = Harness::started(40).await;
        harness
            .source
            .listing_fails
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let (_, out) = harness.input("best").await;
        assert!(out.starts_with("error: could not load best stories"));
        assert_eq!(harness.session.navigation().listing, Listing::Top);
        assert_eq!(harness.session.page().len(), 30);
    }

    #[tokio::test]
    async fn test_browser_failure_is_not_fatal() {
        let browser = FakeBrowser {
            fail: true,
            ..Default::default()
        };
        let mut harness = Harness::with_browser(40, browser);
        let mut out = Vec::new();
        harness.session.start(&mut out).await.unwrap();

        let (flow, out) = harness.input("1").await;
        assert_eq!(flow, Flow::Continue);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "opening item 1: Story 11");
        assert!(lines[1].starts_with("error: could not open"));
    }
}
