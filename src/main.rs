use tracing_subscriber::util::SubscriberInitExt;

pub(crate) mod browser;
pub(crate) mod config;
pub(crate) mod hn_api;
pub(crate) mod page;
pub(crate) mod render;
pub(crate) mod session;

pub(crate) static CLIENT: std::sync::LazyLock<reqwest::Client> =
    std::sync::LazyLock::new(reqwest::Client::new);

#[derive(Debug, Clone, clap::Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "false")]
    #[arg(help = "Log to stderr in addition to the log file")]
    log_to_console: bool,
}

async fn run() -> anyhow::Result<()> {
    let source = std::sync::Arc::new(hn_api::HnClient::from_config());
    let mut session = session::Session::new(
        source,
        Box::new(browser::SystemBrowser),
        config::config().max_concurrent_fetches,
    );

    let mut stdout = std::io::stdout();
    session.start(&mut stdout).await?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    command_loop(&mut session, stdin, &mut stdout).await?;

    tracing::info!(navigation =? session.navigation(), "Session ended");
    Ok(())
}

/// Prompts and executes commands until `quit` or end of input.
///
/// Lines are read as raw bytes so input that is not valid UTF-8 still reaches
/// the session, where it is reported as an unknown option.
async fn command_loop(
    session: &mut session::Session,
    mut input: impl tokio::io::AsyncBufRead + Unpin,
    out: &mut impl std::io::Write,
) -> anyhow::Result<()> {
    use tokio::io::AsyncBufReadExt;

    let mut buf = Vec::new();
    loop {
        write!(out, "{}", session::PROMPT)?;
        out.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            tracing::info!("End of input");
            writeln!(out)?;
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buf);
        if session.handle_input(&line, out).await? == session::Flow::Quit {
            return Ok(());
        }
    }
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::layer::Layer;
    use tracing_subscriber::layer::SubscriberExt;

    use clap::Parser;
    let args = Args::parse();

    let file_appender =
        tracing_appender::rolling::daily(&config::config().log_dir, "hn_pager.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer();
    let file_layer = file_layer
        .with_writer(non_blocking)
        .json()
        .with_filter(tracing::level_filters::LevelFilter::INFO)
        .boxed();

    // Stdout belongs to the interactive ui.
    let pretty_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .with_filter(tracing::level_filters::LevelFilter::INFO)
        .boxed();

    let registry = tracing_subscriber::registry().with(file_layer);

    if config::config().log_to_console || args.log_to_console {
        registry.with(pretty_layer).init();
    } else {
        registry.init();
    };

    tracing::info!(
        config =? config::config(),
        args =? args,
        "Starting HN pager"
    );

    if let Some(e) = &config::config().env_file_error {
        tracing::warn!(error = e.as_str(), "Could not load .env file, using defaults");
        eprintln!("warning: could not load .env file: {}", e);
    }

    let result = run().await;
    if let Err(e) = &result {
        tracing::error!(error =? e, "Fatal error");
        eprintln!("error: {:#}", e);
    }

    // Flush the file writer before exiting.
    drop(guard);
    if result.is_err() {
        std::process::exit(1);
    }
}
