mod api;
mod calendar;
mod chat;
mod config;
mod ui;

use anyhow::{Context, Result};
use api::{DataClient, PlanLookup, ReqwestTransport, TimelineLookup};
use calendar::{CalendarConverter, HttpSolarService};
use chat::format::format_invested_plans;
use chat::EffectRunner;
use clap::Parser;
use config::{
    Config, DEFAULT_API_SERVER_URL, DEFAULT_BACKEND_URL, DEFAULT_DATE_SERVICE_URL,
    DEFAULT_LOG_FILE, DEFAULT_TIMEOUT_SECS,
};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::OpenOptions;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ui::{run_app, App};

#[derive(Parser, Debug)]
#[command(name = "zeema")]
#[command(about = "Terminal support chat for Zeema investors", long_about = None)]
struct Args {
    /// Base URL of the hosted REST backend
    #[arg(long, env = "ZEEMA_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Backend API key, sent as `apikey` and bearer token
    #[arg(long, env = "ZEEMA_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Host of the national-id association endpoint
    #[arg(long, env = "ZEEMA_API_SERVER_URL", default_value = DEFAULT_API_SERVER_URL)]
    api_server_url: String,

    /// Gregorian to Solar date conversion service
    #[arg(long, env = "ZEEMA_DATE_SERVICE_URL", default_value = DEFAULT_DATE_SERVICE_URL)]
    date_service_url: String,

    /// Convert dates with the local approximation only
    #[arg(long)]
    no_date_service: bool,

    /// Run without the payout timeline lookup
    #[arg(long)]
    no_timeline: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Log file; the terminal belongs to the UI
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Convert today's date (and look up --national-id) without starting the TUI
    #[arg(long)]
    check: bool,

    /// National id to look up in check mode
    #[arg(long, requires = "check")]
    national_id: Option<String>,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            backend_url: self.backend_url.clone(),
            api_key: self.api_key.clone(),
            api_server_url: self.api_server_url.clone(),
            date_service_url: (!self.no_date_service).then(|| self.date_service_url.clone()),
            timeline_enabled: !self.no_timeline,
            request_timeout: Duration::from_secs(self.timeout_secs),
            log_file: self.log_file.clone(),
        }
    }
}

fn cleanup_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zeema=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_converter(config: &Config) -> Result<CalendarConverter> {
    Ok(match &config.date_service_url {
        Some(url) => CalendarConverter::new(Arc::new(HttpSolarService::new(
            url,
            config.request_timeout,
        )?)),
        None => CalendarConverter::local_only(),
    })
}

async fn run_check(
    client: &DataClient,
    converter: &CalendarConverter,
    national_id: Option<&str>,
) -> Result<()> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    println!("Today: {} -> {}", today, converter.convert(&today).await);

    let Some(national_id) = national_id else {
        return Ok(());
    };
    println!("Looking up invested plans...");
    let result = client.fetch_invested_plans(national_id).await;
    if !result.success {
        eprintln!("❌ Lookup failed: {}", result.message);
        std::process::exit(1);
    }
    println!("✅ {}", result.message);
    if result.has_rows() {
        println!("{}", format_invested_plans(result.rows()));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.config();
    init_logging(&config.log_file)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        cleanup_terminal();
        original_hook(panic_info);
    }));

    let transport = Arc::new(ReqwestTransport::new(&config.api_key, config.request_timeout)?);
    let client = Arc::new(DataClient::new(transport, &config));
    let converter = build_converter(&config)?;

    // Check mode - run one conversion and optional lookup, then exit
    if args.check {
        return run_check(&client, &converter, args.national_id.as_deref()).await;
    }

    let timeline: Option<Arc<dyn TimelineLookup>> = if config.timeline_enabled {
        Some(client.clone())
    } else {
        None
    };
    let plans: Arc<dyn PlanLookup> = client;
    let runner = EffectRunner::new(plans, timeline, converter);
    info!(
        backend = %config.backend_url,
        date_service = ?config.date_service_url,
        timeline = config.timeline_enabled,
        "starting chat"
    );

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(runner);
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    cleanup_terminal();
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
