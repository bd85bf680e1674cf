use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::Mutex;
use tokio::sync::mpsc::unbounded_channel;

use lightdeck::config::{self, AppConfig, SharedConfig};
use lightdeck::display::{FbSurface, touch};
use lightdeck::error::ApiResult;
use lightdeck::hass::{self, client::HassClient};
use lightdeck::server::{self, appstate::AppState};
use lightdeck::ui::{self, UiEvent, grid::TileGrid, layout::PageLayout};

#[derive(Debug, Parser)]
#[command(version, about = "Touchscreen light panel for Home Assistant")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "/etc/lightdeck.conf")]
    config: PathBuf,

    /// Override the framebuffer device from the config
    #[arg(long)]
    fb_device: Option<String>,

    /// Override the touch input device from the config
    #[arg(long)]
    touch_device: Option<String>,
}

/*
 * Formatter function to output in syslog format. This makes sense when running
 * as a service (where output might go to a log file, or the system journal)
 */
#[allow(clippy::match_same_arms)]
fn syslog_format(
    buf: &mut pretty_env_logger::env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    writeln!(
        buf,
        "<{}>{}: {}",
        match record.level() {
            log::Level::Error => 3,
            log::Level::Warn => 4,
            log::Level::Info => 6,
            log::Level::Debug => 7,
            log::Level::Trace => 7,
        },
        record.target(),
        record.args()
    )
}

fn init_logging() -> ApiResult<()> {
    /* Try to provide reasonable default filters, when RUST_LOG is not specified */
    const DEFAULT_LOG_FILTERS: &[&str] = &[
        "debug",
        "hyper=info",
        "reqwest=info",
        "h2=info",
        "axum::rejection=trace",
    ];

    let log_filters = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTERS.join(","));

    /* Detect if we need syslog or human-readable formatting */
    if std::env::var("SYSTEMD_EXEC_PID").is_ok_and(|pid| pid == std::process::id().to_string()) {
        Ok(pretty_env_logger::env_logger::builder()
            .format(syslog_format)
            .parse_filters(&log_filters)
            .try_init()?)
    } else {
        Ok(pretty_env_logger::formatted_timed_builder()
            .parse_filters(&log_filters)
            .try_init()?)
    }
}

async fn run(args: Args) -> ApiResult<()> {
    init_logging()?;

    let mut conf = match config::parse(&args.config) {
        Ok(conf) => {
            log::debug!("Configuration loaded from {}", args.config.display());
            conf
        }
        Err(err) => {
            log::warn!("Cannot load {}: {err}", args.config.display());
            log::warn!("Starting with defaults; save settings from the web UI to create it.");
            AppConfig::default()
        }
    };

    if let Some(fb_device) = args.fb_device {
        conf.display.fb_device = fb_device;
    }
    if let Some(touch_device) = args.touch_device {
        conf.display.touch_device = touch_device;
    }

    let display = conf.display.clone();
    let web_port = conf.web.port;
    let lights = conf.lights.clone();

    if !conf.has_credentials() {
        log::warn!("{}", "-".repeat(80));
        log::warn!("No Home Assistant credentials configured!");
        log::warn!("The panel will run, but cannot reach any lights.");
        log::warn!("");
        log::warn!(" ** Open the settings UI on port {web_port} to configure it **");
        log::warn!("{}", "-".repeat(80));
    }

    let shared: SharedConfig = Arc::new(Mutex::new(conf));
    let client = HassClient::new(shared.clone())?;

    let (ui_tx, ui_rx) = unbounded_channel();
    let (toggle_tx, toggle_rx) = unbounded_channel();

    let layout = PageLayout::new(
        display.width,
        display.height,
        display.columns as usize,
        display.rows as usize,
    );
    let surface = FbSurface::open(&display, format!("http://<this-device>:{web_port}/"))?;
    let grid = TileGrid::new(surface, layout);

    let state = AppState::new(shared.clone(), args.config, ui_tx.clone(), client.clone());
    tokio::spawn(async move {
        if let Err(err) = server::serve(state, web_port).await {
            log::error!("Settings server failed: {err}");
        }
    });

    tokio::spawn(hass::run_poller(client.clone(), shared, ui_tx.clone()));
    tokio::spawn(hass::run_toggle_worker(client, toggle_rx));
    tokio::spawn(touch::run(display, ui_tx.clone()));

    // Initial draw, before the first touch or poll arrives.
    let _ = ui_tx.send(UiEvent::Rebuild(lights));

    let ui_task = tokio::spawn(ui::run(grid, ui_rx, toggle_tx));

    let mut sigterm = signal::unix::signal(SignalKind::terminate())?;
    tokio::select! {
        _ = signal::ctrl_c() => log::warn!("Ctrl-C pressed, exiting.."),
        _ = sigterm.recv() => log::warn!("SIGTERM received, exiting.."),
        _ = ui_task => log::error!("UI task stopped unexpectedly"),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = run(args).await {
        log::error!("Lightdeck error: {err}");
        log::error!("Fatal error encountered, cannot continue.");
    }
}
