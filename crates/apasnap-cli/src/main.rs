mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use console::{style, truncate_str};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

use apasnap_core::{
    full_screen_url, normalize_target, thumbnail_url, validate, Gallery, GalleryConfig,
    GalleryState, GpsEnricher, MediaFilter, MediaItem, MediaType, SortKey, ViewOptions,
};

use crate::config::AppConfig;

fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");

    if GIT_HASH.is_empty() {
        // Called once; the string lives for the whole program anyway.
        Box::leak(VERSION.to_string().into_boxed_str())
    } else {
        Box::leak(format!("{VERSION} ({GIT_HASH})").into_boxed_str())
    }
}

/// Browse HTTP directory listings and apasnap.json manifests as media galleries.
#[derive(Parser)]
#[command(name = "apasnap", version = version_string(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load a directory once and print its media.
    Browse {
        /// Directory URL; `https://` is assumed when no scheme is given.
        url: String,

        /// Fetch the directory directly instead of through the proxy chain.
        #[arg(long, default_value_t = false)]
        direct: bool,

        /// Read GPS positions from image EXIF data.
        #[arg(long, default_value_t = false)]
        gps: bool,

        /// Show thumbnail and full-screen delivery URLs.
        #[arg(long, default_value_t = false)]
        thumbnails: bool,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Check whether a URL would be accepted as a target.
    Validate {
        url: String,
    },
    /// Print the built-in demo collection.
    Demo {
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// Case-insensitive name filter.
    #[arg(short, long)]
    query: Option<String>,

    /// ALL, IMAGE or VIDEO.
    #[arg(short = 't', long = "type")]
    media_type: Option<MediaFilter>,

    /// name_asc, name_desc, date_desc or date_asc.
    #[arg(short, long)]
    sort: Option<SortKey>,

    /// Print JSON instead of a table.
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl ViewArgs {
    fn to_view(&self, default_sort: SortKey) -> ViewOptions {
        ViewOptions::default()
            .with_query(self.query.clone().unwrap_or_default())
            .with_filter(self.media_type.unwrap_or_default())
            .with_sort(self.sort.unwrap_or(default_sort))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, config } => {
            run_serve(listen, config).await;
        }
        Commands::Browse {
            url,
            direct,
            gps,
            thumbnails,
            config,
            view,
        } => {
            let app_config = load_config(config.as_deref(), "warn");
            run_browse(&url, direct, gps, thumbnails, app_config, &view).await;
        }
        Commands::Validate { url } => run_validate(&url),
        Commands::Demo { view } => {
            let mut state = GalleryState::default().with_view(view.to_view(SortKey::default()));
            state.load_demo();
            print_items(&state.view(), state.items().len(), view.json, false);
        }
    }
}

/// Loads the config file when given, then installs the tracing subscriber.
fn load_config(path: Option<&std::path::Path>, default_level: &str) -> AppConfig {
    let Some(path) = path else {
        init_tracing("pretty", default_level);
        return AppConfig::default();
    };
    match AppConfig::load(path) {
        Ok(c) => {
            init_tracing(&c.server.log_format, default_level);
            tracing::info!(path = %path.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty", default_level);
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run_serve(listen_override: Option<SocketAddr>, config_path: Option<PathBuf>) {
    let app_config = load_config(config_path.as_deref(), "info");
    let listen = listen_override.unwrap_or(app_config.server.listen);
    let gallery_config = app_config.to_gallery_config();

    let idle = Duration::from_secs(app_config.server.session_idle_secs);
    let state = match apasnap_api::state::AppState::from_config(gallery_config) {
        Ok(s) => s.with_session_idle(idle),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };

    tracing::info!(%listen, proxies = state.config.proxies.len(), "Starting apasnap API server");
    if let Err(e) = apasnap_api::serve_with_state(listen, state, apasnap_api::shutdown_signal()).await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

async fn run_browse(
    url: &str,
    direct: bool,
    gps: bool,
    thumbnails: bool,
    app_config: AppConfig,
    view: &ViewArgs,
) {
    let config: GalleryConfig = app_config.to_gallery_config();
    let gallery = match Gallery::from_config(&config) {
        Ok(g) => g,
        Err(e) => fail(&e.to_string()),
    };

    let mut state = GalleryState::new(config.proxy_enabled && !direct)
        .with_view(view.to_view(config.default_sort));

    let spinner = ProgressBar::new_spinner();
    if let Ok(s) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(s);
    }
    spinner.set_message(format!("Loading {} ({})", normalize_target(url), state.mode()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let ticket = state.begin_load();
    let result = gallery.load(url, state.mode()).await;
    let loaded = result
        .as_ref()
        .map(|l| (l.manifest_mode, l.transport.clone()))
        .ok();
    state.finish_load(ticket, result);
    spinner.finish_and_clear();

    if let Some(message) = state.error() {
        fail(message);
    }
    if let Some((manifest_mode, transport)) = loaded {
        eprintln!(
            "{} {} {}",
            style(state.loaded_url().unwrap_or(url)).bold(),
            style(format!("via {transport}")).dim(),
            if manifest_mode {
                style("(manifest)").cyan()
            } else {
                style("(listing)").dim()
            }
        );
    }

    if gps {
        let images: Vec<MediaItem> = state
            .items()
            .iter()
            .filter(|i| i.media_type == MediaType::Image)
            .cloned()
            .collect();
        let bar = ProgressBar::new(images.len() as u64);
        if let Ok(s) = ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}") {
            bar.set_style(s);
        }
        bar.set_message("reading EXIF");

        let enricher = GpsEnricher::from_strategy(gallery.strategy(), state.mode());
        enricher
            .enrich_all(&images, |item| {
                state.apply_enrichment(ticket, &item);
                bar.inc(1);
            })
            .await;
        bar.finish_and_clear();
    }

    print_items(&state.view(), state.items().len(), view.json, thumbnails);
}

fn run_validate(url: &str) {
    let target = normalize_target(url);
    let result = validate(&target);
    if result.valid {
        println!("{} {}", style("valid").green().bold(), target);
    } else {
        println!(
            "{} {}: {}",
            style("invalid").red().bold(),
            target,
            result.error.unwrap_or_default()
        );
        std::process::exit(1);
    }
}

fn print_items(items: &[MediaItem], total: usize, json: bool, thumbnails: bool) {
    if json {
        let values: Vec<Value> = items.iter().map(|i| item_json(i, thumbnails)).collect();
        match serde_json::to_string_pretty(&values) {
            Ok(s) => println!("{s}"),
            Err(e) => fail(&e.to_string()),
        }
        return;
    }

    for item in items {
        let kind = match item.media_type {
            MediaType::Video => style(format!("{:<5}", "VIDEO")).magenta(),
            _ => style(format!("{:<5}", "IMAGE")).green(),
        };
        let gps = match (item.lat, item.lng) {
            (Some(lat), Some(lng)) => format!("  {}", style(format!("{lat:.5},{lng:.5}")).cyan()),
            _ => String::new(),
        };
        println!(
            "{}  {:<40} {:>7}  {:<16}{}",
            kind,
            truncate_str(&item.name, 40, "..."),
            item.size.as_deref().unwrap_or("-"),
            item.date.as_deref().unwrap_or("-"),
            gps
        );
        if thumbnails && item.media_type == MediaType::Image {
            println!("       {} {}", style("thumb").dim(), thumbnail_url(&item.url));
            println!("       {} {}", style("full ").dim(), full_screen_url(&item.url));
        } else {
            println!("       {}", style(&item.url).dim());
        }
    }
    eprintln!(
        "{}",
        style(format!("{} of {} item(s) shown", items.len(), total)).dim()
    );
}

fn item_json(item: &MediaItem, thumbnails: bool) -> Value {
    let mut value = serde_json::to_value(item).unwrap_or(Value::Null);
    if thumbnails && item.media_type == MediaType::Image {
        if let Value::Object(map) = &mut value {
            map.insert("thumbnailUrl".into(), thumbnail_url(&item.url).into());
            map.insert("fullScreenUrl".into(), full_screen_url(&item.url).into());
        }
    }
    value
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", style("error:").red().bold(), message);
    std::process::exit(1);
}

fn init_tracing(log_format: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_format {
        "json" => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
