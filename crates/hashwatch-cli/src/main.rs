//! CLI for hashwatch: serves live BitAxe and Avalon Nano telemetry to a
//! browser dashboard.

mod commands;

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hashwatch_core::{DEFAULT_CGMINER_PORT, MonitorConfig};

#[derive(Parser, Debug)]
#[command(name = "hashwatch")]
#[command(about = "hashwatch: local dashboard backend for a BitAxe and an Avalon Nano")]
#[command(version = hashwatch_core::VERSION)]
struct Cli {
    /// BitAxe address, `host` or `host:port` [default: 192.168.0.196]
    bitaxe_host: Option<String>,

    /// Dashboard refresh interval in seconds [default: 5]
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    refresh_interval: Option<u64>,

    /// Dashboard HTTP port [default: 8080]
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    web_port: Option<u16>,

    /// Avalon Nano address [default: 192.168.0.192]
    avalon_host: Option<String>,

    /// Address the dashboard server binds to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// cgminer API port on the Avalon Nano
    #[arg(long, default_value_t = DEFAULT_CGMINER_PORT)]
    avalon_port: u16,

    /// Dashboard template (defaults to index.html next to the binary, then in the working directory)
    #[arg(long)]
    template: Option<PathBuf>,

    /// Directory containing the `images/` folder
    #[arg(long, default_value = ".")]
    assets_dir: PathBuf,

    /// Directory for JSONL session logs
    #[arg(long, default_value = "sessions")]
    session_dir: PathBuf,

    /// Do not write a session log
    #[arg(long)]
    no_session_log: bool,
}

impl Cli {
    fn into_config(self) -> MonitorConfig {
        let defaults = MonitorConfig::default();
        MonitorConfig {
            bitaxe_host: self.bitaxe_host.unwrap_or(defaults.bitaxe_host),
            avalon_host: self.avalon_host.unwrap_or(defaults.avalon_host),
            avalon_port: self.avalon_port,
            refresh_interval: self
                .refresh_interval
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            bind: self.bind,
            port: self.web_port.unwrap_or(defaults.port),
            template: self.template,
            assets_dir: self.assets_dir,
            session_dir: (!self.no_session_log).then_some(self.session_dir),
            http_timeouts: defaults.http_timeouts,
            tcp_timeouts: defaults.tcp_timeouts,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = commands::server::run(cli.into_config()) {
        eprintln!("error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
