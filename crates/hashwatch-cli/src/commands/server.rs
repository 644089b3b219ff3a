use std::sync::Arc;

use hashwatch_core::{JsonlSessionLog, MonitorConfig};
use hashwatch_server::{AppContext, ServerError};
use log::{info, warn};

pub fn run(config: MonitorConfig) -> Result<(), ServerError> {
    let base = format!("http://{}", config.listen_addr());

    println!("⛏  hashwatch v{}", hashwatch_core::VERSION);
    println!("   {base}");
    println!("   BitAxe:      {}", config.bitaxe_host);
    println!(
        "   Avalon Nano: {}:{}",
        config.avalon_host, config.avalon_port
    );
    println!("   Refresh:     {}s", config.refresh_interval.as_secs());
    println!();
    println!("   Endpoints:");
    println!("     GET /                  Dashboard");
    println!("     GET /api/stats         BitAxe telemetry (polls the device)");
    println!("     GET /api/avalon/stats  Avalon Nano telemetry (polls the device)");
    println!("     GET /api/snapshot      Last known telemetry with its age");
    println!("     GET /images/<file>     Dashboard images");
    println!();
    println!("   Press Ctrl+C to stop.");
    println!();

    let mut ctx = AppContext::new(config.clone())?;
    if let Some(dir) = &config.session_dir {
        match JsonlSessionLog::create(dir, &config) {
            Ok(log) => {
                info!("session log: {}", log.path().display());
                ctx = ctx.with_sink(Arc::new(log));
            }
            Err(e) => warn!("session log disabled: {e}"),
        }
    }

    let rt = tokio::runtime::Runtime::new().map_err(ServerError::Runtime)?;
    rt.block_on(hashwatch_server::run_server(Arc::new(ctx)))
}
