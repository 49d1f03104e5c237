//! Status server command.

use anyhow::Context;
use console::style;

use crate::config::Settings;

const DEFAULT_PORT: u16 = 3030;

/// Start the status server and the cleanup scheduler behind it.
pub async fn cmd_serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    settings.ensure_directories()?;

    // Tables must exist before the scheduler's first sweep queries them.
    println!("{} Preparing catalog database...", style("→").cyan());
    let ctx = settings.create_db_context();
    match ctx.init_schema().await {
        Ok(()) => println!("  {} Database ready", style("✓").green()),
        Err(e) => {
            eprintln!("  {} Schema setup failed: {}", style("✗").red(), e);
            return Err(e.into());
        }
    }

    println!(
        "{} Starting novelacquire status server at http://{}:{}",
        style("→").cyan(),
        host,
        port
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Accepts a bare port ("3030"), a bare host ("0.0.0.0"), or both
/// ("0.0.0.0:3030"). Host defaults to 127.0.0.1, port to 3030.
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }
    match bind.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse()
                .with_context(|| format!("invalid port in bind address '{}'", bind))?;
            Ok((host.to_string(), port))
        }
        None => Ok((bind.to_string(), DEFAULT_PORT)),
    }
}
