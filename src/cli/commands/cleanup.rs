//! One-shot cleanup command.

use console::style;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::models::JobOutcome;
use crate::services::CleanupService;
use crate::utils::format_size;

/// Run a single cleanup sweep and print what it removed.
pub async fn cmd_cleanup(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let db = settings.create_db_context();
    db.init_schema().await?;

    println!(
        "{} Sweeping {}...",
        style("→").cyan(),
        settings.output_dir.display()
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let service = CleanupService::new(db, settings.clone());
    let report = service.sweep(&cancel).await;

    match report.outcome {
        JobOutcome::Completed => println!("{} Sweep complete", style("✓").green()),
        JobOutcome::Cancelled => println!("{} Sweep interrupted", style("!").yellow()),
        JobOutcome::Failed => println!("{} Sweep failed; see log for details", style("✗").red()),
    }
    let stats = report.stats;
    println!("  {} orphaned novels removed", stats.orphans_deleted);
    println!("  {} stale artifacts removed", stats.artifacts_deleted);
    println!(
        "  {} folders trimmed for size ({} freed)",
        stats.folders_trimmed,
        format_size(stats.bytes_freed)
    );
    if settings.disk_size_limit <= 0 {
        println!("  Size-based trimming disabled (disk_size_limit is unset)");
    }

    Ok(())
}
