//! Novel download command.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::scrapers::crawler::ChapterProgress;
use crate::services::DownloadService;

/// Download a novel end to end with a progress bar over the chapter loop.
pub async fn cmd_crawl(settings: &Settings, url: &str) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let db = settings.create_db_context();
    db.init_schema().await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "\n{} Interrupted, finishing current chapter...",
                    style("!").yellow()
                );
                cancel.cancel();
            }
        });
    }

    println!("{} Crawling {}", style("→").cyan(), url);

    let (tx, mut rx) = mpsc::unbounded_channel::<ChapterProgress>();
    let progress_task = tokio::spawn(async move {
        let mut bar: Option<ProgressBar> = None;
        let mut skipped = 0usize;
        while let Some(event) = rx.recv().await {
            let bar = bar.get_or_insert_with(|| {
                let bar = ProgressBar::new(event.total as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                        .unwrap()
                        .progress_chars("█▓░"),
                );
                bar
            });
            if event.skipped {
                skipped += 1;
            } else if !event.success {
                bar.println(format!(
                    "  {} Chapter {} failed: {}",
                    style("!").yellow(),
                    event.chapter_id,
                    event.title
                ));
            }
            bar.set_message(event.title);
            bar.inc(1);
        }
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        skipped
    });

    let service = DownloadService::new(db, settings.clone());
    let outcome = service.crawl(url, &cancel, tx).await;
    let skipped = progress_task.await?;
    let result = outcome?;

    if cancel.is_cancelled() {
        println!(
            "{} Crawl interrupted; progress saved for next run",
            style("!").yellow()
        );
    } else {
        println!("{} Downloaded '{}'", style("✓").green(), result.title);
    }
    println!(
        "  {}/{} chapters ({} resumed, {} failed), {} images",
        result.chapters_downloaded,
        result.chapters_total,
        skipped,
        result.chapters_failed,
        result.images_saved
    );
    println!("  Saved to {}", result.output_dir.display());
    if result.chapters_failed > 0 {
        println!(
            "  {} Re-run the same command to retry failed chapters",
            style("!").yellow()
        );
    }

    Ok(())
}
