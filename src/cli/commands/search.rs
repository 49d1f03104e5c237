//! Catalog search command.

use console::style;

use crate::cli::helpers::truncate;
use crate::config::Settings;
use crate::scrapers::sources::{all_sources, source_by_name};
use crate::scrapers::NovelCrawler;

/// Search a site's catalog and print the matches.
pub async fn cmd_search(
    settings: &Settings,
    query: &str,
    site: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let source = match source_by_name(site) {
        Some(source) => source,
        None => {
            eprintln!("{} Unknown site: {}", style("✗").red(), site);
            eprintln!("  Available sites:");
            for source in all_sources() {
                eprintln!("    {:<14} {}", source.name(), source.base_urls()[0]);
            }
            std::process::exit(1);
        }
    };

    println!(
        "{} Searching {} for '{}'...",
        style("→").cyan(),
        source.name(),
        query
    );

    let base = source.base_urls()[0].to_string();
    let mut crawler = NovelCrawler::new(source, settings, &base);
    let results = crawler.search(query).await?;

    if results.is_empty() {
        println!(
            "{} No novels found matching '{}'",
            style("!").yellow(),
            query
        );
        return Ok(());
    }

    println!("\n{} results for '{}'\n", results.len(), query);
    for result in results.iter().take(limit) {
        println!("{}", style(&result.title).bold());
        if let Some(info) = &result.info {
            println!("  {}", truncate(info, 80));
        }
        println!("  {}", style(&result.url).cyan());
    }
    if results.len() > limit {
        println!("\n... and {} more (raise --limit to see them)", results.len() - limit);
    }

    Ok(())
}
