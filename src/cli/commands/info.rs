//! Novel metadata command.

use console::style;

use crate::cli::helpers::truncate;
use crate::config::Settings;
use crate::scrapers::sources::source_for_url;
use crate::scrapers::NovelCrawler;

/// How many chapters to list before eliding the rest.
const CHAPTER_PREVIEW: usize = 10;

/// Fetch novel metadata and the chapter list, print them, download nothing.
pub async fn cmd_info(settings: &Settings, url: &str) -> anyhow::Result<()> {
    let source = match source_for_url(url) {
        Some(source) => source,
        None => {
            eprintln!("{} No crawler supports this URL: {}", style("✗").red(), url);
            std::process::exit(1);
        }
    };

    println!(
        "{} Fetching novel info via {}...",
        style("→").cyan(),
        source.name()
    );

    let mut crawler = NovelCrawler::new(source, settings, url);
    crawler.read_info().await?;
    let session = &crawler.session;

    println!("\n{}", style("Novel Info").bold());
    println!("{}", "=".repeat(60));
    println!("{:<12} {}", "Title:", session.title);
    if let Some(author) = &session.author {
        println!("{:<12} {}", "Author:", author);
    }
    println!("{:<12} {}", "URL:", session.novel_url);
    if let Some(cover) = &session.cover_url {
        println!("{:<12} {}", "Cover:", cover);
    }
    if !session.volumes.is_empty() {
        println!("{:<12} {}", "Volumes:", session.volumes.len());
    }
    println!("{:<12} {}", "Chapters:", session.chapters.len());

    if let Some(synopsis) = &session.synopsis {
        println!("\n{}", style("Synopsis").bold());
        println!("{}", "-".repeat(60));
        println!("{}", synopsis);
    }

    if !session.chapters.is_empty() {
        println!("\n{}", style("Chapters").bold());
        println!("{}", "-".repeat(60));
        for chapter in session.chapters.iter().take(CHAPTER_PREVIEW) {
            println!("  {:>4}. {}", chapter.id, truncate(&chapter.title, 70));
        }
        if session.chapters.len() > CHAPTER_PREVIEW {
            println!(
                "  ... and {} more",
                session.chapters.len() - CHAPTER_PREVIEW
            );
        }
    }

    Ok(())
}
