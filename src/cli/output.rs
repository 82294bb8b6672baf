//! CLI output formatting utilities.

use crate::index::SearchHit;
use crate::knowledge::FactSource;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a search hit.
    pub fn search_hit(hit: &SearchHit) {
        println!(
            "\n{} {} {} (score: {:.2}, keyword {:.2}, vector {:.2})",
            style(">>").green(),
            style(format!("[{}]", hit.record.record_type)).cyan(),
            style(&hit.record.id).dim(),
            hit.score,
            hit.keyword_score,
            hit.vector_score
        );
        println!("   {}", content_preview(&hit.record.content, 200));
        for source in &hit.record.sources {
            println!("   {} {}", style(&source.video_title).bold(), style(source.url()).dim());
        }
    }

    /// Print answer citations.
    pub fn sources(sources: &[FactSource]) {
        if sources.is_empty() {
            return;
        }
        println!("\n{}", style("Sources:").bold());
        for source in sources {
            println!(
                "  {} {} {}",
                style("*").cyan(),
                source.video_title,
                style(source.url()).dim()
            );
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis, on a char boundary.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("line one\nline two", 8), "line one...");
        assert_eq!(content_preview("ééééé", 2), "éé...");
    }
}
