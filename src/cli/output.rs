//! CLI output formatting utilities.

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

    /// Print one stored artifact line.
    pub fn artifact_line(title: &str, id: &str, kind: &str, created_at: &str) {
        println!(
            "  {} {} ({}, {}, {})",
            style("*").cyan(),
            style(title).bold(),
            style(id).dim(),
            kind,
            created_at
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
pub fn content_preview(content: &str, max_len: usize) -> String {
    let content = content.replace('\n', " ");
    if content.len() <= max_len {
        content
    } else {
        let mut cut = max_len;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &content[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_short_passthrough() {
        assert_eq!(content_preview("short", 10), "short");
    }

    #[test]
    fn test_content_preview_truncates() {
        let long = "a".repeat(300);
        let preview = content_preview(&long, 200);
        assert_eq!(preview.len(), 203);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        let text = "læring".repeat(50);
        let preview = content_preview(&text, 7);
        assert!(preview.ends_with("..."));
    }
}
