//! The `learnpath cache` commands.

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};

use learnpath_cache::{AdvancedCache, CacheStats};
use learnpath_providers::load_config_from;

use super::parse_list;

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show entry counts, sizes and tags
    Stats,

    /// Remove cached entries
    Clear {
        /// Only remove entries carrying any of these tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Remove expired entries and those from an older schema version
    Purge,
}

pub fn execute(command: CacheCommand, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let cache = config.cache.open()?;

    match command {
        CacheCommand::Stats => print_stats(&cache),
        CacheCommand::Clear { tags } => {
            let tags = parse_list(tags.as_deref());
            let removed = if tags.is_empty() {
                cache.clear()
            } else {
                cache.clear_by_tags(&tags[..])
            };
            println!("Removed {removed} entries");
        }
        CacheCommand::Purge => {
            let removed = cache.purge_stale();
            println!("Purged {removed} stale entries");
        }
    }
    Ok(())
}

fn print_stats(cache: &AdvancedCache) {
    let stats = cache.get_stats();
    let store = cache.store();

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Entries"), Cell::new(stats.total_items)]);
    table.add_row(vec![
        Cell::new("Total size"),
        Cell::new(format!("{} bytes", stats.total_size)),
    ]);
    table.add_row(vec![
        Cell::new("Average size"),
        Cell::new(format!("{} bytes", stats.average_item_size)),
    ]);
    table.add_row(vec![
        Cell::new("Store usage"),
        Cell::new(format!(
            "{} / {} bytes",
            store.used_bytes(),
            store.capacity_bytes()
        )),
    ]);
    table.add_row(vec![
        Cell::new("Oldest"),
        Cell::new(format_timestamp(stats.oldest_item)),
    ]);
    table.add_row(vec![
        Cell::new("Newest"),
        Cell::new(format_timestamp(stats.newest_item)),
    ]);
    if stats.corrupt_items > 0 {
        table.add_row(vec![Cell::new("Corrupt"), Cell::new(stats.corrupt_items)]);
    }
    println!("{table}");

    print_tags(&stats);
}

fn print_tags(stats: &CacheStats) {
    if stats.items_by_tag.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Tag", "Entries"]);
    for (tag, count) in &stats.items_by_tag {
        table.add_row(vec![Cell::new(tag), Cell::new(count)]);
    }
    println!("{table}");
}

fn format_timestamp(ms: Option<i64>) -> String {
    ms.and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
