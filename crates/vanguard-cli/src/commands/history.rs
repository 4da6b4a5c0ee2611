//! Task history commands

use crate::app::App;
use crate::args::HistoryAction;
use chrono::{Local, TimeZone};
use colored::*;
use tokio::sync::mpsc;
use vanguard_core::state::parse_history_items;
use vanguard_core::{GlobalStateKey, HistoryItem, VanguardResult};

pub async fn run(app: &App, action: HistoryAction) -> VanguardResult<()> {
    match action {
        HistoryAction::List { limit } => {
            print_history(app, limit)?;
            Ok(())
        }
        HistoryAction::Watch => watch(app).await,
    }
}

fn print_history(app: &App, limit: Option<usize>) -> VanguardResult<()> {
    let history = app
        .state()
        .get_global(GlobalStateKey::TaskHistory)?
        .unwrap_or_default();
    let mut items = parse_history_items(&history);
    items.sort_by(|a, b| b.ts.cmp(&a.ts));
    if let Some(limit) = limit {
        items.truncate(limit);
    }

    app.console.print_header("Task history");
    if items.is_empty() {
        app.console.info("No tasks yet");
    }
    for item in &items {
        println!("{}", format_item(item));
    }
    Ok(())
}

/// Reprint the history on every external rewrite until Ctrl-C
async fn watch(app: &App) -> VanguardResult<()> {
    if !app.config.storage.watch_history {
        app.console
            .warn("History watching is disabled (storage.watch_history = false)");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    app.state().on_sync_external_change(move || {
        let _ = tx.send(());
    });
    app.console.info(&format!(
        "Watching {} (Ctrl-C to stop)",
        app.state().storage().task_history_path().display()
    ));

    loop {
        tokio::select! {
            changed = rx.recv() => {
                if changed.is_none() {
                    break;
                }
                print_history(app, None)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

fn format_item(item: &HistoryItem) -> String {
    let when = Local
        .timestamp_millis_opt(item.ts)
        .single()
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let cost = item
        .total_cost
        .map(|cost| format!(" ${:.4}", cost))
        .unwrap_or_default();
    format!(
        "  {} {} {} {}",
        when.dimmed(),
        item.id.cyan(),
        truncate(&item.task, 60),
        format!("({} in / {} out{})", item.tokens_in, item.tokens_out, cost).dimmed()
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("first\nsecond", 10), "first");
        assert_eq!(truncate("abcdefghijkl", 5), "abcd…");
    }
}
