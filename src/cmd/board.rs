//! Board commands: `boardsync board` and `boardsync move`.

use anyhow::{Context, Result, bail};
use boardsync::board::{BoardFilters, BoardSync, BoardView, MoveOutcome, NotificationLevel};
use boardsync::common::{IssueStatus, Priority};
use boardsync::config::SyncConfig;
use console::style;

/// Project id from the flag, else from `board.default_project`.
pub fn resolve_project(config: &SyncConfig, flag: Option<&str>) -> Result<String> {
    match flag.map(str::to_string).or_else(|| config.board.default_project.clone()) {
        Some(project) => Ok(project),
        None => bail!("No project given. Pass --project or set board.default_project in boardsync.toml."),
    }
}

pub async fn cmd_board(config: &SyncConfig, project: &str, filters: BoardFilters) -> Result<()> {
    let mut sync = BoardSync::from_config(project, config).context("Failed to create API client")?;
    sync.set_filters(filters);
    sync.reload()
        .await
        .with_context(|| format!("Failed to load issues for project {}", project))?;

    print_board(&sync.view(), sync.filters().is_active());
    Ok(())
}

fn priority_label(priority: Priority) -> String {
    let text = format!("[{}]", priority);
    match priority {
        Priority::Critical | Priority::High => style(text).red().to_string(),
        Priority::Medium => style(text).yellow().to_string(),
        Priority::Low | Priority::Lowest => style(text).dim().to_string(),
    }
}

fn print_board(view: &BoardView, filtered: bool) {
    println!();
    for column in &view.columns {
        println!("{} ({})", style(column.title).bold(), column.issues.len());
        for issue in &column.issues {
            println!(
                "  {:<10} {} {}",
                style(&issue.key).cyan(),
                priority_label(issue.priority),
                issue.title
            );
        }
        println!();
    }
    if filtered {
        println!("{}", style(format!("{} issues match the filters", view.total())).dim());
    } else {
        println!("{}", style(format!("{} issues", view.total())).dim());
    }
}

pub async fn cmd_move(
    config: &SyncConfig,
    project: &str,
    issue_id: &str,
    status: IssueStatus,
    index: Option<usize>,
) -> Result<()> {
    let sync = BoardSync::from_config(project, config).context("Failed to create API client")?;
    let mut notifications = sync.subscribe();
    sync.reload()
        .await
        .with_context(|| format!("Failed to load issues for project {}", project))?;

    let Some((key, from)) = sync
        .board()
        .read(|cache| cache.get(issue_id).map(|i| (i.key.clone(), i.status)))
    else {
        bail!("Issue {} is not on the board of project {}", issue_id, project);
    };

    let outcome = sync
        .move_issue(issue_id, status, index.unwrap_or(usize::MAX))
        .await;

    while let Ok(note) = notifications.try_recv() {
        match note.level {
            NotificationLevel::Error => eprintln!("{}", style(&note.message).red()),
            _ => eprintln!("{}", note.message),
        }
    }

    match outcome {
        MoveOutcome::Unchanged => println!("{} is already in {}", key, from.title()),
        MoveOutcome::Confirmed => println!(
            "{} moved: {} {} {}",
            key,
            from.title(),
            style("→").dim(),
            style(status.title()).green()
        ),
        MoveOutcome::RolledBack => bail!("Move of {} to {} was rolled back", key, status.title()),
        MoveOutcome::Missing | MoveOutcome::Superseded => {
            bail!("Move of {} did not complete", key)
        }
    }
    Ok(())
}
