//! Watch command - run the session lifecycle in the foreground.
//!
//! Keeps the expiry timer and poll armed, refreshes the dashboard on an
//! interval, and treats each Enter keypress as the app returning to the
//! foreground.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use clap::Args;
use console::Style;
use groupsave_client::GroupSaveClient;
use groupsave_session::{DashboardCache, FetchMode, FetchOutcome, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::{Context, format_remaining};
use crate::navigator::TerminalNavigator;

/// Arguments for the watch command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between dashboard refresh attempts
    #[arg(long, default_value = "30")]
    pub refresh_secs: u64,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, ctx: &Context) -> Result<()> {
    let manager = ctx.session();
    manager.attach_navigator(Arc::new(TerminalNavigator));
    let mut events = manager.events();

    let state = manager.start().await;
    if !state.is_authenticated() {
        manager.stop();
        bail!("No active session to watch");
    }

    let client = ctx.client(&manager)?;
    let cache = ctx.dashboard_cache(&manager);
    cache.load_persisted().await;

    let dim = Style::new().dim();
    if !ctx.json_output {
        match manager.remaining() {
            Some(left) => println!(
                "Watching session (expires in {}). {}",
                format_remaining(left),
                dim.apply_to("Enter = resume, Ctrl-C = quit")
            ),
            None => println!(
                "Watching session (no expiry). {}",
                dim.apply_to("Enter = resume, Ctrl-C = quit")
            ),
        }
    }

    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::debug!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::SignedOut { .. }) => {
                    cache.clear().await;
                    report(ctx, "signed_out", None);
                    break;
                }
                Ok(SessionEvent::Expired { cause }) => {
                    report(ctx, "expired", Some(cause.to_string()));
                }
                Ok(SessionEvent::SignedIn { .. }) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Missed session events");
                }
                Err(RecvError::Closed) => break,
            },
            _ = refresh.tick() => {
                refresh_dashboard(ctx, &cache, &client, FetchMode::Normal).await;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    let state = manager.foreground_resumed().await;
                    if state.is_authenticated() {
                        if let Some(left) = manager.remaining() {
                            report(ctx, "resumed", Some(format!("expires in {}", format_remaining(left))));
                        } else {
                            report(ctx, "resumed", None);
                        }
                        refresh_dashboard(ctx, &cache, &client, FetchMode::Normal).await;
                    }
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }

    manager.stop();
    Ok(())
}

async fn refresh_dashboard(
    ctx: &Context,
    cache: &DashboardCache,
    client: &GroupSaveClient,
    mode: FetchMode,
) {
    match cache.fetch(client, mode).await {
        Ok(FetchOutcome::Fetched(snapshot)) => {
            let detail = format!(
                "{} groups, {} unread",
                snapshot.my_groups.len(),
                snapshot.stats.unread_notifications
            );
            report(ctx, "dashboard", Some(detail));
        }
        Ok(FetchOutcome::Fresh) => {
            if ctx.verbose {
                report(ctx, "dashboard", Some("fresh".to_string()));
            }
        }
        Ok(FetchOutcome::InFlight | FetchOutcome::Discarded) => {}
        // A rejection arrives as a SignedOut event.
        Err(e) if e.is_auth_error() => {}
        Err(e) => report(ctx, "dashboard_error", Some(e.to_string())),
    }
}

fn report(ctx: &Context, kind: &str, detail: Option<String>) {
    let now = Local::now();
    if ctx.json_output {
        let line = serde_json::json!({
            "at": now.to_rfc3339(),
            "event": kind,
            "detail": detail,
        });
        println!("{}", line);
        return;
    }
    let dim = Style::new().dim();
    match detail {
        Some(detail) => println!(
            "{} {} {}",
            dim.apply_to(now.format("%H:%M:%S")),
            kind,
            dim.apply_to(detail)
        ),
        None => println!("{} {}", dim.apply_to(now.format("%H:%M:%S")), kind),
    }
}
