//! Dashboard command - groups and counters at a glance.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use groupsave_client::{DashboardSnapshot, GroupSummary, Profile};
use groupsave_session::{FetchMode, FetchOutcome};

use super::{Context, api_error};

/// Arguments for the dashboard command.
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Bypass the freshness window and refetch
    #[arg(short, long)]
    pub refresh: bool,

    /// Show the stored copy without contacting the server
    #[arg(long, conflicts_with = "refresh")]
    pub cached: bool,
}

/// Run the dashboard command.
pub async fn run(args: DashboardArgs, ctx: &Context) -> Result<()> {
    let (manager, client) = ctx.signed_in().await?;
    let cache = ctx.dashboard_cache(&manager);
    let persisted = cache.load_persisted().await;

    if args.cached {
        return match persisted {
            Some(snapshot) => render(ctx, &snapshot, manager.profile().await.as_ref(), true),
            None => anyhow::bail!("No stored dashboard yet. Run 'groupsave dashboard' first."),
        };
    }

    let mode = if args.refresh {
        FetchMode::Force
    } else {
        FetchMode::Normal
    };

    match cache.fetch(&client, mode).await {
        Ok(FetchOutcome::Fetched(snapshot)) => {
            render(ctx, &snapshot, manager.profile().await.as_ref(), false)
        }
        Ok(FetchOutcome::Fresh | FetchOutcome::InFlight) => match cache.get().await {
            Some(snapshot) => render(ctx, &snapshot, manager.profile().await.as_ref(), false),
            None => Ok(()),
        },
        Ok(FetchOutcome::Discarded) => {
            anyhow::bail!("Your session ended while loading the dashboard")
        }
        Err(e) if e.is_auth_error() => Err(api_error(e)),
        Err(e) => match cache.get().await {
            Some(snapshot) => {
                eprintln!(
                    "{} {}",
                    Style::new().yellow().apply_to("Showing stored data:"),
                    e
                );
                render(ctx, &snapshot, manager.profile().await.as_ref(), true)
            }
            None => Err(api_error(e)),
        },
    }
}

fn render(
    ctx: &Context,
    snapshot: &DashboardSnapshot,
    profile: Option<&Profile>,
    stale: bool,
) -> Result<()> {
    if ctx.json_output {
        let output = serde_json::json!({
            "stale": stale,
            "user": profile,
            "dashboard": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let name = profile
        .and_then(|p| p.first_name())
        .unwrap_or_else(|| "there".to_string());

    println!();
    println!("{}", style(format!("Hello, {}", name)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    let s = &snapshot.stats;
    println!(
        "  {} {}   {} {}   {} {}",
        dim.apply_to("Groups:"),
        s.total_groups,
        dim.apply_to("Active:"),
        s.active_groups,
        dim.apply_to("Owned:"),
        s.owned_groups
    );
    println!(
        "  {} {}   {} {}",
        dim.apply_to("Invitations:"),
        s.pending_invitations,
        dim.apply_to("Unread:"),
        s.unread_notifications
    );

    print_groups("My groups", &snapshot.my_groups);
    print_groups("Suggested", &snapshot.top_groups);

    if stale {
        println!();
        println!("  {}", dim.apply_to("(stored copy; may be out of date)"));
    }
    println!();
    Ok(())
}

fn print_groups(heading: &str, groups: &[GroupSummary]) {
    let dim = Style::new().dim();
    println!();
    println!("{}", style(heading).bold());
    if groups.is_empty() {
        println!("  {}", dim.apply_to("none"));
        return;
    }
    for g in groups {
        let owner = g
            .owner
            .as_deref()
            .map(|o| format!(" by {}", o))
            .unwrap_or_default();
        println!(
            "  {} {}{}  {} {}/{} members ({:.0}%)  {} {}",
            dim.apply_to(format!("#{}", g.id)),
            g.title,
            dim.apply_to(owner),
            dim.apply_to("·"),
            g.active_members,
            g.total_members,
            g.progress_percent(),
            dim.apply_to("target"),
            g.target_amount
        );
    }
}
