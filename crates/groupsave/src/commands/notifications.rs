//! Notifications command - the inbox.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use groupsave_client::Notification;

use super::{Context, api_error, print_ack};

/// Arguments for the notifications command.
#[derive(Args, Debug)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// List notifications
    List {
        /// Only show unread notifications
        #[arg(short, long)]
        unread: bool,
    },

    /// Show one notification with its related records
    Show {
        /// Notification ID
        id: String,
    },

    /// Mark a notification as read
    Read {
        /// Notification ID
        id: String,
    },

    /// Mark every notification as read
    ReadAll,
}

/// Run the notifications command.
pub async fn run(args: NotificationsArgs, ctx: &Context) -> Result<()> {
    let (_manager, client) = ctx.signed_in().await?;
    let api = client.notifications();

    match args.command {
        NotificationsCommand::List { unread } => {
            let page = api.list().await.map_err(api_error)?;
            let items: Vec<&Notification> = page
                .items
                .iter()
                .filter(|n| !unread || !n.is_read())
                .collect();

            if ctx.json_output {
                let output = serde_json::json!({
                    "unread_count": page.unread_count,
                    "notifications": items,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            let dim = Style::new().dim();
            println!();
            println!(
                "{} {}",
                style("Notifications").bold(),
                dim.apply_to(format!("({} unread)", page.unread_count))
            );
            println!("{}", dim.apply_to("─".repeat(40)));
            if items.is_empty() {
                println!("  {}", dim.apply_to("Nothing here."));
            }
            for n in items {
                print_line(n);
            }
            println!();
            Ok(())
        }
        NotificationsCommand::Show { id } => {
            let detail = api.get(&id).await.map_err(api_error)?;
            if ctx.json_output {
                let output = serde_json::json!({
                    "notification": detail.notification,
                    "related": detail.related,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
                return Ok(());
            }

            let n = &detail.notification;
            let dim = Style::new().dim();
            println!();
            println!("{}", style(n.title()).bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            if let Some(message) = &n.data.message {
                println!("  {}", message);
            }
            if let Some(group) = &n.data.group_title {
                println!("  {} {}", dim.apply_to("Group:"), group);
            }
            if let Some(user) = &n.data.user_name {
                println!("  {} {}", dim.apply_to("From:"), user);
            }
            if let Some(amount) = &n.data.amount {
                println!("  {} {}", dim.apply_to("Amount:"), amount);
            }
            if let (Some(group), Some(request)) = (n.data.group_id, n.data.join_request_id) {
                println!();
                println!(
                    "  {} groupsave group approve {} {}",
                    dim.apply_to("Respond with:"),
                    group,
                    request
                );
            }
            if let Some(related) = &detail.related
                && ctx.verbose
            {
                println!();
                println!("{}", dim.apply_to(serde_json::to_string_pretty(related)?));
            }
            println!();
            println!("  {} {}", dim.apply_to("Received:"), n.created_at);
            println!();
            Ok(())
        }
        NotificationsCommand::Read { id } => {
            let response = api.mark_read(&id).await.map_err(api_error)?;
            print_ack(ctx, response.message, "Marked as read.")
        }
        NotificationsCommand::ReadAll => {
            let response = api.mark_all_read().await.map_err(api_error)?;
            print_ack(ctx, response.message, "All notifications marked as read.")
        }
    }
}

fn print_line(n: &Notification) {
    let dim = Style::new().dim();
    let marker = if n.is_read() {
        dim.apply_to("○").to_string()
    } else {
        Style::new().cyan().apply_to("●").to_string()
    };
    let detail = n
        .data
        .message
        .as_deref()
        .or(n.data.group_title.as_deref())
        .unwrap_or_default();
    println!(
        "  {} {}  {}  {}",
        marker,
        n.title(),
        dim.apply_to(detail),
        dim.apply_to(&n.id)
    );
}
