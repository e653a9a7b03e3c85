//! Group command - details, membership and join requests.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::{Style, style};
use groupsave_client::CreateGroupRequest;

use super::{Context, api_error, print_ack};

/// Arguments for the group command.
#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Show a group and its members
    Show {
        /// Group ID
        id: u64,
    },

    /// Ask to join a group
    Join {
        /// Group ID
        id: u64,
    },

    /// Create a new group
    Create {
        /// Group name
        #[arg(long)]
        title: String,

        /// Number of seats, including yours
        #[arg(long)]
        members: u32,

        /// Target amount collected per cycle
        #[arg(long)]
        amount: f64,

        /// First cycle start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Day of the month payouts happen (1-31)
        #[arg(long)]
        payout_day: u32,

        /// Invite a member by email (repeatable)
        #[arg(long = "invite", value_name = "EMAIL")]
        invites: Vec<String>,
    },

    /// Approve a pending join request
    Approve {
        /// Group ID
        group: u64,
        /// Join request ID
        request: u64,
    },

    /// Reject a pending join request
    Reject {
        /// Group ID
        group: u64,
        /// Join request ID
        request: u64,
    },
}

/// Run the group command.
pub async fn run(args: GroupArgs, ctx: &Context) -> Result<()> {
    let (manager, client) = ctx.signed_in().await?;
    let groups = client.groups();

    match args.command {
        GroupCommand::Show { id } => {
            let group = groups.get(id).await.map_err(api_error)?;
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&group)?);
                return Ok(());
            }

            let dim = Style::new().dim();
            println!();
            println!("{}", style(&group.title).bold());
            println!("{}", dim.apply_to("─".repeat(40)));
            println!(
                "  {} {}/{} ({:.0}%)",
                dim.apply_to("Members:"),
                group.active_users_count,
                group.total_users,
                group.progress_percent()
            );
            println!("  {} {}", dim.apply_to("Target:"), group.target_amount);
            if let Some(payable) = &group.payable_amount {
                println!("  {} {}", dim.apply_to("Per member:"), payable);
            }
            if let Some(start) = &group.expected_start_date {
                println!("  {} {}", dim.apply_to("Starts:"), start);
            }
            if let Some(day) = group.payment_out_day {
                println!("  {} day {}", dim.apply_to("Payout:"), day);
            }
            if let Some(month) = group.current_month {
                println!("  {} {}", dim.apply_to("Cycle:"), month);
            }

            let me = manager.profile().await.and_then(|p| p.email);
            if let Some(membership) = me.as_deref().and_then(|e| group.membership_for(e)) {
                println!(
                    "  {} {}{}",
                    dim.apply_to("You:"),
                    membership.role,
                    if membership.is_active { "" } else { " (pending)" }
                );
            }

            println!();
            for member in &group.users {
                let name = member
                    .name
                    .as_deref()
                    .or(member.email.as_deref())
                    .unwrap_or("unknown");
                let position = member
                    .pivot
                    .payout_position
                    .map(|p| format!("#{}", p))
                    .unwrap_or_else(|| "-".to_string());
                let status = if member.pivot.is_active {
                    Style::new().green().apply_to("active")
                } else {
                    Style::new().yellow().apply_to("pending")
                };
                println!(
                    "  {:>4}  {}  {}  {}",
                    dim.apply_to(position),
                    name,
                    dim.apply_to(&member.pivot.role),
                    status
                );
            }
            println!();
            Ok(())
        }
        GroupCommand::Join { id } => {
            let response = groups.join(id).await.map_err(api_error)?;
            print_ack(ctx, response.message, "Join request sent.")
        }
        GroupCommand::Create {
            title,
            members,
            amount,
            start_date,
            payout_day,
            invites,
        } => {
            if !(1..=31).contains(&payout_day) {
                bail!("--payout-day must be between 1 and 31");
            }
            if chrono::NaiveDate::parse_from_str(&start_date, "%Y-%m-%d").is_err() {
                bail!("--start-date must look like 2025-01-31");
            }
            let request = CreateGroupRequest {
                title,
                total_users: members,
                target_amount: amount,
                expected_start_date: start_date,
                payment_out_day: payout_day,
                members_emails: invites,
            };
            let response = groups.create(&request).await.map_err(api_error)?;
            print_ack(ctx, response.message, "Group created.")
        }
        GroupCommand::Approve { group, request } => {
            let response = groups
                .approve_join_request(group, request)
                .await
                .map_err(api_error)?;
            print_ack(ctx, response.message, "Join request approved.")
        }
        GroupCommand::Reject { group, request } => {
            let response = groups
                .reject_join_request(group, request)
                .await
                .map_err(api_error)?;
            print_ack(ctx, response.message, "Join request rejected.")
        }
    }
}
