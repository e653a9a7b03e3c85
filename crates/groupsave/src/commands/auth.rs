//! Sign-in, sign-out and session status.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use groupsave_session::SessionState;
use serde::Serialize;

use super::{Context, api_error, format_remaining, prompt_password};

/// Arguments for the login command.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email (prompted if omitted)
    #[arg(short, long)]
    pub email: Option<String>,

    /// Read the password from this environment variable instead of prompting
    #[arg(long, value_name = "VAR")]
    pub password_env: Option<String>,
}

/// Status output for JSON mode.
#[derive(Debug, Serialize)]
struct StatusOutput {
    state: String,
    name: Option<String>,
    email: Option<String>,
    expires_at: Option<i64>,
    expires_in_secs: Option<u64>,
    api_url: String,
    data_dir: String,
}

/// Run the login command.
pub async fn login(args: LoginArgs, ctx: &Context) -> Result<()> {
    let email = match args.email {
        Some(email) => email,
        None => {
            print!("Email: ");
            std::io::stdout().flush()?;
            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };
    if email.is_empty() {
        bail!("Email must not be empty");
    }

    let password = match args.password_env {
        Some(var) => std::env::var(&var)
            .map_err(|_| anyhow::anyhow!("Environment variable {} is not set", var))?,
        None => prompt_password("Password: ", false)?,
    };

    let client = ctx.anonymous_client()?;
    let response = client
        .auth()
        .login(&email, &password)
        .await
        .map_err(api_error)?;

    let manager = ctx.session();
    manager.check().await;
    let state = manager.establish(&response).await;
    if !state.is_authenticated() {
        bail!("The server issued a token that has already expired");
    }

    if ctx.json_output {
        let output = serde_json::json!({
            "signed_in": true,
            "user": response.user,
            "expires_at": state.expires_at(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let green = Style::new().green();
    let dim = Style::new().dim();
    let greeting = response
        .user
        .as_ref()
        .and_then(|u| u.first_name())
        .unwrap_or_else(|| email.clone());
    println!("{} Welcome back, {}!", green.apply_to("✓"), greeting);
    if let Some(remaining) = manager.remaining() {
        println!(
            "  {} {}",
            dim.apply_to("Session expires in"),
            format_remaining(remaining)
        );
    }
    Ok(())
}

/// Run the logout command.
pub async fn logout(ctx: &Context) -> Result<()> {
    let manager = ctx.session();
    let signed_out = match manager.check().await {
        SessionState::Authenticated { .. } => manager.sign_out().await,
        _ => false,
    };

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "signed_out": signed_out }))?
        );
    } else if signed_out {
        println!("{} Signed out.", Style::new().green().apply_to("✓"));
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

/// Run the status command.
pub async fn status(ctx: &Context) -> Result<()> {
    let manager = ctx.session();
    let state = manager.check().await;
    let profile = if state.is_authenticated() {
        manager.profile().await
    } else {
        None
    };
    let remaining = manager.remaining();

    if ctx.json_output {
        let output = StatusOutput {
            state: state.to_string(),
            name: profile.as_ref().and_then(|p| p.name.clone()),
            email: profile.as_ref().and_then(|p| p.email.clone()),
            expires_at: state.expires_at(),
            expires_in_secs: remaining.map(|r| r.as_secs()),
            api_url: ctx.api_url.clone(),
            data_dir: ctx.data_dir.display().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("GroupSave Session").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();

    match state {
        SessionState::Authenticated { expires_at } => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().green().apply_to("● signed in")
            );
            if let Some(profile) = &profile {
                if let Some(name) = &profile.name {
                    println!("  {} {}", dim.apply_to("Name:"), name);
                }
                if let Some(email) = &profile.email {
                    println!("  {} {}", dim.apply_to("Email:"), email);
                }
            }
            match (expires_at, remaining) {
                (Some(at), Some(left)) => {
                    let when = chrono::DateTime::from_timestamp_millis(at)
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| at.to_string());
                    println!(
                        "  {} {} ({})",
                        dim.apply_to("Expires:"),
                        format_remaining(left),
                        dim.apply_to(when)
                    );
                }
                _ => println!(
                    "  {} {}",
                    dim.apply_to("Expires:"),
                    "until the server rejects it"
                ),
            }
        }
        SessionState::Expired => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().yellow().apply_to("● expired")
            );
        }
        _ => {
            println!(
                "  {} {}",
                dim.apply_to("Status:"),
                Style::new().red().apply_to("● signed out")
            );
        }
    }
    println!("  {} {}", dim.apply_to("API:"), ctx.api_url);
    if ctx.verbose {
        println!("  {} {}", dim.apply_to("Data:"), ctx.data_dir.display());
    }
    println!();
    Ok(())
}
