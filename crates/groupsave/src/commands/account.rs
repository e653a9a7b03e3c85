//! Account creation and password recovery.

use anyhow::Result;
use clap::{Args, Subcommand};
use groupsave_client::{RegisterRequest, ResetPasswordRequest};

use super::{Context, api_error, print_ack, prompt_password};

/// Arguments for the register command.
#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Email address
    #[arg(long)]
    pub email: String,

    /// Mobile number
    #[arg(long)]
    pub mobile: String,
}

/// Arguments for the verify-email command.
#[derive(Args, Debug)]
pub struct VerifyEmailArgs {
    /// Email address being verified
    #[arg(long)]
    pub email: String,

    /// One-time code from the verification email
    #[arg(long)]
    pub otp: String,
}

/// Arguments for the password command.
#[derive(Args, Debug)]
pub struct PasswordArgs {
    #[command(subcommand)]
    pub command: PasswordCommand,
}

#[derive(Subcommand, Debug)]
pub enum PasswordCommand {
    /// Send a reset code to the account's email
    Forgot {
        #[arg(long)]
        email: String,
    },

    /// Check a reset code before choosing a new password
    VerifyOtp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
    },

    /// Choose a new password using a verified reset code
    Reset {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
    },
}

/// Run the register command.
pub async fn register(args: RegisterArgs, ctx: &Context) -> Result<()> {
    let password = prompt_password("Password: ", true)?;
    let request = RegisterRequest {
        name: args.name,
        email: args.email.clone(),
        mobile: args.mobile,
        password: password.clone(),
        password_confirmation: password,
    };

    let response = ctx
        .anonymous_client()?
        .auth()
        .register(&request)
        .await
        .map_err(api_error)?;

    print_ack(ctx, response.message, "Account created.")?;
    if !ctx.json_output {
        println!(
            "  Verify it with: groupsave verify-email --email {} --otp <code>",
            args.email
        );
    }
    Ok(())
}

/// Run the verify-email command.
pub async fn verify_email(args: VerifyEmailArgs, ctx: &Context) -> Result<()> {
    let response = ctx
        .anonymous_client()?
        .auth()
        .verify_email(&args.email, &args.otp)
        .await
        .map_err(api_error)?;
    print_ack(ctx, response.message, "Email verified. You can now log in.")
}

/// Run the password command.
pub async fn password(args: PasswordArgs, ctx: &Context) -> Result<()> {
    let client = ctx.anonymous_client()?;
    let auth = client.auth();

    match args.command {
        PasswordCommand::Forgot { email } => {
            let response = auth.forgot_password(&email).await.map_err(api_error)?;
            print_ack(ctx, response.message, "A reset code is on its way.")
        }
        PasswordCommand::VerifyOtp { email, otp } => {
            let response = auth.verify_otp(&email, &otp).await.map_err(api_error)?;
            print_ack(ctx, response.message, "Code accepted.")
        }
        PasswordCommand::Reset { email, otp } => {
            let password = prompt_password("New password: ", true)?;
            let request = ResetPasswordRequest {
                email,
                otp,
                password: password.clone(),
                password_confirmation: password,
            };
            let response = auth.reset_password(&request).await.map_err(api_error)?;
            print_ack(ctx, response.message, "Password changed. You can now log in.")
        }
    }
}
