//! Auth subcommands: login, signup, logout, status, refresh, change-password.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use ringside_auth::api::{Credentials, Registration};
use ringside_core::StoreSnapshot;
use ringside_core::token::{expires_in, now_secs};

use crate::context::Context;

/// Auth subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum AuthAction {
    /// Log in and save the session.
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "RINGSIDE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in.
    Signup {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "RINGSIDE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Forget the saved session.
    Logout,
    /// Show the saved session.
    Status,
    /// Exchange the current token for a new one.
    Refresh,
    /// Change the logged-in user's password.
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

/// Execute an auth subcommand.
pub async fn run(action: AuthAction, ctx: &Context) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        AuthAction::Login { email, password } => {
            let outcome = ctx
                .manager
                .login(&Credentials::new(email, password))
                .await?;
            writeln!(out, "Logged in as {}", outcome.user.display_name())?;
        }
        AuthAction::Signup {
            email,
            password,
            first_name,
            last_name,
        } => {
            let outcome = ctx
                .manager
                .signup(&Registration {
                    email,
                    password,
                    first_name,
                    last_name,
                })
                .await?;
            if let Some(message) = outcome.message {
                writeln!(out, "{message}")?;
            }
            writeln!(out, "Signed up as {}", outcome.user.display_name())?;
        }
        AuthAction::Logout => {
            ctx.manager.logout(None);
            writeln!(out, "Logged out")?;
        }
        AuthAction::Status => {
            for line in status_lines(&ctx.store.snapshot(), now_secs()) {
                writeln!(out, "{line}")?;
            }
        }
        AuthAction::Refresh => {
            ctx.manager.refresh_token().await?;
            writeln!(out, "Session refreshed")?;
        }
        AuthAction::ChangePassword { current, new } => {
            ctx.client.change_password(&current, &new).await?;
            writeln!(out, "Password changed")?;
        }
    }
    Ok(())
}

/// Human-readable description of the saved session.
pub fn status_lines(snapshot: &StoreSnapshot, now: i64) -> Vec<String> {
    let Some(session) = &snapshot.session else {
        return vec!["Not logged in".to_string()];
    };
    let user = session.user();
    let expiry = match expires_in(session.token(), now) {
        Some(secs) if secs > 0 => format!("Token expires in {secs}s"),
        Some(_) => "Token expired".to_string(),
        None => "Token expiry unknown".to_string(),
    };
    vec![
        format!("Logged in as: {} <{}>", user.display_name(), user.email),
        format!("Role: {}", user.role),
        format!("User ID: {}", user.id),
        expiry,
    ]
}
