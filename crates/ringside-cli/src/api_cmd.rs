//! API subcommands: authenticated GET and the `watch` session monitor.

use std::io::{self, Write};

use tracing::info;

use ringside_auth::{GuardState, GuardView, Keepalive, RouteGuard};
use ringside_core::Role;

use crate::context::Context;

/// GET `path` and print the response body. Non-2xx statuses fail the command.
pub async fn get(ctx: &Context, path: &str) -> anyhow::Result<()> {
    let response = ctx.client.get(path).await?;
    let mut out = io::stdout();
    match response.json_value() {
        Some(json) => writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?,
        None => writeln!(out, "{}", response.body)?,
    }
    if !response.is_success() {
        anyhow::bail!("Request failed with status {}", response.status);
    }
    Ok(())
}

/// Hold a protected view open: report guard decisions and keep the token
/// fresh until the session ends or Ctrl-C.
pub async fn watch(ctx: &Context, role: Option<Role>) -> anyhow::Result<()> {
    let mut guard = RouteGuard::new(ctx.manager.clone(), role);
    let keepalive = Keepalive::spawn(ctx.manager.clone(), ctx.config.keepalive_interval());

    let outcome = tokio::select! {
        state = guard.watch(|view| {
            let _ = writeln!(io::stdout(), "{}", describe(view));
        }) => Some(state),
        _ = tokio::signal::ctrl_c() => None,
    };
    keepalive.stop().await;

    match outcome {
        Some(GuardState::Unauthorized { redirect }) => {
            anyhow::bail!("Access ended (redirected to {redirect})")
        }
        Some(state) => {
            info!(?state, "Session watch ended");
            Ok(())
        }
        None => {
            info!("Interrupted");
            Ok(())
        }
    }
}

pub const fn describe(view: GuardView) -> &'static str {
    match view {
        GuardView::Loading => "Loading session...",
        GuardView::Protected => "Session active",
        GuardView::Degraded => "Session kept, but the server could not confirm it",
        GuardView::Nothing => "No access",
    }
}
