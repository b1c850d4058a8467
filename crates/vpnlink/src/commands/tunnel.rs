//! Tunnel command handlers: status, connect, disconnect.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use vpnlink_api::types::TunnelState;
use vpnlink_core::TunnelStateProxy;

use crate::cli::ConnectArgs;
use crate::error::CliError;
use crate::output;

use super::Context;
use super::location::describe_location;

/// How long `connect --wait` waits for the tunnel to settle.
const CONNECT_WAIT: Duration = Duration::from_secs(60);

/// How long `connect --wait` waits for the event subscription and the
/// current state before requesting the connect.
const SUBSCRIBE_WAIT: Duration = Duration::from_secs(10);

fn state_detail(state: &TunnelState, color: bool) -> String {
    let mut out = format!("Tunnel:   {}", output::paint_state(state, color));
    if let Some(details) = state.details() {
        let _ = write!(out, "\nEndpoint: {}", details.endpoint);
        if let Some(ref location) = details.location {
            let _ = write!(out, "\nLocation: {}", describe_location(location));
        }
    }
    out
}

fn print_state(ctx: &Context, state: &TunnelState) -> Result<(), CliError> {
    let out = output::render_single(ctx.output, state, |s| state_detail(s, ctx.color))?;
    ctx.print(&out);
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn status(ctx: &Context) -> Result<(), CliError> {
    let state = ctx.rpc.get_state().await?;
    print_state(ctx, &state)
}

pub async fn connect(ctx: &Context, args: &ConnectArgs) -> Result<(), CliError> {
    if !args.wait {
        ctx.rpc.connect_tunnel().await?;
        ctx.note("Connecting");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let proxy = TunnelStateProxy::new(
        ctx.rpc.clone(),
        Arc::new(move |state: TunnelState| {
            let _ = tx.send(state);
        }),
    );
    proxy.handle_open();

    // The first update comes from the reconciling fetch, which only runs
    // once the daemon has acknowledged the subscription.
    let current = tokio::time::timeout(SUBSCRIBE_WAIT, rx.recv())
        .await
        .map_err(|_| CliError::Timeout {
            what: "the daemon event subscription".into(),
            seconds: SUBSCRIBE_WAIT.as_secs(),
        })?
        .ok_or(CliError::ConnectionLost)?;
    if current.is_connected() {
        return print_state(ctx, &current);
    }

    ctx.rpc.connect_tunnel().await?;
    ctx.note("Connecting");

    let settled = tokio::time::timeout(CONNECT_WAIT, async {
        while let Some(state) = rx.recv().await {
            tracing::debug!(state = %state, "tunnel state changed");
            if matches!(state, TunnelState::Connected(_) | TunnelState::Blocked(_)) {
                return Some(state);
            }
        }
        None
    })
    .await
    .map_err(|_| CliError::Timeout {
        what: "the tunnel to connect".into(),
        seconds: CONNECT_WAIT.as_secs(),
    })?;

    let state = settled.ok_or(CliError::ConnectionLost)?;
    print_state(ctx, &state)
}

pub async fn disconnect(ctx: &Context) -> Result<(), CliError> {
    ctx.rpc.disconnect_tunnel().await?;
    ctx.note("Disconnected");
    Ok(())
}
