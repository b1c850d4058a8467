//! Version command handler.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::warn;
use vpnlink_api::types::AppVersionInfo;

use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct VersionView {
    cli: &'static str,
    daemon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upgrade: Option<AppVersionInfo>,
}

fn version_detail(view: &VersionView) -> String {
    let mut out = format!("CLI:      {}\nDaemon:   {}", view.cli, view.daemon);
    if let Some(ref info) = view.upgrade {
        let _ = write!(
            out,
            "\nLatest:   {} (stable {})\nSupported: {}",
            info.latest,
            info.latest_stable,
            if info.current_is_supported { "yes" } else { "no" }
        );
    }
    out
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let daemon = ctx.rpc.get_current_version().await?;

    // Upgrade info needs the API server; report what we have without it.
    let upgrade = match ctx.rpc.get_version_info().await {
        Ok(info) => Some(info),
        Err(err) => {
            warn!(error = %err, "could not fetch upgrade information");
            None
        }
    };

    let view = VersionView {
        cli: env!("CARGO_PKG_VERSION"),
        daemon,
        upgrade,
    };
    let out = output::render_single(ctx.output, &view, version_detail)?;
    ctx.print(&out);
    Ok(())
}
