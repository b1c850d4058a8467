//! Location command handler.

use std::fmt::Write as _;
use std::time::Duration;

use vpnlink_api::types::Location;
use vpnlink_core::LocationFetcher;

use crate::cli::LocationArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

/// Upper bound for `location --wait`.
const LOCATION_WAIT: Duration = Duration::from_secs(120);

/// `City, Country` or just the country.
pub fn describe_location(location: &Location) -> String {
    match location.city {
        Some(ref city) => format!("{city}, {}", location.country),
        None => location.country.clone(),
    }
}

fn location_detail(location: Option<&Location>) -> String {
    let Some(location) = location else {
        return "Location unknown".into();
    };
    let mut out = format!("Location: {}", describe_location(location));
    if let Some(ref ip) = location.ipv4 {
        let _ = write!(out, "\nIPv4:     {ip}");
    }
    if let Some(ref ip) = location.ipv6 {
        let _ = write!(out, "\nIPv6:     {ip}");
    }
    if let Some(ref hostname) = location.hostname {
        let _ = write!(out, "\nRelay:    {hostname}");
    }
    if let Some(ref bridge) = location.bridge_hostname {
        let _ = write!(out, "\nBridge:   {bridge}");
    }
    let _ = write!(
        out,
        "\nPosition: {:.4}, {:.4}\nSecured:  {}",
        location.latitude,
        location.longitude,
        if location.is_vpn_exit { "yes" } else { "no" }
    );
    out
}

pub async fn handle(ctx: &Context, args: &LocationArgs) -> Result<(), CliError> {
    let location = if args.wait {
        let fetcher = LocationFetcher::new(ctx.rpc.clone());
        tokio::time::timeout(LOCATION_WAIT, fetcher.fetch())
            .await
            .map_err(|_| CliError::Timeout {
                what: "the location".into(),
                seconds: LOCATION_WAIT.as_secs(),
            })??
    } else {
        ctx.rpc.get_location().await?
    };

    let out = output::render_single(ctx.output, &location, |l| location_detail(l.as_ref()))?;
    ctx.print(&out);
    Ok(())
}
