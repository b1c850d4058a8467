//! Settings command handlers: show, allow-lan, bridge.

use std::fmt::Write as _;

use vpnlink_api::types::{BridgeSettings, BridgeState, RelaySettings, Settings, TunnelConstraints};

use crate::cli::{BridgeArg, Toggle};
use crate::error::CliError;
use crate::output;

use super::Context;

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn relay_summary(relay: &RelaySettings) -> String {
    match relay {
        RelaySettings::Normal(normal) => {
            let tunnel = match normal.tunnel.as_only() {
                None => "any tunnel".to_owned(),
                Some(TunnelConstraints::Openvpn(c)) => {
                    format!("openvpn, port {}, protocol {}", c.port, c.protocol)
                }
                Some(TunnelConstraints::Wireguard(c)) => format!("wireguard, port {}", c.port),
            };
            format!("{} ({tunnel})", normal.location)
        }
        RelaySettings::CustomTunnelEndpoint(custom) => format!("custom endpoint {}", custom.host),
    }
}

fn settings_detail(s: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Relay:                    {}", relay_summary(&s.relay_settings));
    let _ = writeln!(out, "Allow LAN:                {}", on_off(s.allow_lan));
    let _ = writeln!(out, "Auto-connect:             {}", on_off(s.auto_connect));
    let _ = writeln!(out, "Block when disconnected:  {}", on_off(s.block_when_disconnected));
    let _ = writeln!(out, "Bridge mode:              {}", s.bridge_state);
    if let BridgeSettings::Normal { ref location } = s.bridge_settings {
        let _ = writeln!(out, "Bridge location:          {location}");
    }
    let _ = writeln!(
        out,
        "IPv6:                     {}",
        on_off(s.tunnel_options.generic.enable_ipv6)
    );
    if let Some(mssfix) = s.tunnel_options.openvpn.mssfix {
        let _ = writeln!(out, "OpenVPN mssfix:           {mssfix}");
    }
    if let Some(mtu) = s.tunnel_options.wireguard.mtu {
        let _ = writeln!(out, "WireGuard MTU:            {mtu}");
    }
    out.trim_end().to_owned()
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn show(ctx: &Context) -> Result<(), CliError> {
    let settings = ctx.rpc.get_settings().await?;
    let out = output::render_single(ctx.output, &settings, settings_detail)?;
    ctx.print(&out);
    Ok(())
}

pub async fn allow_lan(ctx: &Context, state: Toggle) -> Result<(), CliError> {
    ctx.rpc.set_allow_lan(state.enabled()).await?;
    ctx.note(&format!("Allow LAN: {}", on_off(state.enabled())));
    Ok(())
}

pub async fn bridge(ctx: &Context, state: BridgeArg) -> Result<(), CliError> {
    let state = match state {
        BridgeArg::On => BridgeState::On,
        BridgeArg::Auto => BridgeState::Auto,
        BridgeArg::Off => BridgeState::Off,
    };
    ctx.rpc.set_bridge_state(state).await?;
    ctx.note(&format!("Bridge mode: {state}"));
    Ok(())
}
