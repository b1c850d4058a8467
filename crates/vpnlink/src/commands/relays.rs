//! Relay list command handler.

use serde::Serialize;
use tabled::Tabled;
use vpnlink_api::types::{Relay, RelayList};

use crate::cli::RelaysArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

// ── Table row ───────────────────────────────────────────────────────

/// One relay, flattened with its country and city.
#[derive(Debug, Serialize)]
struct RelayEntry<'a> {
    country: &'a str,
    country_code: &'a str,
    city: &'a str,
    city_code: &'a str,
    #[serde(flatten)]
    relay: &'a Relay,
}

#[derive(Tabled)]
struct RelayRow {
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "IPv4")]
    ipv4: String,
    #[tabled(rename = "Tunnels")]
    tunnels: String,
    #[tabled(rename = "Bridge")]
    bridge: String,
}

impl From<&RelayEntry<'_>> for RelayRow {
    fn from(e: &RelayEntry<'_>) -> Self {
        let tunnels = e.relay.tunnels.as_ref().map_or_else(String::new, |t| {
            let mut kinds = Vec::new();
            if !t.openvpn.is_empty() {
                kinds.push("openvpn");
            }
            if !t.wireguard.is_empty() {
                kinds.push("wireguard");
            }
            kinds.join(", ")
        });
        let bridge = e
            .relay
            .bridges
            .as_ref()
            .is_some_and(|b| !b.shadowsocks.is_empty());
        Self {
            country: e.country.to_owned(),
            city: e.city.to_owned(),
            hostname: e.relay.hostname.clone(),
            ipv4: e.relay.ipv4_addr_in.clone(),
            tunnels,
            bridge: if bridge { "yes" } else { "" }.into(),
        }
    }
}

fn entries<'a>(list: &'a RelayList, country: Option<&str>) -> Vec<RelayEntry<'a>> {
    list.countries
        .iter()
        .filter(|c| {
            country.is_none_or(|wanted| {
                c.code.eq_ignore_ascii_case(wanted) || c.name.eq_ignore_ascii_case(wanted)
            })
        })
        .flat_map(|country| {
            country.cities.iter().flat_map(move |city| {
                city.relays.iter().map(move |relay| RelayEntry {
                    country: &country.name,
                    country_code: &country.code,
                    city: &city.name,
                    city_code: &city.code,
                    relay,
                })
            })
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: &RelaysArgs) -> Result<(), CliError> {
    let list = ctx.rpc.get_relay_locations().await?;
    let relays = entries(&list, args.country.as_deref());
    tracing::debug!(total = list.relay_count(), shown = relays.len(), "relay list");

    let out = output::render_list(ctx.output, &relays, |e| RelayRow::from(e))?;
    ctx.print(&out);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn list() -> RelayList {
        serde_json::from_value(serde_json::json!({
            "countries": [
                {"name": "Sweden", "code": "se", "cities": [
                    {"name": "Gothenburg", "code": "got", "latitude": 57.7, "longitude": 11.9, "relays": [
                        {"hostname": "se-got-001", "ipv4_addr_in": "185.213.154.1",
                         "include_in_country": true, "weight": 100,
                         "tunnels": {"openvpn": [{"port": 1194, "protocol": "udp"}], "wireguard": []}}
                    ]}
                ]},
                {"name": "Norway", "code": "no", "cities": [
                    {"name": "Oslo", "code": "osl", "latitude": 59.9, "longitude": 10.7, "relays": [
                        {"hostname": "no-osl-001", "ipv4_addr_in": "91.90.44.1",
                         "include_in_country": true, "weight": 50}
                    ]}
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn country_filter_matches_name_or_code() {
        let list = list();
        assert_eq!(entries(&list, None).len(), 2);
        assert_eq!(entries(&list, Some("SE"))[0].relay.hostname, "se-got-001");
        assert_eq!(entries(&list, Some("norway"))[0].city, "Oslo");
        assert!(entries(&list, Some("fi")).is_empty());
    }

    #[test]
    fn row_lists_tunnel_kinds() {
        let list = list();
        let row = RelayRow::from(&entries(&list, Some("se"))[0]);
        assert_eq!(row.tunnels, "openvpn");
        assert_eq!(row.bridge, "");
    }
}
