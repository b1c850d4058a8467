//! Event streaming: prints every `daemon_event` push until Ctrl-C or until
//! the daemon goes away.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use vpnlink_api::types::{DaemonEvent, KeygenEvent};
use vpnlink_api::{ConnectionObserver, SubscriptionListener};

use crate::error::CliError;
use crate::output;

use super::Context;

enum Feed {
    Event(DaemonEvent),
    Invalid(vpnlink_api::Error),
    Closed,
}

fn event_line(event: &DaemonEvent, color: bool) -> String {
    let time = chrono::Local::now().format("%H:%M:%S");
    let summary = match event {
        DaemonEvent::TunnelState(state) => output::paint_state(state, color),
        DaemonEvent::Settings(settings) => format!(
            "allow_lan={} bridge={} auto_connect={}",
            settings.allow_lan, settings.bridge_state, settings.auto_connect
        ),
        DaemonEvent::RelayList(list) => format!("{} relays", list.relay_count()),
        DaemonEvent::WireguardKey(KeygenEvent::NewKey(key)) => format!("new key {key}"),
        DaemonEvent::WireguardKey(KeygenEvent::TooManyKeys) => "too many keys".into(),
        DaemonEvent::WireguardKey(KeygenEvent::GenerationFailure) => "generation failed".into(),
    };
    format!("{time} {:<13} {summary}", event.kind())
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let listener = Arc::new(SubscriptionListener::new(
        {
            let tx = tx.clone();
            move |event: DaemonEvent| {
                let _ = tx.send(Feed::Event(event));
            }
        },
        {
            let tx = tx.clone();
            move |error: vpnlink_api::Error| {
                let _ = tx.send(Feed::Invalid(error));
            }
        },
    ));
    let observer = Arc::new(ConnectionObserver::new(
        || {},
        move |error: Option<&vpnlink_api::Error>| {
            if let Some(error) = error {
                warn!(error = %error, "daemon connection closed");
            }
            let _ = tx.send(Feed::Closed);
        },
    ));

    ctx.rpc.add_connection_observer(&observer);
    ctx.rpc.subscribe_daemon_event_listener(&listener).await?;
    ctx.note("Streaming daemon events, press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            biased;
            _ = &mut ctrl_c => {
                info!("interrupted");
                break Ok(());
            }
            feed = rx.recv() => match feed {
                Some(Feed::Event(event)) => {
                    let line = output::render_line(ctx.output, &event, |e| event_line(e, ctx.color))?;
                    ctx.print(&line);
                }
                Some(Feed::Invalid(error)) => warn!(error = %error, "skipping invalid daemon event"),
                Some(Feed::Closed) | None => break Err(CliError::ConnectionLost),
            },
        }
    };

    ctx.rpc.remove_event_listener(&listener);
    ctx.rpc.remove_connection_observer(&observer);
    result
}
