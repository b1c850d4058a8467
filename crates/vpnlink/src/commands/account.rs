//! Account command handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use vpnlink_api::types::AccountData;
use vpnlink_core::{AccountDataFetcher, AccountExpiry};

use crate::cli::AccountArgs;
use crate::config;
use crate::error::CliError;
use crate::output;

use super::Context;

#[derive(Debug, Serialize)]
struct AccountView {
    account: String,
    expiry: DateTime<Utc>,
    expired: bool,
    remaining: String,
}

fn account_detail(view: &AccountView) -> String {
    format!(
        "Account:  {}\nExpires:  {}\nStatus:   {}",
        view.account,
        view.expiry.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"),
        if view.expired { "expired" } else { view.remaining.as_str() }
    )
}

/// Show only the last four characters of a token.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let keep = chars.len().min(4);
    let hidden = chars.len() - keep;
    let tail: String = chars.get(hidden..).unwrap_or_default().iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}

/// Token from the credential chain, then the daemon's logged-in account.
async fn current_token(ctx: &Context) -> Result<SecretString, CliError> {
    match config::resolve_account_token(&ctx.config) {
        Ok(token) => return Ok(token),
        Err(err) => debug!(error = %err, "no configured account token, asking the daemon"),
    }
    ctx.rpc
        .get_account()
        .await?
        .map(SecretString::from)
        .ok_or(CliError::NoAccount)
}

pub async fn handle(ctx: &Context, args: AccountArgs) -> Result<(), CliError> {
    if args.logout {
        ctx.rpc.set_account(None).await?;
        ctx.note("Logged out");
        return Ok(());
    }

    let token = match args.token {
        Some(token) => {
            ctx.rpc.set_account(Some(&token)).await?;
            ctx.note("Logged in");
            SecretString::from(token)
        }
        None => current_token(ctx).await?,
    };

    let fetcher = AccountDataFetcher::with_max_age(
        ctx.rpc.clone(),
        ctx.config.account_data_max_age(),
        Arc::new(|_: AccountData| {}),
    );
    let data = fetcher.fetch(token.expose_secret()).await?;
    fetcher.invalidate();

    let expiry = AccountExpiry::from(&data);
    let view = AccountView {
        account: mask(token.expose_secret()),
        expiry: expiry.expiry(),
        expired: expiry.has_expired(),
        remaining: expiry.formatted_remaining(),
    };

    let out = output::render_single(ctx.output, &view, account_detail)?;
    ctx.print(&out);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_keeps_last_four() {
        assert_eq!(mask("1234567890123456"), "************3456");
        assert_eq!(mask("123"), "123");
        assert_eq!(mask(""), "");
    }
}
