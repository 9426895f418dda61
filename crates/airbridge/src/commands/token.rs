//! Token exchange check.

use chrono::{DateTime, Utc};
use serde::Serialize;

use airbridge_api::TokenManager;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// What a successful exchange reports. The token itself is never shown.
#[derive(Debug, Serialize)]
struct TokenSummary {
    token_type: String,
    scope: String,
    issued_at: DateTime<Utc>,
    expires_in_secs: u64,
    refresh_deadline: DateTime<Utc>,
}

fn detail(t: &TokenSummary) -> String {
    [
        format!("Token type:   {}", t.token_type),
        format!("Scope:        {}", t.scope),
        format!("Issued at:    {}", t.issued_at.to_rfc3339()),
        format!("Expires in:   {}s", t.expires_in_secs),
        format!("Refresh at:   {}", t.refresh_deadline.to_rfc3339()),
    ]
    .join("\n")
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = super::load_settings(global)?;
    let bridge = super::bridge_config(global, &cfg)?;

    let tokens = TokenManager::new(&bridge.oauth_url, bridge.app.clone(), &bridge.transport())?;
    let credential = tokens.refresh().await?;

    let summary = TokenSummary {
        token_type: credential.token_type.clone(),
        scope: credential.scope.clone(),
        issued_at: credential.issued_at,
        expires_in_secs: credential.expires_in_secs,
        refresh_deadline: credential.refresh_deadline(),
    };

    let out = output::render_single(global.output, &summary, detail, |t| {
        t.token_type.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
