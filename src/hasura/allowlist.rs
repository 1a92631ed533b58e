//! Active IP allowlist entries, read fresh on every gated request.

use crate::hasura::{Hasura, HasuraError};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

const ACTIVE_ENTRIES: &str = r"
    query GetActiveIpAddresses {
        ip_allowlist(where: { is_active: { _eq: true } }) {
            ip_address
        }
    }
";

#[derive(Debug, Deserialize)]
struct Entry {
    ip_address: String,
}

/// Fetch the address/CIDR texts of all active allowlist entries.
///
/// # Errors
/// Returns a [`HasuraError`] on any upstream failure; the admission gate
/// treats that as a denial.
#[instrument(skip(hasura))]
pub async fn active(hasura: &Hasura) -> Result<Vec<String>, HasuraError> {
    let data = hasura.graphql(ACTIVE_ENTRIES, json!({})).await?;

    let entries = data
        .get("ip_allowlist")
        .cloned()
        .ok_or_else(|| HasuraError::Decode("no ip_allowlist in response".to_string()))?;

    let entries: Vec<Entry> =
        serde_json::from_value(entries).map_err(|e| HasuraError::Decode(e.to_string()))?;

    Ok(entries.into_iter().map(|e| e.ip_address).collect())
}
