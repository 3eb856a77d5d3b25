pub mod channels;
pub mod edge;
pub mod route;
pub mod status;

use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:4202";

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Turn a node response into `T`, surfacing the node's `{error}` body on
/// failure.
pub async fn decode<T: DeserializeOwned>(
    resp: reqwest::Response,
    action: &str,
) -> anyhow::Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    if let Ok(err) = resp.json::<ErrorResponse>().await {
        anyhow::bail!("{} failed (HTTP {}): {}", action, status, err.error);
    }
    anyhow::bail!("{} failed (HTTP {})", action, status)
}

/// GET `path` from the node and decode the JSON body.
pub async fn get_json<T: DeserializeOwned>(
    endpoint: &str,
    path: &str,
    action: &str,
) -> anyhow::Result<T> {
    let url = format!("{}{}", endpoint.trim_end_matches('/'), path);
    let resp = reqwest::get(&url).await.map_err(|e| unreachable(endpoint, e))?;
    decode(resp, action).await
}

pub fn unreachable(endpoint: &str, err: reqwest::Error) -> anyhow::Error {
    anyhow::anyhow!(
        "could not reach node at {}: {}\nIs the node running? Start it with: lnroute-node",
        endpoint,
        err
    )
}

/// Pretty-print a node response exactly as it was received.
pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn render_json(value: &serde_json::Value) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
