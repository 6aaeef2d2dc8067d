//! Page through every network in a view using the async `WapiClient`.
//!
//! Run:
//! `WAPI_HOST=gm.example.com WAPI_USERNAME=admin WAPI_PASSWORD=... cargo run --example async_get_networks`
//!
//! Optional env vars:
//! - `WAPI_NETWORK_VIEW` (defaults to `default`)
//! - `WAPI_PAGE_SIZE` (defaults to `100`)

use ibwapi::{ClientConfig, Credentials, GetOptions, WapiClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = std::env::var("WAPI_HOST")?;
    let username = std::env::var("WAPI_USERNAME")?;
    let password = std::env::var("WAPI_PASSWORD")?;
    let view = std::env::var("WAPI_NETWORK_VIEW").unwrap_or_else(|_| "default".to_owned());
    let page_size: u32 = std::env::var("WAPI_PAGE_SIZE")
        .unwrap_or_else(|_| "100".to_owned())
        .parse()?;

    let client = WapiClient::new(ClientConfig::new(
        host,
        Credentials::new(username, password),
    ))?;

    let options = GetOptions::default()
        .with_return_fields(["default", "extattrs"])
        .with_page_size(page_size);
    let networks = client
        .get_with_options("network", &[("network_view", view.as_str())], &options)
        .await?;

    println!("{} networks in view '{view}'", networks.len());
    println!("{}", serde_json::to_string_pretty(&networks)?);
    Ok(())
}
