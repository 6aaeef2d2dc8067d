//! List host records matching a name pattern with the blocking client.
//!
//! Run:
//! `WAPI_HOST=gm.example.com WAPI_USERNAME=admin WAPI_PASSWORD=... cargo run --example blocking_get_hosts`
//!
//! Optional env vars:
//! - `WAPI_VERSION` (defaults to `2.12`)
//! - `WAPI_HOST_PATTERN` (defaults to `.*`)

use ibwapi::{BlockingWapiClient, ClientConfig, Credentials, DEFAULT_WAPI_VERSION};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = std::env::var("WAPI_HOST")?;
    let username = std::env::var("WAPI_USERNAME")?;
    let password = std::env::var("WAPI_PASSWORD")?;
    let version =
        std::env::var("WAPI_VERSION").unwrap_or_else(|_| DEFAULT_WAPI_VERSION.to_owned());
    let pattern = std::env::var("WAPI_HOST_PATTERN").unwrap_or_else(|_| ".*".to_owned());

    let config =
        ClientConfig::new(host, Credentials::new(username, password)).with_version(version);
    let client = BlockingWapiClient::new(config)?;

    let hosts = client.get(
        "record:host",
        &[("name~", pattern.as_str())],
        &["name", "ipv4addrs"],
    )?;

    println!("{}", serde_json::to_string_pretty(&hosts)?);
    Ok(())
}
