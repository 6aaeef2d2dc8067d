//! Create a host record, rename it, then delete it.
//!
//! Run:
//! `WAPI_HOST=gm.example.com WAPI_USERNAME=admin WAPI_PASSWORD=... cargo run --example blocking_create_host`
//!
//! Set `WAPI_INSECURE=1` to skip TLS verification against lab grids.

use ibwapi::{BlockingWapiClient, ClientConfig, Credentials};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let host = std::env::var("WAPI_HOST")?;
    let username = std::env::var("WAPI_USERNAME")?;
    let password = std::env::var("WAPI_PASSWORD")?;
    let insecure = std::env::var("WAPI_INSECURE").is_ok_and(|value| value == "1");

    let config = ClientConfig::new(host, Credentials::new(username, password))
        .with_tls_verify(!insecure)
        .with_log_api_calls(true);
    let client = BlockingWapiClient::new(config)?;

    let reference = client.create(
        "record:host",
        json!({
            "name": "ibwapi-demo.example.com",
            "ipv4addrs": [{"ipv4addr": "func:nextavailableip:10.0.0.0/24"}]
        }),
    )?;
    println!("created {reference}");

    let reference = client.update(&reference, json!({"name": "ibwapi-demo2.example.com"}))?;
    println!("renamed {reference}");

    let reference = client.delete(&reference)?;
    println!("deleted {reference}");
    Ok(())
}
