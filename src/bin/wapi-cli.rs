use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use ibwapi::{ClientConfig, Credentials, DEFAULT_PAGE_SIZE, GetOptions, WapiClient};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "wapi-cli",
    version,
    about = "Small async CLI for the Infoblox NIOS WAPI"
)]
struct Cli {
    /// Grid master hostname or IP address.
    #[arg(long, env = "WAPI_HOST")]
    host: String,

    /// Username for HTTP Basic authentication.
    #[arg(long, env = "WAPI_USERNAME")]
    username: String,

    /// Password for HTTP Basic authentication.
    #[arg(long, env = "WAPI_PASSWORD", hide_env_values = true)]
    password: String,

    /// WAPI version, with or without a leading `v`.
    #[arg(long, env = "WAPI_VERSION", default_value = ibwapi::DEFAULT_WAPI_VERSION)]
    wapi_version: String,

    /// Skip TLS certificate verification.
    #[arg(long)]
    insecure: bool,

    /// Flat per-request timeout in seconds.
    #[arg(long, value_name = "SECONDS")]
    timeout_secs: Option<u64>,

    /// Log every API call at INFO level.
    #[arg(long)]
    log_api_calls: bool,

    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Read objects by type (for example `record:host`) or by reference.
    Get(GetArgs),
    /// Create an object and print its reference.
    Create(WriteArgs),
    /// Update the object behind a reference and print its reference.
    Update(WriteArgs),
    /// Delete the object behind a reference and print its reference.
    Delete(DeleteArgs),
    /// Post a body to the WAPI `request` object.
    Request(RequestArgs),
}

#[derive(Debug, Args)]
struct GetArgs {
    /// Object type or reference.
    object: String,

    /// Search filter in form field=value. Repeat as needed.
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    filter: Vec<String>,

    /// Field to return. Use `default` to extend the default fields.
    #[arg(long = "return-field", value_name = "FIELD")]
    return_field: Vec<String>,

    /// Fetch the result set in a single request.
    #[arg(long)]
    no_paging: bool,

    /// Objects requested per page.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,

    /// Result cap. Negative values fail when the set is larger.
    #[arg(long, allow_negative_numbers = true)]
    max_results: Option<i64>,
}

#[derive(Debug, Args)]
struct WriteArgs {
    /// Object type (create) or reference (update).
    target: String,

    /// Field to return instead of the bare reference. Repeat as needed.
    #[arg(long = "return-field", value_name = "FIELD")]
    return_field: Vec<String>,

    #[command(flatten)]
    body: BodyInput,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    /// Object reference.
    reference: String,

    /// Delete argument in form key=value. Repeat as needed.
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    arg: Vec<String>,
}

#[derive(Debug, Args)]
struct RequestArgs {
    #[command(flatten)]
    body: BodyInput,
}

#[derive(Debug, Args)]
struct BodyInput {
    /// JSON request body literal.
    #[arg(long, conflicts_with = "body_file")]
    body_json: Option<String>,

    /// Path to a file containing a JSON request body.
    #[arg(long, value_name = "PATH", conflicts_with = "body_json")]
    body_file: Option<PathBuf>,
}

/// Entry point for the async CLI.
///
/// Parses command-line arguments, builds the client, dispatches subcommands,
/// and prints JSON output.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_api_calls);

    let mut config = ClientConfig::new(
        &cli.host,
        Credentials::new(&cli.username, &cli.password),
    )
    .with_version(&cli.wapi_version)
    .with_tls_verify(!cli.insecure)
    .with_log_api_calls(cli.log_api_calls);
    if let Some(seconds) = cli.timeout_secs {
        config = config.with_timeout(Duration::from_secs(seconds));
    }

    let client = WapiClient::new(config)
        .with_context(|| format!("failed to create client for host '{}'", cli.host))?;

    let output = match &cli.command {
        Command::Get(args) => get_objects(&client, args)
            .await
            .with_context(|| format!("read failed: '{}'", args.object))?,
        Command::Create(args) => create_object(&client, args)
            .await
            .with_context(|| format!("create failed: '{}'", args.target))?,
        Command::Update(args) => update_object(&client, args)
            .await
            .with_context(|| format!("update failed: '{}'", args.target))?,
        Command::Delete(args) => delete_object(&client, args)
            .await
            .with_context(|| format!("delete failed: '{}'", args.reference))?,
        Command::Request(args) => {
            let body = require_body(&args.body)?;
            client
                .request(body)
                .await
                .context("WAPI request object call failed")?
        }
    };

    print_json(&output, cli.compact).context("failed to print JSON output")?;
    Ok(())
}

/// Installs a stderr subscriber honoring `RUST_LOG`.
fn init_tracing(log_api_calls: bool) {
    let default_level = if log_api_calls { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn get_objects(client: &WapiClient, args: &GetArgs) -> Result<Value> {
    // Parse repeatable `key=value` args into owned pairs first, then borrow as `&str`.
    let filters = parse_pairs(&args.filter, "--filter").context("failed to parse --filter")?;
    let borrowed_filters = borrow_pairs(&filters);

    let mut options = GetOptions::default()
        .with_return_fields(args.return_field.iter().cloned())
        .with_page_size(args.page_size);
    if args.no_paging {
        options = options.without_paging();
    }
    if let Some(max_results) = args.max_results {
        options = options.with_max_results(max_results);
    }

    let objects = client
        .get_with_options(&args.object, &borrowed_filters, &options)
        .await?;
    Ok(Value::Array(objects))
}

async fn create_object(client: &WapiClient, args: &WriteArgs) -> Result<Value> {
    let body = require_body(&args.body)?;
    if args.return_field.is_empty() {
        return Ok(Value::String(client.create(&args.target, body).await?));
    }
    let fields: Vec<&str> = args.return_field.iter().map(String::as_str).collect();
    Ok(client
        .create_with_return_fields(&args.target, body, &fields)
        .await?)
}

async fn update_object(client: &WapiClient, args: &WriteArgs) -> Result<Value> {
    let body = require_body(&args.body)?;
    if args.return_field.is_empty() {
        return Ok(Value::String(client.update(&args.target, body).await?));
    }
    let fields: Vec<&str> = args.return_field.iter().map(String::as_str).collect();
    Ok(client
        .update_with_return_fields(&args.target, body, &fields)
        .await?)
}

async fn delete_object(client: &WapiClient, args: &DeleteArgs) -> Result<Value> {
    let delete_args = parse_pairs(&args.arg, "--arg").context("failed to parse --arg")?;
    let reference = client
        .delete_with_args(&args.reference, &borrow_pairs(&delete_args))
        .await?;
    Ok(Value::String(reference))
}

/// Parses repeated `key=value` arguments into owned key/value pairs.
///
/// Returns an error when a value does not include `=` or has an empty key.
fn parse_pairs(values: &[String], flag_name: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(values.len());
    for item in values {
        let Some((key, value)) = item.split_once('=') else {
            bail!("invalid {flag_name} value '{item}': expected key=value");
        };
        if key.is_empty() {
            bail!("invalid {flag_name} value '{item}': empty key");
        }
        pairs.push((key.to_owned(), value.to_owned()));
    }
    Ok(pairs)
}

fn borrow_pairs(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect()
}

/// Parses the JSON body from inline text or a file path. One of the two is required.
fn require_body(body: &BodyInput) -> Result<Value> {
    match (&body.body_json, &body.body_file) {
        (Some(raw), None) => {
            serde_json::from_str(raw).context("failed to parse JSON from --body-json")
        }
        (None, Some(path)) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read --body-file '{}'", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse JSON in --body-file '{}'", path.display()))
        }
        (None, None) => bail!("a body is required: use --body-json or --body-file"),
        (Some(_), Some(_)) => bail!("use only one of --body-json or --body-file"),
    }
}

/// Prints a JSON value either compact or pretty-formatted.
fn print_json(value: &Value, compact: bool) -> Result<()> {
    if compact {
        println!(
            "{}",
            serde_json::to_string(value).context("Failed to render JSON")?
        );
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("Failed to render JSON")?
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_pairs;

    #[test]
    fn parses_repeated_pairs() {
        let raw = vec!["name~=web".to_owned(), "view=default".to_owned()];
        let pairs = parse_pairs(&raw, "--filter").expect("valid pairs");
        assert_eq!(pairs[0], ("name~".to_owned(), "web".to_owned()));
        assert_eq!(pairs[1], ("view".to_owned(), "default".to_owned()));
    }

    #[test]
    fn rejects_pairs_without_separator_or_key() {
        assert!(parse_pairs(&["name".to_owned()], "--filter").is_err());
        assert!(parse_pairs(&["=web".to_owned()], "--filter").is_err());
    }
}
