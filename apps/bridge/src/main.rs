use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser, builder::BoolishValueParser};
use reqwest::header::{HeaderMap, SET_COOKIE};
use session_bridge::{Bridge, BridgeConfig, ForwardOptions, Method, RequestDescriptor};
use session_bridge_common::{
    append_set_cookies,
    constants::{
        DEFAULT_MAX_RESPONSE_BODY_BYTES, ENV_DEFAULT_COOKIE_DOMAIN, ENV_FORWARD_COOKIES,
        ENV_MAX_RESPONSE_BODY_BYTES, ENV_REQUEST_TIMEOUT_MS, ENV_UPSTREAM_BASE_URL,
    },
};
use std::{process::ExitCode, time::Duration};
use tracing::{debug, info, warn};

/// CLI arguments for the bridge
#[derive(Parser, Debug)]
#[command(name = "sbridge")]
#[command(about = "Forward one request to an upstream API, relaying session cookies", long_about = None)]
#[command(version)]
struct Args {
    /// Path relative to the upstream base URL, e.g. /auth/me
    path: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: Method,

    /// Upstream API origin
    #[arg(short, long, env = ENV_UPSTREAM_BASE_URL)]
    upstream: String,

    /// Domain given to upstream cookies without a Domain attribute
    #[arg(long, env = ENV_DEFAULT_COOKIE_DOMAIN)]
    cookie_domain: Option<String>,

    /// Upstream request timeout in milliseconds
    #[arg(long, env = ENV_REQUEST_TIMEOUT_MS, default_value = "10000")]
    timeout_ms: u64,

    /// Largest upstream body to accept, in bytes
    #[arg(long, env = ENV_MAX_RESPONSE_BODY_BYTES, default_value_t = DEFAULT_MAX_RESPONSE_BODY_BYTES)]
    max_body_bytes: usize,

    /// Relay cookies in both directions
    #[arg(
        long,
        env = ENV_FORWARD_COOKIES,
        default_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    forward_cookies: bool,

    /// Inbound Cookie header to relay upstream
    #[arg(short, long)]
    cookie: Option<String>,

    /// Extra header, "Name: value" (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// JSON request body
    #[arg(short, long, conflicts_with = "data")]
    json: Option<String>,

    /// Raw request body, sent as-is
    #[arg(short, long)]
    data: Option<String>,

    /// Fail with a parse error when the response body is not JSON
    #[arg(long)]
    require_json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn bridge_config(&self) -> Result<BridgeConfig> {
        let config = BridgeConfig::new(&self.upstream)?
            .with_default_cookie_domain(self.cookie_domain.clone())
            .with_request_timeout(Duration::from_millis(self.timeout_ms))?
            .with_max_response_body_bytes(self.max_body_bytes)?
            .with_forward_cookies(self.forward_cookies);
        Ok(config)
    }

    fn descriptor(&self) -> Result<RequestDescriptor> {
        let mut descriptor = RequestDescriptor::new(self.method, &self.path)?;

        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .ok_or_else(|| anyhow!("Header must look like \"Name: value\": {}", header))?;
            descriptor = descriptor.with_header(name, value.trim())?;
        }

        if let Some(cookie) = &self.cookie {
            descriptor = descriptor.with_inbound_cookies(cookie)?;
        }

        if let Some(json) = &self.json {
            let value: serde_json::Value =
                serde_json::from_str(json).context("--json is not valid JSON")?;
            descriptor = descriptor.with_json(&value)?;
        } else if let Some(data) = &self.data {
            descriptor = descriptor.with_raw_body(data.as_bytes());
        }

        Ok(descriptor)
    }

    fn options(&self, bridge: &Bridge) -> ForwardOptions {
        let options = bridge.default_options();
        if self.require_json {
            options.require_json_body()
        } else {
            options
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Session Bridge v{}", env!("CARGO_PKG_VERSION"));

    let bridge = Bridge::new(args.bridge_config()?)?;
    let descriptor = args.descriptor()?;
    let options = args.options(&bridge);

    info!(
        "{} {}",
        descriptor.method(),
        bridge.config().url_for(descriptor.path())
    );

    let cancelled = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let Some(result) = bridge.forward_until(&descriptor, options, cancelled).await else {
        info!("Received Ctrl-C, request abandoned");
        return Ok(ExitCode::from(130));
    };

    // Set-Cookie lines go to stderr the way a downstream response would carry them
    let mut downstream = HeaderMap::new();
    append_set_cookies(&mut downstream, result.outbound_cookies());
    for value in downstream.get_all(SET_COOKIE) {
        eprintln!("Set-Cookie: {}", value.to_str().unwrap_or_default());
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        if let Some(message) = result.server_message() {
            warn!("Upstream said: {}", message);
        }
        Ok(ExitCode::FAILURE)
    }
}
