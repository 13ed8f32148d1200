//! Bridge - forwards one descriptor to the upstream and shapes the outcome
//!
//! Each call is independent: the only state shared between calls is the pooled
//! `reqwest::Client`, which is safe for concurrent use. Every failure is turned
//! into a `BridgeResult`, so `forward` never returns an error. Upstream bodies
//! above the configured limit count as a network failure.

use reqwest::{Client, RequestBuilder, header::COOKIE, redirect};
use session_bridge_common::{
    BridgeError, BridgeResult, ForwardOptions, RequestDescriptor, Result, UpstreamResponse,
    generate_request_id, set_cookie_headers,
};
use std::{sync::Arc, time::Instant};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::BridgeConfig;

/// Authenticated request-forwarding bridge
///
/// Cheap to clone; clones share the same connection pool and configuration.
#[derive(Debug, Clone)]
pub struct Bridge {
    client: Client,
    config: Arc<BridgeConfig>,
}

impl Bridge {
    /// Build the bridge and its pooled HTTP client
    ///
    /// Redirects are not followed: a `Set-Cookie` on a 3xx (typical after a
    /// login) must reach the caller, and the 3xx itself counts as success.
    pub fn new(config: BridgeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| BridgeError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Options using the configured cookie forwarding default
    pub fn default_options(&self) -> ForwardOptions {
        ForwardOptions::new(self.config.forward_cookies)
    }

    /// Forward one call upstream
    ///
    /// Dropping the returned future aborts the in-flight upstream request.
    pub async fn forward(
        &self,
        descriptor: &RequestDescriptor,
        options: ForwardOptions,
    ) -> BridgeResult {
        let request_id = generate_request_id();
        let span = info_span!(
            "forward",
            %request_id,
            method = %descriptor.method(),
            path = descriptor.path(),
        );

        self.execute(descriptor, options).instrument(span).await
    }

    /// Forward one call, giving up as soon as `cancelled` completes
    ///
    /// Returns `None` when the caller went away first; the upstream request is
    /// dropped along with it.
    pub async fn forward_until<F>(
        &self,
        descriptor: &RequestDescriptor,
        options: ForwardOptions,
        cancelled: F,
    ) -> Option<BridgeResult>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.forward(descriptor, options) => Some(result),
            _ = cancelled => {
                info!("Caller cancelled {} {}", descriptor.method(), descriptor.path());
                None
            }
        }
    }

    async fn execute(&self, descriptor: &RequestDescriptor, options: ForwardOptions) -> BridgeResult {
        let start_time = Instant::now();

        debug!(
            "Forwarding to {} (cookies: {})",
            self.config.url_for(descriptor.path()),
            options.forward_cookies
        );

        let upstream = match self.send(self.build_request(descriptor, &options)).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(
                    "Upstream call failed after {}ms: {}",
                    start_time.elapsed().as_millis(),
                    e
                );
                return BridgeResult::network_error();
            }
        };

        let result = BridgeResult::from_upstream(
            &upstream,
            &options,
            self.config.default_cookie_domain.as_deref(),
        );

        let elapsed = start_time.elapsed().as_millis();
        match result.error_kind() {
            None => debug!(
                "Response: {} ({}ms, {} cookies)",
                upstream.status_code,
                elapsed,
                result.outbound_cookies().len()
            ),
            Some(kind) => info!(
                "Upstream call failed: {} {:?} ({}ms)",
                upstream.status_code, kind, elapsed
            ),
        }

        result
    }

    fn build_request(&self, descriptor: &RequestDescriptor, options: &ForwardOptions) -> RequestBuilder {
        let url = self.config.url_for(descriptor.path());
        let mut req_builder = self.client.request(descriptor.method().into(), &url);

        for (name, value) in descriptor.outgoing_headers() {
            req_builder = req_builder.header(name, value);
        }

        if options.forward_cookies {
            if let Some(cookie) = descriptor.inbound_cookie_header() {
                req_builder = req_builder.header(COOKIE, cookie);
            }
        }

        if let Some(body) = descriptor.body() {
            req_builder = req_builder.body(body.as_bytes().to_vec());
        }

        req_builder
    }

    async fn send(&self, req_builder: RequestBuilder) -> Result<UpstreamResponse> {
        let mut response = req_builder.send().await.map_err(describe_network_error)?;

        let limit = self.config.max_response_body_bytes;
        if response
            .content_length()
            .is_some_and(|length| length > limit as u64)
        {
            return Err(BridgeError::ResponseTooLarge(limit));
        }

        let status_code = response.status().as_u16();
        let raw_set_cookie_headers = set_cookie_headers(response.headers());

        // Content-Length may be absent (chunked) or wrong, so count as we read
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(describe_network_error)? {
            if body.len() + chunk.len() > limit {
                return Err(BridgeError::ResponseTooLarge(limit));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status_code,
            body: (!body.is_empty()).then_some(body),
            raw_set_cookie_headers,
        })
    }
}

fn describe_network_error(e: reqwest::Error) -> BridgeError {
    let message = if e.is_timeout() {
        format!("timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    };
    BridgeError::HttpClient(message)
}
