//! Interactive consent flow with a single-shot loopback listener.
//!
//! Binds an ephemeral local port, opens the provider consent URL, and
//! blocks until the provider redirects back with an authorization code or
//! the flow times out. The listener accepts exactly one connection and is
//! torn down on every path.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{info, warn};
use url::Url;

use updrift_common::{Error, Result};

use super::auth::{AuthManager, ClientDescriptor, Credential};

/// Behavior knobs for the consent flow.
#[derive(Debug, Clone)]
pub struct ConsentOptions {
    /// How long to wait for the provider redirect.
    pub timeout: Duration,
    /// Launch the system browser with the consent URL. When false, the URL
    /// is only logged for the user to open manually.
    pub open_browser: bool,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            open_browser: true,
        }
    }
}

/// One interactive authorization round.
pub struct ConsentFlow {
    descriptor: ClientDescriptor,
    options: ConsentOptions,
}

impl ConsentFlow {
    pub fn new(descriptor: ClientDescriptor, options: ConsentOptions) -> Self {
        Self {
            descriptor,
            options,
        }
    }

    /// Run the flow to completion.
    ///
    /// # Errors
    /// - `Auth` on denial, CSRF mismatch, or timeout
    /// - `Network` when the token endpoint is unreachable during exchange
    pub async fn run(&self) -> Result<Credential> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        self.run_with_listener(listener).await
    }

    /// Flow body over an already-bound listener.
    async fn run_with_listener(&self, listener: TcpListener) -> Result<Credential> {
        let port = listener.local_addr()?.port();
        let redirect_url = format!("http://127.0.0.1:{}/callback", port);

        let manager = AuthManager::for_descriptor(&self.descriptor, &redirect_url)?;
        let (auth_url, csrf_state) = manager.authorization_url();

        if self.options.open_browser {
            if let Err(err) = open::that(&auth_url) {
                warn!("Could not launch browser ({}), open this URL manually:", err);
                info!("{}", auth_url);
            }
        } else {
            info!("Open this URL to authorize: {}", auth_url);
        }

        let code = tokio::time::timeout(
            self.options.timeout,
            wait_for_callback(listener, &csrf_state),
        )
        .await
        .map_err(|_| {
            Error::Auth(format!(
                "Consent flow timed out after {} seconds",
                self.options.timeout.as_secs()
            ))
        })??;
        // Listener is dropped here, releasing the port before the exchange.

        manager.exchange_code(&code).await
    }
}

/// Accept exactly one connection and extract the authorization code.
async fn wait_for_callback(listener: TcpListener, expected_state: &str) -> Result<String> {
    let (mut stream, peer) = listener.accept().await?;
    info!("Consent callback connection from {}", peer);

    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let request_line = request.lines().next().unwrap_or_default();

    let outcome = parse_callback(request_line, expected_state);

    let (status, message) = match &outcome {
        Ok(_) => ("200 OK", "Authorization received. You may close this window."),
        Err(_) => ("400 Bad Request", "Authorization failed. You may close this window."),
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        message.len(),
        message
    );
    // The browser-side response is best effort; the outcome stands either way.
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;

    outcome
}

/// Parse the redirect request line into an authorization code.
fn parse_callback(request_line: &str, expected_state: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| Error::Auth("Malformed callback request".to_string()))?;

    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| Error::Auth(format!("Malformed callback URL: {}", e)))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(Error::Auth(format!("Consent denied: {}", value)));
            }
            _ => {}
        }
    }

    match state {
        Some(state) if state == expected_state => {}
        Some(_) => return Err(Error::Auth("Callback state mismatch".to_string())),
        None => return Err(Error::Auth("Callback is missing the state parameter".to_string())),
    }

    code.ok_or_else(|| Error::Auth("Callback is missing the authorization code".to_string()))
}
