//! Withings API data source.
//!
//! Fetches blood pressure measurements from the Withings Health API
//! using the OAuth2 authorization-code flow. Tokens are cached on disk
//! between runs and refreshed automatically; the first run (or a run
//! after the refresh token went stale) walks the user through a
//! browser authorization with a local callback server.
//!
//! ## Credentials
//!
//! The client reads a JSON credentials file (default
//! `withings_credentials.json`):
//!
//! ```json
//! {
//!   "client_id": "...",
//!   "client_secret": "...",
//!   "redirect_uri": "http://localhost:8080/callback"
//! }
//! ```
//!
//! `WITHINGS_CLIENT_ID`, `WITHINGS_CLIENT_SECRET` and
//! `WITHINGS_REDIRECT_URI` environment variables override file values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use config::{Config, Environment, File, FileFormat};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use super::{ReadingSource, SourceError};
use crate::data::Reading;

const AUTHORIZE_URL: &str = "https://account.withings.com/oauth2_user/authorize2";
const TOKEN_URL: &str = "https://wbsapi.withings.net/v2/oauth2";
const MEASURE_URL: &str = "https://wbsapi.withings.net/measure";

const OAUTH_SCOPE: &str = "user.metrics,user.info";
/// State value sent with the authorization request and checked on the
/// callback.
const OAUTH_STATE: &str = "blood_pressure_analyzer";

/// How long to wait for the browser redirect during authorization.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
/// Refresh access tokens this many seconds before they expire.
const EXPIRY_MARGIN_SECS: i64 = 300;
/// Token lifetime assumed when the API omits `expires_in`.
const DEFAULT_EXPIRES_IN: i64 = 3600;

// Withings measurement type codes: 9 = diastolic, 10 = systolic,
// 11 = pulse.
const TYPE_DIASTOLIC: i64 = 9;
const TYPE_SYSTOLIC: i64 = 10;
const TYPE_PULSE: i64 = 11;
const MEASURE_TYPES: &str = "9,10,11";

/// OAuth2 application credentials for the Withings API.
#[derive(Debug, Clone, Deserialize)]
pub struct WithingsCredentials {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_redirect_uri")]
    redirect_uri: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:8080/callback".to_string()
}

impl WithingsCredentials {
    /// Load credentials from a JSON file, with `WITHINGS_*` environment
    /// variables taking precedence over file values.
    ///
    /// A missing or incomplete configuration yields
    /// [`SourceError::Unavailable`] so the caller can report that the
    /// remote source is not set up.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(Environment::with_prefix("WITHINGS"))
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        settings.try_deserialize().map_err(|e| {
            SourceError::Unavailable(format!(
                "Withings credentials not configured ({}); provide {} or WITHINGS_* environment variables",
                e,
                path.display()
            ))
        })
    }
}

/// Cached OAuth tokens, persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    /// Unix timestamp after which the access token is no longer valid.
    expires_at: i64,
}

impl StoredTokens {
    fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(tokens) => {
                debug!(path = %path.display(), "loaded cached OAuth tokens");
                Some(tokens)
            }
            Err(e) => {
                warn!("ignoring unreadable token cache {}: {}", path.display(), e);
                None
            }
        }
    }

    fn save(&self, path: &Path) -> Result<(), SourceError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| SourceError::Parse(e.to_string()))?;
        fs::write(path, content)?;
        debug!(path = %path.display(), "saved OAuth tokens");
        Ok(())
    }

    /// Whether the access token is expired or about to expire.
    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Envelope wrapping every Withings API response.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: i64,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    body: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct MeasureBody {
    #[serde(default)]
    measuregrps: Vec<MeasureGroup>,
}

#[derive(Debug, Deserialize)]
struct MeasureGroup {
    /// Measurement time as a Unix timestamp.
    date: i64,
    #[serde(default)]
    measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    #[serde(rename = "type")]
    kind: i64,
    value: i64,
    unit: i32,
}

/// Apply the Withings decimal scale: `value * 10^unit`, truncated.
fn scale_value(value: i64, unit: i32) -> i32 {
    (value as f64 * 10f64.powi(unit)) as i32
}

/// Convert raw measure groups into readings in the given offset.
///
/// Groups without both a systolic and a diastolic value are skipped;
/// a missing pulse becomes 0.
fn readings_from_groups(groups: &[MeasureGroup], offset: FixedOffset) -> Vec<Reading> {
    let mut readings = Vec::new();
    for group in groups {
        let timestamp = match DateTime::from_timestamp(group.date, 0) {
            Some(utc) => utc.with_timezone(&offset),
            None => continue,
        };

        let mut systolic = None;
        let mut diastolic = None;
        let mut pulse = None;
        for measure in &group.measures {
            let value = scale_value(measure.value, measure.unit);
            match measure.kind {
                TYPE_SYSTOLIC => systolic = Some(value),
                TYPE_DIASTOLIC => diastolic = Some(value),
                TYPE_PULSE => pulse = Some(value),
                _ => {}
            }
        }

        if let (Some(systolic), Some(diastolic)) = (systolic, diastolic) {
            readings.push(Reading::new(
                timestamp,
                systolic,
                diastolic,
                pulse.unwrap_or(0),
            ));
        }
    }
    readings
}

/// Async client for the Withings token and measure endpoints.
#[derive(Debug)]
struct WithingsClient {
    http: Client,
    credentials: WithingsCredentials,
    token_path: PathBuf,
    tokens: Option<StoredTokens>,
}

impl WithingsClient {
    fn new(credentials: WithingsCredentials, token_path: PathBuf) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Unavailable(format!("cannot build HTTP client: {}", e)))?;
        let tokens = StoredTokens::load(&token_path);
        Ok(Self {
            http,
            credentials,
            token_path,
            tokens,
        })
    }

    /// Fetch blood pressure readings, authorizing first if needed.
    async fn fetch_readings(
        &mut self,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
        offset: FixedOffset,
    ) -> Result<Vec<Reading>, SourceError> {
        let token = self.ensure_access_token().await?;

        let mut form: Vec<(&str, String)> = vec![
            ("action", "getmeas".to_string()),
            ("meastypes", MEASURE_TYPES.to_string()),
            ("category", "1".to_string()),
        ];
        if let Some(start) = start {
            form.push(("startdate", start.timestamp().to_string()));
        }
        if let Some(end) = end {
            form.push(("enddate", end.timestamp().to_string()));
        }

        debug!("requesting measurements from Withings");
        let response = self
            .http
            .post(MEASURE_URL)
            .bearer_auth(&token)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!(
                "measure API returned status {}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<MeasureBody> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if envelope.status != 0 {
            return Err(SourceError::Http(format!(
                "measure request failed (status {}): {}",
                envelope.status,
                envelope.error.as_deref().unwrap_or("unknown error")
            )));
        }

        let body = envelope.body.unwrap_or_default();
        let readings = readings_from_groups(&body.measuregrps, offset);
        info!(
            groups = body.measuregrps.len(),
            readings = readings.len(),
            "fetched readings from Withings"
        );
        Ok(readings)
    }

    /// Return a valid access token, refreshing or reauthorizing as
    /// needed.
    async fn ensure_access_token(&mut self) -> Result<String, SourceError> {
        let now = Utc::now().timestamp();

        if let Some(tokens) = &self.tokens {
            if !tokens.is_expired(now) {
                return Ok(tokens.access_token.clone());
            }
        }

        if self.tokens.is_some() {
            info!("access token expired, refreshing");
            match self.refresh_tokens().await {
                Ok(tokens) => return Ok(tokens.access_token),
                Err(e) => warn!("token refresh failed ({}), starting new authorization", e),
            }
        }

        let tokens = self.authorize().await?;
        Ok(tokens.access_token)
    }

    /// Run the OAuth2 authorization-code flow with a local callback
    /// server, then exchange the code for tokens.
    async fn authorize(&mut self) -> Result<StoredTokens, SourceError> {
        let port = callback_port(&self.credentials.redirect_uri);
        let path = callback_path(&self.credentials.redirect_uri);
        let auth_url = self.authorization_url()?;

        println!("=== Withings Autorisierung ===");
        println!("1. Öffne diese URL in deinem Browser:");
        println!("   {}", auth_url);
        println!("2. Melde dich bei Withings an und erlaube den Zugriff");
        println!("3. Du wirst auf http://localhost:{} zurückgeleitet", port);
        println!(
            "Warte auf Autorisierung (max. {} Sekunden)...",
            CALLBACK_TIMEOUT.as_secs()
        );

        let code = wait_for_callback(port, &path).await?;
        info!("authorization code received");
        self.exchange_code(&code).await
    }

    fn authorization_url(&self) -> Result<String, SourceError> {
        let url = Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", OAUTH_SCOPE),
                ("state", OAUTH_STATE),
            ],
        )
        .map_err(|e| SourceError::Auth(format!("cannot build authorization URL: {}", e)))?;
        Ok(url.to_string())
    }

    async fn exchange_code(&mut self, code: &str) -> Result<StoredTokens, SourceError> {
        let form = [
            ("action", "requesttoken"),
            ("grant_type", "authorization_code"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ];

        let body = self.token_request(&form, "token exchange").await?;
        let refresh_token = match body.refresh_token {
            Some(token) => token,
            None => {
                return Err(SourceError::Auth(
                    "token exchange response carried no refresh token".to_string(),
                ))
            }
        };

        let tokens = StoredTokens {
            access_token: body.access_token,
            refresh_token,
            expires_at: Utc::now().timestamp() + body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        };
        tokens.save(&self.token_path)?;
        info!("obtained OAuth tokens");
        self.tokens = Some(tokens.clone());
        Ok(tokens)
    }

    async fn refresh_tokens(&mut self) -> Result<StoredTokens, SourceError> {
        let refresh_token = match &self.tokens {
            Some(tokens) => tokens.refresh_token.clone(),
            None => return Err(SourceError::Auth("no refresh token available".to_string())),
        };

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        let body = self.token_request(&form, "token refresh").await?;
        let tokens = StoredTokens {
            access_token: body.access_token,
            // The API may omit the refresh token on renewal; keep the
            // old one in that case.
            refresh_token: body.refresh_token.unwrap_or(refresh_token),
            expires_at: Utc::now().timestamp() + body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        };
        tokens.save(&self.token_path)?;
        info!("refreshed OAuth access token");
        self.tokens = Some(tokens.clone());
        Ok(tokens)
    }

    async fn token_request(
        &self,
        form: &[(&str, &str)],
        what: &str,
    ) -> Result<TokenBody, SourceError> {
        let response = self.http.post(TOKEN_URL).form(form).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Auth(format!(
                "{} failed with HTTP status {}",
                what,
                response.status()
            )));
        }

        let envelope: ApiEnvelope<TokenBody> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        if envelope.status != 0 {
            return Err(SourceError::Auth(format!(
                "{} failed (status {}): {}",
                what,
                envelope.status,
                envelope.error.as_deref().unwrap_or("unknown error")
            )));
        }

        envelope
            .body
            .ok_or_else(|| SourceError::Parse(format!("{} response has no body", what)))
    }
}

/// Extract the callback port from the redirect URI (default 8080).
fn callback_port(redirect_uri: &str) -> u16 {
    Url::parse(redirect_uri)
        .ok()
        .and_then(|url| url.port())
        .unwrap_or(8080)
}

/// Extract the callback path from the redirect URI (default
/// `/callback`).
fn callback_path(redirect_uri: &str) -> String {
    match Url::parse(redirect_uri) {
        Ok(url) => url.path().to_string(),
        Err(_) => "/callback".to_string(),
    }
}

/// Listen on localhost for the OAuth redirect and extract the
/// authorization code.
async fn wait_for_callback(port: u16, expected_path: &str) -> Result<String, SourceError> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| SourceError::Connection(format!("cannot listen on port {}: {}", port, e)))?;

    match tokio::time::timeout(CALLBACK_TIMEOUT, callback_loop(&listener, expected_path)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(format!(
            "no authorization callback within {} seconds",
            CALLBACK_TIMEOUT.as_secs()
        ))),
    }
}

/// Accept connections until one carries an authorization code or an
/// error. Unrelated requests (favicon probes, wrong path or method)
/// are answered with a 404 and skipped.
async fn callback_loop(listener: &TcpListener, expected_path: &str) -> Result<String, SourceError> {
    loop {
        let (mut stream, _) = listener
            .accept()
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        // One read is enough for the request line we care about.
        let mut buf = vec![0u8; 4096];
        let n = stream
            .read(&mut buf)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();

        match parse_callback_request(&request, expected_path) {
            CallbackOutcome::Code { code, state } => {
                if state.as_deref() != Some(OAUTH_STATE) {
                    let _ = stream.write_all(error_page("state mismatch").as_bytes()).await;
                    let _ = stream.shutdown().await;
                    return Err(SourceError::Auth(
                        "authorization callback carried an unexpected state value".to_string(),
                    ));
                }
                let _ = stream.write_all(success_page().as_bytes()).await;
                let _ = stream.shutdown().await;
                return Ok(code);
            }
            CallbackOutcome::Error(message) => {
                let _ = stream.write_all(error_page(&message).as_bytes()).await;
                let _ = stream.shutdown().await;
                return Err(SourceError::Auth(format!(
                    "authorization denied: {}",
                    message
                )));
            }
            CallbackOutcome::Ignored => {
                let _ = stream.write_all(not_found_page().as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum CallbackOutcome {
    Code { code: String, state: Option<String> },
    Error(String),
    Ignored,
}

/// Extract the authorization outcome from a raw HTTP request.
///
/// Only `GET` requests on the expected callback path count; anything
/// else is ignored so the listener keeps waiting.
fn parse_callback_request(request: &str, expected_path: &str) -> CallbackOutcome {
    let mut parts = request.split_whitespace();
    let method = parts.next();
    let target = match parts.next() {
        Some(target) => target,
        None => return CallbackOutcome::Ignored,
    };
    if method != Some("GET") {
        return CallbackOutcome::Ignored;
    }
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => return CallbackOutcome::Ignored,
    };
    if path != expected_path {
        return CallbackOutcome::Ignored;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut error_description = None;
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((key, value)) => (key, percent_decode(value)),
            None => (pair, String::new()),
        };
        match key {
            "code" => code = Some(value),
            "state" => state = Some(value),
            "error" => error = Some(value),
            "error_description" => error_description = Some(value),
            _ => {}
        }
    }

    if let Some(code) = code {
        CallbackOutcome::Code { code, state }
    } else if let Some(error) = error {
        let message = match error_description {
            Some(description) if !description.is_empty() => {
                format!("{}: {}", error, description)
            }
            _ => error,
        };
        CallbackOutcome::Error(message)
    } else {
        CallbackOutcome::Ignored
    }
}

/// Decode `%XX` escapes and `+` in a query component.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn http_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
}

fn success_page() -> String {
    http_response(
        200,
        "OK",
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Withings Autorisierung erfolgreich</title></head>\n<body style=\"font-family: Arial, sans-serif; text-align: center; margin-top: 50px;\">\n<p style=\"color: green; font-size: 24px;\">Autorisierung erfolgreich!</p>\n<p style=\"color: #666;\">Du kannst dieses Fenster jetzt schließen und zum Terminal zurückkehren.</p>\n</body>\n</html>\n",
    )
}

fn error_page(message: &str) -> String {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    http_response(
        400,
        "Bad Request",
        &format!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Withings Autorisierung fehlgeschlagen</title></head>\n<body style=\"font-family: Arial, sans-serif; text-align: center; margin-top: 50px;\">\n<p style=\"color: red; font-size: 24px;\">Autorisierung fehlgeschlagen</p>\n<p style=\"color: #666;\">Fehler: {}</p>\n<p style=\"color: #666;\">Du kannst dieses Fenster schließen und es erneut versuchen.</p>\n</body>\n</html>\n",
            escaped
        ),
    )
}

fn not_found_page() -> String {
    http_response(404, "Not Found", "")
}

/// Data source that pulls blood pressure readings from the Withings
/// API.
///
/// Construction loads credentials and any cached tokens; the blocking
/// OAuth wait happens inside [`ReadingSource::fetch`] on first use.
#[derive(Debug)]
pub struct WithingsSource {
    client: WithingsClient,
    runtime: Runtime,
    description: String,
    offset: FixedOffset,
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
}

impl WithingsSource {
    /// Create a source from a credentials file and a token cache path.
    ///
    /// `offset` is the offset fetched timestamps are converted into;
    /// `start` and `end` bound the measurement query when given.
    ///
    /// Fails with [`SourceError::Unavailable`] when no credentials are
    /// configured.
    pub fn connect(
        credentials_path: &Path,
        token_path: &Path,
        offset: FixedOffset,
        start: Option<DateTime<FixedOffset>>,
        end: Option<DateTime<FixedOffset>>,
    ) -> Result<Self, SourceError> {
        let credentials = WithingsCredentials::load(credentials_path)?;
        let runtime = Runtime::new()
            .map_err(|e| SourceError::Unavailable(format!("cannot start async runtime: {}", e)))?;
        let client = WithingsClient::new(credentials, token_path.to_path_buf())?;
        Ok(Self {
            client,
            runtime,
            description: "Withings API".to_string(),
            offset,
            start,
            end,
        })
    }
}

impl ReadingSource for WithingsSource {
    fn fetch(&mut self) -> Result<Vec<Reading>, SourceError> {
        let Self {
            client,
            runtime,
            offset,
            start,
            end,
            ..
        } = self;
        runtime.block_on(client.fetch_readings(*start, *end, *offset))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
