//! Google Sheets v4 client: values get/append/update over REST.
//!
//! Authenticates as a service account: a signed RS256 JWT is exchanged at the
//! key's token endpoint for a bearer token, which is cached until shortly
//! before it expires.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::sheet::{AppendOutcome, SheetClient};
use crate::error::StoreError;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion.
const ASSERTION_TTL_SECS: i64 = 3600;
/// Refresh the bearer token this long before Google says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    token: SecretString,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: UpdateSummary,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSummary {
    updated_range: String,
    #[serde(default)]
    updated_rows: u32,
}

#[derive(Serialize)]
struct ValuesBody<'a> {
    values: &'a [Vec<String>],
}

/// Service-account authenticated Sheets client for one spreadsheet.
pub struct GoogleSheetsClient {
    client: reqwest::Client,
    spreadsheet_id: String,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsClient {
    /// Build a client from the service account key JSON.
    pub fn new(spreadsheet_id: &str, key_json: &SecretString) -> Result<Self, StoreError> {
        let key: ServiceAccountKey = serde_json::from_str(key_json.expose_secret())
            .map_err(|e| StoreError::Credentials(format!("invalid service account JSON: {e}")))?;

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Credentials(format!("invalid private key: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            spreadsheet_id: spreadsheet_id.to_string(),
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
            token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Current bearer token, fetching a fresh one when the cached token is stale.
    async fn bearer(&self) -> Result<SecretString, StoreError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SPREADSHEETS_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_TTL_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
                .map_err(|e| StoreError::Credentials(format!("failed to sign assertion: {e}")))?;

        let resp = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(token_endpoint_error(status, &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("token response: {e}")))?;

        tracing::debug!(expires_in = token.expires_in, "Fetched Sheets access token");

        Ok(CachedToken {
            token: SecretString::from(token.access_token),
            refresh_at: refresh_deadline(Instant::now(), token.expires_in),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let token = self.bearer().await?;
        let resp = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; fetch a new one on the next call.
            *self.token.lock().await = None;
        }
        Err(StoreError::Transport(format!("Sheets API returned {status}: {body}")))
    }
}

#[async_trait]
impl SheetClient for GoogleSheetsClient {
    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let url = values_url(SHEETS_BASE_URL, &self.spreadsheet_id, range, "")?;
        let resp = self.send(self.client.get(url)).await?;
        let body: ValueRange = resp
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(cells_to_strings(body.values))
    }

    async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> Result<AppendOutcome, StoreError> {
        let url = values_url(SHEETS_BASE_URL, &self.spreadsheet_id, range, ":append")?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&ValuesBody { values: &rows });
        let resp = self.send(request).await?;
        let body: AppendResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok(AppendOutcome {
            updated_range: body.updates.updated_range,
            updated_rows: body.updates.updated_rows,
        })
    }

    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let url = values_url(SHEETS_BASE_URL, &self.spreadsheet_id, range, "")?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&ValuesBody { values: &rows });
        self.send(request).await?;
        Ok(())
    }
}

/// `{base}{spreadsheet_id}/values/{range}{suffix}` with each segment percent-encoded.
fn values_url(
    base: &str,
    spreadsheet_id: &str,
    range: &str,
    suffix: &str,
) -> Result<reqwest::Url, StoreError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| StoreError::InvalidResponse(format!("bad base url: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidResponse("base url cannot have segments".into()))?
        .pop_if_empty()
        .push(spreadsheet_id)
        .push("values")
        .push(&format!("{range}{suffix}"));
    Ok(url)
}

/// Server errors and rate limiting are worth retrying; any other rejection
/// means the credentials themselves are bad.
fn token_endpoint_error(status: reqwest::StatusCode, body: &str) -> StoreError {
    let message = format!("token endpoint returned {status}: {body}");
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        StoreError::Transport(message)
    } else {
        StoreError::Credentials(message)
    }
}

fn refresh_deadline(now: Instant, expires_in: u64) -> Instant {
    let lifetime = Duration::from_secs(expires_in);
    now + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN)
}

fn cells_to_strings(rows: Vec<Vec<serde_json::Value>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_url_encodes_cyrillic_sheet() {
        let url = values_url(SHEETS_BASE_URL, "sheet-id", "Клиенты!A:I", "").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/"));
        assert!(!s.contains("Клиенты"));
        assert!(s.ends_with("!A:I"));
    }

    #[test]
    fn values_url_appends_suffix_to_range() {
        let url = values_url(SHEETS_BASE_URL, "id", "S!A:I", ":append").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/id/values/S!A:I:append"
        );
    }

    #[test]
    fn values_url_encodes_spaces_in_quoted_sheet() {
        let url = values_url(SHEETS_BASE_URL, "id", "'Order List'!A1:I1", "").unwrap();
        assert!(url.as_str().ends_with("/values/'Order%20List'!A1:I1"));
    }

    #[test]
    fn invalid_key_json_is_credentials_error() {
        let err = GoogleSheetsClient::new("id", &SecretString::from("not json")).err().unwrap();
        assert!(matches!(err, StoreError::Credentials(_)));
    }

    #[test]
    fn invalid_private_key_is_credentials_error() {
        let key = r#"{"client_email":"bot@x.iam.gserviceaccount.com","private_key":"nope"}"#;
        let err = GoogleSheetsClient::new("id", &SecretString::from(key)).err().unwrap();
        assert!(err.to_string().contains("private key"));
    }

    #[test]
    fn refresh_happens_before_expiry() {
        let now = Instant::now();
        assert_eq!(refresh_deadline(now, 3600), now + Duration::from_secs(3540));
        // Very short lifetimes refresh immediately.
        assert_eq!(refresh_deadline(now, 30), now);
    }

    #[test]
    fn token_endpoint_outages_are_transient() {
        use reqwest::StatusCode;

        let err = token_endpoint_error(StatusCode::SERVICE_UNAVAILABLE, "down");
        assert!(matches!(err, StoreError::Transport(_)));
        assert!(err.is_transient());

        let err = token_endpoint_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(err.is_transient());

        let err = token_endpoint_error(StatusCode::BAD_REQUEST, "invalid_grant");
        assert!(matches!(err, StoreError::Credentials(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn non_string_cells_are_stringified() {
        let rows = vec![vec![
            serde_json::json!("Иван"),
            serde_json::json!(42),
            serde_json::Value::Null,
        ]];
        assert_eq!(cells_to_strings(rows), vec![vec!["Иван", "42", ""]]);
    }

    #[test]
    fn append_response_parses_updated_range() {
        let body = r#"{"spreadsheetId":"x","updates":{"updatedRange":"Клиенты!A5:I5","updatedRows":1,"updatedCells":9}}"#;
        let parsed: AppendResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.updates.updated_range, "Клиенты!A5:I5");
        assert_eq!(parsed.updates.updated_rows, 1);
    }
}
