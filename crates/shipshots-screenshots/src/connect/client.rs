//! HTTP client for the App Store Connect API.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::version::{ConnectVersion, LocalizationState, ScreenshotApi, ScreenshotSetState};
use super::{slot_identity, ConnectCredentials};
use crate::sync::{CatalogClient, RemoteSlot, StorePlatform, STORE_LANGUAGES};
use crate::{Result, ScreenshotError};

/// Base URL for App Store Connect API v1.
const API_BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// Default retry delay in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Maximum number of retries for rate-limited requests.
const MAX_RETRIES: u32 = 3;

/// Version states in which screenshots can be edited.
const EDITABLE_STATES: &[&str] = &["PREPARE_FOR_SUBMISSION", "DEVELOPER_REJECTED", "REJECTED"];

/// App Store Connect catalog client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
#[derive(Clone)]
pub struct AppStoreConnectClient {
    inner: Arc<Inner>,
}

struct Inner {
    credentials: ConnectCredentials,
    http: Client,
    jwt_cache: RwLock<Option<JwtCache>>,
}

/// Cached JWT token with expiration.
struct JwtCache {
    token: String,
    expires_at: chrono::DateTime<Utc>,
}

impl AppStoreConnectClient {
    /// Create a client with the given request timeout.
    pub fn new(credentials: ConnectCredentials, timeout: StdDuration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScreenshotError::remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                credentials,
                http,
                jwt_cache: RwLock::new(None),
            }),
        })
    }

    /// Generate a JWT token for App Store Connect API authentication.
    fn generate_jwt(&self) -> Result<String> {
        {
            let cache = self
                .inner
                .jwt_cache
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *cache {
                // Reuse until five minutes before expiry
                if Utc::now() < cached.expires_at - Duration::minutes(5) {
                    return Ok(cached.token.clone());
                }
            }
        }

        let now = Utc::now();
        let exp = now + Duration::minutes(20);
        let credentials = &self.inner.credentials;

        let claims = JwtClaims {
            iss: credentials.api_issuer_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            aud: "appstoreconnect-v1".to_string(),
        };

        let encoding_key = EncodingKey::from_ec_pem(credentials.api_private_key.as_bytes())
            .map_err(|e| ScreenshotError::remote(format!("Invalid API key: {}", e)))?;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(credentials.api_key_id.clone());

        let token = encode(&header, &claims, &encoding_key)
            .map_err(|e| ScreenshotError::remote(format!("Failed to generate JWT: {}", e)))?;

        *self
            .inner
            .jwt_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(JwtCache {
            token: token.clone(),
            expires_at: exp,
        });

        Ok(token)
    }

    /// Send an authenticated request, retrying when rate limited.
    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut retries = 0;

        loop {
            let token = self.generate_jwt()?;
            let url = format!("{}{}", API_BASE_URL, endpoint);

            debug!("API request: {} {}", method, url);

            let mut request = self
                .inner
                .http
                .request(method.clone(), &url)
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json");

            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| ScreenshotError::remote(format!("API request failed: {}", e)))?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= MAX_RETRIES {
                    return Err(ScreenshotError::remote("Rate limited: too many requests"));
                }

                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(RETRY_DELAY_MS / 1000);

                warn!(
                    "Rate limited, waiting {} seconds before retry ({}/{})",
                    retry_after,
                    retries + 1,
                    MAX_RETRIES
                );

                sleep(StdDuration::from_secs(retry_after)).await;
                retries += 1;
                continue;
            }

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(ScreenshotError::remote(format!(
                    "API error ({}) for {} {}: {}",
                    status, method, endpoint, error_text
                )));
            }

            return Ok(response);
        }
    }

    /// Make an authenticated request and parse the JSON response.
    pub(super) async fn api_request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.execute(method, endpoint, body.as_ref()).await?;
        response
            .json()
            .await
            .map_err(|e| ScreenshotError::remote(format!("Failed to parse API response: {}", e)))
    }

    /// Make an authenticated request whose response body is not needed.
    pub(super) async fn api_send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        self.execute(method, endpoint, body.as_ref()).await?;
        Ok(())
    }

    /// Upload one part of a reserved asset to the URL App Store Connect handed out.
    pub(super) async fn upload_part(&self, operation: &UploadOperation, bytes: &[u8]) -> Result<()> {
        let start = operation.offset as usize;
        let end = start + operation.length as usize;
        let chunk = bytes.get(start..end).ok_or_else(|| {
            ScreenshotError::remote(format!(
                "Upload operation range {}..{} exceeds file size {}",
                start,
                end,
                bytes.len()
            ))
        })?;

        let method = Method::from_bytes(operation.method.as_bytes())
            .map_err(|e| ScreenshotError::remote(format!("Invalid upload method: {}", e)))?;

        let mut request = self.inner.http.request(method, &operation.url);
        for header in &operation.request_headers {
            request = request.header(header.name.as_str(), header.value.as_str());
        }

        let response = request
            .body(chunk.to_vec())
            .send()
            .await
            .map_err(|e| ScreenshotError::remote(format!("Asset upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ScreenshotError::remote(format!(
                "Asset upload failed ({})",
                response.status()
            )));
        }
        Ok(())
    }

    /// Get the App Store Connect app ID from a bundle ID.
    pub async fn get_app_id(&self, bundle_id: &str) -> Result<String> {
        let endpoint = format!("/apps?filter[bundleId]={}", bundle_id);
        let response: ListResponse<ResourceIdentifier> =
            self.api_request(Method::GET, &endpoint, None).await?;

        response
            .data
            .first()
            .map(|app| app.id.clone())
            .ok_or_else(|| ScreenshotError::remote(format!("App not found: {}", bundle_id)))
    }

    async fn get_editable_version_id(
        &self,
        app_id: &str,
        platform: StorePlatform,
    ) -> Result<Option<String>> {
        let endpoint = format!(
            "/apps/{}/appStoreVersions?filter[platform]={}&filter[appStoreState]={}",
            app_id,
            platform.as_connect_str(),
            EDITABLE_STATES.join(",")
        );
        let response: ListResponse<Resource<VersionAttributes>> =
            self.api_request(Method::GET, &endpoint, None).await?;

        Ok(response
            .data
            .into_iter()
            .find(|v| EDITABLE_STATES.contains(&v.attributes.app_store_state.as_str()))
            .map(|v| v.id))
    }

    async fn get_localizations(&self, version_id: &str) -> Result<Vec<Resource<LocalizationAttributes>>> {
        let endpoint = format!("/appStoreVersions/{}/appStoreVersionLocalizations", version_id);
        let response: ListResponse<Resource<LocalizationAttributes>> =
            self.api_request(Method::GET, &endpoint, None).await?;
        Ok(response.data)
    }

    async fn get_screenshot_sets(&self, localization_id: &str) -> Result<Vec<ScreenshotSetState>> {
        let endpoint = format!(
            "/appStoreVersionLocalizations/{}/appScreenshotSets?include=appScreenshots",
            localization_id
        );
        let response: ListResponse<ScreenshotSetResource> =
            self.api_request(Method::GET, &endpoint, None).await?;

        Ok(response
            .data
            .into_iter()
            .map(|set| ScreenshotSetState {
                id: set.id,
                display_type: set.attributes.screenshot_display_type,
                screenshots: set
                    .relationships
                    .and_then(|r| r.app_screenshots)
                    .map(|r| r.data.into_iter().map(|s| Some(s.id)).collect())
                    .unwrap_or_default(),
                touched: false,
            })
            .collect())
    }
}

#[async_trait]
impl ScreenshotApi for AppStoreConnectClient {
    /// Reserve, upload and commit one screenshot into a set.
    async fn upload_screenshot(&self, set_id: &str, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "screenshot.png".to_string());

        let body = serde_json::json!({
            "data": {
                "type": "appScreenshots",
                "attributes": {
                    "fileName": file_name,
                    "fileSize": bytes.len()
                },
                "relationships": {
                    "appScreenshotSet": {
                        "data": { "type": "appScreenshotSets", "id": set_id }
                    }
                }
            }
        });
        let reservation: SingleResponse<Resource<ReservationAttributes>> =
            self.api_request(Method::POST, "/appScreenshots", Some(body)).await?;

        let screenshot_id = reservation.data.id;
        let operations = reservation.data.attributes.upload_operations.unwrap_or_default();
        debug!(
            path = %path.display(),
            parts = operations.len(),
            "uploading screenshot asset"
        );
        for operation in &operations {
            self.upload_part(operation, &bytes).await?;
        }

        let commit = serde_json::json!({
            "data": {
                "type": "appScreenshots",
                "id": screenshot_id,
                "attributes": { "uploaded": true }
            }
        });
        self.api_send(
            Method::PATCH,
            &format!("/appScreenshots/{}", screenshot_id),
            Some(commit),
        )
        .await?;

        Ok(screenshot_id)
    }

    /// Create a localization for `locale` on a version.
    async fn create_localization(&self, version_id: &str, locale: &str) -> Result<String> {
        let body = serde_json::json!({
            "data": {
                "type": "appStoreVersionLocalizations",
                "attributes": { "locale": locale },
                "relationships": {
                    "appStoreVersion": {
                        "data": { "type": "appStoreVersions", "id": version_id }
                    }
                }
            }
        });
        let response: SingleResponse<ResourceIdentifier> = self
            .api_request(Method::POST, "/appStoreVersionLocalizations", Some(body))
            .await?;
        Ok(response.data.id)
    }

    /// Create an empty screenshot set on a localization.
    async fn create_screenshot_set(
        &self,
        localization_id: &str,
        display_type: &str,
    ) -> Result<String> {
        let body = serde_json::json!({
            "data": {
                "type": "appScreenshotSets",
                "attributes": { "screenshotDisplayType": display_type },
                "relationships": {
                    "appStoreVersionLocalization": {
                        "data": { "type": "appStoreVersionLocalizations", "id": localization_id }
                    }
                }
            }
        });
        let response: SingleResponse<ResourceIdentifier> = self
            .api_request(Method::POST, "/appScreenshotSets", Some(body))
            .await?;
        Ok(response.data.id)
    }

    /// Set the order of the screenshots in a set.
    async fn reorder_screenshots(&self, set_id: &str, ids: &[String]) -> Result<()> {
        let data: Vec<_> = ids
            .iter()
            .map(|id| serde_json::json!({ "type": "appScreenshots", "id": id }))
            .collect();
        self.api_send(
            Method::PATCH,
            &format!("/appScreenshotSets/{}/relationships/appScreenshots", set_id),
            Some(serde_json::json!({ "data": data })),
        )
        .await
    }

    /// Delete a screenshot.
    async fn delete_screenshot(&self, screenshot_id: &str) -> Result<()> {
        self.api_send(
            Method::DELETE,
            &format!("/appScreenshots/{}", screenshot_id),
            None,
        )
        .await
    }
}

#[async_trait]
impl CatalogClient for AppStoreConnectClient {
    type Version = ConnectVersion;

    async fn fetch_editable_version(
        &self,
        app: &str,
        platform: StorePlatform,
    ) -> Result<Option<ConnectVersion>> {
        let app_id = self.get_app_id(app).await?;
        let Some(version_id) = self.get_editable_version_id(&app_id, platform).await? else {
            return Ok(None);
        };

        let mut localizations = BTreeMap::new();
        for localization in self.get_localizations(&version_id).await? {
            let sets = self.get_screenshot_sets(&localization.id).await?;
            localizations.insert(
                localization.attributes.locale,
                LocalizationState {
                    id: localization.id,
                    sets,
                },
            );
        }

        info!(
            app,
            version = %version_id,
            localizations = localizations.len(),
            "fetched editable version"
        );
        Ok(Some(ConnectVersion::new(self.clone(), version_id, localizations)))
    }

    async fn available_languages(&self) -> Result<Vec<String>> {
        Ok(STORE_LANGUAGES.iter().map(|l| l.to_string()).collect())
    }
}

/// Slots of one localization, ordered by display type then position.
pub(super) fn slots_for(language: &str, sets: &[ScreenshotSetState]) -> Vec<RemoteSlot> {
    let mut slots = Vec::new();
    for set in sets {
        let (device_type, is_secondary_surface) = slot_identity(&set.display_type);
        let mut order = 0;
        for _ in set.screenshots.iter().flatten() {
            order += 1;
            slots.push(RemoteSlot {
                sort_order: order,
                language: language.to_string(),
                device_type: device_type.clone(),
                is_secondary_surface,
            });
        }
    }
    slots
}

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
}

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SingleResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Resource<A> {
    id: String,
    attributes: A,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionAttributes {
    app_store_state: String,
}

#[derive(Debug, Deserialize)]
struct LocalizationAttributes {
    locale: String,
}

#[derive(Debug, Deserialize)]
struct ScreenshotSetResource {
    id: String,
    attributes: ScreenshotSetAttributes,
    relationships: Option<ScreenshotSetRelationships>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotSetAttributes {
    screenshot_display_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScreenshotSetRelationships {
    app_screenshots: Option<RelationshipList>,
}

#[derive(Debug, Deserialize)]
struct RelationshipList {
    #[serde(default)]
    data: Vec<ResourceIdentifier>,
}

#[derive(Debug, Deserialize)]
struct ResourceIdentifier {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReservationAttributes {
    upload_operations: Option<Vec<UploadOperation>>,
}

/// One part of a reserved asset upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UploadOperation {
    method: String,
    url: String,
    offset: u64,
    length: u64,
    #[serde(default)]
    request_headers: Vec<UploadHeader>,
}

#[derive(Debug, Deserialize)]
struct UploadHeader {
    name: String,
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screenshot_sets_response() {
        let json = r#"{
            "data": [{
                "type": "appScreenshotSets",
                "id": "set-1",
                "attributes": { "screenshotDisplayType": "IMESSAGE_APP_IPHONE_65" },
                "relationships": {
                    "appScreenshots": {
                        "data": [
                            { "type": "appScreenshots", "id": "a" },
                            { "type": "appScreenshots", "id": "b" }
                        ]
                    }
                }
            }]
        }"#;
        let response: ListResponse<ScreenshotSetResource> = serde_json::from_str(json).unwrap();
        let set = &response.data[0];
        assert_eq!(set.attributes.screenshot_display_type, "IMESSAGE_APP_IPHONE_65");
        let ids: Vec<_> = set
            .relationships
            .as_ref()
            .and_then(|r| r.app_screenshots.as_ref())
            .map(|r| r.data.iter().map(|d| d.id.as_str()).collect())
            .unwrap_or_default();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_reservation_response() {
        let json = r#"{
            "data": {
                "type": "appScreenshots",
                "id": "shot-1",
                "attributes": {
                    "uploadOperations": [{
                        "method": "PUT",
                        "url": "https://upload.example.com/part1",
                        "offset": 0,
                        "length": 4,
                        "requestHeaders": [{ "name": "Content-Type", "value": "image/png" }]
                    }]
                }
            }
        }"#;
        let response: SingleResponse<Resource<ReservationAttributes>> =
            serde_json::from_str(json).unwrap();
        let operations = response.data.attributes.upload_operations.unwrap();
        assert_eq!(operations[0].length, 4);
        assert_eq!(operations[0].request_headers[0].value, "image/png");
    }

    #[test]
    fn test_slots_for_sets() {
        let sets = vec![
            ScreenshotSetState {
                id: "s1".to_string(),
                display_type: "APP_IPHONE_65".to_string(),
                screenshots: vec![Some("a".to_string()), Some("b".to_string())],
                touched: false,
            },
            ScreenshotSetState {
                id: "s2".to_string(),
                display_type: "IMESSAGE_APP_IPAD_PRO_129".to_string(),
                screenshots: vec![Some("c".to_string())],
                touched: false,
            },
        ];
        let slots = slots_for("en-US", &sets);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[1].sort_order, 2);
        assert_eq!(slots[1].device_type, "iphone65");
        assert_eq!(slots[2].device_type, "ipadPro");
        assert!(slots[2].is_secondary_surface);
    }
}
