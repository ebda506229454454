//! JSON-RPC client for DAS `getAssetsByOwner`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokengate_entitlements::AssetItem;
use tokengate_types::WalletAddress;

use crate::{AssetOracle, OracleError};

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct DasOracleConfig {
    /// JSON-RPC endpoint, API key included if the provider wants one.
    pub url: String,
    /// Items requested per page.
    pub page_limit: u32,
    /// Hard cap on pages fetched for one wallet.
    pub max_pages: u32,
    /// Timeout of each HTTP request.
    pub timeout: Duration,
}

impl Default for DasOracleConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            page_limit: 1000,
            max_pages: 10,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Asset oracle backed by a DAS-compatible RPC provider.
pub struct DasOracle {
    http_client: reqwest::Client,
    config: DasOracleConfig,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: AssetsByOwnerParams<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssetsByOwnerParams<'a> {
    owner_address: &'a str,
    page: u32,
    limit: u32,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<AssetPage>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct AssetPage {
    #[serde(default)]
    items: Vec<AssetItem>,
}

impl DasOracle {
    pub fn new(config: DasOracleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            config,
        }
    }

    async fn fetch_page(&self, owner: &str, page: u32) -> Result<Vec<AssetItem>, OracleError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: "tokengate",
            method: "getAssetsByOwner",
            params: AssetsByOwnerParams {
                owner_address: owner,
                page,
                limit: self.config.page_limit,
            },
        };

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Unreachable(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    OracleError::Unreachable(format!("connection failed: {e}"))
                } else {
                    OracleError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(OracleError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            OracleError::InvalidResponse(format!("failed to parse getAssetsByOwner response: {e}"))
        })?;

        if let Some(err) = body.error {
            return Err(OracleError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        body.result
            .map(|page| page.items)
            .ok_or_else(|| OracleError::InvalidResponse("response has no result".into()))
    }
}

#[async_trait]
impl AssetOracle for DasOracle {
    async fn fetch_assets(&self, owner: &WalletAddress) -> Result<Vec<AssetItem>, OracleError> {
        let mut items = Vec::new();
        // DAS pages are 1-based.
        for page in 1..=self.config.max_pages.max(1) {
            let batch = self.fetch_page(owner.as_str(), page).await?;
            let short = (batch.len() as u32) < self.config.page_limit;
            items.extend(batch);
            if short {
                return Ok(items);
            }
        }
        tracing::warn!(
            wallet = %owner,
            pages = self.config.max_pages,
            "page cap reached; holdings may be incomplete"
        );
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    /// Serves `pages` in order, recording each request body.
    #[derive(Clone, Default)]
    struct MockDas {
        pages: Arc<Vec<Value>>,
        requests: Arc<Mutex<Vec<Value>>>,
    }

    async fn handle(State(mock): State<MockDas>, Json(req): Json<Value>) -> Json<Value> {
        let page = req["params"]["page"].as_u64().unwrap_or(1) as usize;
        mock.requests.lock().unwrap().push(req);
        let items = mock.pages.get(page - 1).cloned().unwrap_or(json!([]));
        Json(json!({ "jsonrpc": "2.0", "id": "tokengate", "result": { "items": items } }))
    }

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn spawn_mock(pages: Vec<Value>) -> (String, MockDas) {
        let mock = MockDas {
            pages: Arc::new(pages),
            ..Default::default()
        };
        let router = Router::new()
            .route("/", post(handle))
            .with_state(mock.clone());
        (spawn(router).await, mock)
    }

    fn oracle(url: String, page_limit: u32, max_pages: u32) -> DasOracle {
        DasOracle::new(DasOracleConfig {
            url,
            page_limit,
            max_pages,
            timeout: Duration::from_secs(2),
        })
    }

    fn nft(id: &str, collection: &str) -> Value {
        json!({ "id": id, "grouping": [{ "group_key": "collection", "group_value": collection }] })
    }

    #[tokio::test]
    async fn paginates_until_short_page() {
        let (url, mock) = spawn_mock(vec![
            json!([nft("a", "COLLX"), nft("b", "COLLX")]),
            json!([{ "id": "MINT", "token_info": { "balance": 5, "decimals": 0 } }]),
        ])
        .await;

        let items = oracle(url, 2, 10)
            .fetch_assets(&WalletAddress::new("Owner1"))
            .await
            .unwrap();
        assert_eq!(items.len(), 3);

        let requests = mock.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["method"], "getAssetsByOwner");
        assert_eq!(requests[0]["params"]["ownerAddress"], "Owner1");
        assert_eq!(requests[1]["params"]["page"], 2);
    }

    #[tokio::test]
    async fn stops_at_page_cap() {
        let full = json!([nft("a", "COLLX")]);
        let (url, mock) = spawn_mock(vec![full.clone(), full.clone(), full]).await;

        let items = oracle(url, 1, 2)
            .fetch_assets(&WalletAddress::new("Owner1"))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(mock.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rpc_error_is_reported() {
        let router = Router::new().route(
            "/",
            post(|| async {
                Json(json!({ "jsonrpc": "2.0", "id": "x", "error": { "code": -32602, "message": "bad owner" } }))
            }),
        );
        let url = spawn(router).await;
        let err = oracle(url, 10, 1)
            .fetch_assets(&WalletAddress::new("Owner1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::Rpc(msg) if msg.contains("bad owner")));
    }

    #[tokio::test]
    async fn http_failure_is_reported() {
        let router = Router::new().route("/", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let url = spawn(router).await;
        let err = oracle(url, 10, 1)
            .fetch_assets(&WalletAddress::new("Owner1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let router = Router::new().route("/", post(|| async { "not json" }));
        let url = spawn(router).await;
        let err = oracle(url, 10, 1)
            .fetch_assets(&WalletAddress::new("Owner1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::InvalidResponse(_)));
    }
}
