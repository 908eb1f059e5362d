//! HTTP client for the hypervisor-management backend API.

use crate::core::domain::error::{VirtdeckError, VirtdeckResult};
use crate::core::domain::lifecycle::VmAction;
use crate::core::domain::model::config::FleetConfig;
use crate::core::domain::model::fleet_view::BackendStatus;
use crate::core::domain::model::storage_pool::StoragePool;
use crate::core::domain::model::vm::VirtualMachine;
use crate::core::domain::value_object::{BackendUrl, ValueObject};
use crate::core::infrastructure::backend::{
    ActionResponse, CreateVmSpec, HypervisorBackend,
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct VmsEnvelope {
    vms: Vec<VirtualMachine>,
}

#[derive(Debug, Deserialize)]
struct PoolsEnvelope {
    pools: Vec<StoragePool>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Reqwest-backed implementation of [`HypervisorBackend`].
///
/// Applies the configured request timeout and optional client-side rate
/// limiting to every call. Timeouts and connection failures surface as
/// `VirtdeckError::Transport`.
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient` for the given backend base URL.
    ///
    /// # Errors
    /// Returns `VirtdeckError::Transport` if the HTTP client cannot be built.
    pub async fn new(base_url: &BackendUrl, config: &FleetConfig) -> VirtdeckResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| VirtdeckError::Transport(e.to_string()))?;

        let rate_limiter = config.rate_limit.map(|rl| {
            let per_second =
                NonZeroU32::new(rl.requests_per_second).unwrap_or(NonZeroU32::MIN);
            let burst = NonZeroU32::new(rl.burst_size).unwrap_or(NonZeroU32::MIN);
            let quota = Quota::per_second(per_second).allow_burst(burst);
            Arc::new(DefaultDirectRateLimiter::direct(quota))
        });

        Ok(Self {
            http_client,
            base_url: base_url.as_inner().await,
            rate_limiter,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.rate_limiter {
            // `until_ready()` completes when capacity is available.
            limiter.until_ready().await;
        }
    }

    async fn get_json<T>(&self, path: &str) -> VirtdeckResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.throttle().await;

        let response = self
            .http_client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(|e| VirtdeckError::Transport(format!("GET {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.or(envelope.message))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(VirtdeckError::Transport(format!(
                "API error ({}): {}",
                status, message
            )));
        }

        response.json::<T>().await.map_err(|e| {
            VirtdeckError::Transport(format!("failed to parse response from {}: {}", path, e))
        })
    }

    /// Posts a state-changing request and parses the logical outcome.
    ///
    /// The backend reports logical failures with a non-2xx status and a JSON
    /// body (`{success: false, message|error}`), so the body is parsed before
    /// the status code is consulted.
    async fn post_for_outcome<B>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> VirtdeckResult<ActionResponse>
    where
        B: serde::Serialize + Sync,
    {
        self.throttle().await;

        let mut req_builder = self.http_client.post(self.endpoint(path));
        if let Some(body) = body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder
            .send()
            .await
            .map_err(|e| VirtdeckError::Transport(format!("POST {} failed: {}", path, e)))?;

        let status = response.status();
        match response.json::<ActionResponse>().await {
            Ok(outcome) => Ok(outcome),
            Err(e) if status.is_success() => Err(VirtdeckError::Transport(format!(
                "failed to parse response from {}: {}",
                path, e
            ))),
            Err(_) => Err(VirtdeckError::Transport(format!("API error ({})", status))),
        }
    }
}

#[async_trait]
impl HypervisorBackend for ApiClient {
    async fn status(&self) -> VirtdeckResult<BackendStatus> {
        self.get_json("api/status").await
    }

    async fn list_vms(&self) -> VirtdeckResult<Vec<VirtualMachine>> {
        Ok(self.get_json::<VmsEnvelope>("api/vms").await?.vms)
    }

    async fn vm_action(&self, name: &str, action: VmAction) -> VirtdeckResult<ActionResponse> {
        let path = format!("api/vm/{}/{}", name, action.as_segment());
        self.post_for_outcome::<()>(&path, None).await
    }

    async fn create_vm(&self, spec: &CreateVmSpec) -> VirtdeckResult<ActionResponse> {
        self.post_for_outcome("api/vm/create", Some(spec)).await
    }

    async fn list_pools(&self) -> VirtdeckResult<Vec<StoragePool>> {
        Ok(self.get_json::<PoolsEnvelope>("api/storage/pools").await?.pools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::model::config::RateLimitConfig;
    use crate::core::domain::model::vm::VmStatus;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_client(server_url: &str) -> ApiClient {
        let url = BackendUrl::new_unchecked(server_url.to_string());
        ApiClient::new(&url, &FleetConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn status_success() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "connected": true,
                "libvirt_status": "Connected"
            })))
            .mount(&mock_server)
            .await;

        let status = client.status().await.unwrap();
        assert!(status.connected);
        assert_eq!(status.libvirt_status, "Connected");
    }

    #[tokio::test]
    async fn list_vms_maps_wire_shape() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "vms": [
                    {
                        "name": "web01",
                        "uuid": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
                        "status": "Running",
                        "icon": "🟢",
                        "vcpu": 2,
                        "memory_mb": 2048
                    },
                    {
                        "name": "db02",
                        "uuid": "2c5f39cb-3fb2-22e3-994f-1127e4ddb538",
                        "status": "Crashed",
                        "vcpu": 4,
                        "memory_mb": 8192
                    }
                ]
            })))
            .mount(&mock_server)
            .await;

        let vms = client.list_vms().await.unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[0].name, "web01");
        assert_eq!(vms[0].status, VmStatus::Running);
        assert_eq!(vms[0].vcpu_count, 2);
        // Foreign state labels collapse instead of failing the list.
        assert_eq!(vms[1].status, VmStatus::NoState);
    }

    #[tokio::test]
    async fn list_vms_error_body_is_surfaced() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("GET"))
            .and(path("/api/vms"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "libvirt unreachable"
            })))
            .mount(&mock_server)
            .await;

        let result = client.list_vms().await;
        match result {
            Err(VirtdeckError::Transport(message)) => {
                assert!(message.contains("libvirt unreachable"), "{message}");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn vm_action_logical_failure_parses_500_body() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("POST"))
            .and(path("/api/vm/web01/stop"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "success": false,
                "message": "VM 'web01' failed to shut down gracefully."
            })))
            .mount(&mock_server)
            .await;

        let outcome = client.vm_action("web01", VmAction::Stop).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(
            outcome.message(),
            Some("VM 'web01' failed to shut down gracefully.")
        );
    }

    #[tokio::test]
    async fn create_vm_sends_full_body() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        let spec = CreateVmSpec::named("new-vm");
        Mock::given(method("POST"))
            .and(path("/api/vm/create"))
            .and(body_json(serde_json::json!({
                "name": "new-vm",
                "memory_mb": 512,
                "vcpu": 1,
                "disk_path": "/var/lib/libvirt/images/new_vm.qcow2",
                "disk_size_gb": 10,
                "os_iso_path": null,
                "network_bridge": "virbr0"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "VM 'new-vm' created successfully!"
            })))
            .mount(&mock_server)
            .await;

        let outcome = client.create_vm(&spec).await.unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn create_vm_error_envelope_is_a_logical_failure() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("POST"))
            .and(path("/api/vm/create"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Failed to create VM 'new-vm'. Check logs for details."
            })))
            .mount(&mock_server)
            .await;

        let outcome = client.create_vm(&CreateVmSpec::named("new-vm")).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.message().unwrap().contains("Failed to create"));
    }

    #[tokio::test]
    async fn unparseable_error_response_is_a_transport_error() {
        let mock_server = MockServer::start().await;
        let client = create_test_client(&mock_server.uri()).await;

        Mock::given(method("POST"))
            .and(path("/api/vm/web01/start"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let result = client.vm_action("web01", VmAction::Start).await;
        assert!(matches!(result, Err(VirtdeckError::Transport(_))));
    }

    #[tokio::test]
    async fn rate_limiting_delays_requests() {
        use std::time::{Duration, Instant};

        let mock_server = MockServer::start().await;
        let url = BackendUrl::new_unchecked(mock_server.uri());
        let config = FleetConfig {
            rate_limit: Some(RateLimitConfig {
                requests_per_second: 2,
                burst_size: 2,
            }),
            ..Default::default()
        };
        let client = ApiClient::new(&url, &config).await.unwrap();

        Mock::given(method("GET"))
            .and(path("/api/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "connected": true,
                "libvirt_status": "Connected"
            })))
            .expect(4)
            .mount(&mock_server)
            .await;

        // Burst passes immediately.
        let start = Instant::now();
        let (r1, r2) = tokio::join!(client.status(), client.status());
        r1.unwrap();
        r2.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));

        // The next pair must wait for the 2/sec quota to replenish.
        let start = Instant::now();
        let (r3, r4) = tokio::join!(client.status(), client.status());
        r3.unwrap();
        r4.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(900));
    }
}
