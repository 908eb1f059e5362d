use crate::core::domain::{
    error::{ValidationError, VirtdeckResult},
    value_object::base_value_object::ValueObject,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Constraints for a backend base URL.
#[derive(Debug, Clone)]
pub struct BackendUrlConfig {
    allowed_schemes: &'static [&'static str],
}

impl Default for BackendUrlConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: &["http", "https"],
        }
    }
}

/// A validated base URL of the hypervisor-management backend.
///
/// All API paths (`/api/status`, `/api/vms`, ...) are resolved against it.
#[derive(Debug, Clone)]
pub struct BackendUrl {
    value: Arc<RwLock<String>>,
}

impl BackendUrl {
    /// Creates a new BackendUrl instance with validation
    ///
    /// # Errors
    ///
    /// Returns `VirtdeckError::Validation` if the URL is not an absolute
    /// http(s) URL with a host.
    pub async fn new(url: String) -> VirtdeckResult<Self> {
        <Self as ValueObject>::new(url).await
    }

    /// Creates an instance without validation. Intended for tests.
    pub fn new_unchecked(url: String) -> Self {
        Self::create(url)
    }
}

#[async_trait]
impl ValueObject for BackendUrl {
    type Value = String;
    type ValidationConfig = BackendUrlConfig;

    fn value(&self) -> &Arc<RwLock<Self::Value>> {
        &self.value
    }

    fn validation_config() -> Self::ValidationConfig {
        BackendUrlConfig::default()
    }

    async fn validate(
        value: &Self::Value,
        config: &Self::ValidationConfig,
    ) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::Field {
                field: "backend_url".to_string(),
                message: "Backend URL cannot be empty".to_string(),
            });
        }

        let parsed = Url::parse(value)
            .map_err(|e| ValidationError::Format(format!("Invalid backend URL: {}", e)))?;

        if !config.allowed_schemes.contains(&parsed.scheme()) {
            return Err(ValidationError::ConstraintViolation(format!(
                "Backend URL scheme must be one of {:?}, got '{}'",
                config.allowed_schemes,
                parsed.scheme()
            )));
        }

        if parsed.host_str().is_none() {
            return Err(ValidationError::ConstraintViolation(
                "Backend URL must include a host".to_string(),
            ));
        }

        Ok(())
    }

    fn create(value: Self::Value) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
        }
    }
}
