use crate::core::domain::{
    error::{ValidationError, VirtdeckResult},
    value_object::base_value_object::ValueObject,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Constraints for a VM name.
#[derive(Debug, Clone)]
pub struct VmNameConfig {
    max_length: usize,
}

impl Default for VmNameConfig {
    fn default() -> Self {
        Self { max_length: 64 }
    }
}

/// A validated VM name.
///
/// Names are interpolated into the `/api/vm/{name}/{action}` path, so they
/// must not contain path separators or whitespace.
#[derive(Debug, Clone)]
pub struct VmName {
    value: Arc<RwLock<String>>,
}

impl VmName {
    /// Creates a new VmName instance with validation
    ///
    /// # Errors
    ///
    /// Returns `VirtdeckError::Validation` if the name is empty, too long, or
    /// contains characters that cannot appear in a URL path segment.
    pub async fn new(name: String) -> VirtdeckResult<Self> {
        <Self as ValueObject>::new(name).await
    }

    /// Creates an instance without validation. Intended for tests.
    pub fn new_unchecked(name: String) -> Self {
        Self::create(name)
    }
}

#[async_trait]
impl ValueObject for VmName {
    type Value = String;
    type ValidationConfig = VmNameConfig;

    fn value(&self) -> &Arc<RwLock<Self::Value>> {
        &self.value
    }

    fn validation_config() -> Self::ValidationConfig {
        VmNameConfig::default()
    }

    async fn validate(
        value: &Self::Value,
        config: &Self::ValidationConfig,
    ) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::Field {
                field: "name".to_string(),
                message: "VM name cannot be empty".to_string(),
            });
        }

        if value.len() > config.max_length {
            return Err(ValidationError::ConstraintViolation(format!(
                "VM name length exceeds maximum of {} characters",
                config.max_length
            )));
        }

        if value.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(ValidationError::Format(
                "VM name cannot contain whitespace or path separators".to_string(),
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
