use crate::core::domain::error::{ValidationError, VirtdeckResult};
use async_trait::async_trait;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A trait representing a domain value object with built-in validation,
/// thread-safety, and async capabilities.
///
/// Value objects wrap a validated primitive behind `Arc<RwLock>` so they can
/// be shared across tasks and cloned cheaply.
///
/// # Type Parameters
///
/// * `Value`: The underlying type of the value object
#[async_trait]
pub trait ValueObject: Send + Sync + 'static {
    /// The underlying type of the value
    type Value: Send + Sync + Clone + Display;

    /// The configuration type for validation
    type ValidationConfig: Send + Sync;

    /// Returns a reference to the internal thread-safe value
    fn value(&self) -> &Arc<RwLock<Self::Value>>;

    /// Returns the validation configuration for the value object
    fn validation_config() -> Self::ValidationConfig;

    /// Validates the value according to domain rules
    ///
    /// # Returns
    ///
    /// * `Ok(())` if validation passes
    /// * `Err(ValidationError)` if validation fails
    async fn validate(
        value: &Self::Value,
        config: &Self::ValidationConfig,
    ) -> Result<(), ValidationError>;

    /// Returns the value as a clone
    async fn as_inner(&self) -> Self::Value {
        self.value().read().await.clone()
    }

    /// Creates a new instance with the given value, skipping validation
    fn create(value: Self::Value) -> Self;

    /// Creates a new validated instance asynchronously
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` if creation and validation succeed
    /// * `Err(VirtdeckError)` if validation fails
    async fn new(value: Self::Value) -> VirtdeckResult<Self>
    where
        Self: Sized,
    {
        let config = Self::validation_config();
        Self::validate(&value, &config).await?;
        Ok(Self::create(value))
    }
}
