//! Object-safe wrapper around `tactus_hitl::HitlGateway<H>`, mirroring
//! `provider::ScriptProvider` for the same reason: `HitlGateway` is generic
//! over its `HitlHandler`, but the bridge's `Human` capability needs to
//! hold one gateway behind `Arc<dyn ...>` regardless of whether the
//! invocation is running against a real handler or a `MockHitlHandler`.

use async_trait::async_trait;
use serde_json::Value;
use tactus_core::duration::DurationMs;
use tactus_core::error::HitlError;
use tactus_core::id::InvocationId;
use tactus_hitl::{HitlGateway, HitlHandler};

/// Object-safe facade over [`HitlGateway::approve`]/`input`/`review`.
#[async_trait]
pub trait DynHitl: Send + Sync {
    /// See [`HitlGateway::approve`].
    async fn approve(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError>;

    /// See [`HitlGateway::input`].
    async fn input(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError>;

    /// See [`HitlGateway::review`].
    async fn review(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError>;
}

#[async_trait]
impl<H: HitlHandler + 'static> DynHitl for HitlGateway<H> {
    async fn approve(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        HitlGateway::approve(self, invocation, message, context, timeout, default).await
    }

    async fn input(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        HitlGateway::input(self, invocation, message, context, timeout, default).await
    }

    async fn review(
        &self,
        invocation: &InvocationId,
        message: String,
        context: Value,
        timeout: Option<DurationMs>,
        default: Option<Value>,
    ) -> Result<Value, HitlError> {
        HitlGateway::review(self, invocation, message, context, timeout, default).await
    }
}
