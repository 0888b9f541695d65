//! Object-safe wrapper around `tactus_agent_turn::Provider`.
//!
//! `Provider` uses RPITIT and is deliberately not object-safe — fine for
//! `ReactOperator<P>`, which is generic over one concrete `P`. A script
//! procedure's agents are declared at runtime from a procedure definition,
//! so the bridge needs to hold a `HashMap<String, Arc<dyn ...>>` of
//! heterogeneous agents without itself being generic. [`ScriptProvider`]
//! is that erasure point; [`ProviderAdapter`] is the blanket bridge from
//! any real `Provider` impl.

use std::future::Future;
use std::pin::Pin;

use tactus_agent_turn::provider::{Provider, ProviderError};
use tactus_agent_turn::types::{ProviderRequest, ProviderResponse};

/// Object-safe counterpart to [`Provider`], used wherever the script bridge
/// needs to hold a provider behind `Arc<dyn ...>`.
pub trait ScriptProvider: Send + Sync {
    /// Send a completion request to the provider.
    fn complete_dyn(
        &self,
        request: ProviderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + '_>>;
}

impl<P: Provider + Send + Sync> ScriptProvider for P {
    fn complete_dyn(
        &self,
        request: ProviderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + '_>> {
        Box::pin(Provider::complete(self, request))
    }
}

/// Adapts an `Arc<dyn ScriptProvider>` back into something that implements
/// the real, non-object-safe `Provider` trait — the shape `ReactOperator<P>`
/// and `SingleShotOperator<P>` expect. This is how the bridge reuses the
/// existing turn operators for `Agent.turn()` without being generic itself.
#[derive(Clone)]
pub struct DynProvider(pub std::sync::Arc<dyn ScriptProvider>);

impl Provider for DynProvider {
    fn complete(
        &self,
        request: ProviderRequest,
    ) -> impl Future<Output = Result<ProviderResponse, ProviderError>> + Send {
        self.0.complete_dyn(request)
    }
}
