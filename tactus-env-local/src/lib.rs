#![deny(missing_docs)]
//! Local (passthrough) implementation of tactus_core's Environment trait,
//! plus §5's resource dependency provisioning: HTTP clients, database pools,
//! caches declared by a procedure definition, created once per invocation,
//! shared across that invocation's agents, torn down on terminal status, and
//! inherited by reference by any child invocation.
//!
//! No isolation, no credential injection, no resource limits — this is the
//! development/single-process implementation. A future sandboxed
//! `Environment` would honor `EnvironmentSpec::isolation`; `LocalEnv` only
//! honors `Process` (the default, a no-op).

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tactus_core::environment::{Environment, EnvironmentSpec};
use tactus_core::error::EnvError;
use tactus_core::turn::{Turn, TurnInput, TurnOutput};

/// A resource dependency instance, type-erased so the pool can hold
/// heterogeneous resources (an HTTP client next to a cache next to a pool
/// handle) behind one map.
pub type ResourceHandle = Arc<dyn Any + Send + Sync>;

/// How to create and dispose of one named resource dependency.
///
/// Implementations wrap whatever the invocation actually needs — a
/// `reqwest::Client`, a connection pool, an in-process cache. `provision`
/// runs once at invocation start; `teardown` runs once when the owning
/// invocation reaches a terminal status.
#[async_trait]
pub trait ResourceFactory: Send + Sync {
    /// Create the resource. Returns a type-erased handle stored in the pool.
    async fn provision(&self) -> Result<ResourceHandle, EnvError>;

    /// Dispose of a previously provisioned resource. Default no-op — most
    /// resources (HTTP clients, in-memory caches) drop cleanly and need no
    /// explicit teardown; pooled connections override this.
    async fn teardown(&self, _handle: ResourceHandle) {}
}

/// The set of resource dependencies shared by every agent within one
/// invocation. Created at invocation start via [`ResourcePool::provision`],
/// torn down once via [`ResourcePool::teardown`] when the invocation
/// finishes. `Clone` is cheap (`Arc` underneath) — a child invocation
/// inherits its parent's pool by cloning it, sharing the same resource
/// instances rather than provisioning its own.
#[derive(Clone, Default)]
pub struct ResourcePool {
    resources: Arc<tokio::sync::Mutex<HashMap<String, ResourceHandle>>>,
}

impl ResourcePool {
    /// Provision a fresh pool from a set of named factories. Each factory
    /// runs once; a provisioning failure aborts the whole pool (an
    /// invocation either gets every resource it declared, or none).
    pub async fn provision(
        factories: Vec<(String, Arc<dyn ResourceFactory>)>,
    ) -> Result<(Self, Vec<(String, Arc<dyn ResourceFactory>)>), EnvError> {
        let mut resources = HashMap::with_capacity(factories.len());
        for (name, factory) in &factories {
            let handle = factory.provision().await?;
            resources.insert(name.clone(), handle);
        }
        Ok((
            Self {
                resources: Arc::new(tokio::sync::Mutex::new(resources)),
            },
            factories,
        ))
    }

    /// Look up a resource by name and downcast it to the expected type.
    /// Returns `None` if the name wasn't provisioned or the type doesn't
    /// match — callers treat a missing dependency as a configuration error
    /// at the call site, not a panic here.
    pub async fn get<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        let guard = self.resources.lock().await;
        guard.get(name).and_then(|h| h.clone().downcast::<T>().ok())
    }

    /// Inherit this pool by reference for a child invocation — same
    /// instances, no re-provisioning. Spec §5: "child invocations inherit
    /// the parent's resources by reference."
    pub fn inherit(&self) -> Self {
        self.clone()
    }

    /// Tear down every resource. Called once when the owning invocation
    /// reaches a terminal status (`completed`, `failed`, or `cancelled`).
    /// A child's inherited pool does not tear down its own copy — only the
    /// invocation that originally provisioned the pool does, to avoid
    /// double-teardown of shared resources.
    pub async fn teardown(self, factories: &[(String, Arc<dyn ResourceFactory>)]) {
        let mut guard = self.resources.lock().await;
        for (name, factory) in factories {
            if let Some(handle) = guard.remove(name) {
                factory.teardown(handle).await;
            }
        }
    }
}

/// Local passthrough environment.
///
/// Owns an `Arc<dyn Turn>` plus the invocation's [`ResourcePool`] and
/// delegates execution directly to the turn. The `EnvironmentSpec` is
/// otherwise ignored — there is no isolation boundary beyond the
/// process itself and no credential injection.
///
/// Suitable for development, testing, and single-process deployments
/// where isolation is not required.
pub struct LocalEnv {
    op: Arc<dyn Turn>,
    resources: ResourcePool,
}

impl LocalEnv {
    /// Create a new local environment wrapping the given turn with an
    /// empty resource pool.
    pub fn new(op: Arc<dyn Turn>) -> Self {
        Self {
            op,
            resources: ResourcePool::default(),
        }
    }

    /// Create a local environment with a pre-provisioned (or inherited)
    /// resource pool — the shape a child invocation uses to share its
    /// parent's resources.
    pub fn with_resources(op: Arc<dyn Turn>, resources: ResourcePool) -> Self {
        Self { op, resources }
    }

    /// The resource pool this environment exposes to its agents.
    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }
}

#[async_trait]
impl Environment for LocalEnv {
    async fn run(&self, input: TurnInput, _spec: &EnvironmentSpec) -> Result<TurnOutput, EnvError> {
        self.op.execute(input).await.map_err(EnvError::TurnError)
    }
}
