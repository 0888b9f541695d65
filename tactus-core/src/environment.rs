//! The Environment protocol — resource dependencies a procedure invocation needs
//! before its turns can run: credentials, working directories, reachable tools.

use crate::{error::EnvError, turn::TurnInput, turn::TurnOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Protocol ④ — Environment
///
/// How a turn executes within its resource boundary. An invocation declares
/// what it depends on (credentials, isolation, resource limits); the
/// Environment resolves those dependencies and runs the turn inside them.
///
/// Implementations:
/// - LocalEnvironment: no isolation, direct execution, credentials read
///   straight from the process environment (development, CI, single-tenant
///   deployments)
/// - A future containerized/sandboxed environment for untrusted procedures
///
/// `run()` takes only data (`TurnInput` + `EnvironmentSpec`), not a function
/// reference — how the Environment resolves and invokes a Turn is an internal
/// concern, the same pattern the Orchestrator protocol uses for dispatch.
#[async_trait]
pub trait Environment: Send + Sync {
    /// Execute a turn within this environment's resource boundary.
    ///
    /// The implementation:
    /// 1. Resolves any required isolation (process, container, sandbox)
    /// 2. Injects credentials according to the spec
    /// 3. Applies resource limits
    /// 4. Executes the turn
    /// 5. Tears down anything it provisioned
    async fn run(&self, input: TurnInput, spec: &EnvironmentSpec) -> Result<TurnOutput, EnvError>;
}

/// Declarative specification of what a procedure invocation depends on.
/// Serializable so it can live in a procedure definition.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// Isolation boundaries to apply, outermost first.
    #[serde(default)]
    pub isolation: Vec<IsolationBoundary>,

    /// Credentials to make available to the invocation.
    #[serde(default)]
    pub credentials: Vec<CredentialRef>,

    /// Resource limits.
    pub resources: Option<ResourceLimits>,
}

/// A single isolation boundary. Multiple boundaries compose.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IsolationBoundary {
    /// OS process boundary (the only boundary `LocalEnvironment` honors).
    Process,
    /// Future isolation types (container, sandbox, wasm runtime).
    Custom {
        /// The custom boundary type identifier.
        boundary_type: String,
        /// Configuration for this boundary.
        config: serde_json::Value,
    },
}

/// A reference to a credential an invocation needs. Resolution of *where*
/// the value comes from is out of scope — this is the declaration a real
/// secrets backend would consume, not a resolver.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRef {
    /// Name of the credential (e.g., "anthropic-api-key").
    pub name: String,
    /// How to inject it.
    pub injection: CredentialInjection,
}

/// How a credential is injected into the environment.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialInjection {
    /// Read from an environment variable already set on the process.
    EnvVar {
        /// The environment variable name.
        var_name: String,
    },
    /// Mount as file.
    File {
        /// The file path to mount the credential at.
        path: String,
    },
}

/// Resource limits for the execution environment.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum wall-clock time for the whole invocation.
    pub max_duration_ms: Option<u64>,
    /// Maximum USD cost for the whole invocation.
    pub max_cost: Option<rust_decimal::Decimal>,
}

impl CredentialRef {
    /// Create a new credential reference.
    pub fn new(name: impl Into<String>, injection: CredentialInjection) -> Self {
        Self {
            name: name.into(),
            injection,
        }
    }
}
