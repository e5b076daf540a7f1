//! The adapter abstraction and its registry.
//!
//! Every external CFP source is wrapped in an [`Adapter`]: one named component
//! with a single fetch capability. The ingestion run iterates a registry of
//! boxed adapters; polymorphism is over the fetch capability, not a class
//! hierarchy.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            AdapterRegistry               │
//! │  ┌────────────┐  ┌────────────────────┐  │
//! │  │ grants_gov │  │ agency:<name>  ... │  │
//! │  └────────────┘  └────────────────────┘  │
//! └───────────────┬──────────────────────────┘
//!                 ▼
//!        run_ingestion() → upserts
//! ```
//!
//! The registry is built from configuration at startup and passed into the
//! orchestrator explicitly. There is no process-global registration, so test
//! setups can inject stub adapters.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::CfpDraft;

/// A CFP source adapter.
///
/// # Lifecycle
///
/// 1. Constructed from its config section by [`crate::registry::build_registry`].
/// 2. [`fetch`](Adapter::fetch) is called once per ingestion run.
/// 3. Returned drafts flow through the upsert keyed by `(source, source_id)`.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use callboard::error::FetchError;
/// use callboard::models::CfpDraft;
/// use callboard::traits::Adapter;
///
/// pub struct FixtureAdapter;
///
/// #[async_trait]
/// impl Adapter for FixtureAdapter {
///     fn name(&self) -> &str { "fixture" }
///     fn description(&self) -> &str { "Returns a canned listing" }
///
///     async fn fetch(&self) -> Result<Vec<CfpDraft>, FetchError> {
///         Ok(vec![CfpDraft::new("fixture", "1", "Example Call", "https://example.org/1")])
///     }
/// }
/// ```
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The source name used to tag records from this adapter
    /// (e.g. `"grants_gov"`, `"agency:icmr"`). Must be unique per registry.
    fn name(&self) -> &str;

    /// One-line description, shown by `callboard sources`.
    fn description(&self) -> &str;

    /// Contact the external source and return all current listings,
    /// normalized. Performs network I/O to a single endpoint per call.
    ///
    /// Fails with [`FetchError`] when the source is unreachable or returns
    /// unparseable content; the ingestion run recovers by recording the
    /// failure and continuing with the next adapter.
    async fn fetch(&self) -> Result<Vec<CfpDraft>, FetchError>;
}

/// Ordered collection of adapter instances for one ingestion run.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn Adapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Box<dyn Adapter>] {
        &self.adapters
    }

    pub fn find(&self, name: &str) -> Option<&dyn Adapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
