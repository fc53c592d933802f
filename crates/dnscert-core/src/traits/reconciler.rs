// # Reconciliation Engine Trait
//
// Defines the interface to the desired-state DNS engine.
//
// Given a provider and a zone's desired configuration, the engine reads the
// live records, computes the difference and hands back the provider calls
// that would make live state match. dnscert never builds corrections
// itself; it only decides *which* desired state to reconcile and runs the
// resulting corrections in the order the engine produced them.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;

use crate::zone::{DomainConfig, ProviderInstance};

/// Executable side of a correction
///
/// One provider-side mutation batch: create these records, delete that one,
/// and so on. Implemented for plain async closures, so engines can write
/// `Correction::new(msg, move || async move { ... })`.
#[async_trait]
pub trait CorrectionAction: Send + Sync {
    /// Perform the mutation
    async fn run(&self) -> Result<(), crate::Error>;
}

#[async_trait]
impl<F, Fut> CorrectionAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), crate::Error>> + Send,
{
    async fn run(&self) -> Result<(), crate::Error> {
        (self)().await
    }
}

/// A unit of work produced by the reconciliation engine
///
/// Corrections without an action are informational reports.
pub struct Correction {
    /// Human-readable description
    pub msg: String,

    action: Option<Box<dyn CorrectionAction>>,
}

impl Correction {
    /// Create an executable correction
    pub fn new(msg: impl Into<String>, action: impl CorrectionAction + 'static) -> Self {
        Self {
            msg: msg.into(),
            action: Some(Box::new(action)),
        }
    }

    /// Create an informational report
    pub fn report(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            action: None,
        }
    }

    /// Whether this correction only carries a message
    pub fn is_report(&self) -> bool {
        self.action.is_none()
    }

    /// Run the correction's action; reports succeed without doing anything
    pub async fn execute(&self) -> Result<(), crate::Error> {
        match &self.action {
            Some(action) => action.run().await,
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correction")
            .field("msg", &self.msg)
            .field("report", &self.is_report())
            .finish()
    }
}

/// Result of reconciling one zone against one provider
#[derive(Debug, Default)]
pub struct ZoneCorrections {
    /// Informational messages, never executed
    pub reports: Vec<Correction>,

    /// Corrections to execute, in order (deletions, creations, modifications)
    pub corrections: Vec<Correction>,

    /// Number of substantive record changes
    pub change_count: usize,
}

/// Trait for the desired-state reconciliation engine
///
/// # Thread Safety
///
/// Implementations must support concurrent calls for different zones.
#[async_trait]
pub trait ReconciliationEngine: Send + Sync {
    /// Compute the corrections that make `provider`'s live records match `desired`
    ///
    /// # Parameters
    ///
    /// - `provider`: The provider instance whose live state is compared
    /// - `desired`: The zone's desired configuration
    ///
    /// # Returns
    ///
    /// - `Ok(ZoneCorrections)`: Reports, corrections and change count
    /// - `Err(Error)`: If live state could not be read or diffed
    async fn reconcile(
        &self,
        provider: &ProviderInstance,
        desired: &DomainConfig,
    ) -> Result<ZoneCorrections, crate::Error>;
}
