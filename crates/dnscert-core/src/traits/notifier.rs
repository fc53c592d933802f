// # Notifier Trait
//
// Receives a message for every correction dnscert runs and for every
// certificate it issues, together with the outcome. Typical
// implementations post to chat or e-mail; a failing notification is
// treated like a failing correction.

use async_trait::async_trait;

/// Trait for change notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report one change
    ///
    /// # Parameters
    ///
    /// - `domain`: Zone or certificate name the change belongs to
    /// - `provider`: Component that performed it (e.g., "certs")
    /// - `msg`: Description of the change
    /// - `err`: The change's error, if it failed
    /// - `preview`: Whether the change was only previewed
    async fn notify(
        &self,
        domain: &str,
        provider: &str,
        msg: &str,
        err: Option<&crate::Error>,
        preview: bool,
    ) -> Result<(), crate::Error>;

    /// Flush any batched notifications
    async fn done(&self) {}
}

/// Notifier that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(
        &self,
        _domain: &str,
        _provider: &str,
        _msg: &str,
        _err: Option<&crate::Error>,
        _preview: bool,
    ) -> Result<(), crate::Error> {
        Ok(())
    }
}
