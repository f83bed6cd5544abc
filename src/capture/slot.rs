//! Guarded encoder/core slot shared across execution contexts
//!
//! Touched from the owning context (configure, start, stop), the capture
//! worker (read encoder) and encoder completions (read core). The lock is
//! held only to clone or swap a handle, never across a call into the encoder
//! or the core.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::boundary::CoreBoundary;
use crate::platform::VideoEncoder;

#[derive(Default)]
struct SlotInner {
    encoder: Option<Arc<dyn VideoEncoder>>,
    core: Option<Arc<dyn CoreBoundary>>,
}

/// The `{encoder, core}` pair behind one mutex.
#[derive(Default)]
pub(crate) struct EncoderSlot {
    inner: Mutex<SlotInner>,
}

impl EncoderSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        // A panic while holding the guard cannot leave the pair half-written
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn encoder(&self) -> Option<Arc<dyn VideoEncoder>> {
        self.lock().encoder.clone()
    }

    pub(crate) fn core(&self) -> Option<Arc<dyn CoreBoundary>> {
        self.lock().core.clone()
    }

    /// Install a new encoder, returning the previous one for invalidation.
    pub(crate) fn replace_encoder(
        &self,
        encoder: Option<Arc<dyn VideoEncoder>>,
    ) -> Option<Arc<dyn VideoEncoder>> {
        std::mem::replace(&mut self.lock().encoder, encoder)
    }

    pub(crate) fn set_core(&self, core: Option<Arc<dyn CoreBoundary>>) {
        self.lock().core = core;
    }

    /// Clear both handles; returns the encoder for invalidation.
    pub(crate) fn take_all(&self) -> Option<Arc<dyn VideoEncoder>> {
        let mut inner = self.lock();
        inner.core = None;
        inner.encoder.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockCore, MockEncoder};

    #[test]
    fn replace_returns_previous_encoder() {
        let slot = EncoderSlot::new();
        let first: Arc<dyn VideoEncoder> = Arc::new(MockEncoder::detached());
        let second: Arc<dyn VideoEncoder> = Arc::new(MockEncoder::detached());

        assert!(slot.replace_encoder(Some(Arc::clone(&first))).is_none());
        let previous = slot.replace_encoder(Some(second)).expect("first encoder");
        assert!(Arc::ptr_eq(&previous, &first));
    }

    #[test]
    fn take_all_clears_core_and_encoder() {
        let slot = EncoderSlot::new();
        slot.set_core(Some(Arc::new(MockCore::new())));
        slot.replace_encoder(Some(Arc::new(MockEncoder::detached())));

        assert!(slot.take_all().is_some());
        assert!(slot.encoder().is_none());
        assert!(slot.core().is_none());
        assert!(slot.take_all().is_none());
    }
}
