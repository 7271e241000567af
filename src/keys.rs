use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{info, info_span, warn};

use crate::{
    backend::SnarkBackend,
    error::TicketError,
    relation::Relation,
};

/// Compiled constraint system and the key pair derived from it.
pub struct Keys<B: SnarkBackend> {
    pub constraint_system: B::ConstraintSystem,
    pub proving_key: B::ProvingKey,
    pub verifying_key: B::VerifyingKey,
}

/// Owns the key cache for one relation.
///
/// Concurrent `ensure_keys` callers block on a single initializer. A failed or
/// panicking setup leaves the cache empty, so the next call starts over.
pub struct KeySetupManager<B: SnarkBackend> {
    backend: Arc<B>,
    relation: Relation,
    keys: OnceCell<Arc<Keys<B>>>,
}

impl<B: SnarkBackend> KeySetupManager<B> {
    pub fn new(backend: Arc<B>, relation: Relation) -> Self {
        Self {
            backend,
            relation,
            keys: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// The cached keys, without triggering setup.
    pub fn cached(&self) -> Option<Arc<Keys<B>>> {
        self.keys.get().map(Arc::clone)
    }

    pub fn ensure_keys(&self) -> Result<Arc<Keys<B>>, TicketError> {
        self.keys
            .get_or_try_init(|| self.generate())
            .map(Arc::clone)
    }

    /// Drops the cached keys and derives a fresh pair.
    pub fn regenerate(&mut self) -> Result<Arc<Keys<B>>, TicketError> {
        self.keys.take();
        self.ensure_keys()
    }

    fn generate(&self) -> Result<Arc<Keys<B>>, TicketError> {
        let _span = info_span!("key_setup", relation = %self.relation.id()).entered();

        let constraint_system = self.backend.compile(&self.relation).map_err(|err| {
            warn!("relation compilation failed: {err}");
            TicketError::Compilation(err)
        })?;
        let (proving_key, verifying_key) =
            self.backend.setup(&constraint_system).map_err(|err| {
                warn!("key setup failed: {err}");
                TicketError::Setup(err)
            })?;

        info!("derived proving and verifying keys");
        Ok(Arc::new(Keys {
            constraint_system,
            proving_key,
            verifying_key,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::{self, AssertUnwindSafe},
        thread,
    };

    use super::*;
    use crate::{
        backend::testing::CountingBackend,
        relation::{RelationId, NUM_TOKENS, TICKET},
    };

    fn manager(backend: CountingBackend) -> KeySetupManager<CountingBackend> {
        KeySetupManager::new(Arc::new(backend), Relation::battle_ticket())
    }

    #[test]
    fn test_ensure_keys_is_idempotent() {
        let manager = manager(CountingBackend::default());
        assert!(manager.cached().is_none());

        let first = manager.ensure_keys().unwrap();
        let second = manager.ensure_keys().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &manager.cached().unwrap()));
        assert_eq!(manager.backend().compiles(), 1);
        assert_eq!(manager.backend().setups(), 1);
    }

    #[test]
    fn test_concurrent_callers_share_one_setup() {
        let manager = manager(CountingBackend::default());

        let keys: Vec<Arc<Keys<CountingBackend>>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| manager.ensure_keys().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(manager.backend().setups(), 1);
        assert_eq!(manager.backend().compiles(), 1);
        for key in &keys[1..] {
            assert!(Arc::ptr_eq(&keys[0], key));
        }
    }

    #[test]
    fn test_failed_setup_is_not_cached() {
        let manager = manager(CountingBackend::failing_setups(1));

        assert!(matches!(
            manager.ensure_keys(),
            Err(TicketError::Setup(_))
        ));
        assert!(manager.cached().is_none());

        let keys = manager.ensure_keys().unwrap();
        assert!(Arc::ptr_eq(&keys, &manager.cached().unwrap()));
        assert_eq!(manager.backend().setups(), 2);
        assert_eq!(manager.backend().compiles(), 2);
    }

    #[test]
    fn test_panicking_setup_is_not_cached() {
        let manager = manager(CountingBackend::panicking_setups(1));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| manager.ensure_keys()));
        assert!(outcome.is_err());
        assert!(manager.cached().is_none());

        let keys = manager.ensure_keys().unwrap();
        assert!(Arc::ptr_eq(&keys, &manager.cached().unwrap()));
        assert_eq!(manager.backend().setups(), 2);
    }

    #[test]
    fn test_compilation_failure() {
        let relation = Relation::new(
            RelationId::new("no-public"),
            vec![NUM_TOKENS, TICKET],
            vec![],
            *Relation::battle_ticket().constraint(),
        );
        let manager = KeySetupManager::new(Arc::new(CountingBackend::default()), relation);

        assert!(matches!(
            manager.ensure_keys(),
            Err(TicketError::Compilation(_))
        ));
        assert!(manager.cached().is_none());
        assert_eq!(manager.backend().setups(), 0);
    }

    #[test]
    fn test_regenerate() {
        let mut manager = manager(CountingBackend::default());
        let first = manager.ensure_keys().unwrap();
        let second = manager.regenerate().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &manager.ensure_keys().unwrap()));
        assert_eq!(manager.backend().setups(), 2);
    }
}
