//! Thread-safe handle to a settlement engine.
//!
//! Every call holds the one engine lock for the whole operation, ledger
//! transfers included, so operations from different threads never
//! interleave.

use std::sync::{Arc, Mutex, MutexGuard};

use roundswap_ledger::AssetLedger;
use roundswap_types::{
    Amount, AmountPair, EngineEvent, ParticipantId, Payout, Result, RoundId, RoundswapError,
};

use crate::engine::{EngineSnapshot, RoundClosure, SettlementEngine};

/// Cloneable, `Send + Sync` wrapper around a [`SettlementEngine`].
pub struct SharedEngine<L0, L1> {
    inner: Arc<Mutex<SettlementEngine<L0, L1>>>,
}

impl<L0, L1> Clone for SharedEngine<L0, L1> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L0: AssetLedger, L1: AssetLedger> SharedEngine<L0, L1> {
    #[must_use]
    pub fn new(engine: SettlementEngine<L0, L1>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SettlementEngine<L0, L1>>> {
        self.inner.lock().map_err(|_| {
            tracing::error!("Settlement engine lock poisoned");
            RoundswapError::Internal("engine lock poisoned".into())
        })
    }

    /// Run `f` with exclusive access to the engine.
    ///
    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn with<T>(&self, f: impl FnOnce(&mut SettlementEngine<L0, L1>) -> T) -> Result<T> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    /// # Errors
    /// See [`SettlementEngine::deposit`]; `Internal` if the lock is poisoned.
    pub fn deposit(
        &self,
        round_id: RoundId,
        amount0: Amount,
        amount1: Amount,
        caller: ParticipantId,
    ) -> Result<()> {
        self.lock()?.deposit(round_id, amount0, amount1, caller)
    }

    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn end_round(&self) -> Result<RoundClosure> {
        Ok(self.lock()?.end_round())
    }

    /// # Errors
    /// See [`SettlementEngine::claim`]; `Internal` if the lock is poisoned.
    pub fn claim(&self, round_id: RoundId, caller: ParticipantId) -> Result<Payout> {
        self.lock()?.claim(round_id, caller)
    }

    /// # Errors
    /// See [`SettlementEngine::query_claimable_balance`].
    pub fn query_claimable_balance(
        &self,
        round_id: RoundId,
        caller: ParticipantId,
    ) -> Result<Payout> {
        self.lock()?.query_claimable_balance(round_id, caller)
    }

    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn current_round(&self) -> Result<RoundId> {
        Ok(self.lock()?.current_round())
    }

    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn token_balance(&self) -> Result<AmountPair> {
        Ok(self.lock()?.token_balance())
    }

    /// # Errors
    /// `ConservationViolation` on mismatch; `Internal` if the lock is poisoned.
    pub fn verify_conservation(&self) -> Result<()> {
        self.lock()?.verify_conservation()
    }

    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn drain_events(&self) -> Result<Vec<EngineEvent>> {
        Ok(self.lock()?.drain_events())
    }

    /// # Errors
    /// `Internal` if the lock is poisoned.
    pub fn snapshot(&self) -> Result<EngineSnapshot> {
        Ok(self.lock()?.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use roundswap_ledger::InMemoryLedger;

    use super::*;

    fn shared(users: &[ParticipantId]) -> SharedEngine<InMemoryLedger, InMemoryLedger> {
        let custody = ParticipantId::random();
        let mut engine = SettlementEngine::new(
            custody,
            InMemoryLedger::new("PUNK", custody),
            InMemoryLedger::new("MORNI", custody),
        );
        for &user in users {
            engine.asset0_mut().mint(user, 1_000_000).unwrap();
            engine.asset0_mut().approve(user, 1_000_000);
            engine.asset1_mut().mint(user, 1_000_000).unwrap();
            engine.asset1_mut().approve(user, 1_000_000);
        }
        SharedEngine::new(engine)
    }

    #[test]
    fn concurrent_deposits_are_not_lost() {
        let user = ParticipantId::random();
        let engine = shared(&[user]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        engine.deposit(RoundId(1), 3, 1, user).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let position = engine
            .with(|e| e.position(RoundId(1), user).cloned())
            .unwrap()
            .unwrap();
        assert_eq!(position.amounts(), AmountPair::new(600, 200));
        assert_eq!(engine.token_balance().unwrap(), AmountPair::new(600, 200));
        assert_eq!(engine.drain_events().unwrap().len(), 200);
        engine.verify_conservation().unwrap();
    }

    #[test]
    fn concurrent_claims_pay_once() {
        let (a, b) = (ParticipantId::random(), ParticipantId::random());
        let engine = shared(&[a, b]);
        engine.deposit(RoundId(1), 100, 0, a).unwrap();
        engine.deposit(RoundId(1), 0, 300, b).unwrap();
        engine.end_round().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                thread::spawn(move || engine.claim(RoundId(1), a))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let paid: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(paid, vec![&AmountPair::new(0, 300)]);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(RoundswapError::AlreadyClaimed { .. })))
                .count(),
            3
        );
        engine.verify_conservation().unwrap();
    }

    #[test]
    fn poisoned_lock_is_internal() {
        let engine = shared(&[]);
        let poisoner = engine.clone();
        let crashed = thread::spawn(move || {
            poisoner.with(|e| {
                if e.current_round() == RoundId(1) {
                    panic!("engine host crashed");
                }
            })
        })
        .join();
        assert!(crashed.is_err());

        assert!(matches!(
            engine.current_round().unwrap_err(),
            RoundswapError::Internal(_)
        ));
    }
}
