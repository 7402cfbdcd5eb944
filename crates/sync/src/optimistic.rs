//! Tentative local updates that can be undone if the backend refuses them.

/// A tentative value applied to a slot ahead of backend confirmation.
///
/// Rolling back restores the prior value only if the slot still holds the
/// tentative one. If a fresher observation replaced it in the meantime,
/// that observation is kept.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "an optimistic update must be committed or rolled back"]
pub struct Optimistic<T> {
    prior: T,
    tentative: T,
}

impl<T: Clone + PartialEq> Optimistic<T> {
    /// Apply `tentative` to `slot`, remembering what was there before.
    pub fn begin(slot: &mut T, tentative: T) -> Self {
        let prior = std::mem::replace(slot, tentative.clone());
        Self { prior, tentative }
    }

    /// Restore the prior value. Returns `false` if the slot had already
    /// moved on and was left untouched.
    pub fn rollback(self, slot: &mut T) -> bool {
        if *slot != self.tentative {
            return false;
        }
        *slot = self.prior;
        true
    }

    /// Accept the tentative value. Returns the value it replaced.
    pub fn commit(self) -> T {
        self.prior
    }

    pub fn prior(&self) -> &T {
        &self.prior
    }

    pub fn tentative(&self) -> &T {
        &self.tentative
    }
}

#[cfg(test)]
mod tests {
    use imgbench_core::status::Status;

    use super::*;

    #[test]
    fn rollback_restores_prior() {
        let mut slot = Status::Running;
        let update = Optimistic::begin(&mut slot, Status::Canceling);
        assert_eq!(slot, Status::Canceling);

        assert!(update.rollback(&mut slot));
        assert_eq!(slot, Status::Running);
    }

    #[test]
    fn rollback_keeps_newer_value() {
        let mut slot = Status::Running;
        let update = Optimistic::begin(&mut slot, Status::Canceling);

        // A poll landed a terminal status before the failure came back.
        slot = Status::Done;

        assert!(!update.rollback(&mut slot));
        assert_eq!(slot, Status::Done);
    }

    #[test]
    fn commit_returns_prior() {
        let mut slot = Status::Queued;
        let update = Optimistic::begin(&mut slot, Status::Canceling);

        assert_eq!(update.commit(), Status::Queued);
        assert_eq!(slot, Status::Canceling);
    }
}
