use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// Process-wide cap on live provider calls.
///
/// A caller reserves a slot before calling the provider and commits it only when
/// the call succeeded. In-flight reservations count against the limit, so
/// concurrent callers can never push `used` past `limit`. Dropping an
/// uncommitted permit returns the slot.
#[derive(Debug)]
pub struct ApiBudget {
    limit: u32,
    state: Mutex<BudgetState>,
}

#[derive(Debug, Default)]
struct BudgetState {
    used: u32,
    in_flight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub used: u32,
    pub limit: u32,
    pub exhausted: bool,
}

impl ApiBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            state: Mutex::new(BudgetState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `None` when committed plus in-flight calls already reach the limit.
    pub fn try_reserve(&self) -> Option<BudgetPermit<'_>> {
        let mut state = self.lock();
        if state.used + state.in_flight >= self.limit {
            return None;
        }
        state.in_flight += 1;
        Some(BudgetPermit {
            budget: self,
            committed: false,
        })
    }

    pub fn used(&self) -> u32 {
        self.lock().used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn status(&self) -> BudgetStatus {
        let used = self.used();
        BudgetStatus {
            used,
            limit: self.limit,
            exhausted: used >= self.limit,
        }
    }
}

/// A reserved provider call.
#[derive(Debug)]
pub struct BudgetPermit<'a> {
    budget: &'a ApiBudget,
    committed: bool,
}

impl BudgetPermit<'_> {
    /// Counts the call as used. Returns the new total.
    pub fn commit(mut self) -> u32 {
        let mut state = self.budget.lock();
        state.in_flight -= 1;
        state.used += 1;
        self.committed = true;
        state.used
    }
}

impl Drop for BudgetPermit<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.budget.lock().in_flight -= 1;
        }
    }
}
