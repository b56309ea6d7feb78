//! Per-run cap on completion-service calls.

/// Remaining model invocations for one run.
///
/// Spent once per loop iteration before the model is called. When nothing
/// is left the run stops quietly; running out is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBudget {
    limit: u32,
    used: u32,
}

impl RunBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Spend one call. Returns `false` once the budget is gone.
    pub fn try_spend(&mut self) -> bool {
        if self.used >= self.limit {
            return false;
        }
        self.used += 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.limit
    }
}
