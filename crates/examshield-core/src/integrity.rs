//! Tab-switch integrity monitoring.
//!
//! The monitor counts focus-loss events. Reaching the ceiling has no
//! automatic consequence; the ceiling is only reported alongside the count.

use serde::{Deserialize, Serialize};

/// Warnings allowed before a test is considered compromised.
pub const DEFAULT_WARNING_CEILING: u32 = 3;

/// Emitted once per focus-loss event while the session is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityWarning {
    /// Warning number, starting at 1.
    pub count: u32,
    pub ceiling: u32,
}

impl IntegrityWarning {
    pub fn exceeded_ceiling(&self) -> bool {
        self.count >= self.ceiling
    }

    /// Message shown to the candidate.
    pub fn message(&self) -> String {
        format!(
            "Tab switch detected! Warning {}/{}. Continued switching may invalidate your test.",
            self.count, self.ceiling
        )
    }
}

#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    warnings: u32,
    ceiling: u32,
}

impl Default for IntegrityMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_CEILING)
    }
}

impl IntegrityMonitor {
    pub fn new(ceiling: u32) -> Self {
        Self {
            warnings: 0,
            ceiling: ceiling.max(1),
        }
    }

    /// Count one focus loss and return the warning to emit.
    pub fn record_focus_loss(&mut self) -> IntegrityWarning {
        self.warnings = self.warnings.saturating_add(1);
        IntegrityWarning {
            count: self.warnings,
            ceiling: self.ceiling,
        }
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }
}
