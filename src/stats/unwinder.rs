//! Native unwinder counters as kept by the kernel-side profiler.
//!
//! The kernel keeps one [`UnwinderStats`] record per CPU and bumps fields
//! independently, so a freshly read record need not satisfy
//! `total_samples >= success + errors`. Sources fold the per-CPU records
//! with [`UnwinderStats::from_per_cpu`] and the collector emits what it got.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Why an unwind attempt stopped before reaching the bottom frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnwindErrorReason {
    Truncated,
    UnsupportedExpression,
    FramePointerAction,
    UnsupportedCfaRegister,
    Catchall,
    ShouldNeverHappen,
    PcNotCovered,
    UnsupportedJit,
}

impl UnwindErrorReason {
    /// Every reason, in emission order.
    pub const ALL: [UnwindErrorReason; 8] = [
        Self::Truncated,
        Self::UnsupportedExpression,
        Self::FramePointerAction,
        Self::UnsupportedCfaRegister,
        Self::Catchall,
        Self::ShouldNeverHappen,
        Self::PcNotCovered,
        Self::UnsupportedJit,
    ];

    /// Value of the `reason` label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Truncated => "truncated",
            Self::UnsupportedExpression => "unsupported_expression",
            Self::FramePointerAction => "frame_pointer_action",
            Self::UnsupportedCfaRegister => "unsupported_cfa_register",
            Self::Catchall => "catchall",
            Self::ShouldNeverHappen => "should_never_happen",
            Self::PcNotCovered => "pc_not_covered",
            Self::UnsupportedJit => "unsupported_jit",
        }
    }
}

impl fmt::Display for UnwindErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sample and outcome counts of the native (DWARF) unwinder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnwinderStats {
    pub total_samples: u64,
    /// Samples that unwound all the way to the bottom frame.
    pub success_dwarf: u64,
    pub error_truncated: u64,
    pub error_unsupported_expression: u64,
    pub error_frame_pointer_action: u64,
    pub error_unsupported_cfa_register: u64,
    pub error_catchall: u64,
    pub error_should_never_happen: u64,
    pub error_pc_not_covered: u64,
    pub error_unsupported_jit: u64,
}

impl UnwinderStats {
    /// Folds per-CPU records into one process-wide record.
    ///
    /// ```
    /// use evictkit::stats::unwinder::UnwinderStats;
    ///
    /// let cpu0 = UnwinderStats { total_samples: 10, success_dwarf: 9, ..Default::default() };
    /// let cpu1 = UnwinderStats { total_samples: 5, success_dwarf: 4, ..Default::default() };
    /// let all = UnwinderStats::from_per_cpu([cpu0, cpu1]);
    /// assert_eq!(all.total_samples, 15);
    /// assert_eq!(all.success_dwarf, 13);
    /// ```
    pub fn from_per_cpu(per_cpu: impl IntoIterator<Item = UnwinderStats>) -> Self {
        per_cpu.into_iter().sum()
    }

    pub fn error_count(&self, reason: UnwindErrorReason) -> u64 {
        match reason {
            UnwindErrorReason::Truncated => self.error_truncated,
            UnwindErrorReason::UnsupportedExpression => self.error_unsupported_expression,
            UnwindErrorReason::FramePointerAction => self.error_frame_pointer_action,
            UnwindErrorReason::UnsupportedCfaRegister => self.error_unsupported_cfa_register,
            UnwindErrorReason::Catchall => self.error_catchall,
            UnwindErrorReason::ShouldNeverHappen => self.error_should_never_happen,
            UnwindErrorReason::PcNotCovered => self.error_pc_not_covered,
            UnwindErrorReason::UnsupportedJit => self.error_unsupported_jit,
        }
    }

    fn error_count_mut(&mut self, reason: UnwindErrorReason) -> &mut u64 {
        match reason {
            UnwindErrorReason::Truncated => &mut self.error_truncated,
            UnwindErrorReason::UnsupportedExpression => &mut self.error_unsupported_expression,
            UnwindErrorReason::FramePointerAction => &mut self.error_frame_pointer_action,
            UnwindErrorReason::UnsupportedCfaRegister => &mut self.error_unsupported_cfa_register,
            UnwindErrorReason::Catchall => &mut self.error_catchall,
            UnwindErrorReason::ShouldNeverHappen => &mut self.error_should_never_happen,
            UnwindErrorReason::PcNotCovered => &mut self.error_pc_not_covered,
            UnwindErrorReason::UnsupportedJit => &mut self.error_unsupported_jit,
        }
    }

    /// Sum of all per-reason error counts (saturating).
    pub fn total_errors(&self) -> u64 {
        UnwindErrorReason::ALL
            .iter()
            .fold(0u64, |acc, &r| acc.saturating_add(self.error_count(r)))
    }

    /// `true` when `total_samples` covers successes plus errors.
    ///
    /// Field-by-field reads of live counters can break this for a cycle.
    pub fn is_consistent(&self) -> bool {
        self.success_dwarf.saturating_add(self.total_errors()) <= self.total_samples
    }
}

impl AddAssign for UnwinderStats {
    fn add_assign(&mut self, rhs: Self) {
        self.total_samples = self.total_samples.wrapping_add(rhs.total_samples);
        self.success_dwarf = self.success_dwarf.wrapping_add(rhs.success_dwarf);
        for reason in UnwindErrorReason::ALL {
            let slot = self.error_count_mut(reason);
            *slot = slot.wrapping_add(rhs.error_count(reason));
        }
    }
}

impl Add for UnwinderStats {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for UnwinderStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct_snake_case() {
        let labels: Vec<_> = UnwindErrorReason::ALL.iter().map(|r| r.label()).collect();
        let mut dedup = labels.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 8);
        for label in labels {
            assert!(label.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        assert_eq!(UnwindErrorReason::PcNotCovered.to_string(), "pc_not_covered");
    }

    #[test]
    fn error_count_reads_matching_field() {
        let stats = UnwinderStats {
            error_catchall: 3,
            error_unsupported_jit: 7,
            ..Default::default()
        };
        assert_eq!(stats.error_count(UnwindErrorReason::Catchall), 3);
        assert_eq!(stats.error_count(UnwindErrorReason::UnsupportedJit), 7);
        assert_eq!(stats.error_count(UnwindErrorReason::Truncated), 0);
        assert_eq!(stats.total_errors(), 10);
    }

    #[test]
    fn per_cpu_records_fold_fieldwise() {
        let mut cpus = Vec::new();
        for (i, reason) in UnwindErrorReason::ALL.into_iter().enumerate() {
            let mut cpu = UnwinderStats {
                total_samples: 10,
                success_dwarf: 8,
                ..Default::default()
            };
            *cpu.error_count_mut(reason) = i as u64 + 1;
            cpus.push(cpu);
        }
        let all = UnwinderStats::from_per_cpu(cpus);
        assert_eq!(all.total_samples, 80);
        assert_eq!(all.success_dwarf, 64);
        for (i, reason) in UnwindErrorReason::ALL.into_iter().enumerate() {
            assert_eq!(all.error_count(reason), i as u64 + 1);
        }
    }

    #[test]
    fn empty_fold_is_zero() {
        assert_eq!(
            UnwinderStats::from_per_cpu(std::iter::empty()),
            UnwinderStats::default()
        );
    }

    #[test]
    fn consistency_check() {
        let ok = UnwinderStats {
            total_samples: 10,
            success_dwarf: 7,
            error_truncated: 3,
            ..Default::default()
        };
        assert!(ok.is_consistent());

        let torn = UnwinderStats {
            total_samples: 9,
            ..ok
        };
        assert!(!torn.is_consistent());
    }
}
