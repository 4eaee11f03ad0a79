/// Orders may be cancelled up to and including this many whole days after placement.
pub const CANCELLATION_WINDOW_DAYS: i64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancellationEligibility {
    Eligible,
    Ineligible { days_since_order: i64, window_days: i64 },
}

impl CancellationEligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

pub fn cancellation_eligibility(days_since_order: i64) -> CancellationEligibility {
    if days_since_order <= CANCELLATION_WINDOW_DAYS {
        CancellationEligibility::Eligible
    } else {
        CancellationEligibility::Ineligible {
            days_since_order,
            window_days: CANCELLATION_WINDOW_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{cancellation_eligibility, CancellationEligibility, CANCELLATION_WINDOW_DAYS};

    #[test]
    fn window_boundary_is_inclusive() {
        assert!(cancellation_eligibility(0).is_eligible());
        assert!(cancellation_eligibility(CANCELLATION_WINDOW_DAYS).is_eligible());
        assert_eq!(
            cancellation_eligibility(11),
            CancellationEligibility::Ineligible { days_since_order: 11, window_days: 10 }
        );
    }

    #[test]
    fn eligibility_depends_only_on_elapsed_days() {
        for days in 0..=30 {
            assert_eq!(cancellation_eligibility(days).is_eligible(), days <= 10, "day {days}");
        }
    }
}
