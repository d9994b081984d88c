//! Quota guard: the ceiling check for countable per-tenant resources.
//!
//! This is the decision only. Stores call it while holding whatever makes
//! count-then-insert atomic for them (a write lock, a locked tenant row), so
//! two concurrent creations can never both observe the last free slot.

use serde::Serialize;

use workhive_tenancy::ResourceKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Reservation {
    Reserved { used_after: u64, limit: u32 },
    Rejected { used: u64, limit: u32 },
}

/// Usage of one countable resource after a successful reservation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaUsage {
    pub kind: ResourceKind,
    pub used: u64,
    pub limit: u32,
}

/// Decide whether one more `kind` fits under `limit` given `used`.
///
/// Rejects once `used >= limit`; lowering a limit below current usage
/// blocks further creation but never removes anything.
pub fn reserve(kind: ResourceKind, used: u64, limit: u32) -> Reservation {
    if used >= u64::from(limit) {
        tracing::info!(kind = kind.as_str(), used, limit, "quota ceiling reached");
        Reservation::Rejected { used, limit }
    } else {
        Reservation::Reserved { used_after: used + 1, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn last_slot_is_reservable_then_full() {
        assert_eq!(
            reserve(ResourceKind::Project, 2, 3),
            Reservation::Reserved { used_after: 3, limit: 3 }
        );
        assert_eq!(
            reserve(ResourceKind::Project, 3, 3),
            Reservation::Rejected { used: 3, limit: 3 }
        );
    }

    #[test]
    fn shrunk_limit_rejects_without_retroactive_effect() {
        assert_eq!(reserve(ResourceKind::User, 5, 2), Reservation::Rejected { used: 5, limit: 2 });
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        /// Sequentially reserving from any starting point never exceeds the limit.
        #[test]
        fn sequential_reservations_stop_at_limit(start in 0u64..20, limit in 0u32..20, attempts in 0usize..40) {
            let mut used = start;
            let mut granted = 0u64;
            for _ in 0..attempts {
                if let Reservation::Reserved { used_after, .. } = reserve(ResourceKind::Project, used, limit) {
                    used = used_after;
                    granted += 1;
                }
            }
            let headroom = u64::from(limit).saturating_sub(start);
            prop_assert_eq!(granted, headroom.min(attempts as u64));
            prop_assert!(used <= u64::from(limit).max(start));
        }
    }
}
