//! Property-based tests for scoring and clamping invariants.
//!
//! Every score the crate produces is contractually a value in [0,1]:
//! importance at every write, the retention and priority heuristics for any
//! record state, and the hybrid pruning blend. These tests exercise the
//! formulas over arbitrary inputs rather than hand-picked cases.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use crate::pruning::hybrid_score;
    use crate::record::{MemoryRecord, MemoryType};
    use crate::scoring::{priority_heuristic, retention_heuristic, PriorityWeights};

    // Strategy for generating any finite importance input, in range or not
    fn any_importance() -> impl Strategy<Value = f64> {
        prop_oneof![
            Just(0.0),
            Just(1.0),
            -1000.0f64..1000.0f64,
        ]
    }

    // Strategy for generating a record with arbitrary scoring inputs
    fn arbitrary_record() -> impl Strategy<Value = MemoryRecord> {
        (
            any_importance(),
            0u64..10_000u64,
            0i64..4000i64,
            prop_oneof![
                Just(MemoryType::Conversation),
                Just(MemoryType::ToolCall),
                Just(MemoryType::ToolResult),
                Just(MemoryType::SystemEvent),
                Just(MemoryType::Knowledge),
                Just(MemoryType::Other("custom".to_string())),
            ],
        )
            .prop_map(|(importance, accesses, age_days, memory_type)| {
                let mut record =
                    MemoryRecord::new("session", "content", memory_type, importance, vec![]);
                record.access_count = accesses;
                record.created_at = Utc::now() - Duration::days(age_days);
                record
            })
    }

    proptest! {
        /// Importance is clamped into [0,1] at creation for any input.
        #[test]
        fn importance_clamped_on_creation(importance in any_importance()) {
            let record = MemoryRecord::new(
                "session",
                "content",
                MemoryType::Conversation,
                importance,
                vec![],
            );
            prop_assert!((0.0..=1.0).contains(&record.importance_score));
        }

        /// Importance is clamped into [0,1] on update for any input.
        #[test]
        fn importance_clamped_on_update(importance in any_importance()) {
            let mut record = MemoryRecord::new(
                "session",
                "content",
                MemoryType::Conversation,
                0.5,
                vec![],
            );
            record.set_importance(importance);
            prop_assert!((0.0..=1.0).contains(&record.importance_score));
        }

        /// The retention heuristic lands in [0,1] for any record state.
        #[test]
        fn retention_heuristic_in_unit_interval(record in arbitrary_record()) {
            let score = retention_heuristic(&record, Utc::now());
            prop_assert!(
                (0.0..=1.0).contains(&score),
                "retention score {} out of range",
                score
            );
        }

        /// The priority heuristic lands in [0,1] under every preset.
        #[test]
        fn priority_heuristic_in_unit_interval(record in arbitrary_record()) {
            let now = Utc::now();
            for weights in [
                PriorityWeights::BALANCED,
                PriorityWeights::IMPORTANCE,
                PriorityWeights::RECENCY,
                PriorityWeights::ACCESS,
            ] {
                let score = priority_heuristic(&record, now, &weights);
                prop_assert!(
                    (0.0..=1.0).contains(&score),
                    "priority score {} out of range for {:?}",
                    score,
                    weights
                );
            }
        }

        /// The hybrid pruning blend lands in [0,1] for any record state.
        #[test]
        fn hybrid_score_in_unit_interval(record in arbitrary_record()) {
            let score = hybrid_score(&record, Utc::now());
            prop_assert!(
                (0.0..=1.0).contains(&score),
                "hybrid score {} out of range",
                score
            );
        }

        /// With equal age and access state, higher importance never ranks
        /// lower under the importance-dominant preset.
        #[test]
        fn priority_monotone_in_importance(low in 0.0f64..1.0, delta in 0.0f64..1.0) {
            let high = (low + delta).min(1.0);
            let now = Utc::now();

            let mut a = MemoryRecord::new("s", "c", MemoryType::Conversation, low, vec![]);
            let mut b = MemoryRecord::new("s", "c", MemoryType::Conversation, high, vec![]);
            b.created_at = a.created_at;
            a.access_count = 3;
            b.access_count = 3;

            let score_low = priority_heuristic(&a, now, &PriorityWeights::IMPORTANCE);
            let score_high = priority_heuristic(&b, now, &PriorityWeights::IMPORTANCE);
            prop_assert!(score_high >= score_low);
        }
    }
}
