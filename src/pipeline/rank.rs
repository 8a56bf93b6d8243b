use crate::model::DealCandidate;

/// Stable sort by discount, highest first, then keep the first `k`.
pub fn rank(mut candidates: Vec<DealCandidate>, k: usize) -> Vec<DealCandidate> {
    candidates.sort_by(|a, b| b.discount_percent.cmp(&a.discount_percent));
    candidates.truncate(k);
    candidates
}

/// Candidates at or above `min_discount`, in discovery order.
pub fn select_above(candidates: Vec<DealCandidate>, min_discount: u8) -> Vec<DealCandidate> {
    candidates
        .into_iter()
        .filter(|c| c.discount_percent >= min_discount)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Platform;
    use proptest::prelude::*;

    fn candidate(idx: usize, discount: u8) -> DealCandidate {
        DealCandidate {
            title: format!("item {}", idx),
            link: String::new(),
            discount_percent: discount,
            deal_price: None,
            original_price: None,
            platform: Platform::Unknown,
            source: idx.to_string(),
        }
    }

    #[test]
    fn keeps_top_k_by_discount() {
        let input = vec![candidate(0, 10), candidate(1, 80), candidate(2, 45), candidate(3, 60)];
        let out: Vec<u8> = rank(input, 2).iter().map(|c| c.discount_percent).collect();
        assert_eq!(out, vec![80, 60]);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let input = vec![candidate(0, 50), candidate(1, 70), candidate(2, 50), candidate(3, 50)];
        let out: Vec<String> = rank(input, 5).into_iter().map(|c| c.source).collect();
        assert_eq!(out, vec!["1", "0", "2", "3"]);
    }

    #[test]
    fn threshold_selection_keeps_order() {
        let input = vec![candidate(0, 30), candidate(1, 70), candidate(2, 40), candidate(3, 10)];
        let out: Vec<String> = select_above(input, 40).into_iter().map(|c| c.source).collect();
        assert_eq!(out, vec!["1", "2"]);
    }

    proptest! {
        #[test]
        fn output_sorted_and_stable(discounts in proptest::collection::vec(0u8..=100, 0..40), k in 1usize..10) {
            let input: Vec<_> = discounts.iter().enumerate().map(|(i, d)| candidate(i, *d)).collect();
            let out = rank(input, k);
            prop_assert!(out.len() <= k);
            for w in out.windows(2) {
                prop_assert!(w[0].discount_percent >= w[1].discount_percent);
                if w[0].discount_percent == w[1].discount_percent {
                    let a: usize = w[0].source.parse().unwrap();
                    let b: usize = w[1].source.parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}
