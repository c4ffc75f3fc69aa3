use proptest::prelude::*;

use lotpick_core::generator::{check_lucky_numbers, check_main_numbers};
use lotpick_core::stats::{count_odd, percentile};
use lotpick_core::{analyze, generate, make_test_draws, parse_history, Bounds, GenerationConfig};
use lotpick_db::models::Draw;

fn sample_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((-5000i32..5000).prop_map(f64::from), 1..60)
}

proptest! {
    #[test]
    fn percentile_endpoints_are_min_and_max(xs in sample_values()) {
        let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(percentile(&xs, 0.0), min);
        prop_assert_eq!(percentile(&xs, 100.0), max);
    }

    #[test]
    fn percentile_is_monotonic(xs in sample_values(), a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percentile(&xs, lo) <= percentile(&xs, hi));
    }

    #[test]
    fn analyzer_ranges_are_tight_and_achievable(n in 1usize..120, seed in any::<u64>()) {
        let draws = make_test_draws(n, seed);
        let t = analyze(&draws, false).unwrap();

        prop_assert!(t.sum_range.min <= t.sum_range.max);
        prop_assert!(t.sum_range.min >= 1 + 2 + 3 + 4 + 5);
        prop_assert!(t.sum_range.max <= 46 + 47 + 48 + 49 + 50);

        prop_assert!(t.odd_range.min <= t.odd_range.max);
        prop_assert!(t.odd_range.max <= 5);
        let odds: Vec<u32> = draws.iter().map(|d| count_odd(&d.main) as u32).collect();
        prop_assert!(odds.contains(&t.odd_range.min));
        prop_assert!(odds.contains(&t.odd_range.max));
    }

    #[test]
    fn analysis_is_idempotent(seed in any::<u64>()) {
        let draws = make_test_draws(40, seed);
        prop_assert_eq!(analyze(&draws, false).unwrap(), analyze(&draws, false).unwrap());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn generated_combinations_pass_every_filter(
        seed in any::<u64>(),
        history_seed in 0u64..8,
        cluster_max in 2usize..=3,
    ) {
        let history = make_test_draws(100, history_seed);
        let mut config = GenerationConfig::from_thresholds(&analyze(&history, false).unwrap());
        config.min_score = 0.0;
        config.max_iterations = 5_000;
        config.cluster_max = cluster_max;

        let result = generate(&history, &config, Some(seed)).unwrap();
        if let Some(best) = result.best_combination {
            prop_assert!(check_main_numbers(&best.main, &config).is_none());
            prop_assert!(check_lucky_numbers(&best.lucky, &config).is_none());
            prop_assert!(!history.contains(&best));
            prop_assert!(best.main.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(best.lucky[0] < best.lucky[1]);
            prop_assert!(result.accepted);
        }
    }
}

#[test]
fn uniform_history_yields_a_combination() {
    let history = make_test_draws(100, 2024);
    let mut config = GenerationConfig::from_thresholds(&analyze(&history, false).unwrap());
    config.min_score = 0.0;
    config.max_iterations = 50_000;

    let result = generate(&history, &config, Some(99)).unwrap();
    assert!(result.best_combination.is_some());
    assert!(result.iterations <= 50_000);
}

#[test]
fn single_draw_has_point_odd_range() {
    let history = parse_history(&[vec!["01", "02", "03", "04", "05", "01", "02"]]).unwrap();
    let t = analyze(&history, false).unwrap();
    assert_eq!(t.odd_range, Bounds::new(3, 3));
}

#[test]
fn constant_even_count_caps_base_two() {
    // every draw has exactly two even main numbers
    let history: Vec<Draw> = (0..30u8)
        .map(|i| {
            let shift = (i % 5) * 2;
            Draw::new(
                [1 + shift, 2 + shift, 11 + shift, 14 + shift, 21 + shift],
                [1 + i % 10, 11],
            )
        })
        .collect();
    let t = analyze(&history, false).unwrap();
    assert_eq!(t.multiples_allowed[&2], 2);
}
