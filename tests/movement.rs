use odds_signals::movement::{MovementLabel, MovementThresholds, classify, classify_deltas};

#[test]
fn level_to_half_ball_with_shortening_price() {
    let label = classify(
        Some("平手"),
        Some("半球"),
        Some(1.95),
        Some(1.80),
        MovementThresholds::default(),
    );
    assert_eq!(label, Some(MovementLabel::LineUpPriceDown));
    assert_eq!(label.map(|l| l.as_str()), Some("line-up-price-down"));
}

#[test]
fn crossing_the_line_threshold_only_moves_up() {
    let thr = MovementThresholds::default();
    for price_delta in [-0.019, -0.01, 0.0, 0.01, 0.019] {
        let mut seen_up = false;
        for step in 0..=200 {
            let handicap_delta = step as f64 * 0.0005;
            let label = classify_deltas(handicap_delta, price_delta, thr);
            match label {
                MovementLabel::Unchanged => assert!(!seen_up, "fell back at {handicap_delta}"),
                MovementLabel::LineUp => seen_up = true,
                other => panic!("unexpected {other:?} at {handicap_delta}/{price_delta}"),
            }
        }
        assert!(seen_up);
        assert_eq!(classify_deltas(0.005, price_delta, thr), MovementLabel::Unchanged);
        assert_eq!(classify_deltas(0.25, price_delta, thr), MovementLabel::LineUp);
    }
}

#[test]
fn any_missing_input_gives_no_label() {
    let handicaps = [Some("平手"), Some("半球")];
    let prices = [Some(1.95), Some(1.80)];
    // Bit i set means input i is present; 0b1111 is the only complete case.
    for mask in 0u8..16 {
        let pick_h = |i: usize| if mask & (1 << i) != 0 { handicaps[i] } else { None };
        let pick_p = |i: usize| if mask & (1 << (i + 2)) != 0 { prices[i] } else { None };
        let label = classify(
            pick_h(0),
            pick_h(1),
            pick_p(0),
            pick_p(1),
            MovementThresholds::default(),
        );
        if mask == 0b1111 {
            assert!(label.is_some());
        } else {
            assert_eq!(label, None, "mask {mask:04b}");
        }
    }
}

#[test]
fn unparseable_token_counts_as_missing() {
    let label = classify(
        Some("平手"),
        Some("未开盘"),
        Some(1.95),
        Some(1.80),
        MovementThresholds::default(),
    );
    assert_eq!(label, None);
}

#[test]
fn full_table() {
    let thr = MovementThresholds::default();
    let cases = [
        (0.5, -0.1, MovementLabel::LineUpPriceDown),
        (0.5, 0.1, MovementLabel::LineUpPriceUp),
        (0.5, 0.0, MovementLabel::LineUp),
        (-0.5, -0.1, MovementLabel::LineDownPriceDown),
        (-0.5, 0.1, MovementLabel::LineDownPriceUp),
        (-0.5, 0.0, MovementLabel::LineDown),
        (0.0, -0.1, MovementLabel::PriceDown),
        (0.0, 0.1, MovementLabel::PriceUp),
        (0.0, 0.0, MovementLabel::Unchanged),
    ];
    for (h, p, want) in cases {
        assert_eq!(classify_deltas(h, p, thr), want, "{h}/{p}");
    }
}
