use super::*;

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn discrete_levels_are_sorted_and_distinct() {
    let scale = ColourScale::discrete("batch", &labels(&["b", "a", "b", "c"]));
    match &scale {
        ColourScale::Discrete { levels, colours, .. } => {
            assert_eq!(levels, &labels(&["a", "b", "c"]));
            assert_eq!(colours[0], palette_colour(0));
            assert_eq!(colours.len(), 3);
        }
        other => panic!("expected discrete scale, got {other:?}"),
    }
    assert_eq!(scale.colour(&ScaleValue::Level("b".into())), palette_colour(1));
    assert_eq!(scale.colour(&ScaleValue::Level("zzz".into())), GRAY50);
    assert_eq!(scale.colour(&ScaleValue::Value(1.0)), GRAY50);
}

#[test]
fn palette_wraps() {
    assert_eq!(palette_colour(0), palette_colour(10));
    assert_ne!(palette_colour(0), palette_colour(1));
}

#[test]
fn manual_scale_keeps_given_order() {
    let scale = ColourScale::manual("is_control", &[("FALSE", ALICEBLUE), ("TRUE", WHEAT)], false);
    assert!(!scale.show_legend());
    assert_eq!(scale.title(), "is_control");
    assert_eq!(scale.colour(&ScaleValue::Level("TRUE".into())), WHEAT);
    assert_eq!(
        scale.legend_entries(),
        vec![("FALSE".to_string(), ALICEBLUE), ("TRUE".to_string(), WHEAT)]
    );
}

#[test]
fn continuous_range_ignores_non_finite() {
    let scale = ColourScale::continuous("sum", &[f64::NAN, 2.0, 10.0, f64::INFINITY]);
    match scale {
        ColourScale::Continuous { min, max, .. } => {
            assert_eq!((min, max), (2.0, 10.0));
        }
        other => panic!("expected continuous scale, got {other:?}"),
    }
}

#[test]
fn continuous_ends_follow_viridis() {
    let scale = ColourScale::continuous("sum", &[0.0, 1.0]);
    let low = scale.colour(&ScaleValue::Value(0.0));
    let high = scale.colour(&ScaleValue::Value(1.0));
    let v0 = colorous::VIRIDIS.eval_continuous(0.0);
    let v1 = colorous::VIRIDIS.eval_continuous(1.0);
    assert_eq!(low, Rgb(v0.r, v0.g, v0.b));
    assert_eq!(high, Rgb(v1.r, v1.g, v1.b));
    assert_eq!(scale.colour(&ScaleValue::Value(f64::NAN)), GRAY50);
}

#[test]
fn continuous_legend_runs_high_to_low() {
    let scale = ColourScale::continuous("sum", &[0.0, 100.0]);
    let entries = scale.legend_entries();
    assert_eq!(entries.len(), 5);
    assert_eq!(entries[0].0, "100");
    assert_eq!(entries[4].0, "0");

    let flat = ColourScale::continuous("sum", &[3.0, 3.0]);
    assert_eq!(flat.legend_entries().len(), 1);
}
