use super::*;
use crate::expr::csc::CscMatrix;

fn experiment() -> Experiment {
    let counts = CscMatrix::from_triplets(2, 4, vec![(0, 0, 1u32), (1, 1, 2), (3, 0, 4)])
        .expect("csc");
    let mut exp = Experiment::from_counts(
        counts,
        vec!["f1".into(), "f2".into()],
        vec!["G1".into(), "G2".into()],
        vec!["c1".into(), "c2".into(), "c3".into(), "c4".into()],
    )
    .expect("experiment");
    exp.col_data
        .insert("sum", ColumnData::Numeric(vec![10.0, 20.0, f64::NAN, 40.0]))
        .expect("sum");
    exp.col_data
        .insert("detected", ColumnData::Numeric(vec![1.0, 2.0, 3.0, 4.0]))
        .expect("detected");
    exp.col_data
        .insert(
            "batch",
            ColumnData::Categorical(vec!["b".into(), "a".into(), "b".into(), "a".into()]),
        )
        .expect("batch");
    exp.row_data
        .insert("mean", ColumnData::Numeric(vec![1.25, 0.5]))
        .expect("mean");
    exp
}

#[test]
fn scatter_drops_non_finite_points() {
    let params = MetadataPlotParams::new("detected").with_x("sum");
    let chart = plot_col_data(&experiment(), &params).expect("chart");
    assert_eq!(chart.x_label, "sum");
    assert_eq!(chart.y_label, "detected");
    assert!(!chart.x_axis.is_discrete());
    let marks = &chart.layers[0].marks;
    assert_eq!(marks.len(), 3);
    assert_eq!((marks[2].x, marks[2].y), (40.0, 4.0));
}

#[test]
fn categorical_x_uses_sorted_levels_with_jitter() {
    let params = MetadataPlotParams::new("detected").with_x("batch");
    let chart = plot_col_data(&experiment(), &params).expect("chart");
    assert_eq!(
        chart.x_axis,
        Axis::Discrete {
            levels: vec!["a".into(), "b".into()]
        }
    );
    let marks = &chart.layers[0].marks;
    // c1 is in batch "b", drawn around position 1.
    assert!((marks[0].x - 1.0).abs() <= JITTER_WIDTH / 2.0);
    assert!((marks[1].x - 0.0).abs() <= JITTER_WIDTH / 2.0);
}

#[test]
fn missing_x_gives_single_strip() {
    let chart = plot_col_data(&experiment(), &MetadataPlotParams::new("detected")).expect("chart");
    assert_eq!(
        chart.x_axis,
        Axis::Discrete {
            levels: vec![String::new()]
        }
    );
    assert_eq!(chart.layers[0].marks.len(), 4);
}

#[test]
fn colour_by_feature_expression() {
    let params = MetadataPlotParams::new("detected").with_x("sum").with_colour("G1");
    let chart = plot_col_data(&experiment(), &params).expect("chart");
    match chart.colour_scale {
        Some(ColourScale::Continuous { min, max, .. }) => assert_eq!((min, max), (0.0, 4.0)),
        other => panic!("expected continuous colour, got {other:?}"),
    }
    assert_eq!(
        chart.layers[0].marks[0].colour,
        Some(ScaleValue::Value(1.0))
    );
}

#[test]
fn categorical_y_is_rejected() {
    let err = plot_col_data(&experiment(), &MetadataPlotParams::new("batch")).unwrap_err();
    assert!(matches!(err, PlotError::ColumnKind { expected: "numeric", .. }));
}

#[test]
fn row_data_plot() {
    let chart = plot_row_data(&experiment(), &MetadataPlotParams::new("mean")).expect("chart");
    let ys: Vec<f64> = chart.layers[0].marks.iter().map(|m| m.y).collect();
    assert_eq!(ys, vec![1.25, 0.5]);
}

#[test]
fn jitter_is_deterministic_and_bounded() {
    for i in 0..100 {
        let v = jitter(3.0, i);
        assert_eq!(v, jitter(3.0, i));
        assert!(v >= 3.0 - JITTER_WIDTH / 2.0 && v < 3.0 + JITTER_WIDTH / 2.0);
    }
    assert_ne!(jitter(0.0, 0), jitter(0.0, 1));
}
