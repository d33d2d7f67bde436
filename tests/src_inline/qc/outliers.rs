use super::*;
use crate::qc::cell::SubsetCellMetrics;

fn params(kind: OutlierType) -> OutlierParams {
    OutlierParams {
        kind,
        ..OutlierParams::default()
    }
}

#[test]
fn median_handles_even_and_empty() {
    assert_eq!(median(&[1.0, 2.0, 3.0]), 2.0);
    assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), 2.5);
    assert!(median(&[]).is_nan());
}

#[test]
fn mad_is_scaled() {
    let (med, mad) = median_mad(&[1.0, 2.0, 3.0, 4.0, 100.0]);
    assert_eq!(med, 3.0);
    assert!((mad - MAD_CONSTANT).abs() < 1e-12);
}

#[test]
fn flags_both_sides() {
    let result = is_outlier(&[1.0, 2.0, 3.0, 4.0, 100.0], &params(OutlierType::Both)).expect("ok");
    assert_eq!(result.flags, vec![false, false, false, false, true]);
    let t = result.thresholds[ALL_CELLS];
    assert!((t.lower - (3.0 - 3.0 * MAD_CONSTANT)).abs() < 1e-9);
    assert!((t.higher - (3.0 + 3.0 * MAD_CONSTANT)).abs() < 1e-9);
}

#[test]
fn one_sided_thresholds_are_infinite() {
    let result = is_outlier(&[1.0, 2.0, 3.0], &params(OutlierType::Higher)).expect("ok");
    assert_eq!(result.thresholds[ALL_CELLS].lower, f64::NEG_INFINITY);
    let result = is_outlier(&[1.0, 2.0, 3.0], &params(OutlierType::Lower)).expect("ok");
    assert_eq!(result.thresholds[ALL_CELLS].higher, f64::INFINITY);
}

#[test]
fn log_scale_thresholds_reported_in_original_units() {
    let p = OutlierParams {
        kind: OutlierType::Lower,
        log: true,
        ..OutlierParams::default()
    };
    let result = is_outlier(&[100.0, 100.0, 100.0, 100.0, 1.0], &p).expect("ok");
    assert_eq!(result.flags, vec![false, false, false, false, true]);
    assert!((result.thresholds[ALL_CELLS].lower - 100.0).abs() < 1e-9);
}

#[test]
fn min_diff_widens_thresholds() {
    let p = OutlierParams {
        min_diff: Some(2.0),
        ..OutlierParams::default()
    };
    let result = is_outlier(&[5.0, 5.0, 5.0, 6.0], &p).expect("ok");
    assert_eq!(result.n_outliers(), 0);
    assert_eq!(result.thresholds[ALL_CELLS], Thresholds { lower: 3.0, higher: 7.0 });
}

#[test]
fn non_finite_values_are_never_flagged() {
    let result = is_outlier(&[1.0, f64::NAN, 1.0, 1.0], &params(OutlierType::Both)).expect("ok");
    assert_eq!(result.flags, vec![false; 4]);
}

#[test]
fn batches_are_judged_separately() {
    let p = OutlierParams {
        kind: OutlierType::Higher,
        batch: Some(vec!["a".into(), "a".into(), "a".into(), "b".into(), "b".into(), "b".into()]),
        ..OutlierParams::default()
    };
    let result = is_outlier(&[1.0, 1.0, 1.0, 10.0, 10.0, 30.0], &p).expect("ok");
    assert_eq!(result.flags, vec![false, false, false, false, false, true]);
    assert_eq!(result.thresholds.len(), 2);
    assert_eq!(result.thresholds["b"].higher, 10.0);
}

#[test]
fn batch_length_mismatch() {
    let p = OutlierParams {
        batch: Some(vec!["a".into()]),
        ..OutlierParams::default()
    };
    let err = is_outlier(&[1.0, 2.0], &p).unwrap_err();
    assert!(matches!(err, QcError::BatchLength { expected: 2, found: 1 }));
}

fn table() -> CellQcTable {
    CellQcTable {
        cell_names: (1..=6).map(|i| format!("c{i}")).collect(),
        sum: vec![1000.0, 1100.0, 900.0, 1000.0, 1050.0, 10.0],
        detected: vec![100, 110, 90, 100, 105, 5],
        percent_top: Vec::new(),
        subsets: vec![SubsetCellMetrics {
            name: "mito".to_string(),
            sum: vec![0.0; 6],
            detected: vec![0; 6],
            percent: vec![5.0, 5.0, 6.0, 5.0, 4.0, 60.0],
        }],
    }
}

#[test]
fn quick_qc_discards_the_damaged_cell() {
    let params = QuickQcParams {
        sub_fields: vec!["mito".to_string()],
        ..QuickQcParams::default()
    };
    let result = quick_per_cell_qc(&table(), &params).expect("quick qc");
    let expected = vec![false, false, false, false, false, true];
    assert_eq!(result.low_lib_size.flags, expected);
    assert_eq!(result.low_n_features.flags, expected);
    assert_eq!(result.high_subsets[0].1.flags, expected);
    assert_eq!(result.discard, expected);
    assert_eq!(result.n_discarded(), 1);

    let names: Vec<String> = result.columns().into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        vec!["low_lib_size", "low_n_features", "high_subsets_mito_percent", "discard"]
    );
}

#[test]
fn quick_qc_unknown_subset() {
    let params = QuickQcParams {
        sub_fields: vec!["ribo".to_string()],
        ..QuickQcParams::default()
    };
    let err = quick_per_cell_qc(&table(), &params).unwrap_err();
    assert!(matches!(err, QcError::UnknownSubset(name) if name == "ribo"));
}
