use super::*;

fn experiment() -> Experiment {
    // cell totals 2, 6, 4 -> mean 4
    let counts = CscMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1u32), (0, 1, 1), (1, 0, 3), (1, 1, 3), (2, 0, 4)],
    )
    .expect("csc");
    Experiment::from_counts(
        counts,
        vec!["id1".into(), "id2".into()],
        vec!["G1".into(), "G2".into()],
        vec!["c1".into(), "c2".into(), "c3".into()],
    )
    .expect("experiment")
}

#[test]
fn library_size_factors_have_unit_mean() {
    let exp = experiment();
    let Assay::Counts(counts) = exp.assay("counts").expect("counts") else {
        panic!("expected counts");
    };
    let sf = library_size_factors(counts);
    assert_eq!(sf, vec![0.5, 1.5, 1.0]);
}

#[test]
fn log_norm_counts_adds_logcounts() {
    let exp = experiment();
    let out = log_norm_counts(&exp, &LogNormParams::default()).expect("lognorm");
    let logcounts = out.assay("logcounts").expect("logcounts");
    // cell 0: G1 = 1 / 0.5 -> log2(3), G2 = 1 / 0.5 -> log2(3)
    let col0 = logcounts.dense_col(0);
    assert!((col0[0] - 3f64.log2()).abs() < 1e-6);
    // cell 2: G1 = 4 / 1 -> log2(5), G2 unstored stays 0
    let col2 = logcounts.dense_col(2);
    assert!((col2[0] - 5f64.log2()).abs() < 1e-6);
    assert_eq!(col2[1], 0.0);
    assert!(out.size_factors.is_some());
}

#[test]
fn stored_size_factors_are_centred() {
    let mut exp = experiment();
    exp.size_factors = Some(vec![2.0, 2.0, 2.0]);
    let out = log_norm_counts(&exp, &LogNormParams::default()).expect("lognorm");
    assert_eq!(out.size_factors, Some(vec![1.0, 1.0, 1.0]));
}

#[test]
fn zero_size_factor_is_rejected() {
    let mut exp = experiment();
    exp.size_factors = Some(vec![1.0, 0.0, 1.0]);
    let err = log_norm_counts(&exp, &LogNormParams::default()).unwrap_err();
    assert!(matches!(err, NormalizeError::NonPositiveSizeFactors(1)));
}

#[test]
fn unsupported_pseudo_count() {
    let exp = experiment();
    let params = LogNormParams {
        pseudo_count: 0.5,
        ..LogNormParams::default()
    };
    let err = log_norm_counts(&exp, &params).unwrap_err();
    assert!(matches!(err, NormalizeError::UnsupportedPseudoCount(_)));
}

#[test]
fn unknown_assay_is_reported() {
    let exp = experiment();
    let params = LogNormParams {
        exprs_values: "spliced".to_string(),
        ..LogNormParams::default()
    };
    let err = log_norm_counts(&exp, &params).unwrap_err();
    assert!(matches!(err, NormalizeError::Sce(SceError::UnknownAssay { .. })));
}

#[test]
fn cpm_scales_to_a_million() {
    let exp = experiment();
    let out = calculate_cpm(&exp, "counts").expect("cpm");
    let cpm = out.assay("cpm").expect("cpm");
    let sums = cpm.col_sums();
    for s in sums {
        assert!((s - 1e6).abs() < 1.0);
    }
}
