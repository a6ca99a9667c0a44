use approx::assert_abs_diff_eq;
use std::collections::BTreeMap;
use std::io::Cursor;

use tceval::{
    evaluate_conf, BackendAdapter, CrfSuiteAdapter, EvalConfigBuilder, Evaluator, Feature,
    FeatureStore, Instance, LearningMode, MeasureResults, OutcomeStore, Reporter, SingleOutcome,
    SparseFeatureStore, ZeroDivision,
};

/// The classified outcomes behind the gold-by-predicted matrix
/// [[5, 1], [2, 8]]: 16 instances, 13 of them classified correctly.
fn two_class_report() -> String {
    let mut report = String::from("#ID=PREDICTION;GOLDSTANDARD;THRESHOLD\n#labels 0=A 1=B\n");
    let cells = [(0usize, 0usize, 5usize), (0, 1, 1), (1, 0, 2), (1, 1, 8)];
    let mut id = 0usize;
    for (gold, prediction, count) in cells {
        for _ in 0..count {
            report.push_str(&format!("doc{}={};{};0.5\n", id, prediction, gold));
            id += 1;
        }
    }
    report
}

#[test]
fn evaluation_from_a_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("id2outcome.txt");
    std::fs::write(&path, two_class_report()).unwrap();

    let store = OutcomeStore::from_file(&path, LearningMode::SingleLabel).unwrap();
    let config = EvalConfigBuilder::default()
        .individual_label_measures(true)
        .build();
    let results = evaluate_conf(&store, config).unwrap();

    assert_abs_diff_eq!(results["Accuracy"], 13.0 / 16.0, epsilon = 1e-12);
    assert_abs_diff_eq!(results["MicroPrecision"], 13.0 / 16.0, epsilon = 1e-12);
    assert_abs_diff_eq!(results["MicroRecall"], 13.0 / 16.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        results["MacroPrecision"],
        (5.0 / 7.0 + 8.0 / 9.0) / 2.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        results["MacroRecall"],
        (5.0 / 6.0 + 8.0 / 10.0) / 2.0,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(results["Precision_A"], 5.0 / 7.0, epsilon = 1e-12);
    assert_abs_diff_eq!(results["Recall_B"], 8.0 / 10.0, epsilon = 1e-12);
}

#[test]
fn merged_folds_share_one_label_universe() {
    let fold_0 = "#labels 0=A 1=B\ndoc0=0;0;0.5\ndoc1=1;1;0.5\n";
    let fold_1 = "#labels 0=B 1=C\ndoc2=1;1;0.5\ndoc3=0;0;0.5\n";
    let mut store =
        OutcomeStore::from_reader(Cursor::new(fold_0), LearningMode::SingleLabel).unwrap();
    let other =
        OutcomeStore::from_reader(Cursor::new(fold_1), LearningMode::SingleLabel).unwrap();
    store.merge(other).unwrap();

    let homogenized = store.homogenize();
    assert_eq!(
        homogenized.labels(),
        vec![String::from("A"), String::from("B"), String::from("C")]
    );
    let results = Evaluator::default().evaluate(&homogenized).unwrap();
    assert_abs_diff_eq!(results["Accuracy"], 1.0, epsilon = 1e-12);
}

#[test]
fn strict_policy_propagates_nan() {
    // B is never gold and never predicted: its precision divides by zero
    let labels = vec![String::from("A"), String::from("B")];
    let mut store = OutcomeStore::new(LearningMode::SingleLabel);
    store.push(SingleOutcome::new(
        vec![1.0, 0.0],
        vec![1.0, 0.0],
        labels.clone(),
        "doc0",
    ));
    let strict = EvalConfigBuilder::default()
        .division_by_zero(ZeroDivision::Strict)
        .build();
    let results = evaluate_conf(&store, strict).unwrap();
    assert_abs_diff_eq!(results["Accuracy"], 1.0, epsilon = 1e-12);
    assert!(results["MacroPrecision"].is_nan());

    let soft = EvalConfigBuilder::default()
        .division_by_zero(ZeroDivision::Soft)
        .build();
    let results = evaluate_conf(&store, soft).unwrap();
    assert_abs_diff_eq!(results["MacroPrecision"], 0.5, epsilon = 1e-12);
}

#[test]
fn reporter_collects_several_runs() {
    let store = OutcomeStore::from_reader(
        Cursor::new(two_class_report()),
        LearningMode::SingleLabel,
    )
    .unwrap();
    let evaluator = Evaluator::default();

    let mut reporter = Reporter::default();
    reporter.insert_row("fold-0", evaluator.evaluate(&store).unwrap());
    reporter.insert_row("fold-1", evaluator.micro_measures(&store).unwrap());

    let text = reporter.to_string();
    assert!(text.starts_with("Run, Accuracy,"));
    // fold-1 never computed an accuracy
    assert!(text.contains("fold-1, -,"));

    let rows: BTreeMap<String, MeasureResults> = reporter.into();
    assert_abs_diff_eq!(rows["fold-0"]["Accuracy"], 13.0 / 16.0, epsilon = 1e-12);
}

#[test]
fn multi_label_end_to_end() {
    let report = "\
#labels 0=economy 1=politics 2=sports
doc0=0.900,0.800,0.100;1.000,1.000,0.000;0.5
doc1=0.200,0.100,0.900;0.000,0.000,1.000;0.5
doc2=0.700,0.100,0.600;1.000,0.000,0.000;0.5
";
    let store =
        OutcomeStore::from_reader(Cursor::new(report), LearningMode::MultiLabel).unwrap();
    let results = evaluate_conf(&store, EvalConfigBuilder::default().build()).unwrap();
    // doc2 predicted {economy, sports} against gold {economy}: one spurious
    // label out of five gold/predicted pairs
    assert_abs_diff_eq!(results["MicroPrecision"], 4.0 / 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(results["MicroRecall"], 1.0, epsilon = 1e-12);
}

#[test]
fn feature_store_to_training_data() {
    let mut store = SparseFeatureStore::new();
    let rows = [("DET", 0usize), ("NN", 0), ("VB", 1)];
    for (position, (outcome, sequence)) in rows.iter().enumerate() {
        store
            .add_instance(
                Instance::new(
                    vec![
                        Feature::new("token", format!("w{}", position).as_str()),
                        Feature::new("capitalized", position == 0),
                    ],
                    *outcome,
                )
                .with_sequence(*sequence, position),
            )
            .unwrap();
    }

    let mut buffer = Vec::new();
    CrfSuiteAdapter.write(&store, &mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "DET\ttoken=w0\tcapitalized=true\t__BOS__");
    assert!(lines[1].ends_with("__EOS__"));
    assert!(lines[2].ends_with("__BOS__\t__EOS__"));
}
