//! End-to-end run over synthetic presence/absence data: train an ensemble,
//! persist the chosen models, reload them, and check the sensitivity
//! output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use nichenet::{
    model_file_name, run, AucThresholds, CancelToken, Dataset, Network, NullReporter, Profiler,
    Roc, TrainOptions, VarStats,
};

/// Presences cluster near (0.8, 0.8), absences near (-0.8, -0.8).
fn clustered_data(n: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut inputs = Vec::with_capacity(n);
    let mut targets = Vec::with_capacity(n);
    for i in 0..n {
        let center = if i % 2 == 0 { 0.8 } else { -0.8 };
        let x = center + rng.gen_range(-0.3..0.3);
        let y = center + rng.gen_range(-0.3..0.3);
        inputs.push(vec![x, y]);
        targets.push(vec![if i % 2 == 0 { 1.0 } else { 0.0 }]);
    }
    Dataset::from_rows(&inputs, &targets).unwrap()
}

fn profiler() -> Profiler {
    let stats = VarStats {
        mean: 0.0,
        stdev: 1.0,
        real_max: 1.1,
        real_min: -1.1,
        std_max: 1.1,
        std_min: -1.1,
    };
    Profiler::new(&[("east".to_owned(), stats), ("north".to_owned(), stats)], 8).unwrap()
}

#[test]
fn full_run_persists_and_reloads_models() {
    let data = clustered_data(40, 99);
    let dir = tempfile::tempdir().unwrap();

    let opts = TrainOptions {
        repetitions: 3,
        iter_inter: 100,
        iter_report: 3,
        seed: 5,
        save_dir: Some(dir.path().to_path_buf()),
        ..TrainOptions::default()
    };
    let profiler = profiler();
    let report = run(
        &data,
        Some(&profiler),
        &opts,
        &NullReporter,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(report.models.len(), 3);
    assert!(report.failed.is_empty());
    assert_eq!(report.advisory, None);

    // Each chosen model is on disk under its iteration/repetition name and
    // reloads to an identical predictor.
    for model in &report.models {
        let path = dir
            .path()
            .join(model_file_name(model.result.iteration, model.repetition));
        assert!(path.is_file(), "missing {}", path.display());

        let mut reloaded = Network::load_json(&path).unwrap();
        let mut trained = model.network.clone();
        for idx in 0..data.len() {
            assert_eq!(
                trained.evaluate(data.input(idx)),
                reloaded.evaluate(data.input(idx))
            );
        }
    }

    // One sensitivity report per model, shaped by the profiler grid.
    assert_eq!(report.sensitivity.len(), 3);
    for sens in &report.sensitivity {
        assert_eq!(sens.variables, vec!["east", "north"]);
        assert_eq!(sens.profiles.len(), 2);
        assert!(sens.profiles.iter().all(|p| p.len() == 9));
        assert!(sens.surfaces.iter().all(|s| s.len() == 9));
        assert_eq!(sens.importance.len(), 2);
    }

    // The clusters are cleanly separable, so the best model should rank
    // presences above absences almost everywhere.
    let best = report
        .models
        .iter()
        .min_by(|a, b| {
            a.result
                .test_error
                .partial_cmp(&b.result.test_error)
                .unwrap()
        })
        .unwrap();
    let mut net = best.network.clone();
    let scores: Vec<f64> = (0..data.len())
        .map(|idx| net.evaluate(data.input(idx))[0])
        .collect();
    let auc = Roc::new(data.targets_flat(), &scores).unwrap().auc_roc();
    assert!(auc > 0.8, "best model AUC {auc} too low");
}

#[test]
fn gated_run_scores_every_retained_model() {
    let data = clustered_data(40, 7);
    let opts = TrainOptions {
        repetitions: 3,
        iter_inter: 100,
        iter_report: 3,
        seed: 11,
        auc_filter: Some(AucThresholds {
            train: 0.0,
            test: 0.0,
        }),
        ..TrainOptions::default()
    };
    let report = run(&data, None, &opts, &NullReporter, &CancelToken::new()).unwrap();

    assert_eq!(report.models.len(), 3);
    assert!(report.failed.is_empty());
    for model in &report.models {
        assert!(model.result.train_auc.is_some());
        assert!(model.result.test_auc.is_some());
    }
}
