//! Bank churn ensemble: k-fold training, optional hyperparameter search, submission.

use std::path::PathBuf;

use compkit::churn::runner;
use compkit::config;
use compkit::logging;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("compkit-churn") {
        eprintln!("Logging disabled: {err}");
    }
    let _run = logging::run_span("churn").entered();
    let mut settings = config::load_or_default(options.config.as_deref())
        .map_err(|err| err.to_string())?
        .churn;
    if let Some(dir) = options.data_dir {
        settings.data_dir = dir;
    }
    if let Some(out) = options.out {
        settings.submission_path = out;
    }
    if let Some(trials) = options.trials {
        settings.n_trials = trials;
    }
    if let Some(folds) = options.folds {
        if folds < 2 {
            return Err(format!("--folds must be at least 2, got {folds}"));
        }
        settings.num_folds = folds;
    }

    let report = runner::run(&settings, options.optimize).map_err(|err| err.to_string())?;
    println!("mean ROC-AUC over {} folds: {:.5}", report.folds.len(), report.mean_roc_auc);
    for fold in &report.folds {
        println!(
            "fold {:>2}  accuracy={:.4}  roc_auc={:.5}",
            fold.fold, fold.accuracy, fold.roc_auc
        );
    }
    println!("submission written to {}", settings.submission_path.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    optimize: bool,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    trials: Option<usize>,
    folds: Option<usize>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--optimize" => {
                options.optimize = true;
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--data-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--data-dir requires a value".to_string())?;
                options.data_dir = Some(PathBuf::from(value));
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                options.out = Some(PathBuf::from(value));
            }
            "--trials" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--trials requires a value".to_string())?;
                options.trials = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --trials value: {value}"))?,
                );
            }
            "--folds" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--folds requires a value".to_string())?;
                options.folds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --folds value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "compkit-churn",
        "",
        "Trains the soft-voting boosting ensemble with stratified k-fold and writes submission.csv.",
        "",
        "Usage:",
        "  compkit-churn [--optimize] [--config compkit.toml] [--data-dir ./data] [--out submission.csv]",
        "",
        "Options:",
        "  --optimize          Run the hyperparameter search first and train with its best trial.",
        "  --config <file>     Settings file (default: compkit.toml when present).",
        "  --data-dir <dir>    Directory holding train.csv and test.csv (default ./data).",
        "  --out <file>        Submission path (default ./submission.csv).",
        "  --trials <n>        Search trials for --optimize (default 300).",
        "  --folds <n>         Stratified folds (default 5).",
    ]
    .join("\n")
}
