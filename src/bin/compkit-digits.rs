//! Digit recognizer: trains the CNN with early stopping and writes submission.csv.

use std::path::PathBuf;

use compkit::config::{self, DigitsBackend};
use compkit::digits;
use compkit::logging;
use compkit::ml::metrics::precision_recall_by_class;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("compkit-digits") {
        eprintln!("Logging disabled: {err}");
    }
    let _run = logging::run_span("digits").entered();
    let mut settings = config::load_or_default(options.config.as_deref())
        .map_err(|err| err.to_string())?
        .digits;
    if let Some(dir) = options.data_dir {
        settings.data_dir = dir;
    }
    if let Some(out) = options.out {
        settings.submission_path = out;
    }
    if let Some(epochs) = options.epochs {
        settings.num_epochs = epochs;
    }
    if let Some(backend) = options.backend {
        settings.backend = backend;
    }

    let report = digits::run(&settings).map_err(|err| err.to_string())?;
    if let Some(last) = report.epochs.last() {
        println!(
            "trained {} epochs{}; last val loss {:.4}, val accuracy {:.4}",
            report.epochs.len(),
            if report.stopped_early { " (stopped early)" } else { "" },
            last.val_loss,
            last.val_accuracy
        );
    }
    if let Some(confusion) = &report.val_confusion {
        for (digit, stats) in precision_recall_by_class(confusion).iter().enumerate() {
            println!(
                "digit {digit}  precision={:.3}  recall={:.3}  support={}",
                stats.precision, stats.recall, stats.support
            );
        }
    }
    println!("submission written to {}", settings.submission_path.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    epochs: Option<usize>,
    backend: Option<DigitsBackend>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
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
            "--epochs" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--epochs requires a value".to_string())?;
                options.epochs = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --epochs value: {value}"))?,
                );
            }
            "--backend" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--backend requires a value".to_string())?;
                options.backend = Some(
                    DigitsBackend::parse(value)
                        .ok_or_else(|| format!("Invalid --backend value: {value}"))?,
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
        "compkit-digits",
        "",
        "Trains the digit CNN with early stopping and writes an ImageId,Label submission.",
        "",
        "Usage:",
        "  compkit-digits [--config compkit.toml] [--data-dir ./data] [--out submission.csv]",
        "",
        "Options:",
        "  --config <file>     Settings file (default: compkit.toml when present).",
        "  --data-dir <dir>    Directory holding train.csv and test.csv (default ./data).",
        "  --out <file>        Submission path (default ./submission.csv).",
        "  --epochs <n>        Maximum training epochs (default 40).",
        "  --backend <name>    cpu or wgpu; COMPKIT_DIGITS_BACKEND overrides (default cpu).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_and_epochs() {
        let args = ["--backend", "ndarray", "--epochs", "3"]
            .iter()
            .map(|value| value.to_string())
            .collect();
        let options = parse_args(args).unwrap();
        assert_eq!(options.backend, Some(DigitsBackend::Cpu));
        assert_eq!(options.epochs, Some(3));
        assert!(parse_args(vec!["--backend".to_string(), "tpu".to_string()]).is_err());
    }
}
