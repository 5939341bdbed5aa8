//! Train the crop classifier from a CSV dataset and write the artifact bundle.

use std::path::PathBuf;

use croprec::config::{self, Settings};
use croprec::logging::{self, Console};
use croprec::training::{EvaluationReport, train_and_save};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("train", Console::Stderr) {
        eprintln!("Logging disabled: {err}");
    }

    let mut settings = config::load_or_default().map_err(|err| err.to_string())?;
    if options.init_config {
        let path = config::config_path().map_err(|err| err.to_string())?;
        if path.exists() {
            return Err(format!("Config already exists: {}", path.display()));
        }
        config::save_to(&path, &Settings::default()).map_err(|err| err.to_string())?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }
    options.apply(&mut settings);
    settings.validate().map_err(|err| err.to_string())?;

    let dataset = settings
        .training
        .dataset
        .clone()
        .ok_or_else(|| format!("No dataset given.\n\n{}", help_text()))?;
    if !dataset.is_file() {
        return Err(format!("Dataset is not a file: {}", dataset.display()));
    }
    let out_dir = match &options.out_dir {
        Some(dir) => dir.clone(),
        None => settings.resolve_artifact_dir().map_err(|err| err.to_string())?,
    };

    let run = train_and_save(&dataset, &out_dir, &settings.training)
        .map_err(|err| err.to_string())?;
    let artifacts = &run.artifacts;
    println!("run id: {}", artifacts.stamp.run_id);
    println!("rows: train={} test={}", run.train_rows, run.test_rows);
    println!(
        "label encoder: {}",
        if artifacts.encoder.is_some() { "written" } else { "not used" }
    );
    println!("artifacts: {}", out_dir.display());
    match &run.report {
        Some(report) => print_report(report),
        None => println!("held-out split is empty; evaluation skipped"),
    }
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!("test accuracy: {:.4}", report.accuracy());
    for (idx, stats) in report.per_class().iter().enumerate() {
        println!(
            "class {:>2} {:<14}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            idx, report.class_names[idx], stats.precision, stats.recall, stats.f1, stats.support
        );
    }
    let cm = &report.confusion;
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:5}", cm.get(truth, pred)));
        }
        println!("{row}");
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    dataset: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    n_estimators: Option<usize>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    no_encode: bool,
    init_config: bool,
}

impl CliOptions {
    /// Flags override values from the config file.
    fn apply(&self, settings: &mut Settings) {
        let training = &mut settings.training;
        if let Some(dataset) = &self.dataset {
            training.dataset = Some(dataset.clone());
        }
        if let Some(n) = self.n_estimators {
            training.n_estimators = n;
        }
        if let Some(seed) = self.seed {
            training.seed = seed;
        }
        if let Some(fraction) = self.test_fraction {
            training.test_fraction = fraction;
        }
        if self.max_depth.is_some() {
            training.max_depth = self.max_depth;
        }
        if let Some(min) = self.min_samples_split {
            training.min_samples_split = min;
        }
        if self.no_encode {
            training.encode_labels = false;
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--dataset" => {
                idx += 1;
                options.dataset = Some(PathBuf::from(value_of(&args, idx, "--dataset")?));
            }
            "--out" => {
                idx += 1;
                options.out_dir = Some(PathBuf::from(value_of(&args, idx, "--out")?));
            }
            "--trees" => {
                idx += 1;
                options.n_estimators = Some(parse_value(&args, idx, "--trees")?);
            }
            "--seed" => {
                idx += 1;
                options.seed = Some(parse_value(&args, idx, "--seed")?);
            }
            "--test-fraction" => {
                idx += 1;
                options.test_fraction = Some(parse_value(&args, idx, "--test-fraction")?);
            }
            "--max-depth" => {
                idx += 1;
                options.max_depth = Some(parse_value(&args, idx, "--max-depth")?);
            }
            "--min-samples-split" => {
                idx += 1;
                options.min_samples_split = Some(parse_value(&args, idx, "--min-samples-split")?);
            }
            "--no-encode" => options.no_encode = true,
            "--init-config" => options.init_config = true,
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn value_of<'a>(args: &'a [String], idx: usize, flag: &str) -> Result<&'a str, String> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_value<T: std::str::FromStr>(args: &[String], idx: usize, flag: &str) -> Result<T, String> {
    let value = value_of(args, idx, flag)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "croprec-train",
        "",
        "Trains the crop recommendation forest and writes model.json, minmaxscaler.json,",
        "standscaler.json and (for text labels) label_encoder.json.",
        "",
        "Usage:",
        "  croprec-train --dataset <crops.csv> [--out <dir>] [options]",
        "",
        "Options:",
        "  --dataset <file>           CSV with N,P,K,temperature,humidity,ph,rainfall,label.",
        "  --out <dir>                Artifact directory (default: config or app dir).",
        "  --trees <n>                Number of trees (default: 100).",
        "  --seed <n>                 Split and forest seed (default: 42).",
        "  --test-fraction <f64>      Held-out fraction in [0, 1) (default: 0.2).",
        "  --max-depth <n>            Maximum tree depth (default: unlimited).",
        "  --min-samples-split <n>    Minimum rows to split a node (default: 2).",
        "  --no-encode                Keep text labels as string classes.",
        "  --init-config              Write a default croprec.toml and exit.",
    ]
    .join("\n")
}
