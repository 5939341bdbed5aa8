//! Headless crop recommendation for one set of soil and weather values.

use std::path::PathBuf;

use croprec::config;
use croprec::logging::{self, Console};
use croprec::schema::{FEATURE_COLUMNS, FEATURE_COUNT, FeatureVector, column_index};
use croprec::serving::ServingContext;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("predict", Console::Stderr) {
        eprintln!("Logging disabled: {err}");
    }
    let artifact_dir = match options.artifact_dir {
        Some(dir) => dir,
        None => config::load_or_default()
            .and_then(|settings| settings.resolve_artifact_dir())
            .map_err(|err| err.to_string())?,
    };

    let serving = ServingContext::load(&artifact_dir);
    for warning in serving.warnings() {
        eprintln!("warning: {warning}");
    }
    let recommendation = serving
        .recommend(&options.features)
        .map_err(|err| err.to_string())?;
    println!("{recommendation}");
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    artifact_dir: Option<PathBuf>,
    features: FeatureVector,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut artifact_dir = None;
    let mut positional = Vec::new();
    let mut named: [Option<f64>; FEATURE_COUNT] = [None; FEATURE_COUNT];

    let mut idx = 0usize;
    while idx < args.len() {
        let arg = args[idx].as_str();
        match arg {
            "-h" | "--help" => return Err(help_text()),
            "--artifacts" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--artifacts requires a value".to_string())?;
                artifact_dir = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => {
                let column = column_for_flag(&flag[2..])
                    .ok_or_else(|| format!("Unknown argument: {flag}\n\n{}", help_text()))?;
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| format!("{flag} requires a value"))?;
                named[column] = Some(parse_number(flag, value)?);
            }
            value => positional.push(parse_number("value", value)?),
        }
        idx += 1;
    }

    let features = if positional.is_empty() {
        let mut values = [0.0; FEATURE_COUNT];
        for (idx, slot) in named.into_iter().enumerate() {
            values[idx] = slot.ok_or_else(|| {
                let flag = FEATURE_COLUMNS[idx].name.to_lowercase();
                format!("Missing --{flag}\n\n{}", help_text())
            })?;
        }
        FeatureVector::new(values)
    } else if named.iter().any(Option::is_some) {
        return Err("Use either positional values or named flags, not both".to_string());
    } else {
        FeatureVector::from_slice(&positional).ok_or_else(|| {
            format!(
                "Expected {FEATURE_COUNT} values, got {}\n\n{}",
                positional.len(),
                help_text()
            )
        })?
    };
    Ok(CliOptions {
        artifact_dir,
        features,
    })
}

/// `--n`, `--N` and `--nitrogen` all name the first column.
fn column_for_flag(flag: &str) -> Option<usize> {
    column_index(flag).or_else(|| {
        FEATURE_COLUMNS.iter().position(|column| {
            column.name.eq_ignore_ascii_case(flag)
                || column
                    .display
                    .split(' ')
                    .next()
                    .is_some_and(|word| word.eq_ignore_ascii_case(flag))
        })
    })
}

fn parse_number(flag: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "croprec-predict",
        "",
        "Recommends a crop for one set of soil and weather values.",
        "",
        "Usage:",
        "  croprec-predict [--artifacts <dir>] <N> <P> <K> <temperature> <humidity> <ph> <rainfall>",
        "  croprec-predict [--artifacts <dir>] --n <v> --p <v> --k <v> --temperature <v> \\",
        "                  --humidity <v> --ph <v> --rainfall <v>",
    ]
    .join("\n")
}
