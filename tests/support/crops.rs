//! Synthetic crop dataset with well separated class centroids.

use std::fmt::Write as _;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Canonical rice measurements `(N, P, K, temperature, humidity, ph, rainfall)`.
pub const RICE_SAMPLE: [f64; 7] = [90.0, 42.0, 43.0, 20.87, 82.0, 6.5, 202.9];

/// `(label, centroid, half-width of the uniform jitter)` per crop.
const CROPS: [(&str, [f64; 7], [f64; 7]); 4] = [
    (
        "rice",
        [80.0, 48.0, 40.0, 23.7, 82.3, 6.4, 236.0],
        [12.0, 8.0, 6.0, 3.0, 2.0, 0.5, 40.0],
    ),
    (
        "maize",
        [78.0, 48.0, 20.0, 22.4, 65.0, 6.2, 84.8],
        [12.0, 8.0, 4.0, 3.0, 4.0, 0.5, 20.0],
    ),
    (
        "chickpea",
        [40.0, 68.0, 80.0, 18.9, 16.9, 7.3, 80.0],
        [12.0, 8.0, 4.0, 2.0, 2.0, 0.5, 10.0],
    ),
    (
        "coffee",
        [101.0, 28.7, 29.9, 25.5, 58.9, 6.8, 158.0],
        [12.0, 6.0, 4.0, 2.0, 4.0, 0.4, 30.0],
    ),
];

/// Write `rows_per_crop` rows per crop; `label_for` renders the label column.
pub fn write_csv(path: &Path, rows_per_crop: usize, label_for: impl Fn(&str) -> String) {
    let mut rng = StdRng::seed_from_u64(7);
    let mut text = String::from("N,P,K,temperature,humidity,ph,rainfall,label\n");
    for row in 0..rows_per_crop * CROPS.len() {
        let (label, centroid, spread) = &CROPS[row % CROPS.len()];
        for (value, half) in centroid.iter().zip(spread) {
            let jitter = rng.random_range(-half..=*half);
            write!(text, "{:.2},", value + jitter).unwrap();
        }
        writeln!(text, "{}", label_for(label)).unwrap();
    }
    std::fs::write(path, text).unwrap();
}

/// Numeric labels of the reference dataset.
pub fn numeric_label(label: &str) -> String {
    match label {
        "rice" => "1",
        "maize" => "2",
        "chickpea" => "21",
        "coffee" => "22",
        other => panic!("no numeric label for {other}"),
    }
    .to_string()
}
