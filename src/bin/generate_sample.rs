//! Writes a synthetic diffraction scan (`Index,Value`) for trying out the
//! viewer. Usage: `generate_sample [OUTPUT] [READINGS]`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reflections of a silicon powder pattern: (2θ, width, height).
const PEAKS: [(f64, f64, f64); 6] = [
    (28.44, 0.12, 9500.0),
    (47.30, 0.14, 5600.0),
    (56.12, 0.15, 3100.0),
    (69.13, 0.17, 800.0),
    (76.38, 0.18, 1200.0),
    (88.03, 0.20, 1500.0),
];

const TWO_THETA_START: f64 = 10.0;
const TWO_THETA_END: f64 = 90.0;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Air scatter falling off with angle.
fn background(two_theta: f64) -> f64 {
    120.0 + 900.0 * (-two_theta / 12.0).exp()
}

/// Normal sample via the Box-Muller transform.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Detector counts with counting noise; the first reading is the
/// reference value the viewer skips.
fn generate_scan(readings: usize, rng: &mut StdRng) -> Vec<f64> {
    let step = (TWO_THETA_END - TWO_THETA_START) / (readings - 1) as f64;
    let mut values = Vec::with_capacity(readings + 1);
    values.push(0.0);
    for i in 0..readings {
        let two_theta = TWO_THETA_START + i as f64 * step;
        let signal = background(two_theta)
            + PEAKS
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(two_theta, mu, sigma, amp))
                .sum::<f64>();
        values.push(gauss(rng, signal, signal.sqrt()).max(0.0).round());
    }
    values
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "sample_scan.csv".into()));
    let readings: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("invalid reading count '{n}'"))?,
        None => 4001,
    };
    anyhow::ensure!(readings >= 2, "need at least 2 readings, got {readings}");

    let mut rng = StdRng::seed_from_u64(42);
    let values = generate_scan(readings, &mut rng);

    let mut writer = csv::Writer::from_path(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    writer.write_record(["Index", "Value"])?;
    for (i, v) in values.iter().enumerate() {
        writer.write_record([i.to_string(), v.to_string()])?;
    }
    writer.flush().with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Wrote {} readings to {} (open with 2θ {TWO_THETA_START}..{TWO_THETA_END})",
        values.len(),
        output.display()
    );
    Ok(())
}
