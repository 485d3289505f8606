//! Example running ALDEx2 on synthetic data and extracting differences.
//!
//! Requires `run_aldex2.R` (or another engine honoring the same positional
//! arguments) on `PATH`.

use composable_aldex2::prelude::*;

fn main() -> Result<()> {
    env_logger::init();
    println!("=== Composable ALDEx2 Example ===\n");

    let (counts, condition) = create_example_data()?;

    println!("Data dimensions:");
    println!("  Features: {}", counts.n_features());
    println!("  Samples:  {}", counts.n_samples());
    println!("  Groups:   {}", condition.levels().join(", "));
    println!();

    println!("=== Running ALDEx2 ===\n");

    let output = run_aldex2_differences(
        &counts,
        &condition,
        Aldex2Config::default().mc_samples(64),
        DifferenceThresholds::default(),
    )?;

    print!("{}", output.results.summary("we.eBH")?);
    println!();

    if let Some(differences) = output.differences {
        println!("Differentially abundant features:");
        for fid in differences.feature_ids() {
            println!(
                "  {}: effect={:.3}, diff.btw={:.3}",
                fid,
                differences.get(fid, EFFECT_COLUMN).unwrap_or(f64::NAN),
                differences.get(fid, DIFFERENCE_COLUMN).unwrap_or(f64::NAN)
            );
        }
    }

    Ok(())
}

/// 20 features × 12 samples; the first 5 features are 6x higher in "treatment".
fn create_example_data() -> Result<(CountMatrix, MetadataColumn)> {
    let n_features = 20;
    let n_samples = 12;

    let mut seed = 7u64;
    let mut noise = || {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        0.8 + 0.4 * (((seed >> 16) & 0x7FFF) as f64 / 32768.0)
    };

    let rows: Vec<Vec<u64>> = (0..n_features)
        .map(|feat| {
            (0..n_samples)
                .map(|sample| {
                    let treated = sample >= n_samples / 2;
                    let mult = if feat < 5 && treated { 6.0 } else { 1.0 };
                    (200.0 * mult * noise()).round() as u64
                })
                .collect()
        })
        .collect();

    let feature_ids = (0..n_features).map(|i| format!("taxon_{}", i)).collect();
    let sample_ids: Vec<String> = (0..n_samples).map(|i| format!("sample_{}", i)).collect();
    let counts = CountMatrix::from_rows(&rows, feature_ids, sample_ids.clone())?;

    let labels = sample_ids
        .iter()
        .enumerate()
        .map(|(i, _)| Some(if i < n_samples / 2 { "control" } else { "treatment" }.to_string()))
        .collect();
    let condition = MetadataColumn::new("group", sample_ids, labels)?;

    Ok((counts, condition))
}
