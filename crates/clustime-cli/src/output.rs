//! Result export: labels, matrices, and a JSON run summary.
//!
//! These files are the boundary hand-off to external plotting and map
//! reconstruction; the pipeline itself consumes nothing back from them.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clustime_core::{PipelineOutput, SimilarityMatrix};
use serde_json::json;
use tracing::info;

/// Write every artifact of a finished run into `saving_dir`, file names
/// prefixed with `prefix`.
pub fn write_outputs(
    output: &PipelineOutput,
    saving_dir: &Path,
    prefix: &str,
) -> std::io::Result<()> {
    fs::create_dir_all(saving_dir)?;

    let labels_path = named(saving_dir, prefix, "labels.tsv");
    write_labels(output, &labels_path)?;

    let similarity_path = named(saving_dir, prefix, "similarity.tsv");
    write_matrix(&output.similarity, &similarity_path)?;

    if let Some(binarized) = &output.binarized {
        let binary_path = named(saving_dir, prefix, "binary.tsv");
        write_matrix(binarized, &binary_path)?;
    }

    let summary_path = named(saving_dir, prefix, "summary.json");
    write_summary(output, &summary_path)?;

    info!(dir = %saving_dir.display(), prefix, "outputs written");
    Ok(())
}

fn named(dir: &Path, prefix: &str, suffix: &str) -> PathBuf {
    if prefix.is_empty() {
        dir.join(suffix)
    } else {
        dir.join(format!("{prefix}_{suffix}"))
    }
}

/// One `time_index<TAB>label` pair per line, in index order.
fn write_labels(output: &PipelineOutput, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (&index, &label) in output.indexes.iter().zip(&output.labels) {
        writeln!(writer, "{index}\t{label}")?;
    }
    writer.flush()
}

/// Tab-separated matrix rows.
fn write_matrix(matrix: &SimilarityMatrix, path: &Path) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in matrix.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
        writeln!(writer, "{}", line.join("\t"))?;
    }
    writer.flush()
}

fn write_summary(output: &PipelineOutput, path: &Path) -> std::io::Result<()> {
    let mut distinct: Vec<i64> = output.labels.clone();
    distinct.sort_unstable();
    distinct.dedup();

    let timings: Vec<usize> = output.timings.iter().map(|(c, _)| c).collect();
    let summary = json!({
        "nscans": output.nscans,
        "retained_time_points": output.indexes.len(),
        "clusters": distinct.len(),
        "noise_points": output.labels.iter().filter(|&&l| l < 0).count(),
        "has_binary_matrix": output.binarized.is_some(),
        "timing_conditions": timings,
        "save_maps": output.save_maps,
    });
    fs::write(path, serde_json::to_string_pretty(&summary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clustime_core::{
        config::{Algorithm, ClustimeConfig},
        pipeline,
        signal::{SignalMatrix, TaskTimings},
    };

    fn sample_output() -> PipelineOutput {
        let rows: Vec<Vec<f32>> = (0..8)
            .map(|i| (0..4).map(|v| ((i * 4 + v) as f32).sin()).collect())
            .collect();
        let signal = SignalMatrix::from_rows(rows).unwrap();
        let config = ClustimeConfig::default()
            .with_algorithm(Algorithm::KMeans)
            .with_n_clusters(2);
        pipeline::run(signal, &config, TaskTimings::empty()).unwrap()
    }

    #[test]
    fn writes_labels_matrix_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let output = sample_output();
        write_outputs(&output, dir.path(), "run1").unwrap();

        let labels = fs::read_to_string(dir.path().join("run1_labels.tsv")).unwrap();
        assert_eq!(labels.lines().count(), 8);

        let matrix = fs::read_to_string(dir.path().join("run1_similarity.tsv")).unwrap();
        assert_eq!(matrix.lines().count(), 8);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("run1_summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["nscans"], 8);
        assert_eq!(summary["has_binary_matrix"], false);
    }

    #[test]
    fn empty_prefix_omits_underscore() {
        let dir = tempfile::tempdir().unwrap();
        write_outputs(&sample_output(), dir.path(), "").unwrap();
        assert!(dir.path().join("labels.tsv").exists());
    }
}
