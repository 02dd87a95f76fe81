//! On-disk session fixtures for the file-backed collaborator

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

fn write(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), value.to_string()).unwrap();
}

fn heatmap(rows: usize, cols: usize, extent: [f64; 4]) -> Value {
    let values: Vec<f64> = (0..rows * cols).map(|i| ((i * 7) % 11) as f64).collect();
    json!({"extent": extent, "rows": rows, "cols": cols, "values": values})
}

/// Regular spike train of one cluster over `[0, duration)`
fn train(period: f64, duration: f64, offset: f64) -> Vec<f64> {
    let n = ((duration - offset) / period) as usize;
    (0..n).map(|i| offset + i as f64 * period).collect()
}

/// Write a ten-second session with six trials and three clusters
///
/// Trials cover both stimulus sides, both blocks and a missing movement
/// time. With `optional` the heatmap and raw-trace files are written too.
pub fn write_raw_session(data_dir: &Path, session: &str, optional: bool) -> PathBuf {
    let dir = data_dir.join(session);
    fs::create_dir_all(&dir).unwrap();

    write(
        &dir,
        "session.json",
        &json!({
            "subject": "KS014", "lab": "cortexlab", "date": "2019-12-04",
            "probe": "probe00", "duration": 10.0,
            "regions": [
                {"acronym": "CA1", "depth_lo": 20.0, "depth_hi": 1500.0, "color": [126, 208, 75]},
                {"acronym": "VISa", "depth_lo": 1500.0, "depth_hi": 3840.0, "color": [8, 133, 140]}
            ]
        }),
    );

    let trials: Vec<Value> = (0..6u32)
        .map(|i| {
            let t0 = f64::from(i) * 1.5;
            let left = i % 2 == 0;
            let contrast = if i % 3 == 0 { 1.0 } else { 0.125 };
            let first_movement = (i != 4).then(|| t0 + 0.7 + 0.05 * f64::from(i));
            let (contrast_left, contrast_right) = if left {
                (Some(contrast), None)
            } else {
                (None, Some(contrast))
            };
            let choice = if left { -1 } else { 1 };
            let feedback_type = if i == 5 { -1 } else { 1 };
            let probability_left = if i < 3 { 0.8 } else { 0.2 };
            json!({
                "index": i, "t0": t0, "t1": t0 + 1.4,
                "stim_on": t0 + 0.5,
                "first_movement": first_movement,
                "feedback_time": t0 + 1.0,
                "contrast_left": contrast_left,
                "contrast_right": contrast_right,
                "choice": choice,
                "feedback_type": feedback_type,
                "probability_left": probability_left
            })
        })
        .collect();
    write(&dir, "trials.json", &Value::Array(trials));

    write(
        &dir,
        "clusters.json",
        &json!([
            {"index": 0, "depth": 300.0, "amp": 5e-5, "channel": 3, "brain_region": "CA1", "good": true,
             "waveform": [0.0, -2e-5, -6e-5, -1e-5, 3e-5, 1e-5, 0.0]},
            {"index": 1, "depth": 1800.0, "amp": 8e-5, "channel": 90, "brain_region": "VISa", "good": true},
            {"index": 2, "depth": 2600.0, "amp": 3e-5, "channel": 140, "brain_region": "VISa", "good": false}
        ]),
    );

    let mut times = Vec::new();
    let mut clusters = Vec::new();
    let mut amps = Vec::new();
    let mut depths = Vec::new();
    for (cluster, period, offset, amp, depth) in [
        (0u32, 0.013, 0.0, 5e-5, 300.0),
        (1, 0.029, 0.004, 8e-5, 1800.0),
        (2, 0.051, 0.011, 3e-5, 2600.0),
    ] {
        for t in train(period, 10.0, offset) {
            times.push(t);
            clusters.push(cluster);
            amps.push(amp);
            depths.push(depth);
        }
    }
    write(
        &dir,
        "spikes.json",
        &json!({"times": times, "clusters": clusters, "amps": amps, "depths": depths}),
    );

    if optional {
        write(&dir, "ap_rms.json", &heatmap(24, 10, [0.0, 10.0, 20.0, 3840.0]));
        write(&dir, "lfp_spectrum.json", &heatmap(24, 16, [0.0, 300.0, 20.0, 3840.0]));
        let snippets: Vec<Value> = (0..4)
            .map(|k| heatmap(32, 20, [f64::from(k), f64::from(k) + 0.05, 20.0, 3840.0]))
            .collect();
        write(&dir, "raw.json", &Value::Array(snippets));
    }
    dir
}
