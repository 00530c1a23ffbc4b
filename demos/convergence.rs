use anyhow::{Context, Result};
use gnuplot::{Figure, PlotOption::Caption};
use keylift::convergence::convergence;
use keylift::distinguishers::LeakageModel;
use ndarray::Array2;
use ndarray_npy::read_npy;
use std::{env, path::PathBuf};

fn main() -> Result<()> {
    let traces_dir =
        PathBuf::from(env::var("TRACES_DIR").context("Missing TRACES_DIR environment variable")?);
    let byte_index: usize = env::var("BYTE_INDEX")
        .unwrap_or_else(|_| "0".to_string())
        .parse()
        .context("BYTE_INDEX must be an integer")?;

    let traces: Array2<f64> =
        read_npy(traces_dir.join("traces.npy")).context("Failed to read traces.npy")?;
    let plaintexts: Array2<u8> =
        read_npy(traces_dir.join("plaintexts.npy")).context("Failed to read plaintexts.npy")?;
    assert_eq!(traces.shape()[0], plaintexts.shape()[0]);

    let result = convergence(
        traces.view(),
        plaintexts.view(),
        byte_index,
        LeakageModel::Cpa,
        10,
        5,
    );

    // Plot every guess's score against the number of traces used
    let mut fg = Figure::new();
    let axes = fg.axes2d();
    for guess in 0..256 {
        let caption = format!("0x{guess:02x}");
        axes.lines(
            &result.trace_counts,
            result.scores.row(guess),
            &[Caption(&caption)],
        );
    }
    fg.show()?;

    Ok(())
}
