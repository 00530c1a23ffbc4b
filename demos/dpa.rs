use anyhow::{Context, Result};
use keylift::attack::{AttackOptions, KEY_BYTES, KeyGuess, recover_key_with_progress};
use keylift::distinguishers::LeakageModel;
use keylift::shared::SharedMatrix;
use ndarray::Array2;
use ndarray_npy::read_npy;
use std::{env, path::PathBuf};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const ORANGE: &str = "\x1b[38;5;208m";
const LIGHT_GREEN: &str = "\x1b[38;5;154m";

// Known key of the capture campaign, for validating the recovery
const KEY: [u8; KEY_BYTES] = [
    0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c,
];

fn confidence_color(pct: f64) -> &'static str {
    if pct >= 80.0 {
        LIGHT_GREEN
    } else if pct >= 60.0 {
        GREEN
    } else if pct >= 40.0 {
        YELLOW
    } else if pct >= 20.0 {
        ORANGE
    } else {
        RED
    }
}

fn print_summary(result: &KeyGuess, key: &[u8; KEY_BYTES]) {
    println!("Byte | Guess | Correct | Status | Confidence | Second best");
    println!("-----+-------+---------+--------+------------+------------------------");

    for (i, byte) in result.byte_results().iter().enumerate() {
        let ok = byte.guess == key[i];
        let status = if ok {
            format!("{GREEN}OK {RESET}")
        } else {
            format!("{BOLD}{RED}NOK{RESET}")
        };

        let pct = byte.confidence * 100.0;
        let confidence = format!("{}{pct:6.2}%{RESET}", confidence_color(pct));

        if ok {
            println!(
                "{i:>4} |  0x{:02x} |    0x{:02x} |    {status} |    {confidence} |",
                byte.guess, key[i]
            );
        } else {
            println!(
                "{i:>4} |  0x{:02x} |    0x{:02x} |    {status} |    {confidence} | 0x{:02x} ({:.5} vs {:.5})",
                byte.guess, key[i], byte.second_best_guess, byte.second_best_score, byte.best_score
            );
        }
    }
}

fn main() -> Result<()> {
    let traces_dir =
        PathBuf::from(env::var("TRACES_DIR").context("Missing TRACES_DIR environment variable")?);

    let traces: Array2<f64> =
        read_npy(traces_dir.join("traces.npy")).context("Failed to read traces.npy")?;
    let plaintexts: Array2<u8> =
        read_npy(traces_dir.join("plaintexts.npy")).context("Failed to read plaintexts.npy")?;

    let traces = SharedMatrix::from_array(traces);
    let plaintexts = SharedMatrix::from_array(plaintexts);

    let result = recover_key_with_progress(
        &traces,
        &plaintexts,
        AttackOptions::new(LeakageModel::Dpa),
        |done| eprintln!("{done}/{KEY_BYTES} bytes"),
    )?;

    println!("Recovered key: {}", result.hex());
    println!();
    println!("=== DPA BYTE SUMMARY ===");
    print_summary(&result, &KEY);

    Ok(())
}
