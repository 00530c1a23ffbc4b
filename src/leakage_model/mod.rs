//! Leakage models mapping intermediate values to predicted leakage.

pub mod aes;

/// Hamming weight of a byte, between 0 and 8.
pub fn hw(value: u8) -> u8 {
    value.count_ones() as u8
}

/// Least significant bit of a byte, used as the DPA partition label.
pub fn lsb(value: u8) -> bool {
    value & 1 == 1
}
