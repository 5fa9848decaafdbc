//! Binary linear codecs: generic SEC and Hsiao SECDED (spec §4.B.3).
//!
//! Both share one H/G-matrix representation; Hsiao differs from SEC only in
//! appending one more check row that forces every column to odd weight,
//! turning single-error-correction into single-error-correct/double-error-
//! detect (spec: "Hsiao additionally uses odd column-weight to distinguish
//! single vs double errors").

use crate::codec::{Codec, DecodeResult, Outcome};
use crate::error::{EccSimError, Result};
use crate::layout::{Block, EccWord};
use std::collections::BTreeSet;

pub struct BinaryLinear {
    name: String,
    bit_n: usize,
    bit_k: usize,
    bit_r: usize,
    hamming_rows: usize,
    secded: bool,
    /// `columns[j]` is the H-matrix column for codeword position `j`,
    /// `bit_r` bits, row-major.
    columns: Vec<Vec<u8>>,
    data_positions: Vec<usize>,
}

impl BinaryLinear {
    fn new(name: &str, bit_n: usize, bit_k: usize, secded: bool) -> Result<Self> {
        let bit_r = bit_n - bit_k;
        if bit_r == 0 {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "{name}: bitR must be > 0"
            )));
        }
        let hamming_rows = if secded { bit_r - 1 } else { bit_r };
        let hamming_capacity = (1usize << hamming_rows) - 1;
        let hamming_covered = if secded { bit_n - 1 } else { bit_n };
        if hamming_covered > hamming_capacity {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "{name}: {hamming_covered} positions need more than {hamming_rows} Hamming check bits"
            )));
        }

        let mut columns = vec![vec![0u8; bit_r]; bit_n];
        let mut data_positions = Vec::with_capacity(bit_k);
        let mut label = 1usize; // 1-based Hamming column label
        for j in 0..hamming_covered {
            for i in 0..hamming_rows {
                columns[j][i] = ((label >> i) & 1) as u8;
            }
            if !label.is_power_of_two() {
                data_positions.push(j);
            }
            label += 1;
        }
        if secded {
            // The last position is dedicated to the extra parity check:
            // zero Hamming part, weight 1 in the extra row alone.
            columns[bit_n - 1][hamming_rows] = 1;
            for j in 0..hamming_covered {
                let weight: u32 = columns[j][..hamming_rows].iter().map(|&b| b as u32).sum();
                columns[j][hamming_rows] = (weight % 2 == 0) as u8;
            }
        }
        assert_eq!(data_positions.len(), bit_k, "Hamming construction produced the wrong data-bit count");

        Ok(BinaryLinear {
            name: name.to_string(),
            bit_n,
            bit_k,
            bit_r,
            hamming_rows,
            secded,
            columns,
            data_positions,
        })
    }

    pub fn sec(name: &str, bit_n: usize, bit_k: usize) -> Result<Self> {
        Self::new(name, bit_n, bit_k, false)
    }

    pub fn hsiao(name: &str, bit_n: usize, bit_k: usize) -> Result<Self> {
        Self::new(name, bit_n, bit_k, true)
    }

    fn parity_positions(&self) -> Vec<usize> {
        (0..self.bit_n)
            .filter(|j| !self.data_positions.contains(j) && !(self.secded && *j == self.bit_n - 1))
            .collect()
    }

    fn syndrome(&self, word: &Block) -> Vec<u8> {
        let mut syn = vec![0u8; self.bit_r];
        for j in 0..self.bit_n {
            if !word.get_bit(j) {
                continue;
            }
            for i in 0..self.bit_r {
                syn[i] ^= self.columns[j][i];
            }
        }
        syn
    }
}

impl Codec for BinaryLinear {
    fn name(&self) -> &str {
        &self.name
    }
    fn bit_n(&self) -> usize {
        self.bit_n
    }
    fn bit_k(&self) -> usize {
        self.bit_k
    }

    fn encode(&self, data: &[bool]) -> EccWord {
        assert_eq!(data.len(), self.bit_k);
        let mut word = EccWord::new(self.bit_n, self.bit_k);
        for (k, &pos) in self.data_positions.iter().enumerate() {
            word.block.set_bit(pos, data[k]);
        }
        for hp in self.parity_positions() {
            let row = self.columns[hp].iter().position(|&b| b == 1).unwrap();
            let mut v = false;
            for &dp in &self.data_positions {
                if self.columns[dp][row] == 1 {
                    v ^= word.block.get_bit(dp);
                }
            }
            word.block.set_bit(hp, v);
        }
        if self.secded {
            let extra_row = self.hamming_rows;
            let last = self.bit_n - 1;
            let mut v = false;
            for j in 0..self.bit_n {
                if j == last {
                    continue;
                }
                if self.columns[j][extra_row] == 1 {
                    v ^= word.block.get_bit(j);
                }
            }
            word.block.set_bit(last, v);
        }
        word
    }

    fn decode(&self, msg: &EccWord) -> DecodeResult {
        let mut decoded = msg.clone();
        if msg.block.is_zero() {
            return DecodeResult {
                outcome: Outcome::Ne,
                decoded,
                corrected_positions: BTreeSet::new(),
            };
        }

        let syn = self.syndrome(&msg.block);
        if syn.iter().all(|&b| b == 0) {
            return DecodeResult {
                outcome: Outcome::Sdc,
                decoded,
                corrected_positions: BTreeSet::new(),
            };
        }

        let hamming_value: usize = (0..self.hamming_rows)
            .map(|i| (syn[i] as usize) << i)
            .sum();

        if !self.secded {
            if hamming_value == 0 || hamming_value > self.bit_n {
                return DecodeResult {
                    outcome: Outcome::Due,
                    decoded,
                    corrected_positions: BTreeSet::new(),
                };
            }
            let pos = hamming_value - 1;
            decoded.block.flip_bit(pos);
            let outcome = if decoded.block.is_zero() { Outcome::Ce } else { Outcome::Sdc };
            let mut corrected_positions = BTreeSet::new();
            corrected_positions.insert(pos);
            return DecodeResult {
                outcome,
                decoded,
                corrected_positions,
            };
        }

        // Hsiao: a syndrome that matches some column of H exactly (Hamming
        // part AND the extra parity bit) is a single-bit error; anything
        // else means two errors occurred (odd column weight guarantees a
        // double-bit syndrome never equals a single valid column).
        if hamming_value == 0 || hamming_value > self.bit_n {
            return DecodeResult {
                outcome: Outcome::Due,
                decoded,
                corrected_positions: BTreeSet::new(),
            };
        }
        let candidate = hamming_value - 1;
        let matches = self.columns[candidate] == syn;
        if matches {
            decoded.block.flip_bit(candidate);
            let outcome = if decoded.block.is_zero() { Outcome::Ce } else { Outcome::Sdc };
            let mut corrected_positions = BTreeSet::new();
            corrected_positions.insert(candidate);
            DecodeResult {
                outcome,
                decoded,
                corrected_positions,
            }
        } else {
            DecodeResult {
                outcome: Outcome::Due,
                decoded,
                corrected_positions: BTreeSet::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sec_single_bit_flip_corrects() {
        let sec = BinaryLinear::sec("SEC(13,9)", 13, 9).unwrap();
        for pos in 0..13 {
            let mut word = EccWord::new(13, 9);
            word.block.flip_bit(pos);
            let res = sec.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce, "pos={pos}");
        }
    }

    #[test]
    fn hsiao_single_bit_always_ce() {
        let hsiao = BinaryLinear::hsiao("Hsiao(72,64)", 72, 64).unwrap();
        for pos in 0..72 {
            let mut word = EccWord::new(72, 64);
            word.block.flip_bit(pos);
            let res = hsiao.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce, "pos={pos}");
        }
    }

    #[test]
    fn hsiao_double_bit_never_ce() {
        let hsiao = BinaryLinear::hsiao("Hsiao(72,64)", 72, 64).unwrap();
        for p1 in 0..72 {
            let p2 = (p1 + 1) % 72;
            let mut word = EccWord::new(72, 64);
            word.block.flip_bit(p1);
            word.block.flip_bit(p2);
            let res = hsiao.decode(&word);
            assert_ne!(res.outcome, Outcome::Ce, "p1={p1} p2={p2}");
        }
    }

    #[test]
    fn encode_decode_roundtrip_is_ne() {
        let hsiao = BinaryLinear::hsiao("Hsiao(72,64)", 72, 64).unwrap();
        let data = vec![true, false, true, true, false, false, true, false]
            .into_iter()
            .cycle()
            .take(64)
            .collect::<Vec<_>>();
        let word = hsiao.encode(&data);
        let res = hsiao.decode(&word);
        assert_eq!(res.outcome, Outcome::Ne);
    }
}
