//! CRC-8 and CRC-16 codecs (spec §4.B.5). Detection-only by default; when
//! `enable_1bitfix` is set, a precomputed syndrome-to-position table lets a
//! single-bit error be corrected the way a parity-check matrix would,
//! without building one explicitly.

use crate::codec::{Codec, DecodeResult, Outcome};
use crate::error::{EccSimError, Result};
use crate::layout::EccWord;
use std::collections::{BTreeSet, HashMap};

/// CRC-8/ATM: x^8 + x^7 + x^6 + x^3 + x^2 + x + 1.
pub const CRC8_ATM_POLY: u32 = 0xCF;
pub const CRC8_ATM_DEGREE: u32 = 8;

/// x^16 + x^14 + x^12 + x^11 + x^8 + x^5 + x^4 + x^2 + 1.
pub const CRC16_POLY: u32 = 0x5935;
pub const CRC16_DEGREE: u32 = 16;

fn crc_remainder(bits: impl Iterator<Item = bool>, generator_low: u32, degree: u32) -> u32 {
    let mask = (1u32 << degree) - 1;
    let mut reg: u32 = 0;
    for bit in bits {
        let top = (reg >> (degree - 1)) & 1 == 1;
        reg = ((reg << 1) | (bit as u32)) & mask;
        if top {
            reg ^= generator_low & mask;
        }
    }
    reg
}

pub struct Crc {
    name: String,
    generator_low: u32,
    degree: u32,
    bit_n: usize,
    enable_1bitfix: bool,
    syndrome_to_pos: HashMap<u32, usize>,
}

impl Crc {
    pub fn new(
        name: &str,
        generator_low: u32,
        degree: u32,
        bit_n: usize,
        enable_1bitfix: bool,
    ) -> Result<Self> {
        if bit_n <= degree as usize {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "{name}: bitN={bit_n} must exceed CRC degree {degree}"
            )));
        }
        let mut syndrome_to_pos = HashMap::new();
        if enable_1bitfix {
            for pos in 0..bit_n {
                let syn = crc_remainder(
                    (0..bit_n).map(|i| i == pos),
                    generator_low,
                    degree,
                );
                // A collision means two single-bit errors are
                // indistinguishable; keep only the first so lookups stay a
                // conservative correction, never a guess between two.
                syndrome_to_pos.entry(syn).or_insert(pos);
            }
        }
        Ok(Crc {
            name: name.to_string(),
            generator_low,
            degree,
            bit_n,
            enable_1bitfix,
            syndrome_to_pos,
        })
    }

    pub fn crc8_atm(name: &str, bit_n: usize, enable_1bitfix: bool) -> Result<Self> {
        Self::new(name, CRC8_ATM_POLY, CRC8_ATM_DEGREE, bit_n, enable_1bitfix)
    }

    pub fn crc16(name: &str, bit_n: usize, enable_1bitfix: bool) -> Result<Self> {
        Self::new(name, CRC16_POLY, CRC16_DEGREE, bit_n, enable_1bitfix)
    }
}

impl Codec for Crc {
    fn name(&self) -> &str {
        &self.name
    }
    fn bit_n(&self) -> usize {
        self.bit_n
    }
    fn bit_k(&self) -> usize {
        self.bit_n - self.degree as usize
    }

    fn encode(&self, data: &[bool]) -> EccWord {
        assert_eq!(data.len(), self.bit_k());
        let degree = self.degree as usize;
        let padded = data.iter().copied().chain(std::iter::repeat(false).take(degree));
        let remainder = crc_remainder(padded, self.generator_low, self.degree);

        let mut word = EccWord::new(self.bit_n, self.bit_k());
        for (i, &b) in data.iter().enumerate() {
            word.block.set_bit(i, b);
        }
        for i in 0..degree {
            let bit = (remainder >> (degree - 1 - i)) & 1 == 1;
            word.block.set_bit(data.len() + i, bit);
        }
        word
    }

    fn decode(&self, msg: &EccWord) -> DecodeResult {
        let decoded = msg.clone();
        if msg.block.is_zero() {
            return DecodeResult { outcome: Outcome::Ne, decoded, corrected_positions: BTreeSet::new() };
        }

        let bits: Vec<bool> = (0..self.bit_n).map(|i| msg.block.get_bit(i)).collect();
        let syndrome = crc_remainder(bits.into_iter(), self.generator_low, self.degree);

        // CRC is detection-only by nature: a zero syndrome is NE even on a
        // nonzero word, since an undetected error is indistinguishable from
        // no error at all from the codec's point of view.
        if syndrome == 0 {
            return DecodeResult { outcome: Outcome::Ne, decoded, corrected_positions: BTreeSet::new() };
        }

        if self.enable_1bitfix {
            if let Some(&pos) = self.syndrome_to_pos.get(&syndrome) {
                let mut fixed = decoded;
                fixed.block.flip_bit(pos);
                let outcome = if fixed.block.is_zero() { Outcome::Ce } else { Outcome::Sdc };
                let mut corrected_positions = BTreeSet::new();
                corrected_positions.insert(pos);
                return DecodeResult { outcome, decoded: fixed, corrected_positions };
            }
        }
        DecodeResult { outcome: Outcome::Due, decoded, corrected_positions: BTreeSet::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_error_decodes_ne() {
        let crc = Crc::crc8_atm("CRC8-ATM", 72, false).unwrap();
        let data = vec![false; crc.bit_k()];
        let word = crc.encode(&data);
        assert_eq!(crc.decode(&word).outcome, Outcome::Ne);
    }

    #[test]
    fn detection_only_never_reports_ce() {
        let crc = Crc::crc8_atm("CRC8-ATM", 72, false).unwrap();
        let mut data = vec![false; crc.bit_k()];
        data[3] = true;
        let mut word = crc.encode(&data);
        word.block.flip_bit(10);
        let res = crc.decode(&word);
        assert_ne!(res.outcome, Outcome::Ce);
    }

    #[test]
    fn triple_bit_error_never_silently_ce() {
        let crc = Crc::crc8_atm("CRC8-ATM", 72, true).unwrap();
        let mut data = vec![false; crc.bit_k()];
        data[1] = true;
        data[40] = true;
        let mut word = crc.encode(&data);
        word.block.flip_bit(2);
        word.block.flip_bit(15);
        word.block.flip_bit(33);
        let res = crc.decode(&word);
        assert!(matches!(res.outcome, Outcome::Due | Outcome::Sdc));
    }

    #[test]
    fn single_bit_error_corrects_when_enabled() {
        let crc = Crc::crc8_atm("CRC8-ATM", 72, true).unwrap();
        let data = vec![true, false, true, true, false].into_iter().cycle().take(crc.bit_k()).collect::<Vec<_>>();
        for pos in 0..72 {
            let mut word = crc.encode(&data);
            word.block.flip_bit(pos);
            let res = crc.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce, "pos={pos}");
        }
    }
}
