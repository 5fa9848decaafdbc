//! Binary BCH over GF(2^m) (spec §4.B.4): same Berlekamp-Massey / Chien /
//! Forney machinery as [`crate::codec::rs`], but the generator is built from
//! the minimal polynomials of alpha^1, alpha^3, ..., alpha^(2t-1) rather
//! than their raw factors, and codeword bits are single GF(2) digits instead
//! of m-bit symbols.

use crate::codec::{Codec, DecodeResult, Outcome};
use crate::error::{EccSimError, Result};
use crate::gf::{self, GfElem, GfField, GfPoly};
use crate::layout::EccWord;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Bch {
    name: String,
    m: u32,
    bit_n: usize,
    bit_r: usize,
    sym_t: usize,
    field: Arc<GfField>,
    generator: GfPoly,
}

fn minimal_poly(field: &Arc<GfField>, alpha_power: u32, n: u32) -> (GfPoly, BTreeSet<u32>) {
    let mut conjugates = BTreeSet::new();
    let mut idx = alpha_power % n;
    loop {
        if conjugates.contains(&idx) {
            break;
        }
        conjugates.insert(idx);
        idx = (idx * 2) % n;
    }
    let one = GfElem::from_index(field, 0);
    let mut poly = GfPoly::from_coeffs(field, vec![one.clone()]);
    for &c in &conjugates {
        let alpha_c = GfElem::from_index(field, c);
        let term = GfPoly::from_coeffs(field, vec![alpha_c, one.clone()]);
        poly = poly.mul(&term);
    }
    (poly, conjugates)
}

impl Bch {
    pub fn new(name: &str, m: u32, bit_n: usize, design_t: usize) -> Result<Self> {
        let field = gf::field(m)?;
        let n = field.max_index;
        if bit_n == 0 || bit_n as u32 > n || design_t == 0 {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "BCH<{m}>: bitN={bit_n} designT={design_t} incompatible with field order {n}"
            )));
        }

        let mut used: BTreeSet<u32> = BTreeSet::new();
        let one = GfElem::from_index(&field, 0);
        let mut generator = GfPoly::from_coeffs(&field, vec![one]);
        let mut i = 1u32;
        while i < 2 * design_t as u32 {
            if !used.contains(&i) {
                let (mp, conjugates) = minimal_poly(&field, i, n);
                used.extend(conjugates);
                generator = generator.mul(&mp);
            }
            i += 2;
        }

        let bit_r = generator.degree().max(0) as usize;
        if bit_r >= bit_n {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "BCH<{m}>: generator degree {bit_r} leaves no data bits in bitN={bit_n}"
            )));
        }

        Ok(Bch {
            name: name.to_string(),
            m,
            bit_n,
            bit_r,
            sym_t: design_t,
            field,
            generator,
        })
    }

    fn bit_k(&self) -> usize {
        self.bit_n - self.bit_r
    }

    fn block_to_poly(&self, msg: &EccWord) -> GfPoly {
        let zero = GfElem::zero(&self.field);
        let one = GfElem::from_index(&self.field, 0);
        let coeffs: Vec<GfElem> = (0..self.bit_n)
            .map(|i| if msg.block.get_bit(i) { one.clone() } else { zero.clone() })
            .collect();
        GfPoly::from_coeffs(&self.field, coeffs)
    }

    fn syndromes(&self, recv: &GfPoly) -> Vec<GfElem> {
        (0..2 * self.sym_t)
            .map(|i| recv.eval_at_index((i as u32 + 1) % self.field.max_index))
            .collect()
    }

    fn berlekamp_massey(&self, syndromes: &[GfElem]) -> (GfPoly, usize) {
        let f = &self.field;
        let one = GfElem::from_index(f, 0);
        let mut c = GfPoly::from_coeffs(f, vec![one.clone()]);
        let mut b = GfPoly::from_coeffs(f, vec![one.clone()]);
        let mut l = 0usize;
        let mut m_shift = 1usize;
        let mut b_coef = one.clone();

        for n in 0..syndromes.len() {
            let mut delta = syndromes[n].clone();
            for i in 1..=l {
                delta = delta.add(&c.coeff(i).mul(&syndromes[n - i]));
            }
            if delta.is_zero() {
                m_shift += 1;
            } else if 2 * l <= n {
                let t = c.clone();
                let scale = delta.div(&b_coef);
                let shifted = b.shl(m_shift).mul_scalar(&scale);
                c.add_assign(&shifted);
                l = n + 1 - l;
                b = t;
                b_coef = delta;
                m_shift = 1;
            } else {
                let scale = delta.div(&b_coef);
                let shifted = b.shl(m_shift).mul_scalar(&scale);
                c.add_assign(&shifted);
                m_shift += 1;
            }
        }
        (c, l)
    }

    fn chien_search(&self, locator: &GfPoly) -> Vec<usize> {
        let f = &self.field;
        let mut roots = Vec::new();
        for i in 0..self.bit_n {
            let inv_index = (f.max_index - (i as u32 % f.max_index)) % f.max_index;
            if locator.eval_at_index(inv_index).is_zero() {
                roots.push(i);
            }
        }
        roots
    }

    fn formal_derivative(p: &GfPoly) -> GfPoly {
        if p.coeffs.len() <= 1 {
            return GfPoly::zero(&p.field);
        }
        let mut out = vec![GfElem::zero(&p.field); p.coeffs.len() - 1];
        let mut k = 1;
        while k < p.coeffs.len() {
            out[k - 1] = p.coeff(k);
            k += 2;
        }
        GfPoly::from_coeffs(&p.field, out)
    }

    fn forney(&self, syndrome_poly: &GfPoly, locator: &GfPoly, locations: &[usize]) -> Vec<GfElem> {
        let f = &self.field;
        let omega_full = syndrome_poly.mul(locator);
        let omega = GfPoly::from_coeffs(
            f,
            (0..2 * self.sym_t).map(|i| omega_full.coeff(i)).collect(),
        );
        let deriv = Self::formal_derivative(locator);
        locations
            .iter()
            .map(|&i| {
                let inv_index = (f.max_index - (i as u32 % f.max_index)) % f.max_index;
                let num = omega.eval_at_index(inv_index);
                let den = deriv.eval_at_index(inv_index);
                // A binary code's error value is always 1 (flip), but we
                // still run Forney so a nonzero denominator confirms the
                // root is a genuine, isolated error location.
                if den.is_zero() { GfElem::zero(f) } else { num.div(&den) }
            })
            .collect()
    }
}

impl Codec for Bch {
    fn name(&self) -> &str {
        &self.name
    }
    fn bit_n(&self) -> usize {
        self.bit_n
    }
    fn bit_k(&self) -> usize {
        self.bit_k()
    }

    fn encode(&self, data: &[bool]) -> EccWord {
        assert_eq!(data.len(), self.bit_k());
        let zero = GfElem::zero(&self.field);
        let one = GfElem::from_index(&self.field, 0);
        let msg_coeffs: Vec<GfElem> = data.iter().map(|&b| if b { one.clone() } else { zero.clone() }).collect();
        let shifted = GfPoly::from_coeffs(&self.field, msg_coeffs.clone()).shl(self.bit_r);
        let (_, remainder) = shifted.div_rem(&self.generator);

        let mut word = EccWord::new(self.bit_n, self.bit_k());
        for i in 0..self.bit_r {
            word.block.set_bit(i, !remainder.coeff(i).is_zero());
        }
        for (j, c) in msg_coeffs.iter().enumerate() {
            word.block.set_bit(self.bit_r + j, !c.is_zero());
        }
        word
    }

    fn decode(&self, msg: &EccWord) -> DecodeResult {
        let mut decoded = msg.clone();
        if msg.block.is_zero() {
            return DecodeResult { outcome: Outcome::Ne, decoded, corrected_positions: BTreeSet::new() };
        }

        let recv_poly = self.block_to_poly(msg);
        let syndromes = self.syndromes(&recv_poly);
        if syndromes.iter().all(|s| s.is_zero()) {
            return DecodeResult { outcome: Outcome::Sdc, decoded, corrected_positions: BTreeSet::new() };
        }

        let (locator, l) = self.berlekamp_massey(&syndromes);
        if l > self.sym_t {
            return DecodeResult { outcome: Outcome::Due, decoded, corrected_positions: BTreeSet::new() };
        }
        let locations = self.chien_search(&locator);
        if locations.len() != l || locations.iter().any(|&p| p >= self.bit_n) {
            return DecodeResult { outcome: Outcome::Due, decoded, corrected_positions: BTreeSet::new() };
        }

        let syndrome_poly = GfPoly::from_coeffs(&self.field, syndromes);
        let values = self.forney(&syndrome_poly, &locator, &locations);
        let mut corrected_positions = BTreeSet::new();
        for (loc, val) in locations.iter().zip(values.iter()) {
            if val.is_zero() {
                return DecodeResult { outcome: Outcome::Due, decoded, corrected_positions: BTreeSet::new() };
            }
            decoded.block.flip_bit(*loc);
            corrected_positions.insert(*loc);
        }
        let outcome = if decoded.block.is_zero() { Outcome::Ce } else { Outcome::Sdc };
        DecodeResult { outcome, decoded, corrected_positions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_error_decodes_ne() {
        let bch = Bch::new("BCH(15,7,t2)", 4, 15, 2).unwrap();
        let data = vec![false; bch.bit_k()];
        let word = bch.encode(&data);
        let res = bch.decode(&word);
        assert_eq!(res.outcome, Outcome::Ne);
    }

    #[test]
    fn single_bit_error_corrects() {
        let bch = Bch::new("BCH(15,7,t2)", 4, 15, 2).unwrap();
        let data = vec![true, false, true, false, true, false, true];
        for pos in 0..15 {
            let mut word = bch.encode(&data);
            word.block.flip_bit(pos);
            let res = bch.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce, "pos={pos}");
        }
    }

    #[test]
    fn double_bit_error_corrects_within_design_distance() {
        let bch = Bch::new("BCH(15,7,t2)", 4, 15, 2).unwrap();
        let data = vec![true, true, false, false, true, true, false];
        let mut word = bch.encode(&data);
        word.block.flip_bit(0);
        word.block.flip_bit(5);
        let res = bch.decode(&word);
        assert_eq!(res.outcome, Outcome::Ce);
    }
}
