//! Reed-Solomon over GF(2^m) (spec §4.B.1): encode, syndrome computation,
//! Berlekamp-Massey, Chien search, Forney's algorithm.

use crate::codec::{Codec, DecodeResult, Outcome};
use crate::error::{EccSimError, Result};
use crate::gf::{self, GfElem, GfField, GfPoly};
use crate::layout::EccWord;
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct Rs {
    name: String,
    pub m: u32,
    pub sym_n: usize,
    pub sym_r: usize,
    pub sym_t: usize,
    pub sym_b: usize,
    pub field: Arc<GfField>,
    pub generator: GfPoly,
}

impl Rs {
    /// `symT`/`symB` are independent parameters (spec §4.B.1: "Parameters:
    /// symN, symR, symT, symB"), not derived from `symR` — a scheme picks
    /// its own correction strength and burst-correction width.
    pub fn new(name: &str, m: u32, sym_n: usize, sym_r: usize, sym_t: usize, sym_b: usize) -> Result<Self> {
        let field = gf::field(m)?;
        if sym_n == 0 || sym_r >= sym_n || sym_n > field.max_index as usize {
            return Err(EccSimError::CodecShapeMismatch(format!(
                "RS<{}>: symN={} symR={} exceeds field capacity {}",
                m, sym_n, sym_r, field.max_index
            )));
        }
        let one = GfPoly::from_coeffs(&field, vec![GfElem::from_index(&field, 0)]);
        let mut g = one;
        for i in 1..=sym_r {
            let alpha_i = GfElem::from_index(&field, (i as u32) % field.max_index);
            let term = GfPoly::from_coeffs(&field, vec![alpha_i, GfElem::from_index(&field, 0)]);
            g = g.mul(&term);
        }
        Ok(Rs {
            name: name.to_string(),
            m,
            sym_n,
            sym_r,
            sym_t,
            sym_b,
            field,
            generator: g,
        })
    }

    fn sym_k(&self) -> usize {
        self.sym_n - self.sym_r
    }

    fn block_to_symbols(&self, data: &crate::layout::Block) -> Vec<GfElem> {
        (0..self.sym_n)
            .map(|j| GfElem::from_poly(&self.field, data.read_symbol(j, self.m as usize)))
            .collect()
    }

    fn syndromes(&self, recv: &[GfElem]) -> Vec<GfElem> {
        let poly = GfPoly::from_coeffs(&self.field, recv.to_vec());
        (0..self.sym_r)
            .map(|i| poly.eval_at_index((i as u32 + 1) % self.field.max_index))
            .collect()
    }

    /// Inversion-less Berlekamp-Massey. Returns (locator polynomial, L).
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

    /// Chien search: roots of `locator` among `alpha^-i` for i in [0, symN).
    /// Returns the error-location exponents found.
    fn chien_search(&self, locator: &GfPoly) -> Vec<usize> {
        let f = &self.field;
        let mut roots = Vec::new();
        for i in 0..self.sym_n {
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

    /// Forney's algorithm: error magnitude at each root location (given by
    /// its exponent, as returned from `chien_search`).
    fn forney(
        &self,
        syndrome_poly: &GfPoly,
        locator: &GfPoly,
        locations: &[usize],
    ) -> Vec<GfElem> {
        let f = &self.field;
        let omega_full = syndrome_poly.mul(locator);
        let omega = GfPoly::from_coeffs(
            f,
            (0..self.sym_r).map(|i| omega_full.coeff(i)).collect(),
        );
        let deriv = Self::formal_derivative(locator);
        locations
            .iter()
            .map(|&i| {
                let inv_index = (f.max_index - (i as u32 % f.max_index)) % f.max_index;
                let num = omega.eval_at_index(inv_index);
                let den = deriv.eval_at_index(inv_index);
                if den.is_zero() {
                    GfElem::zero(f)
                } else {
                    num.div(&den)
                }
            })
            .collect()
    }

    pub(crate) fn berlekamp_massey_pub(&self, syndromes: &[GfElem]) -> (GfPoly, usize) {
        self.berlekamp_massey(syndromes)
    }

    pub(crate) fn chien_search_pub(&self, locator: &GfPoly) -> Vec<usize> {
        self.chien_search(locator)
    }

    pub(crate) fn forney_pub(
        &self,
        syndrome_poly: &GfPoly,
        locator: &GfPoly,
        locations: &[usize],
    ) -> Vec<GfElem> {
        self.forney(syndrome_poly, locator, locations)
    }

    /// Burst-aligned correction path (spec §4.B.1, DUO64bx4): for each
    /// 4-symbol-aligned start position, solves the fixed 4x4 coefficient
    /// matrix against `S0..S3` directly rather than running Berlekamp-Massey,
    /// then accepts the candidate only if substituting the four recovered
    /// symbols back into the message clears every syndrome — this crate's
    /// `EccWord` carries no out-of-band DUO parity bit, so the original's
    /// `S4-S6` plus 15-bit parity check is expressed here as a full
    /// syndrome recheck, the same verify-before-accept shape. Only runs for
    /// codecs configured with a burst width (`symB >= 4`) and at least 7
    /// check symbols.
    fn try_correct_burst(&self, recv: &[GfElem], syndromes: &[GfElem]) -> Option<(Vec<usize>, Vec<GfElem>)> {
        if self.sym_b < 4 || self.sym_r < 7 {
            return None;
        }
        let f = &self.field;
        const COEFFS: [[u32; 4]; 4] = [
            [218, 505, 503, 212],
            [504, 225, 201, 499],
            [501, 200, 221, 497],
            [209, 497, 496, 206],
        ];

        let mut start = 0;
        while start + 4 <= self.sym_n {
            let shifted: Vec<GfElem> = (0..4)
                .map(|i| {
                    let denom = GfElem::from_index(f, (start as u32 * (i as u32 + 1)) % f.max_index);
                    syndromes[i].div(&denom)
                })
                .collect();

            let errors: Vec<GfElem> = COEFFS
                .iter()
                .map(|row| {
                    row.iter().zip(shifted.iter()).fold(GfElem::zero(f), |acc, (&c, s)| {
                        acc.add(&s.mul(&GfElem::from_index(f, c % f.max_index)))
                    })
                })
                .collect();

            if !errors.iter().all(|e| e.is_zero()) {
                let mut candidate = recv.to_vec();
                for (i, e) in errors.iter().enumerate() {
                    candidate[start + i] = candidate[start + i].add(e);
                }
                if self.syndromes(&candidate).iter().all(|s| s.is_zero()) {
                    return Some(((start..start + 4).collect(), errors));
                }
            }
            start += 4;
        }
        None
    }

    /// Runs BM + Chien + Forney against `recv`. Falls back to the
    /// burst-aligned path (spec §4.B.1) when the primary path can't locate
    /// a correction and this codec is configured with burst width. Returns
    /// `None` on DUE.
    pub(crate) fn try_correct(&self, recv: &[GfElem]) -> Option<(Vec<usize>, Vec<GfElem>)> {
        let syndromes = self.syndromes(recv);
        if syndromes.iter().all(|s| s.is_zero()) {
            return Some((Vec::new(), Vec::new()));
        }
        let (locator, l) = self.berlekamp_massey(&syndromes);
        if l > self.sym_t {
            return self.try_correct_burst(recv, &syndromes);
        }
        let locations = self.chien_search(&locator);
        if locations.len() != l || locations.iter().any(|&loc| loc >= self.sym_n) {
            return self.try_correct_burst(recv, &syndromes);
        }
        let syndrome_poly = GfPoly::from_coeffs(&self.field, syndromes);
        let values = self.forney(&syndrome_poly, &locator, &locations);
        Some((locations, values))
    }
}

impl Codec for Rs {
    fn name(&self) -> &str {
        &self.name
    }

    fn bit_n(&self) -> usize {
        self.sym_n * self.m as usize
    }

    fn bit_k(&self) -> usize {
        self.sym_k() * self.m as usize
    }

    fn encode(&self, data: &[bool]) -> EccWord {
        assert_eq!(data.len(), self.bit_k(), "RS encode: message length mismatch");
        let mut msg_block = crate::layout::Block::new(self.sym_k() * self.m as usize);
        for (i, &b) in data.iter().enumerate() {
            msg_block.set_bit(i, b);
        }
        let msg_symbols: Vec<GfElem> = (0..self.sym_k())
            .map(|j| GfElem::from_poly(&self.field, msg_block.read_symbol(j, self.m as usize)))
            .collect();
        // Message occupies the high-order coefficients x^symR..x^symN-1;
        // parity (the remainder mod g(x)) occupies x^0..x^symR-1.
        let shifted = GfPoly::from_coeffs(&self.field, msg_symbols.clone()).shl(self.sym_r);
        let (_, remainder) = shifted.div_rem(&self.generator);

        let mut word = EccWord::new(self.bit_n(), self.bit_k());
        for i in 0..self.sym_r {
            word.block.write_symbol(i, self.m as usize, remainder.coeff(i).poly());
        }
        for (j, sym) in msg_symbols.iter().enumerate() {
            word.block.write_symbol(self.sym_r + j, self.m as usize, sym.poly());
        }
        word
    }

    fn decode(&self, msg: &EccWord) -> DecodeResult {
        let recv = self.block_to_symbols(&msg.block);
        let mut decoded = msg.clone();
        let mut corrected_positions = BTreeSet::new();

        match self.try_correct(&recv) {
            None => DecodeResult {
                outcome: Outcome::Due,
                decoded,
                corrected_positions,
            },
            Some((locations, values)) if locations.is_empty() => {
                let outcome = if msg.block.is_zero() { Outcome::Ne } else { Outcome::Sdc };
                DecodeResult {
                    outcome,
                    decoded,
                    corrected_positions,
                }
            }
            Some((locations, values)) => {
                for (loc, val) in locations.iter().zip(values.iter()) {
                    let cur = decoded.block.read_symbol(*loc, self.m as usize);
                    let fixed = cur ^ val.poly();
                    decoded.block.write_symbol(*loc, self.m as usize, fixed);
                    corrected_positions.insert(*loc);
                }
                let outcome = if decoded.block.is_zero() { Outcome::Ce } else { Outcome::Sdc };
                DecodeResult {
                    outcome,
                    decoded,
                    corrected_positions,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn flip_symbol(word: &mut EccWord, m: usize, pos: usize, delta: u32) {
        let cur = word.block.read_symbol(pos, m);
        word.block.write_symbol(pos, m, cur ^ delta);
    }

    #[test]
    fn no_error_decodes_ne() {
        let rs = Rs::new("RS8,4", 8, 8, 4, 2, 0).unwrap();
        let data = vec![false; rs.bit_k()];
        let word = rs.encode(&data);
        let res = rs.decode(&word);
        assert_eq!(res.outcome, Outcome::Ne);
    }

    #[test]
    fn single_symbol_error_always_corrects() {
        let rs = Rs::new("RS8,4", 8, 8, 4, 2, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let mut word = EccWord::new(rs.bit_n(), rs.bit_k());
            let pos = rng.gen_range(0..rs.sym_n);
            let delta = rng.gen_range(1..255u32);
            flip_symbol(&mut word, rs.m as usize, pos, delta);
            let res = rs.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce, "pos={pos} delta={delta}");
        }
    }

    #[test]
    fn double_symbol_error_corrects_with_t_ge_2() {
        let rs = Rs::new("RS8,4", 8, 8, 4, 2, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut word = EccWord::new(rs.bit_n(), rs.bit_k());
            let p1 = rng.gen_range(0..rs.sym_n);
            let mut p2 = rng.gen_range(0..rs.sym_n);
            while p2 == p1 {
                p2 = rng.gen_range(0..rs.sym_n);
            }
            flip_symbol(&mut word, rs.m as usize, p1, rng.gen_range(1..255u32));
            flip_symbol(&mut word, rs.m as usize, p2, rng.gen_range(1..255u32));
            let res = rs.decode(&word);
            assert_eq!(res.outcome, Outcome::Ce);
        }
    }

    #[test]
    fn too_many_errors_reports_due_or_sdc_never_silently_wrong() {
        let rs = Rs::new("RS8,4", 8, 8, 4, 2, 0).unwrap();
        let mut word = EccWord::new(rs.bit_n(), rs.bit_k());
        for pos in 0..rs.sym_n {
            flip_symbol(&mut word, rs.m as usize, pos, 0xAB);
        }
        let res = rs.decode(&word);
        assert!(matches!(res.outcome, Outcome::Due | Outcome::Sdc));
    }

    #[test]
    fn burst_path_corrects_when_bm_has_no_budget() {
        // symT=0 means the primary Berlekamp-Massey path never accepts any
        // correction; with symB=4 set, every error must clear through the
        // burst-aligned fallback instead.
        let rs = Rs::new("burst-only", 8, 36, 12, 0, 4).unwrap();
        let mut word = EccWord::new(rs.bit_n(), rs.bit_k());
        flip_symbol(&mut word, rs.m as usize, 2, 0x5A);
        let res = rs.decode(&word);
        assert_eq!(res.outcome, Outcome::Ce);
        assert!(res.corrected_positions.contains(&2));
    }
}
