//! Reed-Solomon dual erasure+error decoding (spec §4.B.2).

use crate::codec::rs::Rs;
use crate::codec::{Codec, DecodeResult, Outcome};
use crate::error::Result;
use crate::gf::{GfElem, GfPoly};
use crate::layout::EccWord;
use std::collections::BTreeSet;

pub struct RsDual {
    pub rs: Rs,
}

impl RsDual {
    pub fn new(name: &str, m: u32, sym_n: usize, sym_r: usize, sym_t: usize) -> Result<Self> {
        Ok(RsDual {
            // The dual decoder's erasure-aided path above is self-contained;
            // the inner codec's own burst path (symB) stays off since a
            // caller here always supplies an erasure list instead.
            rs: Rs::new(name, m, sym_n, sym_r, sym_t, 0)?,
        })
    }

    /// Decodes `msg` given a list of symbol positions already known to be
    /// erased. Correction capability: `2L + |erasures| <= symR` (spec
    /// §4.B.2); beyond that, DUE. On success, flags SDC iff a corrected
    /// symbol outside the erasure set also changed value (a genuine,
    /// unexpected error rather than a known erasure), distinguishing
    /// real chip-level erasures from accidental matches.
    pub fn decode_with_erasures(&self, msg: &EccWord, erasures: &[usize]) -> DecodeResult {
        let f = &self.rs.field;
        let m = self.rs.m as usize;
        let recv: Vec<GfElem> = (0..self.rs.sym_n)
            .map(|j| GfElem::from_poly(f, msg.block.read_symbol(j, m)))
            .collect();

        let erasure_set: BTreeSet<usize> = erasures.iter().copied().collect();
        if 2 * 0 + erasure_set.len() > self.rs.sym_r {
            // Even zero errors cannot be covered by this many erasures.
            return DecodeResult {
                outcome: Outcome::Due,
                decoded: msg.clone(),
                corrected_positions: BTreeSet::new(),
            };
        }

        // Erasure locator polynomial Gamma(x) = prod (1 + alpha^e x).
        let one = GfElem::from_index(f, 0);
        let mut gamma = GfPoly::from_coeffs(f, vec![one.clone()]);
        for &e in &erasure_set {
            let alpha_e = GfElem::from_index(f, (e as u32) % f.max_index);
            let term = GfPoly::from_coeffs(f, vec![one.clone(), alpha_e]);
            gamma = gamma.mul(&term);
        }

        let syndromes = {
            let poly = GfPoly::from_coeffs(f, recv.clone());
            (0..self.rs.sym_r)
                .map(|i| poly.eval_at_index((i as u32 + 1) % f.max_index))
                .collect::<Vec<_>>()
        };
        if syndromes.iter().all(|s| s.is_zero()) {
            let outcome = if msg.block.is_zero() { Outcome::Ne } else { Outcome::Sdc };
            return DecodeResult {
                outcome,
                decoded: msg.clone(),
                corrected_positions: BTreeSet::new(),
            };
        }

        // Modified syndrome polynomial T = S * Gamma mod x^symR.
        let syndrome_poly = GfPoly::from_coeffs(f, syndromes.clone());
        let modified = syndrome_poly.mul(&gamma);
        let t_syms: Vec<GfElem> = (0..self.rs.sym_r).map(|i| modified.coeff(i)).collect();

        let (sigma, l) = self.berlekamp_massey_from(&t_syms);
        if 2 * l + erasure_set.len() > self.rs.sym_r {
            return DecodeResult {
                outcome: Outcome::Due,
                decoded: msg.clone(),
                corrected_positions: BTreeSet::new(),
            };
        }

        let combined = sigma.mul(&gamma);
        let locations = self.rs.chien_search_pub(&combined);
        if locations.len() != l + erasure_set.len() || locations.iter().any(|&p| p >= self.rs.sym_n) {
            return DecodeResult {
                outcome: Outcome::Due,
                decoded: msg.clone(),
                corrected_positions: BTreeSet::new(),
            };
        }

        let values = self.rs.forney_pub(&syndrome_poly, &combined, &locations);
        let mut decoded = msg.clone();
        let mut corrected_positions = BTreeSet::new();
        let mut spurious_error = false;
        for (loc, val) in locations.iter().zip(values.iter()) {
            let cur = decoded.block.read_symbol(*loc, m);
            let fixed = cur ^ val.poly();
            if fixed != cur && !erasure_set.contains(loc) {
                spurious_error = true;
            }
            decoded.block.write_symbol(*loc, m, fixed);
            corrected_positions.insert(*loc);
        }

        let outcome = if spurious_error {
            Outcome::Sdc
        } else if decoded.block.is_zero() {
            Outcome::Ce
        } else {
            Outcome::Sdc
        };
        DecodeResult {
            outcome,
            decoded,
            corrected_positions,
        }
    }

    fn berlekamp_massey_from(&self, syndromes: &[GfElem]) -> (GfPoly, usize) {
        self.rs.berlekamp_massey_pub(syndromes)
    }
}

impl Codec for RsDual {
    fn name(&self) -> &str {
        self.rs.name()
    }
    fn bit_n(&self) -> usize {
        self.rs.bit_n()
    }
    fn bit_k(&self) -> usize {
        self.rs.bit_k()
    }
    fn encode(&self, data: &[bool]) -> EccWord {
        self.rs.encode(data)
    }
    fn decode(&self, msg: &EccWord) -> DecodeResult {
        // Without an erasure list, dual decode degrades to plain RS decode.
        self.rs.decode(msg)
    }
}
