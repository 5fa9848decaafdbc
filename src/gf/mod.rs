// Copyright (c) 2024, The project authors.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//     * Redistributions of source code must retain the above copyright
//       notice, this list of conditions and the following disclaimer.
//
//     * Redistributions in binary form must reproduce the above
//       copyright notice, this list of conditions and the following disclaimer
//       in the documentation and/or other materials provided with the
//       distribution.
//
//     * Neither the name of the copyright holder nor the names of its
//       contributors may be used to endorse or promote products derived from
//       this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Galois field GF(2^m) arithmetic (spec §4.A).
//!
//! Two representations per element, matching the original `gf.hh`/`gf.cc`:
//! an `Index` (power of the field's primitive element α, with `2^m - 1`
//! reserved for the zero element) and a `Poly` (bit-vector of coefficients).
//! Tables translating between the two are built once per field size and
//! shared by reference thereafter (spec §5: "GF tables are immutable after
//! construction and can be shared by reference").

use crate::error::{EccSimError, Result};
use std::sync::Arc;
use std::sync::OnceLock;

pub type Index = u32;
pub type Poly = u32;

/// Hard-coded primitive polynomials for m in {1..10, 16}, from the reference
/// implementation's `GF::pickPrimitivePoly`.
fn primitive_poly(m: u32) -> Option<Poly> {
    Some(match m {
        1 => 0x3,
        2 => 0x7,
        3 => 0xB,
        4 => 0x13,
        5 => 0x25,
        6 => 0x43,
        7 => 0x83,
        8 => 0x11D,
        9 => 0x211,
        10 => 0x409,
        16 => 0x1100B,
        _ => return None,
    })
}

/// Precomputed index<->poly tables for one field size. Built once, shared
/// by `Arc` across every `GFElem`/`GFPoly` value of that field size.
pub struct GfField {
    pub m: u32,
    pub primitive_poly: Poly,
    pub max_index: Index,
    index2poly: Vec<Poly>,
    poly2index: Vec<Index>,
}

impl GfField {
    fn build(m: u32) -> Result<Self> {
        let primitive_poly = primitive_poly(m).ok_or(EccSimError::UnsupportedField(m))?;
        let size = 1usize << m;
        let max_index = (size - 1) as Index;
        let mut index2poly = vec![0 as Poly; size];
        let mut poly2index = vec![0 as Index; size];

        index2poly[0] = 1;
        poly2index[1] = 0;
        let mut p: Poly = 1;
        for i in 1..(size - 1) {
            p <<= 1;
            if p & (size as Poly) != 0 {
                p ^= primitive_poly;
            }
            index2poly[i] = p;
            poly2index[p as usize] = i as Index;
        }
        // The zero element has no finite power of alpha; it is addressed by
        // the sentinel index `max_index` and maps to poly value 0.
        index2poly[size - 1] = 0;
        poly2index[0] = max_index;

        Ok(GfField {
            m,
            primitive_poly,
            max_index,
            index2poly,
            poly2index,
        })
    }

    #[inline]
    pub fn index2poly(&self, index: Index) -> Poly {
        self.index2poly[index as usize]
    }

    #[inline]
    pub fn poly2index(&self, poly: Poly) -> Index {
        self.poly2index[poly as usize]
    }

    #[inline]
    pub fn is_zero_index(&self, index: Index) -> bool {
        index == self.max_index
    }
}

/// Cache of built `GfField`s keyed by `m`, so repeated `GFElem::field(m)`
/// calls within one process reuse the same tables (mirrors the reference
/// implementation's per-template-instantiation static `GF<p,m> gf`).
static FIELD_CACHE: OnceLock<std::sync::Mutex<std::collections::HashMap<u32, Arc<GfField>>>> =
    OnceLock::new();

pub fn field(m: u32) -> Result<Arc<GfField>> {
    let cache = FIELD_CACHE.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut guard = cache.lock().unwrap();
    if let Some(f) = guard.get(&m) {
        return Ok(Arc::clone(f));
    }
    let built = Arc::new(GfField::build(m)?);
    guard.insert(m, Arc::clone(&built));
    Ok(built)
}

/// A single GF(2^m) element, stored as an index (power of α).
#[derive(Clone)]
pub struct GfElem {
    pub field: Arc<GfField>,
    index: Index,
}

impl GfElem {
    pub fn zero(field: &Arc<GfField>) -> Self {
        GfElem {
            field: Arc::clone(field),
            index: field.max_index,
        }
    }

    pub fn from_index(field: &Arc<GfField>, index: Index) -> Self {
        GfElem {
            field: Arc::clone(field),
            index,
        }
    }

    pub fn from_poly(field: &Arc<GfField>, poly: Poly) -> Self {
        GfElem {
            index: field.poly2index(poly),
            field: Arc::clone(field),
        }
    }

    #[inline]
    pub fn index(&self) -> Index {
        self.index
    }

    #[inline]
    pub fn poly(&self) -> Poly {
        self.field.index2poly(self.index)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.field.is_zero_index(self.index)
    }

    pub fn add(&self, rhs: &GfElem) -> GfElem {
        let sum_poly = self.poly() ^ rhs.poly();
        GfElem::from_poly(&self.field, sum_poly)
    }

    // Subtraction is addition in characteristic 2.
    pub fn sub(&self, rhs: &GfElem) -> GfElem {
        self.add(rhs)
    }

    pub fn mul(&self, rhs: &GfElem) -> GfElem {
        if self.is_zero() || rhs.is_zero() {
            return GfElem::zero(&self.field);
        }
        let n = self.field.max_index;
        let sum = (self.index as u64 + rhs.index as u64) % n as u64;
        GfElem::from_index(&self.field, sum as Index)
    }

    pub fn div(&self, rhs: &GfElem) -> GfElem {
        if self.is_zero() {
            return GfElem::zero(&self.field);
        }
        // rhs == 0 is a caller error (division by zero); mirrors the
        // reference implementation, which asserts rather than returning.
        assert!(!rhs.is_zero(), "GF division by zero");
        let n = self.field.max_index as i64;
        let diff = ((self.index as i64 - rhs.index as i64) % n + n) % n;
        GfElem::from_index(&self.field, diff as Index)
    }

    pub fn pow(&self, exp: i64) -> GfElem {
        if self.is_zero() {
            return if exp == 0 {
                GfElem::from_index(&self.field, 0)
            } else {
                GfElem::zero(&self.field)
            };
        }
        let n = self.field.max_index as i64;
        let e = ((exp % n) + n) % n;
        let new_index = ((self.index as i64 * e) % n + n) % n;
        GfElem::from_index(&self.field, new_index as Index)
    }

    pub fn inv(&self) -> GfElem {
        assert!(!self.is_zero(), "GF inverse of zero is undefined");
        let n = self.field.max_index;
        GfElem::from_index(&self.field, (n - self.index) % n)
    }
}

impl PartialEq for GfElem {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl Eq for GfElem {}

/// A polynomial over GF(2^m), stored coefficient-major (index 0 = constant
/// term), with a dynamically tracked degree (spec §4.A: "Degrees grow as
/// needed").
#[derive(Clone)]
pub struct GfPoly {
    pub field: Arc<GfField>,
    pub coeffs: Vec<GfElem>,
}

impl GfPoly {
    pub fn zero(field: &Arc<GfField>) -> Self {
        GfPoly {
            field: Arc::clone(field),
            coeffs: Vec::new(),
        }
    }

    pub fn from_coeffs(field: &Arc<GfField>, coeffs: Vec<GfElem>) -> Self {
        let mut p = GfPoly {
            field: Arc::clone(field),
            coeffs,
        };
        p.trim();
        p
    }

    fn trim(&mut self) {
        while matches!(self.coeffs.last(), Some(c) if c.is_zero()) {
            self.coeffs.pop();
        }
    }

    pub fn degree(&self) -> isize {
        self.coeffs.len() as isize - 1
    }

    pub fn coeff(&self, i: usize) -> GfElem {
        self.coeffs
            .get(i)
            .cloned()
            .unwrap_or_else(|| GfElem::zero(&self.field))
    }

    pub fn add_assign(&mut self, rhs: &GfPoly) {
        let n = self.coeffs.len().max(rhs.coeffs.len());
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.coeff(i).add(&rhs.coeff(i)));
        }
        self.coeffs = out;
        self.trim();
    }

    pub fn mul(&self, rhs: &GfPoly) -> GfPoly {
        if self.coeffs.is_empty() || rhs.coeffs.is_empty() {
            return GfPoly::zero(&self.field);
        }
        let mut out = vec![GfElem::zero(&self.field); self.coeffs.len() + rhs.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, b) in rhs.coeffs.iter().enumerate() {
                if b.is_zero() {
                    continue;
                }
                let prod = a.mul(b);
                out[i + j] = out[i + j].add(&prod);
            }
        }
        GfPoly::from_coeffs(&self.field, out)
    }

    pub fn mul_scalar(&self, s: &GfElem) -> GfPoly {
        let out = self.coeffs.iter().map(|c| c.mul(s)).collect();
        GfPoly::from_coeffs(&self.field, out)
    }

    /// Polynomial long division over GF(2^m); returns (quotient, remainder).
    pub fn div_rem(&self, divisor: &GfPoly) -> (GfPoly, GfPoly) {
        assert!(divisor.degree() >= 0, "division by zero polynomial");
        let mut remainder = self.coeffs.clone();
        let dlead = divisor.coeff(divisor.degree() as usize);
        let mut quotient = vec![GfElem::zero(&self.field); 0];
        while (remainder.len() as isize - 1) >= divisor.degree() && !remainder.is_empty() {
            let shift = remainder.len() - 1 - divisor.degree() as usize;
            let lead = remainder[remainder.len() - 1].clone();
            if lead.is_zero() {
                remainder.pop();
                continue;
            }
            let factor = lead.div(&dlead);
            if quotient.len() <= shift {
                quotient.resize(shift + 1, GfElem::zero(&self.field));
            }
            quotient[shift] = factor.clone();
            for (j, dc) in divisor.coeffs.iter().enumerate() {
                if dc.is_zero() {
                    continue;
                }
                let term = dc.mul(&factor);
                remainder[shift + j] = remainder[shift + j].add(&term);
            }
            while matches!(remainder.last(), Some(c) if c.is_zero()) {
                remainder.pop();
            }
        }
        (
            GfPoly::from_coeffs(&self.field, quotient),
            GfPoly::from_coeffs(&self.field, remainder),
        )
    }

    /// Shift by `k` symbols (multiply by x^k).
    pub fn shl(&self, k: usize) -> GfPoly {
        let mut out = vec![GfElem::zero(&self.field); k];
        out.extend(self.coeffs.iter().cloned());
        GfPoly::from_coeffs(&self.field, out)
    }

    /// Evaluate the polynomial at the field element with the given index.
    pub fn eval_at_index(&self, x_index: Index) -> GfElem {
        let x = GfElem::from_index(&self.field, x_index);
        let mut acc = GfElem::zero(&self.field);
        for (i, c) in self.coeffs.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            acc = acc.add(&c.mul(&x.pow(i as i64)));
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gf256_roundtrips_index_and_poly() {
        let f = field(8).unwrap();
        for i in 0..f.max_index {
            let e = GfElem::from_index(&f, i);
            let back = GfElem::from_poly(&f, e.poly());
            assert_eq!(e.index(), back.index());
        }
    }

    #[test]
    fn gf_mul_div_inverse_roundtrip() {
        let f = field(8).unwrap();
        let a = GfElem::from_index(&f, 17);
        let b = GfElem::from_index(&f, 200);
        let prod = a.mul(&b);
        let back = prod.div(&b);
        assert_eq!(a.index(), back.index());
    }

    #[test]
    fn gf_zero_absorbs_multiplication() {
        let f = field(8).unwrap();
        let zero = GfElem::zero(&f);
        let a = GfElem::from_index(&f, 42);
        assert!(zero.mul(&a).is_zero());
        assert!(a.mul(&zero).is_zero());
    }

    #[test]
    fn unsupported_field_size_errors() {
        assert!(matches!(field(11), Err(EccSimError::UnsupportedField(11))));
    }

    #[test]
    fn poly_div_rem_reconstructs_dividend() {
        let f = field(8).unwrap();
        let a = GfPoly::from_coeffs(
            &f,
            vec![
                GfElem::from_index(&f, 3),
                GfElem::from_index(&f, 10),
                GfElem::from_index(&f, 0),
                GfElem::from_index(&f, 5),
            ],
        );
        let b = GfPoly::from_coeffs(&f, vec![GfElem::from_index(&f, 1), GfElem::from_index(&f, 0)]);
        let (q, r) = a.div_rem(&b);
        let mut reconstructed = q.mul(&b);
        reconstructed.add_assign(&r);
        assert_eq!(reconstructed.degree(), a.degree());
        for i in 0..=a.degree() as usize {
            assert_eq!(reconstructed.coeff(i).index(), a.coeff(i).index());
        }
    }
}
