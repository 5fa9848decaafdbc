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

//! The codec family (spec §4.B): RS, RS-dual, binary linear (Hsiao/SEC),
//! BCH and CRC, all implementing one shared [`Codec`] trait.

pub mod bch;
pub mod crc;
pub mod linear;
pub mod rs;
pub mod rs_dual;

use crate::layout::EccWord;
use std::collections::BTreeSet;

/// Outcome lattice (spec §4.H): `NE < CE < DUE < SDC`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Ne = 0,
    Ce = 1,
    Due = 2,
    Sdc = 3,
}

impl Outcome {
    pub fn worse(a: Outcome, b: Outcome) -> Outcome {
        if a >= b {
            a
        } else {
            b
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Outcome::Ne => "NE",
            Outcome::Ce => "CE",
            Outcome::Due => "DUE",
            Outcome::Sdc => "SDC",
        }
    }
}

/// Result of a single `decode` call.
#[derive(Clone, Debug)]
pub struct DecodeResult {
    pub outcome: Outcome,
    pub decoded: EccWord,
    pub corrected_positions: BTreeSet<usize>,
}

/// Shared interface implemented by every codec in the family (spec §4.B).
pub trait Codec {
    fn name(&self) -> &str;
    fn bit_n(&self) -> usize;
    fn bit_k(&self) -> usize;
    fn bit_r(&self) -> usize {
        self.bit_n() - self.bit_k()
    }

    /// Encodes `bit_k()` bits of message (MSB-first in `data`) into a full
    /// `bit_n()`-bit codeword.
    fn encode(&self, data: &[bool]) -> EccWord;

    /// Decodes a (possibly corrupted) codeword, per spec §4.B's outcome
    /// rules. Never raises: decoding failure is a value (`Outcome::Due`/
    /// `Outcome::Sdc`), never an exception (spec §7).
    fn decode(&self, msg: &EccWord) -> DecodeResult;
}

#[cfg(test)]
pub(crate) fn zero_extended(data: &[bool], bit_n: usize) -> Vec<bool> {
    let mut v = data.to_vec();
    v.resize(bit_n, false);
    v
}
