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

//! Fault taxonomy and error materialization (spec §4.D).

pub mod rate;

use crate::error::{EccSimError, Result};
use crate::layout::CacheLine;
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    Sbit,
    Sword,
    Scol,
    Srow,
    Sbank,
    Mbank,
    Mrank,
    Channel,
    Blsa,
    Cdec,
    Csl,
    Rdec,
    Swd,
    Lwl,
    BankPattern,
    Inherent,
}

impl FaultKind {
    pub fn code(&self) -> &'static str {
        match self {
            FaultKind::Sbit => "SBIT",
            FaultKind::Sword => "SWORD",
            FaultKind::Scol => "SCOL",
            FaultKind::Srow => "SROW",
            FaultKind::Sbank => "SBANK",
            FaultKind::Mbank => "MBANK",
            FaultKind::Mrank => "MRANK",
            FaultKind::Channel => "Channel",
            FaultKind::Blsa => "BLSA",
            FaultKind::Cdec => "CDEC",
            FaultKind::Csl => "CSL",
            FaultKind::Rdec => "RDEC",
            FaultKind::Swd => "SWD",
            FaultKind::Lwl => "LWL",
            FaultKind::BankPattern => "Bank-pattern",
            FaultKind::Inherent => "Inherent",
        }
    }

    pub const ALL: [FaultKind; 15] = [
        FaultKind::Sbit,
        FaultKind::Sword,
        FaultKind::Scol,
        FaultKind::Srow,
        FaultKind::Sbank,
        FaultKind::Mbank,
        FaultKind::Mrank,
        FaultKind::Channel,
        FaultKind::Blsa,
        FaultKind::Cdec,
        FaultKind::Csl,
        FaultKind::Rdec,
        FaultKind::Swd,
        FaultKind::Lwl,
        FaultKind::BankPattern,
    ];

    /// Maps a CLI scenario-eval fault-kind-code (spec §6) onto a variant.
    /// An out-of-range code is fatal, never a silent no-op (spec §9, open
    /// question 2).
    pub fn from_code(code: u32) -> Result<FaultKind> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| EccSimError::FaultKindNotImplemented(format!("fault-kind-code {code}")))
    }

    /// Maps a `FaultRateInfo` entry name (spec §4.E) onto a variant; `None`
    /// for `"inherent"` or anything else unrecognized.
    pub fn from_name(name: &str) -> Option<FaultKind> {
        Self::ALL.iter().copied().find(|k| k.code() == name)
    }
}

/// Per-bit address masks for every fault kind, derived from the DRAM's
/// address-bit-width breakdown rather than hard-coded (original source's
/// `setup_configs`, `AutogenMASK == 2` path, computes them the same way).
#[derive(Clone, Copy, Debug)]
pub struct FaultMasks {
    pub sbit: u64,
    pub sword: u64,
    pub scol: u64,
    pub srow: u64,
    pub sbank: u64,
    pub mbank: u64,
    pub mrank: u64,
    pub channel: u64,
    pub microarch: u64,
}

/// Immutable DRAM geometry (spec §9 Design Notes: global mutable config
/// constants reframed as an explicit, passed-around value).
#[derive(Clone, Copy, Debug)]
pub struct DramGeometry {
    pub channel_width: usize,
    pub chip_width: usize,
    pub beat_height: usize,
    pub column_address_bits: u32,
    pub row_address_bits: u32,
    pub bank_address_bits: u32,
    pub bank_group_address_bits: u32,
    pub rank_address_bits: u32,
    pub num_banks: usize,
    pub cdec_per_chip: usize,
    pub csl_per_chip: usize,
    pub bits_per_chip: usize,
}

impl DramGeometry {
    pub fn masks(&self) -> FaultMasks {
        let col = (1u64 << self.column_address_bits) - 1;
        let row = ((1u64 << self.row_address_bits) - 1) << self.column_address_bits;
        let past_col_row = self.column_address_bits + self.row_address_bits;
        let bank = ((1u64 << self.bank_address_bits) - 1) << past_col_row;
        let bankgroup =
            ((1u64 << self.bank_group_address_bits) - 1) << (past_col_row + self.bank_address_bits);
        let sbank = col | row;
        let mbank = sbank | bank | bankgroup;
        FaultMasks {
            sbit: 0,
            sword: 0,
            scol: col,
            srow: row,
            sbank,
            mbank,
            mrank: mbank | (((1u64 << self.rank_address_bits) - 1)
                << (past_col_row + self.bank_address_bits + self.bank_group_address_bits)),
            channel: u64::MAX,
            // DRAM-internal micro-architectural faults (BLSA/CDEC/CSL/RDEC/
            // SWD/LWL/bank-pattern) are scoped to one bank like SBANK; the
            // simulator does not currently distinguish their footprints
            // further (see DESIGN.md).
            microarch: sbank,
        }
    }

    pub fn ddr5() -> Self {
        DramGeometry {
            channel_width: 64,
            chip_width: 4,
            beat_height: 16,
            column_address_bits: 10,
            row_address_bits: 17,
            bank_address_bits: 2,
            bank_group_address_bits: 3,
            rank_address_bits: 1,
            num_banks: 32,
            cdec_per_chip: 8,
            csl_per_chip: 512,
            bits_per_chip: 1 << 30,
        }
    }

    pub fn hbm3() -> Self {
        DramGeometry {
            channel_width: 64,
            chip_width: 2,
            beat_height: 8,
            column_address_bits: 6,
            row_address_bits: 15,
            bank_address_bits: 4,
            bank_group_address_bits: 2,
            rank_address_bits: 0,
            num_banks: 16,
            cdec_per_chip: 4,
            csl_per_chip: 64,
            bits_per_chip: 1 << 33,
        }
    }

    pub fn lpddr5_split() -> Self {
        DramGeometry {
            channel_width: 16,
            chip_width: 8,
            beat_height: 16,
            column_address_bits: 10,
            row_address_bits: 16,
            bank_address_bits: 3,
            bank_group_address_bits: 1,
            rank_address_bits: 0,
            num_banks: 8,
            cdec_per_chip: 4,
            csl_per_chip: 256,
            bits_per_chip: 1 << 29,
        }
    }

    pub fn lpddr5_merge() -> Self {
        DramGeometry {
            channel_width: 32,
            chip_width: 16,
            beat_height: 16,
            column_address_bits: 10,
            row_address_bits: 16,
            bank_address_bits: 3,
            bank_group_address_bits: 1,
            rank_address_bits: 0,
            num_banks: 8,
            cdec_per_chip: 4,
            csl_per_chip: 256,
            bits_per_chip: 1 << 29,
        }
    }
}

/// A single injected DRAM fault (spec §3's `Fault` entity).
#[derive(Clone, Debug)]
pub struct Fault {
    pub kind: FaultKind,
    pub mask: u64,
    pub fixed_addr: u64,
    pub pins: Vec<usize>,
    pub chip_pos: usize,
    pub beat_start: usize,
    pub beat_end: usize,
    pub is_transient: bool,
    pub num_dq: usize,
    pub affected_blk_count: u64,
    pub overlaps_inherent: bool,
}

impl Fault {
    pub fn beats(&self) -> std::ops::RangeInclusive<usize> {
        self.beat_start..=self.beat_end
    }
}

/// Two faults overlap iff their addresses agree on every bit neither mask
/// covers (spec §3 Invariants). Reflexive, symmetric, not transitive.
pub fn overlap(a: &Fault, b: &Fault) -> bool {
    (a.fixed_addr ^ b.fixed_addr) & !(a.mask | b.mask) == 0
}

fn mask_for(kind: FaultKind, masks: &FaultMasks) -> u64 {
    match kind {
        FaultKind::Sbit => masks.sbit,
        FaultKind::Sword => masks.sword,
        FaultKind::Scol => masks.scol,
        FaultKind::Srow => masks.srow,
        FaultKind::Sbank => masks.sbank,
        FaultKind::Mbank => masks.mbank,
        FaultKind::Mrank => masks.mrank,
        FaultKind::Channel => masks.channel,
        FaultKind::Blsa
        | FaultKind::Cdec
        | FaultKind::Csl
        | FaultKind::Rdec
        | FaultKind::Swd
        | FaultKind::Lwl
        | FaultKind::BankPattern => masks.microarch,
        FaultKind::Inherent => 0,
    }
}

fn pick_distinct_pins(rng: &mut impl Rng, chip_width: usize, count: usize, group: bool, group_size: usize) -> Vec<usize> {
    if group && group_size > 0 && group_size <= chip_width {
        let num_groups = chip_width / group_size;
        let g = rng.gen_range(0..num_groups.max(1));
        return (g * group_size..(g * group_size + group_size).min(chip_width)).collect();
    }
    let mut pins: Vec<usize> = (0..chip_width).collect();
    for i in (1..pins.len()).rev() {
        let j = rng.gen_range(0..=i);
        pins.swap(i, j);
    }
    pins.truncate(count.min(chip_width).max(1));
    pins.sort_unstable();
    pins
}

/// Samples a new fault of the given kind against `geometry` (spec §4.D).
pub fn gen_random_fault(
    kind: FaultKind,
    geometry: &DramGeometry,
    rng: &mut impl Rng,
    group: bool,
    group_size: usize,
) -> Fault {
    let masks = geometry.masks();
    let mask = mask_for(kind, &masks);
    let num_chips = geometry.channel_width / geometry.chip_width;
    let chip_pos = rng.gen_range(0..num_chips.max(1));

    let num_dq = match kind {
        FaultKind::Sbit | FaultKind::Inherent => 1,
        FaultKind::Channel => geometry.chip_width,
        _ => rng.gen_range(1..=geometry.chip_width),
    };
    let pins = pick_distinct_pins(rng, geometry.chip_width, num_dq, group, group_size);

    let is_single_beat = matches!(kind, FaultKind::Sbit | FaultKind::Sword | FaultKind::Inherent);
    let (beat_start, beat_end) = if is_single_beat {
        let b = rng.gen_range(0..geometry.beat_height);
        (b, b)
    } else {
        (0, geometry.beat_height - 1)
    };

    let is_transient = rng.gen_bool(0.5);
    let fixed_addr: u64 = rng.gen();

    Fault {
        kind,
        mask,
        fixed_addr: fixed_addr & !mask,
        pins,
        chip_pos,
        beat_start,
        beat_end,
        is_transient,
        num_dq,
        affected_blk_count: 0,
        overlaps_inherent: false,
    }
}

/// Flips bits in `line` for every (beat, pin) the fault covers, each
/// independently activated with probability `activation_prob` (spec §4.D).
pub fn gen_random_errors(fault: &Fault, line: &mut CacheLine, activation_prob: f64, rng: &mut impl Rng) {
    let base_pin = fault.chip_pos * line.chip_width;
    for beat in fault.beats() {
        for &local_pin in &fault.pins {
            if rng.gen_bool(activation_prob.clamp(0.0, 1.0)) {
                let pin = base_pin + local_pin;
                let cur = line.bit_at(beat, pin);
                line.set_bit_at(beat, pin, !cur);
            }
        }
    }
}

/// Deterministic single-activation variant used by scenario evaluation
/// (spec §6): every covered (beat, pin) flips unconditionally.
pub fn gen_random_error(fault: &Fault, line: &mut CacheLine) {
    gen_random_errors(fault, line, 1.0, &mut rand::thread_rng());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn overlap_is_reflexive_and_symmetric() {
        let geometry = DramGeometry::ddr5();
        let mut rng = StdRng::seed_from_u64(1);
        let a = gen_random_fault(FaultKind::Srow, &geometry, &mut rng, false, 1);
        let b = gen_random_fault(FaultKind::Srow, &geometry, &mut rng, false, 1);
        assert!(overlap(&a, &a));
        assert_eq!(overlap(&a, &b), overlap(&b, &a));
    }

    #[test]
    fn channel_fault_covers_every_pin_every_beat() {
        let geometry = DramGeometry::ddr5();
        let mut rng = StdRng::seed_from_u64(2);
        let fault = gen_random_fault(FaultKind::Channel, &geometry, &mut rng, false, 1);
        assert_eq!(fault.beat_start, 0);
        assert_eq!(fault.beat_end, geometry.beat_height - 1);
        assert_eq!(fault.pins.len(), geometry.chip_width);
    }

    #[test]
    fn sbit_fault_is_single_beat_single_pin() {
        let geometry = DramGeometry::ddr5();
        let mut rng = StdRng::seed_from_u64(3);
        let fault = gen_random_fault(FaultKind::Sbit, &geometry, &mut rng, false, 1);
        assert_eq!(fault.beat_start, fault.beat_end);
        assert_eq!(fault.pins.len(), 1);
    }

    #[test]
    fn unknown_fault_code_is_fatal_not_silent() {
        assert!(FaultKind::from_code(999).is_err());
    }

    #[test]
    fn gen_random_errors_only_touches_covered_beats_and_pins() {
        let geometry = DramGeometry::ddr5();
        let mut rng = StdRng::seed_from_u64(4);
        let fault = gen_random_fault(FaultKind::Sbit, &geometry, &mut rng, false, 1);
        let mut line = CacheLine::new(geometry.chip_width, geometry.channel_width, geometry.beat_height);
        gen_random_errors(&fault, &mut line, 1.0, &mut rng);
        let set_bits: usize = (0..geometry.beat_height)
            .flat_map(|b| (0..geometry.channel_width).map(move |p| (b, p)))
            .filter(|&(b, p)| line.bit_at(b, p))
            .count();
        assert!(set_bits <= 1);
    }
}
