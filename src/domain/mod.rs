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

//! Per-rank fault accumulation and composition (spec §4.F).

use crate::codec::{Codec, DecodeResult, Outcome};
use crate::fault::rate::FaultRateInfo;
use crate::fault::{gen_random_errors, gen_random_fault, overlap, DramGeometry, Fault, FaultKind};
use crate::layout::{CacheLine, Layout};
use rand::Rng;
use std::collections::{BTreeSet, HashMap};

/// Identity postprocessing: the decoded outcome stands as-is. Schemes with
/// graceful-degradation postprocessing (spec §4.G) pass their own closure
/// into [`FaultDomain::step`] instead.
pub fn identity_postprocess(result: &DecodeResult) -> Outcome {
    result.outcome
}

/// Per-rank container of faults and their composed decode history (spec
/// §3's `FaultDomain` entity).
pub struct FaultDomain {
    pub geometry: DramGeometry,
    pub layout: Layout,
    pub pos: usize,
    pub rate_info: FaultRateInfo,
    pub operational_faults: Vec<Fault>,
    pub retired_chip_ids: BTreeSet<usize>,
    pub retired_pin_ids: BTreeSet<(usize, usize)>,
    pub sdc_histogram: HashMap<&'static str, u64>,
    pub due_histogram: HashMap<&'static str, u64>,
}

impl FaultDomain {
    pub fn new(geometry: DramGeometry, layout: Layout, pos: usize, rate_info: FaultRateInfo) -> Self {
        FaultDomain {
            geometry,
            layout,
            pos,
            rate_info,
            operational_faults: Vec::new(),
            retired_chip_ids: BTreeSet::new(),
            retired_pin_ids: BTreeSet::new(),
            sdc_histogram: HashMap::new(),
            due_histogram: HashMap::new(),
        }
    }

    fn fresh_line(&self) -> CacheLine {
        CacheLine::new(self.geometry.chip_width, self.geometry.channel_width, self.geometry.beat_height)
    }

    fn apply_inherent(&self, line: &mut CacheLine, rng: &mut impl Rng) {
        let p = self.rate_info.inherent.per_cell_probability();
        if p <= 0.0 {
            return;
        }
        for beat in 0..line.beat_height {
            for pin in 0..line.channel_width {
                if rng.gen_bool(p.min(1.0)) {
                    let cur = line.bit_at(beat, pin);
                    line.set_bit_at(beat, pin, !cur);
                }
            }
        }
    }

    fn decode_line(&self, codec: &dyn Codec, postprocess: impl Fn(&DecodeResult) -> Outcome, line: &CacheLine) -> Outcome {
        let word = crate::layout::extract(line, self.layout, self.pos, codec.bit_n());
        let result = codec.decode(&word);
        postprocess(&result)
    }

    /// Every non-empty subset of `overlappers` (each member already known to
    /// overlap `new_fault`), combined with `new_fault` itself, is composed
    /// and decoded independently (spec §4.F's composition rule); the worst
    /// outcome observed across all subsets wins.
    fn composed_outcome(
        &self,
        codec: &dyn Codec,
        postprocess: impl Fn(&DecodeResult) -> Outcome + Copy,
        new_fault: &Fault,
        overlappers: &[&Fault],
        rng: &mut impl Rng,
    ) -> Outcome {
        if overlappers.is_empty() {
            let mut line = self.fresh_line();
            if new_fault.overlaps_inherent {
                self.apply_inherent(&mut line, rng);
            }
            gen_random_errors(new_fault, &mut line, 1.0, rng);
            return self.decode_line(codec, postprocess, &line);
        }

        let n = overlappers.len();
        let mut worst = Outcome::Ne;
        // 2^n - 1 non-empty subsets; DRAM overlap is rare in practice so n
        // stays small, but guard against pathological inputs anyway.
        let capped_n = n.min(16);
        for mask in 1u32..(1u32 << capped_n) {
            let mut line = self.fresh_line();
            if new_fault.overlaps_inherent {
                self.apply_inherent(&mut line, rng);
            }
            gen_random_errors(new_fault, &mut line, 1.0, rng);
            for i in 0..capped_n {
                if mask & (1 << i) != 0 {
                    gen_random_errors(overlappers[i], &mut line, 1.0, rng);
                }
            }
            let outcome = self.decode_line(codec, postprocess, &line);
            worst = Outcome::worse(worst, outcome);
            if worst == Outcome::Sdc {
                break;
            }
        }
        worst
    }

    /// Runs one memory access through the domain: draws a fault (or the
    /// inherent model), composes it against any overlapping history, decodes
    /// via `codec`/`postprocess`, and applies the retirement policy.
    /// `postprocess`, `need_retire` and `max_retired_blk_count` are supplied
    /// by the owning ECC scheme (spec §4.G) to avoid a domain → ecc
    /// dependency cycle.
    pub fn step(
        &mut self,
        codec: &dyn Codec,
        postprocess: impl Fn(&DecodeResult) -> Outcome + Copy,
        need_retire: impl Fn(&Fault) -> bool,
        max_retired_blk_count: usize,
        rng: &mut impl Rng,
    ) -> Outcome {
        let draw = self.rate_info.weighted_draw(rng.gen::<f64>()).map(str::to_string);

        let kind_name = match draw {
            None => {
                let mut line = self.fresh_line();
                self.apply_inherent(&mut line, rng);
                let outcome = self.decode_line(codec, postprocess, &line);
                crate::telemetry::record_outcome(outcome);
                return outcome;
            }
            Some(name) => name,
        };

        let Some(kind) = FaultKind::from_name(&kind_name) else {
            let mut line = self.fresh_line();
            self.apply_inherent(&mut line, rng);
            let outcome = self.decode_line(codec, postprocess, &line);
            crate::telemetry::record_outcome(outcome);
            return outcome;
        };

        let mut fault = gen_random_fault(kind, &self.geometry, rng, false, 1);
        fault.overlaps_inherent = rng.gen::<f64>() < self.rate_info.overlap_prob(&kind_name);
        crate::telemetry::FAULTS_INJECTED.inc();

        let overlapper_indices: Vec<usize> = self
            .operational_faults
            .iter()
            .enumerate()
            .filter(|(_, f)| overlap(&fault, f))
            .map(|(i, _)| i)
            .collect();
        let overlappers: Vec<&Fault> = overlapper_indices.iter().map(|&i| &self.operational_faults[i]).collect();

        let outcome = self.composed_outcome(codec, postprocess, &fault, &overlappers, rng);
        crate::telemetry::record_outcome(outcome);

        match outcome {
            Outcome::Ce => {
                let retired_count = self.retired_chip_ids.len() + self.retired_pin_ids.len();
                if need_retire(&fault) && retired_count < max_retired_blk_count {
                    self.retired_chip_ids.insert(fault.chip_pos);
                    for &pin in &fault.pins {
                        self.retired_pin_ids.insert((fault.chip_pos, pin));
                    }
                    crate::telemetry::RETIREMENTS_TOTAL.inc();
                } else {
                    self.operational_faults.push(fault);
                }
            }
            Outcome::Due => {
                *self.due_histogram.entry(kind.code()).or_insert(0) += 1;
                self.operational_faults.push(fault);
            }
            Outcome::Sdc => {
                *self.sdc_histogram.entry(kind.code()).or_insert(0) += 1;
                self.operational_faults.push(fault);
            }
            Outcome::Ne => {
                self.operational_faults.push(fault);
            }
        }
        outcome
    }

    /// Drops every transient fault from the operational list (spec §5's
    /// scrubber, invoked by the Tester between configured access intervals).
    pub fn scrub(&mut self) {
        self.operational_faults.retain(|f| !f.is_transient);
    }

    /// Faulty-chip detection for erasure-assisted decoders (spec §4.F,
    /// default policy): walk faults newest-first; a candidate (any
    /// non-single-beat fault) joins the detected set iff it overlaps the
    /// immediately preceding candidate. Returns 0, 1, or 2 chip IDs.
    pub fn detect_faulty_chips(&self) -> Vec<usize> {
        let candidates: Vec<&Fault> = self
            .operational_faults
            .iter()
            .rev()
            .filter(|f| f.beat_start != f.beat_end)
            .collect();
        let mut detected = Vec::new();
        for pair in candidates.windows(2) {
            if overlap(pair[0], pair[1]) {
                if !detected.contains(&pair[0].chip_pos) {
                    detected.push(pair[0].chip_pos);
                }
                if detected.len() >= 2 {
                    break;
                }
            }
        }
        detected
    }
}

/// A collection of per-rank `FaultDomain`s sharing one codec and advancing
/// together (spec §3's `DomainGroup`, Design Notes §9's "cyclic graph arena"
/// reframed as a flat owned `Vec`).
pub struct DomainGroup {
    pub domains: Vec<FaultDomain>,
}

impl DomainGroup {
    pub fn new(domains: Vec<FaultDomain>) -> Self {
        DomainGroup { domains }
    }

    pub fn step_all(
        &mut self,
        codec: &dyn Codec,
        postprocess: impl Fn(&DecodeResult) -> Outcome + Copy,
        need_retire: impl Fn(&Fault) -> bool + Copy,
        max_retired_blk_count: usize,
        rng: &mut impl Rng,
    ) -> Outcome {
        let mut worst = Outcome::Ne;
        for domain in &mut self.domains {
            let outcome = domain.step(codec, postprocess, need_retire, max_retired_blk_count, rng);
            worst = Outcome::worse(worst, outcome);
        }
        worst
    }

    pub fn scrub_all(&mut self) {
        for domain in &mut self.domains {
            domain.scrub();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::linear::BinaryLinear;
    use crate::fault::rate::InherentRate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn domain_with(geometry: DramGeometry) -> FaultDomain {
        let mut rate_info = FaultRateInfo::new(InherentRate::default());
        rate_info.add_rate("SBIT", 1.0);
        FaultDomain::new(geometry, Layout::Linear, 0, rate_info)
    }

    #[test]
    fn no_fault_access_decodes_ne() {
        let geometry = DramGeometry {
            channel_width: 72,
            chip_width: 72,
            beat_height: 1,
            ..DramGeometry::ddr5()
        };
        let mut domain = domain_with(geometry);
        domain.rate_info.remove_last(); // empty table -> inherent-only draws
        let codec = BinaryLinear::hsiao("Hsiao(72,64)", 72, 64).unwrap();
        let mut rng = StdRng::seed_from_u64(10);
        for _ in 0..20 {
            let outcome = domain.step(&codec, identity_postprocess, |_| false, 0, &mut rng);
            assert_eq!(outcome, Outcome::Ne);
        }
    }

    #[test]
    fn scrub_drops_only_transient_faults() {
        let geometry = DramGeometry::ddr5();
        let mut domain = domain_with(geometry);
        let mut rng = StdRng::seed_from_u64(11);
        let mut permanent = gen_random_fault(FaultKind::Sbit, &geometry, &mut rng, false, 1);
        permanent.is_transient = false;
        let mut transient = gen_random_fault(FaultKind::Sbit, &geometry, &mut rng, false, 1);
        transient.is_transient = true;
        domain.operational_faults.push(permanent);
        domain.operational_faults.push(transient);
        domain.scrub();
        assert_eq!(domain.operational_faults.len(), 1);
        assert!(!domain.operational_faults[0].is_transient);
    }

    #[test]
    fn retirement_moves_fault_out_of_operational_list() {
        let geometry = DramGeometry {
            channel_width: 72,
            chip_width: 72,
            beat_height: 1,
            ..DramGeometry::ddr5()
        };
        let mut domain = domain_with(geometry);
        let codec = BinaryLinear::hsiao("Hsiao(72,64)", 72, 64).unwrap();
        let mut rng = StdRng::seed_from_u64(12);
        let mut retired_once = false;
        for _ in 0..200 {
            let outcome = domain.step(&codec, identity_postprocess, |_| true, 100, &mut rng);
            if outcome == Outcome::Ce {
                retired_once = true;
                break;
            }
        }
        assert!(retired_once || domain.operational_faults.is_empty());
    }
}
