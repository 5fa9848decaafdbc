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

//! Monte-Carlo driver (spec §2, component J): system evaluation (time-
//! advancing Poisson process over a [`DomainGroup`]) and scenario evaluation
//! (a fixed, deterministic sequence of injected faults).

use crate::codec::Outcome;
use crate::domain::DomainGroup;
use crate::ecc::Ecc;
use crate::fault::{gen_random_error, gen_random_fault, Fault, FaultKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp};
use rayon::prelude::*;

/// Per-year outcome tally accumulated by [`Tester::run_system_eval`], printed
/// in the periodic output block (spec §6).
#[derive(Clone, Debug, Default)]
pub struct YearlyTally {
    pub ne: u64,
    pub ce: u64,
    pub due: u64,
    pub sdc: u64,
}

impl YearlyTally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ne => self.ne += 1,
            Outcome::Ce => self.ce += 1,
            Outcome::Due => self.due += 1,
            Outcome::Sdc => self.sdc += 1,
        }
    }

    fn total(&self) -> u64 {
        self.ne + self.ce + self.due + self.sdc
    }

    pub fn ne_prob(&self) -> f64 {
        self.ne as f64 / self.total().max(1) as f64
    }

    pub fn ce_prob(&self) -> f64 {
        self.ce as f64 / self.total().max(1) as f64
    }

    pub fn due_prob(&self) -> f64 {
        self.due as f64 / self.total().max(1) as f64
    }

    pub fn sdc_prob(&self) -> f64 {
        self.sdc as f64 / self.total().max(1) as f64
    }
}

/// Running result of a system evaluation: one tally per simulated year plus
/// the grand total the CLI reports under "After N runs" (spec §6).
#[derive(Clone, Debug, Default)]
pub struct SystemEvalResult {
    pub per_year: Vec<YearlyTally>,
    pub runs: u64,
}

/// Drives trials against a [`DomainGroup`]/[`Ecc`] pair. One `Tester` owns
/// one worker's private state (spec §5): the domain group, the scheme, the
/// scrub interval, and the RNG.
pub struct Tester<'a> {
    pub domains: DomainGroup,
    pub scheme: &'a dyn Ecc,
    /// Number of accesses between scrubber passes (0 disables scrubbing).
    pub scrub_interval_accesses: u64,
    /// Simulated lifetime, in years, a system evaluation run covers.
    pub lifetime_years: u32,
    /// Mean accesses per simulated year, used to convert the Poisson
    /// time-advance (in fault-arrival units) into a year bucket index.
    pub accesses_per_year: f64,
}

impl<'a> Tester<'a> {
    pub fn new(domains: DomainGroup, scheme: &'a dyn Ecc, scrub_interval_accesses: u64, lifetime_years: u32, accesses_per_year: f64) -> Self {
        Tester {
            domains,
            scheme,
            scrub_interval_accesses,
            lifetime_years,
            accesses_per_year,
        }
    }

    fn total_fit(&self) -> f64 {
        self.domains
            .domains
            .iter()
            .map(|d| d.rate_info.total_rate())
            .sum()
    }

    /// Runs `num_trials` independent lifetimes (spec §2's control flow, steps
    /// 1-5). Each trial restarts with an empty operational fault list (the
    /// domains passed in are reused across trials for their geometry/rate
    /// tables, but any prior-trial faults are cleared at entry).
    pub fn run_system_eval(&mut self, num_trials: u64, rng: &mut impl Rng) -> SystemEvalResult {
        let mut result = SystemEvalResult {
            per_year: vec![YearlyTally::default(); self.lifetime_years.max(1) as usize],
            runs: 0,
        };

        let total_fit = self.total_fit();
        let accesses_per_year = self.accesses_per_year.max(1.0);

        for _ in 0..num_trials {
            for domain in &mut self.domains.domains {
                domain.operational_faults.clear();
                domain.retired_chip_ids.clear();
                domain.retired_pin_ids.clear();
            }

            let mut accesses_since_scrub: u64 = 0;
            let mut elapsed_accesses: f64 = 0.0;
            let horizon = accesses_per_year * self.lifetime_years.max(1) as f64;

            while elapsed_accesses < horizon {
                // Step 1: exponential time-advance; a zero/negative total FIT
                // degenerates to one access per step (inherent-only domains).
                let step = if total_fit > 0.0 {
                    Exp::new(total_fit).unwrap().sample(rng).max(1.0)
                } else {
                    1.0
                };
                elapsed_accesses += step;

                let codec = self.scheme.state().config_list[0].codec.as_ref();
                let outcome = self.domains.step_all(
                    codec,
                    |r| {
                        if self.scheme.state().do_postprocess {
                            self.scheme.postprocess(r)
                        } else {
                            r.outcome
                        }
                    },
                    |f| self.scheme.state().do_retire && self.scheme.need_retire(f),
                    self.scheme.state().max_retired_blk_count,
                    rng,
                );

                let year_idx = ((elapsed_accesses / accesses_per_year) as usize).min(result.per_year.len() - 1);
                result.per_year[year_idx].record(outcome);

                accesses_since_scrub += 1;
                if self.scrub_interval_accesses > 0 && accesses_since_scrub >= self.scrub_interval_accesses {
                    self.domains.scrub_all();
                    accesses_since_scrub = 0;
                    crate::telemetry::SCRUB_EVENTS_TOTAL.inc();
                }
            }
            result.runs += 1;
            crate::telemetry::TRIALS_TOTAL.inc();
        }
        result
    }

    /// Deterministic scenario evaluation (spec §2/§6): injects exactly the
    /// fault kinds named by `codes` (in order) against the first domain, then
    /// decodes the resulting composed cache line once. Used for the
    /// reproducible end-to-end scenarios of spec §8.
    pub fn run_scenario_eval(&mut self, codes: &[FaultKind], chip_positions: &[usize], pins: &[Vec<usize>], rng: &mut impl Rng) -> Outcome {
        let domain = &mut self.domains.domains[0];
        let mut line = crate::layout::CacheLine::new(domain.geometry.chip_width, domain.geometry.channel_width, domain.geometry.beat_height);

        let mut faults: Vec<Fault> = Vec::with_capacity(codes.len());
        for (i, &kind) in codes.iter().enumerate() {
            let mut fault = gen_random_fault(kind, &domain.geometry, rng, false, 1);
            if let Some(&chip) = chip_positions.get(i) {
                fault.chip_pos = chip;
            }
            if let Some(p) = pins.get(i) {
                fault.pins = p.clone();
            }
            gen_random_error(&fault, &mut line);
            faults.push(fault);
        }

        let erasure_hint = domain.detect_faulty_chips();
        let pre = self.scheme.decode_internal(&line, &erasure_hint);
        let outcome = if self.scheme.state().do_postprocess {
            self.scheme.postprocess(&pre)
        } else {
            pre.outcome
        };

        for fault in faults {
            domain.operational_faults.push(fault);
        }
        outcome
    }
}

/// Shards a system evaluation across `num_workers` rayon threads (spec §5:
/// "each worker owning a private `FaultDomain`/`FaultRateInfo`/
/// `InherentRate`/`StdRng`"). `domain_factory` builds one worker's fresh
/// `DomainGroup`; every worker gets its own `StdRng` seeded off `base_seed`
/// so the run stays reproducible regardless of thread scheduling order.
pub fn run_system_eval_parallel(
    scheme: &dyn Ecc,
    domain_factory: impl Fn() -> DomainGroup + Sync,
    scrub_interval_accesses: u64,
    lifetime_years: u32,
    accesses_per_year: f64,
    num_workers: usize,
    trials_per_worker: u64,
    base_seed: u64,
) -> SystemEvalResult {
    (0..num_workers.max(1))
        .into_par_iter()
        .map(|worker_idx| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(worker_idx as u64));
            let mut worker = Tester::new(
                domain_factory(),
                scheme,
                scrub_interval_accesses,
                lifetime_years,
                accesses_per_year,
            );
            worker.run_system_eval(trials_per_worker, &mut rng)
        })
        .reduce(SystemEvalResult::default, |mut a, b| {
            a.runs += b.runs;
            if a.per_year.len() < b.per_year.len() {
                a.per_year.resize(b.per_year.len(), YearlyTally::default());
            }
            for (ay, by) in a.per_year.iter_mut().zip(b.per_year.iter()) {
                ay.ne += by.ne;
                ay.ce += by.ce;
                ay.due += by.due;
                ay.sdc += by.sdc;
            }
            a
        })
}
