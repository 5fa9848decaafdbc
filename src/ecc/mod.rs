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

//! The ECC orchestrator (spec §4.G): one shared entry point, concrete
//! schemes override `decode_internal`/`postprocess`/`need_retire`.

pub mod schemes;

use crate::codec::{Codec, DecodeResult};
use crate::fault::Fault;
use crate::layout::{CacheLine, EccWord, Layout};

/// One tier of a graceful-degradation `configList` (spec §4.G).
pub struct ConfigTier {
    pub max_device_retirement: usize,
    pub max_pin_retirement: usize,
    pub codec: Box<dyn Codec + Send + Sync>,
}

/// Non-polymorphic orchestrator state shared by every concrete scheme (spec
/// §9 Design Notes: "a shared `EccState` struct for the non-polymorphic
/// orchestrator state").
pub struct EccState {
    pub layout: Layout,
    pub pos: usize,
    pub config_list: Vec<ConfigTier>,
    pub do_postprocess: bool,
    pub do_retire: bool,
    pub max_retired_blk_count: usize,
}

impl EccState {
    pub fn new(layout: Layout, pos: usize, config_list: Vec<ConfigTier>) -> Self {
        EccState {
            layout,
            pos,
            config_list,
            do_postprocess: false,
            do_retire: true,
            max_retired_blk_count: usize::MAX,
        }
    }

    pub fn primary_codec(&self) -> &(dyn Codec + Send + Sync) {
        self.config_list[0].codec.as_ref()
    }

    /// Extracts this scheme's codeword out of `line` using its own
    /// `layout`/`pos` and the given codec's width.
    pub fn extract(&self, line: &CacheLine, codec: &dyn Codec) -> EccWord {
        crate::layout::extract(line, self.layout, self.pos, codec.bit_n())
    }
}

/// Shared interface every concrete ECC scheme implements (spec §4.G).
/// `Send + Sync` so a scheme can be shared by reference across the rayon
/// worker pool a multi-worker system evaluation shards trials over (spec §5).
pub trait Ecc: Send + Sync {
    fn name(&self) -> &str;
    fn state(&self) -> &EccState;
    fn state_mut(&mut self) -> &mut EccState;

    /// Extracts a codeword from `line` (via `state().layout`/`pos`) and
    /// decodes it, optionally consulting `erasure_hint` (chip/symbol
    /// positions the domain's faulty-chip detector flagged this access) for
    /// erasure-assisted schemes.
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult;

    /// Graceful-degradation postprocessing (QPC/OPC pin-count collapse,
    /// AMDChipkill's single-pin cap, ...). Identity by default.
    fn postprocess(&self, pre: &DecodeResult) -> crate::codec::Outcome {
        pre.outcome
    }

    /// Whether a corrected fault qualifies for retirement. Transient faults
    /// never do by default (spec §8 scenario E) — retiring a chip over an
    /// error that would have cleared on its own wastes retirement budget.
    /// Schemes without any correction capacity worth banking (e.g. a
    /// detection-only CRC) override this to always return `false`.
    fn need_retire(&self, fault: &Fault) -> bool {
        !fault.is_transient
    }

    fn initial_retired_blk_count(&self) -> usize {
        0
    }

    /// Public entry point (spec §4.G): runs `decode_internal`, then
    /// `postprocess` if the scheme enables it.
    fn decode(&self, line: &CacheLine, erasure_hint: &[usize]) -> crate::codec::Outcome {
        let pre = self.decode_internal(line, erasure_hint);
        if self.state().do_postprocess {
            self.postprocess(&pre)
        } else {
            pre.outcome
        }
    }
}
