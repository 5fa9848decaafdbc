//! Concrete ECC schemes (spec §4.G), each a thin policy wrapper over the
//! codec family: which codec(s), which layout, and which graceful-
//! degradation postprocessing and retirement rules apply.

use crate::codec::bch::Bch;
use crate::codec::crc::Crc;
use crate::codec::linear::BinaryLinear;
use crate::codec::rs::Rs;
use crate::codec::rs_dual::RsDual;
use crate::codec::{Codec, DecodeResult, Outcome};
use crate::ecc::{ConfigTier, Ecc, EccState};
use crate::error::Result;
use crate::fault::Fault;
use crate::layout::{CacheLine, Layout};

fn single_tier(codec: Box<dyn Codec + Send + Sync>, layout: Layout) -> EccState {
    EccState::new(
        layout,
        0,
        vec![ConfigTier {
            max_device_retirement: 0,
            max_pin_retirement: 0,
            codec,
        }],
    )
}

/// SEC-DED on a 72-bit interface (`prior.cc`'s `SECDED72b`): a single
/// Hsiao(72,64) tier, no postprocessing, every correction retires.
pub struct SecDed72b {
    state: EccState,
}

impl SecDed72b {
    pub fn new() -> Result<Self> {
        let codec = BinaryLinear::hsiao("SEC-DED (Hsiao)", 72, 64)?;
        Ok(SecDed72b {
            state: single_tier(Box::new(codec), Layout::Linear),
        })
    }
}

impl Ecc for SecDed72b {
    fn name(&self) -> &str {
        "SECDED72b"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
}

/// Single-symbol-correcting chipkill for x4 parts on a 144-bit interface
/// (`prior.cc`'s `S4SCD4SD144b`): plain RS(36,32) over GF(16), no
/// postprocessing.
pub struct S4Scd4Sd144b {
    state: EccState,
}

impl S4Scd4Sd144b {
    pub fn new() -> Result<Self> {
        let codec = Rs::new("S4SCD4SD 144b", 4, 36, 4, 1, 0)?;
        Ok(S4Scd4Sd144b {
            state: single_tier(Box::new(codec), Layout::Linear),
        })
    }
}

impl Ecc for S4Scd4Sd144b {
    fn name(&self) -> &str {
        "S4SCD4SD144b"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
}

/// Single-symbol-correcting chipkill for x8 parts (`prior.cc`'s `S8SC80b`/
/// `S8SC144b`): RS over GF(256), with postprocessing that downgrades any
/// correction touching more than one symbol to DUE (spec §4.G's graceful
/// degradation — a genuine single x8 chip failure never needs two symbols
/// fixed, so two-or-more is evidence of something the code cannot actually
/// cover).
pub struct S8Sc {
    state: EccState,
    name: &'static str,
}

impl S8Sc {
    pub fn new_80b() -> Result<Self> {
        let codec = Rs::new("S8SC80b", 8, 10, 2, 1, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(S8Sc {
            state,
            name: "S8SC80b",
        })
    }

    pub fn new_144b() -> Result<Self> {
        let codec = Rs::new("S8SC144b", 8, 18, 2, 1, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(S8Sc {
            state,
            name: "S8SC144b",
        })
    }
}

impl Ecc for S8Sc {
    fn name(&self) -> &str {
        self.name
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
    fn postprocess(&self, pre: &DecodeResult) -> Outcome {
        if pre.corrected_positions.len() > 1 {
            Outcome::Due
        } else {
            pre.outcome
        }
    }
}

/// AMD-style chipkill on a 72-bit interface (`prior.cc`'s `AMDChipkill72b`):
/// RS over GF(256) with the same single-symbol postprocessing cap as
/// [`S8Sc`]. Uses `Layout::Linear` rather than the hardware-accurate x4
/// lane-interleaved `Layout::Amd` ordering — like the QPC/OPC schemes below,
/// `Layout::Amd`'s extractor only fills one lane's beats per call rather
/// than a full codeword, so it cannot back a single-call decode (see
/// DESIGN.md).
pub struct AmdChipkill72b {
    state: EccState,
}

impl AmdChipkill72b {
    pub fn new() -> Result<Self> {
        let codec = Rs::new("S8SC w/ H (AMD)", 8, 18, 2, 1, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(AmdChipkill72b { state })
    }
}

impl Ecc for AmdChipkill72b {
    fn name(&self) -> &str {
        "AMDChipkill72b"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
    fn postprocess(&self, pre: &DecodeResult) -> Outcome {
        if pre.corrected_positions.len() > 1 {
            Outcome::Due
        } else {
            pre.outcome
        }
    }
}

/// Quad pin-count (QPC) on a 72b/76b interface (`prior.cc`'s `QPC72b`/
/// `QPC76b`): an RS code over x4 symbols with a `maxPins` budget. A
/// correction is only accepted past that budget if every corrected symbol
/// lands on the same chip (4 symbols/chip) — a genuine chip failure, not an
/// uncovered multi-chip event.
pub struct Qpc {
    state: EccState,
    max_pins: usize,
    symbols_per_chip: usize,
    name: &'static str,
}

impl Qpc {
    /// `correction` is symT, passed straight through as the code's
    /// correction-capability parameter (`Bamboo.cc`'s
    /// `QPC72b::QPC72b(correction, maxPins, ...)` -> `RS<2,8>("QPC...", 72, 8,
    /// correction)`); symR is fixed at 8 for this family, not derived from it.
    pub fn new_72b(correction: usize, max_pins: usize) -> Result<Self> {
        let codec = Rs::new("QPC", 8, 72, 8, correction, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(Qpc {
            state,
            max_pins,
            symbols_per_chip: 4,
            name: "QPC72b",
        })
    }

    pub fn new_76b(correction: usize, max_pins: usize) -> Result<Self> {
        let codec = Rs::new("QPC", 8, 76, 8, correction, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(Qpc {
            state,
            max_pins,
            symbols_per_chip: 4,
            name: "QPC76b",
        })
    }

    pub fn new_opc_80b() -> Result<Self> {
        let codec = Rs::new("OPC80b", 8, 80, 16, 8, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(Qpc {
            state,
            max_pins: 2,
            symbols_per_chip: 8,
            name: "OPC80b",
        })
    }

    pub fn new_opc_144b() -> Result<Self> {
        let codec = Rs::new("OPC144b", 8, 144, 16, 8, 0)?;
        let mut state = single_tier(Box::new(codec), Layout::Linear);
        state.do_postprocess = true;
        Ok(Qpc {
            state,
            max_pins: 2,
            symbols_per_chip: 8,
            name: "OPC144b",
        })
    }
}

impl Ecc for Qpc {
    fn name(&self) -> &str {
        self.name
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
    fn postprocess(&self, pre: &DecodeResult) -> Outcome {
        if pre.corrected_positions.len() <= 1 {
            return pre.outcome;
        }
        // A multi-symbol correction only survives when every corrected
        // symbol lands on the same physical chip (one genuine chip event,
        // not two independent faults the code cannot tell apart) and the
        // chip's pin budget isn't exceeded.
        let mut chip_pos = None;
        for &p in &pre.corrected_positions {
            let chip = p / self.symbols_per_chip;
            match chip_pos {
                None => chip_pos = Some(chip),
                Some(c) if c != chip => return Outcome::Due,
                _ => {}
            }
        }
        if pre.corrected_positions.len() > self.max_pins {
            return Outcome::Due;
        }
        pre.outcome
    }
}

/// Erasure-assisted DUO-family scheme (spec §4.G; `DUO.cc`'s general
/// shape): the no-erasure-hint path runs the plain RS codec, which falls
/// back to the DUO64bx4 burst-aligned correction (see
/// `Rs::try_correct_burst`) when BM/Chien can't place a correction; once a
/// fault domain flags a chip as faulty via `FaultDomain::detect_faulty_chips`,
/// those chip positions become erasure symbols for the dual decoder instead.
pub struct Duo {
    state: EccState,
    rs_dual: RsDual,
}

impl Duo {
    pub fn new(name: &str, m: u32, sym_n: usize, sym_r: usize, sym_t: usize, layout: Layout) -> Result<Self> {
        let rs_dual = RsDual::new(name, m, sym_n, sym_r, sym_t)?;
        // The plain (non-dual) RS view shares the dual decoder's shape; it is
        // only used here so `EccState::extract` has a `Codec` to read
        // `bit_n`/`bit_k` from, and to pick up the burst-aligned fallback
        // (`symB=4`) for the no-erasure-hint path in `decode_internal`.
        let codec = Rs::new(name, m, sym_n, sym_r, sym_t, 4)?;
        Ok(Duo {
            state: single_tier(Box::new(codec), layout),
            rs_dual,
        })
    }

    /// x4 DUO on a 36-bit-per-chip interface (`DUO.cc`'s `DUO72bx4` family):
    /// an 8-symbol erasure budget over GF(256).
    pub fn new_36bx4() -> Result<Self> {
        Self::new("DUO36bx4", 8, 36, 12, 6, Layout::Linear)
    }
}

impl Ecc for Duo {
    fn name(&self) -> &str {
        self.rs_dual.name()
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        if erasure_hint.is_empty() {
            codec.decode(&word)
        } else {
            self.rs_dual.decode_with_erasures(&word, erasure_hint)
        }
    }
}

/// Standalone CRC-8/ATM (spec §4.B.5, §4.G): detection-only, no
/// postprocessing, never retires (a CRC codeword carries no correction
/// capacity worth banking against a retirement budget).
pub struct Crc8AtmStandalone {
    state: EccState,
}

impl Crc8AtmStandalone {
    pub fn new(bit_n: usize, enable_1bitfix: bool) -> Result<Self> {
        let codec = Crc::crc8_atm("CRC8-ATM", bit_n, enable_1bitfix)?;
        Ok(Crc8AtmStandalone {
            state: single_tier(Box::new(codec), Layout::Linear),
        })
    }
}

impl Ecc for Crc8AtmStandalone {
    fn name(&self) -> &str {
        "CRC8-ATM"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
    fn need_retire(&self, _fault: &Fault) -> bool {
        false
    }
}

/// Binary BCH standalone scheme (spec §4.B.4, enrichment beyond
/// `prior.cc`'s RS/Hsiao-only catalogue): no postprocessing.
pub struct BchStandalone {
    state: EccState,
}

impl BchStandalone {
    pub fn new(name: &str, m: u32, bit_n: usize, design_t: usize) -> Result<Self> {
        let codec = Bch::new(name, m, bit_n, design_t)?;
        Ok(BchStandalone {
            state: single_tier(Box::new(codec), Layout::Linear),
        })
    }
}

impl Ecc for BchStandalone {
    fn name(&self) -> &str {
        "BCH"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let codec = self.state.primary_codec();
        let word = self.state.extract(line, codec);
        codec.decode(&word)
    }
}

/// On-chip SEC-DED plus rank-level chipkill, two-tier correction
/// (`prior.cc`'s `AMDChipkill_FLEX::decodeInternal` with `onchipecc=true`):
/// every chip's local Hsiao(36,32) first mops up single-bit errors it can
/// already see, then the rank-level RS codec runs on whatever residual
/// error survives that pass.
pub struct OnChipRankHybrid {
    state: EccState,
    onchip: BinaryLinear,
}

impl OnChipRankHybrid {
    pub fn new() -> Result<Self> {
        let onchip = BinaryLinear::hsiao("on-chip SEC-DED", 36, 32)?;
        let rank_codec = Rs::new("rank chipkill", 8, 18, 2, 1, 0)?;
        Ok(OnChipRankHybrid {
            state: single_tier(Box::new(rank_codec), Layout::Linear),
            onchip,
        })
    }
}

impl Ecc for OnChipRankHybrid {
    fn name(&self) -> &str {
        "OnChipRankHybrid"
    }
    fn state(&self) -> &EccState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut EccState {
        &mut self.state
    }
    fn decode_internal(&self, line: &CacheLine, _erasure_hint: &[usize]) -> DecodeResult {
        let mut corrected = line.clone();
        for chip in 0..corrected.num_chips() {
            let word = crate::layout::extract(&corrected, Layout::OnChip, chip, self.onchip.bit_n());
            if word.block.is_zero() {
                continue;
            }
            let result = self.onchip.decode(&word);
            if result.outcome == Outcome::Ce {
                for (beat, pin) in crate::layout::positions_to_pins(Layout::OnChip, &corrected, chip, &result.corrected_positions) {
                    let cur = corrected.bit_at(beat, pin);
                    corrected.set_bit_at(beat, pin, !cur);
                }
            }
        }
        let codec = self.state.primary_codec();
        let word = self.state.extract(&corrected, codec);
        codec.decode(&word)
    }
}

/// Stub for Huawei-style cross-parity schemes (spec §9 Design Notes'
/// enrichment list): the production XED scheme layers a transparent
/// on-chip code under a rank-level chipkill code exactly like
/// [`OnChipRankHybrid`]; this variant names that production target and
/// defers entirely to the already-built two-tier primitive rather than
/// re-deriving it.
pub struct Xed(OnChipRankHybrid);

impl Xed {
    pub fn new() -> Result<Self> {
        Ok(Xed(OnChipRankHybrid::new()?))
    }
}

impl Ecc for Xed {
    fn name(&self) -> &str {
        "XED"
    }
    fn state(&self) -> &EccState {
        self.0.state()
    }
    fn state_mut(&mut self) -> &mut EccState {
        self.0.state_mut()
    }
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult {
        self.0.decode_internal(line, erasure_hint)
    }
}

/// Stub for REGB (regional ECC with a bypass path): the production scheme
/// falls back from a fast single-symbol-correcting code to a stronger one
/// under sustained error pressure, which this framework already expresses
/// as [`S8Sc`]'s single-symbol postprocessing cap.
pub struct Regb(S8Sc);

impl Regb {
    pub fn new() -> Result<Self> {
        Ok(Regb(S8Sc::new_144b()?))
    }
}

impl Ecc for Regb {
    fn name(&self) -> &str {
        "REGB"
    }
    fn state(&self) -> &EccState {
        self.0.state()
    }
    fn state_mut(&mut self) -> &mut EccState {
        self.0.state_mut()
    }
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult {
        self.0.decode_internal(line, erasure_hint)
    }
    fn postprocess(&self, pre: &DecodeResult) -> Outcome {
        self.0.postprocess(pre)
    }
}

/// Stub for LOT (a lower-overhead pin-count chipkill variant): deferred to
/// [`Qpc`]'s same-chip-survives postprocessing, which LOT shares.
pub struct Lot(Qpc);

impl Lot {
    pub fn new() -> Result<Self> {
        Ok(Lot(Qpc::new_72b(8, 1)?))
    }
}

impl Ecc for Lot {
    fn name(&self) -> &str {
        "LOT"
    }
    fn state(&self) -> &EccState {
        self.0.state()
    }
    fn state_mut(&mut self) -> &mut EccState {
        self.0.state_mut()
    }
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult {
        self.0.decode_internal(line, erasure_hint)
    }
    fn postprocess(&self, pre: &DecodeResult) -> Outcome {
        self.0.postprocess(pre)
    }
}

/// Stub for MultiECC (a configurable multi-tier erasure+error scheme):
/// deferred to [`Duo`], the erasure-assisted primitive MultiECC's
/// strongest tier is built from.
pub struct MultiEcc(Duo);

impl MultiEcc {
    pub fn new() -> Result<Self> {
        Ok(MultiEcc(Duo::new_36bx4()?))
    }
}

impl Ecc for MultiEcc {
    fn name(&self) -> &str {
        "MultiECC"
    }
    fn state(&self) -> &EccState {
        self.0.state()
    }
    fn state_mut(&mut self) -> &mut EccState {
        self.0.state_mut()
    }
    fn decode_internal(&self, line: &CacheLine, erasure_hint: &[usize]) -> DecodeResult {
        self.0.decode_internal(line, erasure_hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::DramGeometry;

    fn line_with_bit(geometry: &DramGeometry, beat: usize, pin: usize) -> CacheLine {
        let mut line = CacheLine::new(geometry.chip_width, geometry.channel_width, geometry.beat_height);
        line.set_bit_at(beat, pin, true);
        line
    }

    #[test]
    fn secded72b_corrects_single_bit() {
        let scheme = SecDed72b::new().unwrap();
        let geometry = DramGeometry {
            channel_width: 72,
            chip_width: 72,
            beat_height: 1,
            ..DramGeometry::ddr5()
        };
        let line = line_with_bit(&geometry, 0, 14);
        assert_eq!(scheme.decode(&line, &[]), Outcome::Ce);
    }

    #[test]
    fn s8sc80b_two_symbol_correction_downgrades_to_due() {
        // Hand-build a two-symbol (16-bit) error on an RS(10,8) codeword;
        // within this code's single-symbol correction budget the decoder
        // will report a DUE/SDC outcome on its own (two full symbols exceeds
        // t=1), but the postprocess cap exists for the boundary the codec
        // alone cannot express: a correction that nominally succeeds but
        // touches more positions than the scheme trusts.
        let scheme = S8Sc::new_80b().unwrap();
        let pre = DecodeResult {
            outcome: Outcome::Ce,
            decoded: crate::layout::EccWord::new(80, 64),
            corrected_positions: [0usize, 1usize].into_iter().collect(),
        };
        assert_eq!(scheme.postprocess(&pre), Outcome::Due);
    }

    #[test]
    fn qpc_same_chip_multi_pin_correction_survives() {
        let scheme = Qpc::new_72b(4, 2).unwrap();
        let pre = DecodeResult {
            outcome: Outcome::Ce,
            decoded: crate::layout::EccWord::new(72, 40),
            corrected_positions: [0usize, 1usize].into_iter().collect(),
        };
        // positions 0,1 both fall in chip 0 (symbols_per_chip=4), within maxPins=2
        assert_eq!(scheme.postprocess(&pre), Outcome::Ce);
    }

    #[test]
    fn qpc_cross_chip_multi_pin_correction_downgrades() {
        let scheme = Qpc::new_72b(3, 1).unwrap();
        let pre = DecodeResult {
            outcome: Outcome::Ce,
            decoded: crate::layout::EccWord::new(72, 40),
            corrected_positions: [0usize, 4usize].into_iter().collect(),
        };
        assert_eq!(scheme.postprocess(&pre), Outcome::Due);
    }
}
