//! End-to-end worked scenarios: each test drives a concrete scheme's public
//! `Ecc`/`Codec` surface against a hand-built `CacheLine`, the same way the
//! six worked examples trace through the reliability model by hand.

use dram_ecc_sim::codec::Outcome;
use dram_ecc_sim::ecc::schemes::{AmdChipkill72b, Crc8AtmStandalone, Duo, Qpc, SecDed72b};
use dram_ecc_sim::ecc::Ecc;
use dram_ecc_sim::fault::{Fault, FaultKind};
use dram_ecc_sim::layout::CacheLine;

fn flip(line: &mut CacheLine, beat: usize, pin: usize) {
    let cur = line.bit_at(beat, pin);
    line.set_bit_at(beat, pin, !cur);
}

/// A: single-bit error on a Hsiao(72,64) SEC-DED interface corrects. Chip 3,
/// local pin 2 (chip width 4) lands at absolute bit `3*4 + 2 = 14`.
#[test]
fn scenario_a_secded72b_single_bit_corrects() {
    let scheme = SecDed72b::new().unwrap();
    let mut line = CacheLine::new(4, 72, 1);
    flip(&mut line, 0, 14);
    let pre = scheme.decode_internal(&line, &[]);
    assert_eq!(pre.outcome, Outcome::Ce);
    assert_eq!(scheme.decode(&line, &[]), Outcome::Ce);
}

/// B: QPC72b(correction=4, maxPins=2), two single-bit faults landing on
/// distinct chips (symbols 0 and 4, 4 symbols/chip) downgrade to DUE even
/// though the RS code itself (t=2) could correct both.
#[test]
fn scenario_b_qpc72b_cross_chip_correction_downgrades_to_due() {
    let scheme = Qpc::new_72b(4, 2).unwrap();
    let mut line = CacheLine::new(32, 576, 1);
    flip(&mut line, 0, 0 * 8 + 3); // symbol 0, chip 0
    flip(&mut line, 0, 4 * 8 + 3); // symbol 4, chip 1
    let pre = scheme.decode_internal(&line, &[]);
    assert_eq!(pre.outcome, Outcome::Ce, "RS(72,4) alone corrects two symbol errors");
    assert_eq!(pre.corrected_positions.len(), 2);
    assert_eq!(scheme.decode(&line, &[]), Outcome::Due);
}

/// C: same scheme, two single-bit faults on symbols 4 and 5 — same chip
/// (chip 1) — survive as CE.
#[test]
fn scenario_c_qpc72b_same_chip_correction_survives() {
    let scheme = Qpc::new_72b(4, 2).unwrap();
    let mut line = CacheLine::new(32, 576, 1);
    flip(&mut line, 0, 4 * 8 + 1); // symbol 4, chip 1
    flip(&mut line, 0, 5 * 8 + 6); // symbol 5, chip 1
    let pre = scheme.decode_internal(&line, &[]);
    assert_eq!(pre.outcome, Outcome::Ce);
    assert_eq!(scheme.decode(&line, &[]), Outcome::Ce);
}

/// D: AMDChipkill72b, one chip fault (chip 5 = RS symbol 5, x8 part) flips
/// two bits within that single symbol — one symbol error, within the
/// scheme's t=1 budget, corrects and survives postprocessing.
#[test]
fn scenario_d_amd_chipkill72b_single_chip_fault_corrects() {
    let scheme = AmdChipkill72b::new().unwrap();
    let mut line = CacheLine::new(8, 144, 1);
    flip(&mut line, 0, 5 * 8 + 1);
    flip(&mut line, 0, 5 * 8 + 6);
    let pre = scheme.decode_internal(&line, &[]);
    assert_eq!(pre.outcome, Outcome::Ce);
    assert_eq!(pre.corrected_positions.len(), 1);
    assert_eq!(scheme.decode(&line, &[]), Outcome::Ce);
}

/// E: DUO36bx4, a single-bit transient fault corrects (well within the
/// dual decoder's plain-RS correction budget) but, unlike a permanent
/// fault, never qualifies for retirement.
#[test]
fn scenario_e_duo36bx4_transient_fault_corrects_without_retiring() {
    let scheme = Duo::new_36bx4().unwrap();
    let mut line = CacheLine::new(36, 288, 1);
    flip(&mut line, 0, 10);
    let pre = scheme.decode_internal(&line, &[]);
    assert_eq!(pre.outcome, Outcome::Ce);

    let transient = Fault {
        kind: FaultKind::Sbit,
        mask: 0,
        fixed_addr: 0,
        pins: vec![2],
        chip_pos: 0,
        beat_start: 0,
        beat_end: 0,
        is_transient: true,
        num_dq: 1,
        affected_blk_count: 0,
        overlaps_inherent: false,
    };
    assert!(!scheme.need_retire(&transient), "a transient fault must not consume retirement budget");

    let permanent = Fault {
        is_transient: false,
        ..transient
    };
    assert!(scheme.need_retire(&permanent));
}

/// F: CRC8-ATM, a three-bit error (beyond the code's single-bit-fix table)
/// never silently reports CE — it reports DUE or, if the syndrome aliases
/// another single-bit position, SDC.
#[test]
fn scenario_f_crc8_atm_triple_bit_error_never_ce() {
    let scheme = Crc8AtmStandalone::new(72, true).unwrap();
    let mut line = CacheLine::new(72, 72, 1);
    flip(&mut line, 0, 2);
    flip(&mut line, 0, 15);
    flip(&mut line, 0, 33);
    let outcome = scheme.decode(&line, &[]);
    assert_ne!(outcome, Outcome::Ce);
    assert!(matches!(outcome, Outcome::Due | Outcome::Sdc));
}
