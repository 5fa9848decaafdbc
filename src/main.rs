use clap::Parser;
use dram_ecc_sim::app_config::{dram_geometry_for, parse_fit_conf_file, SystemCatalog};
use dram_ecc_sim::domain::{DomainGroup, FaultDomain};
use dram_ecc_sim::ecc::schemes::{
    AmdChipkill72b, BchStandalone, Crc8AtmStandalone, Duo, Lot, MultiEcc, OnChipRankHybrid, Qpc, Regb, S4Scd4Sd144b, S8Sc, SecDed72b, Xed,
};
use dram_ecc_sim::ecc::Ecc;
use dram_ecc_sim::error::{EccSimError, Result};
use dram_ecc_sim::fault::rate::{FaultRateInfo, InherentRate, ModuleProfiles};
use dram_ecc_sim::fault::FaultKind;
use dram_ecc_sim::layout::Layout;
use dram_ecc_sim::tester::Tester;
use log::error;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// `prog <system-id> <num-trials> <seed> <mode> [mode-specific args...]
/// <module-id> <dram-type>` (spec §6). The mode-specific tail has a
/// mode-dependent length, so positional parsing happens by hand against the
/// trailing var-arg list rather than through clap's derive positionals.
#[derive(Parser, Debug)]
#[command(author, version, about = "Monte-Carlo DRAM ECC reliability simulator", long_about = None)]
struct Cli {
    /// Print the accumulated telemetry counters to the log at exit.
    #[arg(long)]
    telemetry: bool,
    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
    /// Path to the system catalog TOML file.
    #[arg(long, default_value = "systems.toml")]
    catalog: PathBuf,
    /// Output file prefix (spec §6: `<prefix>.<module-suffix>`).
    #[arg(long, default_value = "result")]
    output_prefix: String,
    /// Number of rayon worker threads to shard a system-eval run's trials
    /// across (spec §5); 1 runs the sequential path directly.
    #[arg(long, default_value_t = 1)]
    workers: usize,
    /// `system-id num-trials seed mode [mode-args...] module-id dram-type`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    args: Vec<String>,
}

struct ParsedArgs {
    system_id: u32,
    num_trials: u64,
    seed: u64,
    mode: String,
    mode_args: Vec<String>,
    module_id: u32,
    dram_type: String,
}

fn parse_positional(args: &[String]) -> Result<ParsedArgs> {
    if args.len() < 6 {
        return Err(EccSimError::UsageError(format!(
            "expected at least 6 positional arguments, got {}",
            args.len()
        )));
    }
    let system_id: u32 = args[0].parse().map_err(|_| EccSimError::UsageError(format!("bad system-id {:?}", args[0])))?;
    let num_trials: u64 = args[1].parse().map_err(|_| EccSimError::UsageError(format!("bad num-trials {:?}", args[1])))?;
    let seed: u64 = args[2].parse().map_err(|_| EccSimError::UsageError(format!("bad seed {:?}", args[2])))?;
    let mode = args[3].clone();

    let (mode_args, module_id, dram_type) = if mode == "S" {
        if args.len() != 10 {
            return Err(EccSimError::UsageError(
                "mode S requires exactly 4 arguments: permanent-rate permanent-activation intermittent-rate intermittent-activation".to_string(),
            ));
        }
        (args[4..8].to_vec(), args[8].clone(), args[9].clone())
    } else {
        if args.len() < 6 {
            return Err(EccSimError::UsageError("scenario mode requires at least one fault-kind code".to_string()));
        }
        let tail = &args[4..args.len() - 2];
        (tail.to_vec(), args[args.len() - 2].clone(), args[args.len() - 1].clone())
    };

    let module_id: u32 = module_id.parse().map_err(|_| EccSimError::UsageError(format!("bad module-id {module_id:?}")))?;
    Ok(ParsedArgs {
        system_id,
        num_trials,
        seed,
        mode,
        mode_args,
        module_id,
        dram_type,
    })
}

/// Builds the `FaultRateInfo` table for `module_id` (spec §6): 0-3 select a
/// hard-coded module profile (0 being empty/inherent-only), 4 loads
/// `input_FIT.conf`.
fn build_rate_info(module_id: u32) -> Result<FaultRateInfo> {
    let inherent = InherentRate::new(1.0e-11, 0.2, 1.0e-9, 0.05);
    let mut rate_info = FaultRateInfo::new(inherent);
    match module_id {
        0 => {}
        1 => {
            for (name, rate) in ModuleProfiles::module('A') {
                rate_info.add_rate(name, rate);
            }
        }
        2 => {
            for (name, rate) in ModuleProfiles::module('B') {
                rate_info.add_rate(name, rate);
            }
        }
        3 => {
            for (name, rate) in ModuleProfiles::module('C') {
                rate_info.add_rate(name, rate);
            }
        }
        4 => {
            let entries = parse_fit_conf_file(std::path::Path::new("input_FIT.conf"))?;
            for (name, rate) in entries {
                rate_info.add_rate(&name, rate);
            }
        }
        other => return Err(EccSimError::UsageError(format!("module-id must be 0-4, got {other}"))),
    }
    Ok(rate_info)
}

/// Resolves an `ecc_scheme` catalog name (spec §10's `SystemCatalog`) to a
/// concrete scheme. Unknown names are a fatal usage error, never a silent
/// default.
fn build_scheme(name: &str) -> Result<Box<dyn Ecc>> {
    let scheme: Box<dyn Ecc> = match name {
        "SECDED72b" => Box::new(SecDed72b::new()?),
        "S4SCD4SD144b" => Box::new(S4Scd4Sd144b::new()?),
        "S8SC80b" => Box::new(S8Sc::new_80b()?),
        "S8SC144b" => Box::new(S8Sc::new_144b()?),
        "AMDChipkill72b" => Box::new(AmdChipkill72b::new()?),
        "QPC72b" => Box::new(Qpc::new_72b(4, 2)?),
        "QPC76b" => Box::new(Qpc::new_76b(4, 2)?),
        "OPC80b" => Box::new(Qpc::new_opc_80b()?),
        "OPC144b" => Box::new(Qpc::new_opc_144b()?),
        "DUO36bx4" => Box::new(Duo::new_36bx4()?),
        "OnChipRankHybrid" => Box::new(OnChipRankHybrid::new()?),
        "CRC8-ATM" => Box::new(Crc8AtmStandalone::new(64, true)?),
        "BCH" => Box::new(BchStandalone::new("BCH", 8, 255, 4)?),
        "XED" => Box::new(Xed::new()?),
        "REGB" => Box::new(Regb::new()?),
        "LOT" => Box::new(Lot::new()?),
        "MultiECC" => Box::new(MultiEcc::new()?),
        other => return Err(EccSimError::UsageError(format!("unknown ecc_scheme {other:?} in system catalog"))),
    };
    Ok(scheme)
}

/// Maps a spec §6 scenario fault-kind code onto the internal `FaultKind`
/// taxonomy. The external code set is richer than the internal enum (it
/// names physical sub-structures the simulator scopes to one bank); codes
/// without a direct counterpart fall back to their nearest structural
/// analogue, documented in DESIGN.md.
fn fault_kind_from_code(code: &str) -> Option<FaultKind> {
    let base = code.split('-').next().unwrap_or(code);
    match base {
        "b" | "sbit" => Some(FaultKind::Sbit),
        "w" | "sword" => Some(FaultKind::Sword),
        "p" => Some(FaultKind::Scol),
        "c" => Some(FaultKind::Sbank),
        "r" => Some(FaultKind::Channel),
        _ if base.starts_with("scol") => Some(FaultKind::Scol),
        _ if base.starts_with("srow") => Some(FaultKind::Srow),
        _ if base.starts_with("sbank") => Some(FaultKind::Sbank),
        _ if base.starts_with("mbank") => Some(FaultKind::Mbank),
        _ if base.starts_with("mrank") => Some(FaultKind::Mrank),
        _ if base.starts_with('i') && base[1..].parse::<u32>().is_ok() => Some(FaultKind::Inherent),
        "bank_control_bank_8diff" => Some(FaultKind::BankPattern),
        "decoder_multi_col" => Some(FaultKind::Cdec),
        "local_wordline" => Some(FaultKind::Lwl),
        "lwl_sel" => Some(FaultKind::Lwl),
        "mutli_csls" => Some(FaultKind::Csl),
        "not_clustered_single_bank" => Some(FaultKind::BankPattern),
        "row_decoder" => Some(FaultKind::Rdec),
        "single_sense_amp" => Some(FaultKind::Blsa),
        "subarray_row_decoder" => Some(FaultKind::Rdec),
        _ => None,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::from_default_env().filter_level(level).init();

    let parsed = parse_positional(&cli.args)?;
    let catalog = SystemCatalog::from_file(&cli.catalog)?;
    let entry = catalog.lookup(parsed.system_id)?;

    let geometry = dram_geometry_for(&dram_type_override(&entry.dram_type, &parsed.dram_type));
    let scheme = build_scheme(&entry.ecc_scheme)?;
    let rate_info = build_rate_info(parsed.module_id)?;

    let mut rng = StdRng::seed_from_u64(parsed.seed);
    let build_domains = || -> DomainGroup {
        let domains: Vec<FaultDomain> = (0..entry.num_domains.max(1))
            .map(|_| FaultDomain::new(geometry, Layout::Linear, 0, rate_info.clone()))
            .collect();
        DomainGroup::new(domains)
    };

    let output_path = format!("{}.{}", cli.output_prefix, parsed.module_id);
    if parsed.mode == "S" {
        let result = if cli.workers > 1 {
            let trials_per_worker = (parsed.num_trials / cli.workers as u64).max(1);
            dram_ecc_sim::tester::run_system_eval_parallel(
                scheme.as_ref(),
                build_domains,
                entry.scrub_interval_accesses,
                10,
                1.0e6,
                cli.workers,
                trials_per_worker,
                parsed.seed,
            )
        } else {
            let mut tester = Tester::new(build_domains(), scheme.as_ref(), entry.scrub_interval_accesses, 10, 1.0e6);
            tester.run_system_eval(parsed.num_trials, &mut rng)
        };
        write_system_eval_output(&output_path, &result)?;
    } else {
        let mut tester = Tester::new(build_domains(), scheme.as_ref(), entry.scrub_interval_accesses, 10, 1.0e6);
        let codes: Vec<FaultKind> = parsed
            .mode_args
            .iter()
            .map(|c| fault_kind_from_code(c).ok_or_else(|| EccSimError::FaultKindNotImplemented(c.clone())))
            .collect::<Result<_>>()?;
        let outcome = tester.run_scenario_eval(&codes, &[], &[], &mut rng);
        dram_ecc_sim::telemetry::record_outcome(outcome);
        println!("{}", outcome.name());
    }

    if cli.telemetry {
        dram_ecc_sim::telemetry::flush();
    }
    Ok(())
}

/// The CLI's positional `dram-type` token takes precedence over the
/// catalog's default when both are present and differ, letting `system-id`
/// pin a scheme while leaving geometry selectable per run.
fn dram_type_override(catalog_default: &str, cli_value: &str) -> String {
    if cli_value.is_empty() || cli_value == "-" {
        catalog_default.to_string()
    } else {
        cli_value.to_string()
    }
}

fn write_system_eval_output(path: &str, result: &dram_ecc_sim::tester::SystemEvalResult) -> Result<()> {
    let mut file = std::fs::File::create(path).map_err(|e| EccSimError::UsageError(format!("cannot write {path}: {e}")))?;
    writeln!(file, "After {} runs", result.runs).ok();
    let overall = result.per_year.iter().fold((0u64, 0u64, 0u64, 0u64), |acc, y| {
        (acc.0 + y.ne, acc.1 + y.ce, acc.2 + y.due, acc.3 + y.sdc)
    });
    let total = (overall.0 + overall.1 + overall.2 + overall.3).max(1) as f64;
    writeln!(file, "NE   {}", overall.0 as f64 / total).ok();
    writeln!(file, "CE   {}", overall.1 as f64 / total).ok();
    writeln!(file, "DUE  {:?}", result.per_year.iter().map(|y| y.due_prob()).collect::<Vec<_>>()).ok();
    writeln!(file, "SDC  {:?}", result.per_year.iter().map(|y| y.sdc_prob()).collect::<Vec<_>>()).ok();
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(0),
        Err(EccSimError::UsageError(msg)) => {
            error!("{msg}");
            ExitCode::from(1)
        }
        Err(EccSimError::UnsupportedSystemId(id)) => {
            error!("unsupported system-id {id}");
            ExitCode::from(2)
        }
        Err(EccSimError::FitInputParseError { line, reason }) => {
            error!("FIT input error at line {line}: {reason}");
            ExitCode::from(3)
        }
        Err(other) => {
            error!("{other}");
            ExitCode::from(1)
        }
    }
}

