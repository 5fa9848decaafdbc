//! Ambient configuration: the `SystemCatalog` TOML file resolving opaque
//! `system-id` integers (spec §6) into a concrete `(DramGeometry, EccScheme,
//! scrub interval)` triple, and the bespoke `input_FIT.conf` line parser
//! (spec §6, Module D).

use crate::error::{EccSimError, Result};
use crate::fault::DramGeometry;
use serde::Deserialize;
use std::path::Path;

/// Resolves a CLI `dram-type` token (spec §6) to a concrete geometry.
/// Unrecognized tokens fall back to the `DDR5` preset, matching spec §6's
/// "other" catch-all.
pub fn dram_geometry_for(dram_type: &str) -> DramGeometry {
    match dram_type {
        "HBM3" => DramGeometry::hbm3(),
        "LPDDR5_SPLIT" => DramGeometry::lpddr5_split(),
        "LPDDR5_MERGE" => DramGeometry::lpddr5_merge(),
        _ => DramGeometry::ddr5(),
    }
}

/// One `SystemCatalog` entry: the preconfigured `(DomainGroup, ECC,
/// scrubber)` triple a `system-id` dispatches to (spec §6).
#[derive(Clone, Debug, Deserialize)]
pub struct SystemEntry {
    pub dram_type: String,
    pub ecc_scheme: String,
    #[serde(default = "default_scrub_interval")]
    pub scrub_interval_accesses: u64,
    #[serde(default = "default_num_domains")]
    pub num_domains: usize,
}

fn default_scrub_interval() -> u64 {
    1_000_000
}

fn default_num_domains() -> usize {
    1
}

#[derive(Clone, Debug, Deserialize, Default)]
struct SystemCatalogFile {
    #[serde(default)]
    system: std::collections::BTreeMap<String, SystemEntry>,
}

/// TOML-backed map from `system-id` to [`SystemEntry`] (spec §10: "this is
/// that catalog, analogous to the teacher's `FecConfig::from_toml`").
#[derive(Clone, Debug, Default)]
pub struct SystemCatalog {
    entries: std::collections::BTreeMap<u32, SystemEntry>,
}

impl SystemCatalog {
    pub fn from_toml(s: &str) -> Result<Self> {
        let file: SystemCatalogFile = toml::from_str(s)
            .map_err(|e| EccSimError::UsageError(format!("invalid system catalog: {e}")))?;
        let mut entries = std::collections::BTreeMap::new();
        for (id, entry) in file.system {
            let id: u32 = id
                .parse()
                .map_err(|_| EccSimError::UsageError(format!("non-numeric system-id key: {id}")))?;
            entries.insert(id, entry);
        }
        Ok(SystemCatalog { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EccSimError::UsageError(format!("cannot read system catalog {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn lookup(&self, system_id: u32) -> Result<&SystemEntry> {
        self.entries
            .get(&system_id)
            .ok_or(EccSimError::UnsupportedSystemId(system_id))
    }
}

/// Parses `input_FIT.conf` (spec §6): one `"fault-name",<float-FIT-rate>`
/// record per line. Lines with missing quotes or a negative rate are skipped
/// with a warning (spec §7's `FitInputParseError`, recoverable).
pub fn parse_fit_conf(contents: &str) -> Vec<(String, f64)> {
    let mut rates = Vec::new();
    for (lineno, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        match parse_fit_line(line) {
            Ok((name, rate)) => rates.push((name, rate)),
            Err(reason) => {
                log::warn!("skipping malformed FIT input line {}: {}", lineno + 1, reason);
            }
        }
    }
    rates
}

fn parse_fit_line(line: &str) -> std::result::Result<(String, f64), String> {
    let first_quote = line.find('"').ok_or("missing opening quote")?;
    let rest = &line[first_quote + 1..];
    let second_quote = rest.find('"').ok_or("missing closing quote")?;
    let name = &rest[..second_quote];
    let after = &rest[second_quote + 1..];
    let rate_str = after.trim_start_matches(',').trim();
    let rate: f64 = rate_str.parse().map_err(|_| format!("unparseable rate {rate_str:?}"))?;
    if rate < 0.0 {
        return Err(format!("negative rate {rate}"));
    }
    Ok((name.to_string(), rate))
}

/// Reads and parses `input_FIT.conf` in full. Unlike a malformed individual
/// line (recoverable, skipped with a warning), failure to open the file at
/// all is the fatal `FitInputParseError` of spec §7 (CLI exit code 3).
pub fn parse_fit_conf_file(path: &Path) -> Result<Vec<(String, f64)>> {
    let contents = std::fs::read_to_string(path).map_err(|e| EccSimError::FitInputParseError {
        line: 0,
        reason: format!("cannot read {}: {e}", path.display()),
    })?;
    Ok(parse_fit_conf(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_line_parses() {
        assert_eq!(parse_fit_line("\"SBIT\",123.5"), Ok(("SBIT".to_string(), 123.5)));
    }

    #[test]
    fn missing_quotes_is_an_error() {
        assert!(parse_fit_line("SBIT,123.5").is_err());
    }

    #[test]
    fn negative_rate_is_an_error() {
        assert!(parse_fit_line("\"SBIT\",-1.0").is_err());
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let contents = "\"SBIT\",1.0\nmalformed\n\"SROW\",-5.0\n\"SCOL\",2.5\n";
        let rates = parse_fit_conf(contents);
        assert_eq!(rates, vec![("SBIT".to_string(), 1.0), ("SCOL".to_string(), 2.5)]);
    }

    #[test]
    fn system_catalog_round_trips_from_toml() {
        let toml_src = r#"
            [system.1]
            dram_type = "DDR5"
            ecc_scheme = "SECDED72b"
            scrub_interval_accesses = 500000
            num_domains = 2
        "#;
        let catalog = SystemCatalog::from_toml(toml_src).unwrap();
        let entry = catalog.lookup(1).unwrap();
        assert_eq!(entry.dram_type, "DDR5");
        assert_eq!(entry.num_domains, 2);
        assert!(catalog.lookup(2).is_err());
    }
}
