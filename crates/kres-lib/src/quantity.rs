//! Kubernetes quantity conversion
//!
//! Converts resource quantity strings into the canonical units used
//! throughout kres:
//! - CPU in millicores (`500m`, `2`, `1500000000n`, `2500000u`)
//! - Memory in megabytes (`512Mi`, `2048Ki`, `1Gi`, `1048576`)
//!
//! Forms are tried in a fixed order and the first match wins. Anything
//! that matches no form is rejected with a [`QuantityError`].

use crate::error::QuantityError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Resource kinds kres knows how to normalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    /// Key used for this resource in Kubernetes resource maps
    pub fn key(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
        }
    }

    /// Display suffix of the canonical unit
    pub fn unit(&self) -> &'static str {
        match self {
            ResourceKind::Cpu => "m",
            ResourceKind::Memory => "Mi",
        }
    }

    /// Convert a raw quantity string of this kind to canonical units
    pub fn convert(&self, raw: &str) -> Result<u64, QuantityError> {
        match self {
            ResourceKind::Cpu => cpu_as_millicores(raw),
            ResourceKind::Memory => memory_as_megabytes(raw),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Copy)]
enum Scale {
    Mul(u64),
    Div(u64),
}

struct UnitForm {
    pattern: &'static str,
    scale: Scale,
}

const CPU_FORMS: [UnitForm; 4] = [
    UnitForm { pattern: r"^([0-9]{1,9})m$", scale: Scale::Mul(1) },
    UnitForm { pattern: r"^([0-9]{1,4})$", scale: Scale::Mul(1000) },
    UnitForm { pattern: r"^([0-9]{1,15})n$", scale: Scale::Div(1_000_000) },
    UnitForm { pattern: r"^([0-9]{1,15})u$", scale: Scale::Div(1000) },
];

// Mi and M are not told apart at this precision, same for Ki/K and Gi/G.
const MEMORY_FORMS: [UnitForm; 4] = [
    UnitForm { pattern: r"^([0-9]{1,9})Mi?$", scale: Scale::Mul(1) },
    UnitForm { pattern: r"^([0-9]{1,9})Ki?$", scale: Scale::Div(1024) },
    UnitForm { pattern: r"^([0-9]{1,9})Gi?$", scale: Scale::Mul(1024) },
    UnitForm { pattern: r"^([0-9]{1,19})$", scale: Scale::Div(1024 * 1024) },
];

static CPU_PATTERNS: OnceLock<Vec<(Regex, Scale)>> = OnceLock::new();
static MEMORY_PATTERNS: OnceLock<Vec<(Regex, Scale)>> = OnceLock::new();

fn compile(forms: &[UnitForm]) -> Vec<(Regex, Scale)> {
    forms
        .iter()
        .map(|form| {
            let regex = Regex::new(form.pattern).expect("unit patterns are valid regexes");
            (regex, form.scale)
        })
        .collect()
}

fn convert(
    raw: &str,
    resource: ResourceKind,
    patterns: &[(Regex, Scale)],
) -> Result<u64, QuantityError> {
    let malformed = || QuantityError {
        resource,
        raw: raw.to_string(),
    };

    for (regex, scale) in patterns {
        let Some(captures) = regex.captures(raw) else {
            continue;
        };

        let digits: u64 = captures[1].parse().map_err(|_| malformed())?;
        let value = match *scale {
            Scale::Mul(factor) => digits.checked_mul(factor).ok_or_else(malformed)?,
            Scale::Div(divisor) => digits / divisor,
        };
        return Ok(value);
    }

    Err(malformed())
}

/// Convert a CPU quantity to millicores
///
/// Accepted forms, in order: `<n>m` (1-9 digits), `<n>` whole cores
/// (1-4 digits), `<n>n` nanocores and `<n>u` microcores (1-15 digits).
/// Division truncates.
pub fn cpu_as_millicores(raw: &str) -> Result<u64, QuantityError> {
    let patterns = CPU_PATTERNS.get_or_init(|| compile(&CPU_FORMS));
    convert(raw, ResourceKind::Cpu, patterns)
}

/// Convert a memory quantity to megabytes
///
/// Accepted forms, in order: `<n>M`/`<n>Mi`, `<n>K`/`<n>Ki`, `<n>G`/`<n>Gi`
/// (1-9 digits each) and a bare byte count. Division truncates.
pub fn memory_as_megabytes(raw: &str) -> Result<u64, QuantityError> {
    let patterns = MEMORY_PATTERNS.get_or_init(|| compile(&MEMORY_FORMS));
    convert(raw, ResourceKind::Memory, patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_millicores_passthrough() {
        for n in [0u64, 1, 250, 999, 1500, 123_456_789] {
            assert_eq!(cpu_as_millicores(&format!("{}m", n)).unwrap(), n);
        }
    }

    #[test]
    fn test_cpu_whole_cores() {
        for n in [0u64, 1, 4, 64, 9999] {
            assert_eq!(cpu_as_millicores(&n.to_string()).unwrap(), n * 1000);
        }
    }

    #[test]
    fn test_cpu_nanocores_and_microcores() {
        assert_eq!(cpu_as_millicores("1500000000n").unwrap(), 1500);
        assert_eq!(cpu_as_millicores("2500000u").unwrap(), 2500);
        // Truncates toward zero
        assert_eq!(cpu_as_millicores("999999n").unwrap(), 0);
        assert_eq!(cpu_as_millicores("1999999n").unwrap(), 1);
        assert_eq!(cpu_as_millicores("1999u").unwrap(), 1);
    }

    #[test]
    fn test_cpu_digit_limits() {
        assert!(cpu_as_millicores("1234567890m").is_err());
        assert!(cpu_as_millicores("12345").is_err());
        assert!(cpu_as_millicores("1234567890123456n").is_err());
        assert!(cpu_as_millicores("1234567890123456u").is_err());
        assert_eq!(cpu_as_millicores("999999999999999n").unwrap(), 999_999_999);
    }

    /// Unmatched CPU strings are a hard error instead of a silently
    /// reused value.
    #[test]
    fn test_cpu_rejects_unknown_forms() {
        for raw in ["", "m", "1.5", "0.5", "2k", "-1", "100M", " 1", "1 ", "1e3"] {
            let err = cpu_as_millicores(raw).unwrap_err();
            assert_eq!(err.resource, ResourceKind::Cpu);
            assert_eq!(err.raw, raw);
        }
    }

    #[test]
    fn test_memory_suffix_matrix() {
        assert_eq!(memory_as_megabytes("512Mi").unwrap(), 512);
        assert_eq!(memory_as_megabytes("512M").unwrap(), 512);
        assert_eq!(memory_as_megabytes("2048Ki").unwrap(), 2);
        assert_eq!(memory_as_megabytes("2048K").unwrap(), 2);
        assert_eq!(memory_as_megabytes("1Gi").unwrap(), 1024);
        assert_eq!(memory_as_megabytes("16G").unwrap(), 16384);
        assert_eq!(memory_as_megabytes("1048576").unwrap(), 1);
    }

    #[test]
    fn test_memory_truncates() {
        assert_eq!(memory_as_megabytes("1023Ki").unwrap(), 0);
        assert_eq!(memory_as_megabytes("16331032Ki").unwrap(), 15948);
        assert_eq!(memory_as_megabytes("1048575").unwrap(), 0);
        assert_eq!(memory_as_megabytes("3145727").unwrap(), 2);
    }

    #[test]
    fn test_memory_bare_bytes_use_fallback() {
        assert_eq!(memory_as_megabytes("0").unwrap(), 0);
        assert_eq!(memory_as_megabytes("107374182400").unwrap(), 102_400);
    }

    /// Only bare byte counts reach the byte fallback; any other string is
    /// rejected rather than stripped down to its digits.
    #[test]
    fn test_memory_rejects_unknown_forms() {
        for raw in ["", "Mi", "1.5Gi", "1Ti", "1Pi", "128974848000m", "1e6", "12 Mi", "1234567890Mi"] {
            let err = memory_as_megabytes(raw).unwrap_err();
            assert_eq!(err.resource, ResourceKind::Memory);
            assert_eq!(err.raw, raw);
        }
    }

    #[test]
    fn test_resource_kind_dispatch() {
        assert_eq!(ResourceKind::Cpu.convert("2").unwrap(), 2000);
        assert_eq!(ResourceKind::Memory.convert("2Gi").unwrap(), 2048);
        assert_eq!(ResourceKind::Cpu.key(), "cpu");
        assert_eq!(ResourceKind::Memory.unit(), "Mi");
    }
}
