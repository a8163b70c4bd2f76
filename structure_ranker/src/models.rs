// src/models.rs

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MalformedReason, RankerError, RankerResult};

/// Experimental method of a deposited structure, as labelled by UniProt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExperimentalMethod {
    XRay,
    ElectronMicroscopy,
    Nmr,
    Other(String),
}

impl ExperimentalMethod {
    /// Only diffraction and cryo-EM structures give a single placement
    /// usable as a template.
    pub fn is_template_grade(&self) -> bool {
        matches!(
            self,
            ExperimentalMethod::XRay | ExperimentalMethod::ElectronMicroscopy
        )
    }

    pub fn label(&self) -> &str {
        match self {
            ExperimentalMethod::XRay => "X-ray",
            ExperimentalMethod::ElectronMicroscopy => "EM",
            ExperimentalMethod::Nmr => "NMR",
            ExperimentalMethod::Other(label) => label,
        }
    }
}

impl FromStr for ExperimentalMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.trim() {
            "X-ray" => ExperimentalMethod::XRay,
            "EM" => ExperimentalMethod::ElectronMicroscopy,
            "NMR" => ExperimentalMethod::Nmr,
            other => ExperimentalMethod::Other(other.to_string()),
        };
        Ok(method)
    }
}

impl From<&str> for ExperimentalMethod {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for ExperimentalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Residue range covered by one chain of a structure. `1 <= start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainSpan {
    pub chain: String,
    pub start: u32,
    pub end: u32,
}

impl ChainSpan {
    pub fn new(chain: impl Into<String>, start: u32, end: u32) -> RankerResult<Self> {
        let chain = chain.into();
        let (start, end) = check_range(start.into(), end.into())
            .map_err(|reason| RankerError::malformed(chain.clone(), reason))?;
        Ok(Self { chain, start, end })
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// A PDB structure cross-referenced from a protein entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureRecord {
    id: String,
    method: ExperimentalMethod,
    resolution: Option<f64>,
    spans: Vec<ChainSpan>,
}

impl StructureRecord {
    pub fn new(
        id: impl Into<String>,
        method: ExperimentalMethod,
        resolution: Option<f64>,
        spans: Vec<ChainSpan>,
    ) -> RankerResult<Self> {
        let id = id.into();
        if let Some(value) = resolution {
            check_resolution(value).map_err(|reason| RankerError::malformed(id.clone(), reason))?;
        }
        if spans.is_empty() {
            return Err(RankerError::malformed(id, MalformedReason::NoChains));
        }
        Ok(Self {
            id,
            method,
            resolution,
            spans,
        })
    }

    /// Builds a record from the raw property strings of a UniProt PDB
    /// cross-reference, e.g. method `"X-ray"`, resolution `"2.60 A"`,
    /// chains `"A/B=695-1022"`.
    pub fn from_fields(
        id: &str,
        method: &str,
        resolution: Option<&str>,
        chains: &str,
    ) -> RankerResult<Self> {
        let resolution =
            parse_resolution(resolution).map_err(|reason| RankerError::malformed(id, reason))?;
        let spans = parse_chains(chains).map_err(|reason| RankerError::malformed(id, reason))?;
        Self::new(id, ExperimentalMethod::from(method), resolution, spans)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &ExperimentalMethod {
        &self.method
    }

    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    pub fn spans(&self) -> &[ChainSpan] {
        &self.spans
    }
}

/// A functionally annotated residue range on the protein.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    description: String,
    start: u32,
    end: u32,
}

impl DomainRecord {
    pub fn new(description: impl Into<String>, start: u32, end: u32) -> RankerResult<Self> {
        let description = description.into();
        let (start, end) = check_range(start.into(), end.into())
            .map_err(|reason| RankerError::malformed(domain_label(&description), reason))?;
        Ok(Self {
            description,
            start,
            end,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }
}

/// Unvalidated structure row as normalized by an upstream producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStructure {
    pub id: String,
    pub method: String,
    pub resolution: Option<String>,
    pub chains: Option<String>,
}

impl RawStructure {
    pub fn validate(&self) -> RankerResult<StructureRecord> {
        let chains = self
            .chains
            .as_deref()
            .ok_or_else(|| RankerError::malformed(&self.id, MalformedReason::MissingField("chains")))?;
        StructureRecord::from_fields(&self.id, &self.method, self.resolution.as_deref(), chains)
    }
}

/// Unvalidated domain row; positions are kept signed so that bad input
/// can be reported rather than wrapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDomain {
    #[serde(default)]
    pub description: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl RawDomain {
    pub fn label(&self) -> String {
        domain_label(&self.description)
    }

    pub fn validate(&self) -> RankerResult<DomainRecord> {
        let start = self
            .start
            .ok_or_else(|| RankerError::malformed(self.label(), MalformedReason::MissingField("start")))?;
        let end = self
            .end
            .ok_or_else(|| RankerError::malformed(self.label(), MalformedReason::MissingField("end")))?;
        let (start, end) =
            check_range(start, end).map_err(|reason| RankerError::malformed(self.label(), reason))?;
        Ok(DomainRecord {
            description: self.description.clone(),
            start,
            end,
        })
    }
}

fn domain_label(description: &str) -> String {
    if description.is_empty() {
        "<unnamed domain>".to_string()
    } else {
        description.to_string()
    }
}

fn check_range(start: i64, end: i64) -> Result<(u32, u32), MalformedReason> {
    let start = u32::try_from(start)
        .ok()
        .filter(|s| *s >= 1)
        .ok_or(MalformedReason::ResidueOutOfRange(start))?;
    let end = u32::try_from(end)
        .ok()
        .filter(|e| *e >= 1)
        .ok_or(MalformedReason::ResidueOutOfRange(end))?;
    if start > end {
        return Err(MalformedReason::InvertedRange {
            start: start.into(),
            end: end.into(),
        });
    }
    Ok((start, end))
}

fn check_resolution(value: f64) -> Result<f64, MalformedReason> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(MalformedReason::NonPositiveResolution(value))
    }
}

/// `"2.50 A"` -> `Some(2.5)`; `"-"`, empty or absent -> `None`.
fn parse_resolution(raw: Option<&str>) -> Result<Option<f64>, MalformedReason> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(None);
    }
    let number = trimmed.trim_end_matches(['A', 'Å']).trim_end();
    let value: f64 = number
        .parse()
        .map_err(|_| MalformedReason::UnparsableResolution(raw.to_string()))?;
    check_resolution(value).map(Some)
}

/// Parses `"A/B=1-300"` or `"A=1-100, B=5-200"` into one span per chain label.
fn parse_chains(raw: &str) -> Result<Vec<ChainSpan>, MalformedReason> {
    let unparsable = || MalformedReason::UnparsableChains(raw.to_string());
    let mut spans = Vec::new();

    for group in raw.split(',').map(str::trim).filter(|g| !g.is_empty()) {
        let (labels, range) = group.split_once('=').ok_or_else(unparsable)?;
        let (start, end) = range.trim().split_once('-').ok_or_else(unparsable)?;
        let start: i64 = start.trim().parse().map_err(|_| unparsable())?;
        let end: i64 = end.trim().parse().map_err(|_| unparsable())?;
        let (start, end) = check_range(start, end)?;

        let labels: Vec<&str> = labels
            .split('/')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if labels.is_empty() {
            return Err(unparsable());
        }
        spans.extend(labels.into_iter().map(|chain| ChainSpan {
            chain: chain.to_string(),
            start,
            end,
        }));
    }

    if spans.is_empty() {
        return Err(MalformedReason::NoChains);
    }
    Ok(spans)
}
