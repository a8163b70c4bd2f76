//! Coverage-based ranking of experimental PDB structures.
//!
//! Given the structures cross-referenced from a protein entry and the
//! protein's annotated domains, [`rank_structures`] keeps the X-ray and EM
//! structures and scores each one by how many domain residues it covers.
//! Ordering the result is left to the caller.

pub mod coverage;
pub mod error;
pub mod models;
pub mod ranking;

pub use coverage::{domain_union_length, overlap_residues};
pub use error::{MalformedReason, RankerError, RankerResult};
pub use models::{
    ChainSpan, DomainRecord, ExperimentalMethod, RawDomain, RawStructure, StructureRecord,
};
pub use ranking::{rank_records, rank_structures, Diagnostic, RankedStructure, RankingReport, RecordKind};
