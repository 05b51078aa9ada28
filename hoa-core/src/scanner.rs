//! Signature scanner for monster stacks in a decompressed map payload.
//!
//! The payload is never parsed structurally. Every little-endian type tag of
//! a monster-like object is located by byte search, the fields that follow
//! it are decoded at fixed offsets, and candidates that fail the bounds or
//! validity checks are dropped.

use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use crate::creatures::CreatureTable;
use crate::objects::{Disposition, ObjectType, RANDOM_MONSTER_TYPES};

// Concrete monster layout, relative to the tag.
const CREATURE_ID_OFFSET: usize = 4;
const CONCRETE_QUANTITY_OFFSET: usize = 6;
const CONCRETE_DISPOSITION_OFFSET: usize = 18;

// Random monster layout, relative to the tag.
const RANDOM_QUANTITY_OFFSET: usize = 4;
const RANDOM_DISPOSITION_OFFSET: usize = 14;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanPolicy {
    /// Smallest accepted stack size (inclusive).
    pub min_quantity: u16,
    /// Largest accepted stack size (inclusive).
    pub max_quantity: u16,
    /// Value written over the disposition byte by `scan_and_patch`.
    pub force_disposition: Disposition,
    /// Decode and patch the disposition byte of random monsters too.
    pub random_disposition: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            min_quantity: 0,
            max_quantity: 1000,
            force_disposition: Disposition::Aggressive,
            random_disposition: false,
        }
    }
}

impl ScanPolicy {
    pub fn accepts_quantity(&self, quantity: u16) -> bool {
        (self.min_quantity..=self.max_quantity).contains(&quantity)
    }

    fn disposition_offset(&self, object: ObjectType) -> Option<usize> {
        if object.is_random() {
            self.random_disposition.then_some(RANDOM_DISPOSITION_OFFSET)
        } else {
            Some(CONCRETE_DISPOSITION_OFFSET)
        }
    }

}

/// Bytes from the tag that must be present for a candidate to decode. A
/// concrete monster needs at least one byte past its quantity; the
/// disposition byte itself is optional.
fn required_span(object: ObjectType) -> usize {
    if object.is_random() {
        RANDOM_QUANTITY_OFFSET + 2
    } else {
        CONCRETE_QUANTITY_OFFSET + 3
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MonsterKind {
    Concrete { creature_id: u16 },
    Random(ObjectType),
}

impl MonsterKind {
    pub fn object_type(&self) -> ObjectType {
        match self {
            MonsterKind::Concrete { .. } => ObjectType::Monster,
            MonsterKind::Random(object) => *object,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonsterRecord {
    /// Offset of the type tag in the payload.
    pub offset: usize,
    pub kind: MonsterKind,
    pub quantity: u16,
    /// Disposition byte as it currently stands in the payload, if decoded.
    pub disposition: Option<u8>,
    pub patched: bool,
}

impl MonsterRecord {
    pub fn disposition_kind(&self) -> Option<Disposition> {
        self.disposition.and_then(Disposition::from_code)
    }

    pub fn name(&self, table: &CreatureTable) -> String {
        match self.kind {
            MonsterKind::Concrete { creature_id } => table
                .name(creature_id)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Unknown creature {creature_id}")),
            MonsterKind::Random(object) => object.to_string(),
        }
    }

    pub fn level(&self, table: &CreatureTable) -> Option<u8> {
        match self.kind {
            MonsterKind::Concrete { creature_id } => table.level(creature_id),
            MonsterKind::Random(object) => object.random_level(),
        }
    }

    /// Absolute offset of the disposition byte, when the record carries one.
    pub fn disposition_offset(&self) -> Option<usize> {
        self.disposition.map(|_| match self.kind {
            MonsterKind::Concrete { .. } => self.offset + CONCRETE_DISPOSITION_OFFSET,
            MonsterKind::Random(_) => self.offset + RANDOM_DISPOSITION_OFFSET,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The record layout runs past the end of the payload.
    Truncated { needed: usize, len: usize },
    UnknownCreature(u16),
    QuantityOutOfRange(u16),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Truncated { needed, len } => {
                write!(f, "record needs {needed} bytes but payload has {len}")
            }
            SkipReason::UnknownCreature(id) => write!(f, "creature id {id} is not in the table"),
            SkipReason::QuantityOutOfRange(q) => write!(f, "quantity {q} is out of range"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Candidate {
    Accepted(MonsterRecord),
    Skipped(SkipReason),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SkippedCandidate {
    pub offset: usize,
    pub object: ObjectType,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Concrete monsters first, then each random tag in ascending order.
    pub records: Vec<MonsterRecord>,
    pub skipped: Vec<SkippedCandidate>,
    /// Number of disposition bytes written.
    pub patched: usize,
}

impl ScanReport {
    /// Number of tag matches evaluated.
    pub fn candidates(&self) -> usize {
        self.records.len() + self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn read_u16_le(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

/// Next occurrence of `signature` starting at or after `from`.
pub fn find_signature(bytes: &[u8], signature: &[u8], from: usize) -> Option<usize> {
    let rest = bytes.get(from..)?;
    memmem::find(rest, signature).map(|pos| from + pos)
}

/// Decodes the candidate whose tag sits at `offset`. Never writes.
pub fn decode_candidate(
    bytes: &[u8],
    offset: usize,
    object: ObjectType,
    table: &CreatureTable,
    policy: &ScanPolicy,
) -> Candidate {
    let needed = required_span(object);
    if offset.checked_add(needed).map_or(true, |end| end > bytes.len()) {
        return Candidate::Skipped(SkipReason::Truncated {
            needed,
            len: bytes.len().saturating_sub(offset),
        });
    }

    let (kind, quantity_at) = if object.is_random() {
        (MonsterKind::Random(object), offset + RANDOM_QUANTITY_OFFSET)
    } else {
        let Some(creature_id) = read_u16_le(bytes, offset + CREATURE_ID_OFFSET) else {
            return Candidate::Skipped(SkipReason::Truncated {
                needed,
                len: bytes.len() - offset,
            });
        };
        if !table.contains(creature_id) {
            return Candidate::Skipped(SkipReason::UnknownCreature(creature_id));
        }
        (
            MonsterKind::Concrete { creature_id },
            offset + CONCRETE_QUANTITY_OFFSET,
        )
    };

    let Some(quantity) = read_u16_le(bytes, quantity_at) else {
        return Candidate::Skipped(SkipReason::Truncated {
            needed,
            len: bytes.len() - offset,
        });
    };
    if !policy.accepts_quantity(quantity) {
        return Candidate::Skipped(SkipReason::QuantityOutOfRange(quantity));
    }

    let disposition = policy
        .disposition_offset(object)
        .and_then(|rel| bytes.get(offset + rel).copied());

    Candidate::Accepted(MonsterRecord {
        offset,
        kind,
        quantity,
        disposition,
        patched: false,
    })
}

enum ScanBuffer<'a> {
    Shared(&'a [u8]),
    Exclusive(&'a mut [u8], Disposition),
}

impl ScanBuffer<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            ScanBuffer::Shared(bytes) => bytes,
            ScanBuffer::Exclusive(bytes, _) => bytes,
        }
    }

    fn patch(&mut self, record: &mut MonsterRecord) -> bool {
        let ScanBuffer::Exclusive(bytes, forced) = self else {
            return false;
        };
        let Some(at) = record.disposition_offset() else {
            return false;
        };
        let Some(slot) = bytes.get_mut(at) else {
            return false;
        };
        trace!(offset = at, from = *slot, to = forced.code(), "patching disposition");
        *slot = forced.code();
        record.disposition = Some(forced.code());
        record.patched = true;
        true
    }
}

fn scan_object(
    buf: &mut ScanBuffer<'_>,
    object: ObjectType,
    table: &CreatureTable,
    policy: &ScanPolicy,
    report: &mut ScanReport,
) {
    let signature = object.signature();
    let mut cursor = 0usize;

    while let Some(offset) = find_signature(buf.bytes(), &signature, cursor) {
        match decode_candidate(buf.bytes(), offset, object, table, policy) {
            Candidate::Accepted(mut record) => {
                if buf.patch(&mut record) {
                    report.patched += 1;
                }
                trace!(offset, kind = ?record.kind, quantity = record.quantity, "accepted monster");
                report.records.push(record);
            }
            Candidate::Skipped(reason) => {
                trace!(offset, %object, %reason, "skipped candidate");
                report.skipped.push(SkippedCandidate {
                    offset,
                    object,
                    reason,
                });
            }
        }
        // Step one byte so overlapping matches are still evaluated.
        cursor = offset + 1;
    }
}

fn scan_inner(mut buf: ScanBuffer<'_>, table: &CreatureTable, policy: &ScanPolicy) -> ScanReport {
    let mut report = ScanReport::default();

    scan_object(&mut buf, ObjectType::Monster, table, policy, &mut report);
    for object in RANDOM_MONSTER_TYPES {
        scan_object(&mut buf, object, table, policy, &mut report);
    }

    debug!(
        len = buf.bytes().len(),
        candidates = report.candidates(),
        accepted = report.records.len(),
        patched = report.patched,
        "monster scan finished"
    );
    report
}

/// Collects every monster record in `bytes` without modifying it.
pub fn scan(bytes: &[u8], table: &CreatureTable, policy: &ScanPolicy) -> ScanReport {
    scan_inner(ScanBuffer::Shared(bytes), table, policy)
}

/// Like [`scan`], but overwrites the disposition byte of every accepted
/// record with `policy.force_disposition` as it goes. Later passes see the
/// bytes already written by earlier ones.
pub fn scan_and_patch(bytes: &mut [u8], table: &CreatureTable, policy: &ScanPolicy) -> ScanReport {
    let forced = policy.force_disposition;
    scan_inner(ScanBuffer::Exclusive(bytes, forced), table, policy)
}
