// ⚖️ Comparator - detect field-level divergence between two records
//
// Only a fixed table of comparable fields per entity kind is ever compared.
// Divergence rule, per field:
//   candidate unknown            -> never a change (nothing to propose)
//   catalog unknown              -> change (information gain)
//   both numbers                 -> change when outside tolerance
//   both text                    -> change on exact (case-sensitive) mismatch
//   number vs text               -> change

use crate::change::{ProposedChange, SourceTag};
use crate::record::{EntityKind, Field, Record, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// COMPARABLE FIELDS
// ============================================================================

/// Neither feed publishes system rows, so these are only compared when a
/// caller compares two catalog systems directly.
pub const SYSTEM_FIELDS: &[Field] = &[Field::RightAscension, Field::Declination, Field::Distance];

pub const STAR_FIELDS: &[Field] = &[
    Field::Mass,
    Field::Radius,
    Field::Temperature,
    Field::Age,
    Field::Metallicity,
    Field::SpectralType,
    Field::MagB,
    Field::MagV,
    Field::MagR,
    Field::MagI,
    Field::MagJ,
    Field::MagH,
    Field::MagK,
];

pub const PLANET_FIELDS: &[Field] = &[
    // orbital elements
    Field::SemiMajorAxis,
    Field::Separation,
    Field::Eccentricity,
    Field::Periastron,
    Field::Longitude,
    Field::MeanAnomaly,
    Field::AscendingNode,
    Field::Inclination,
    Field::ImpactParameter,
    Field::Period,
    Field::TransitTime,
    Field::PeriastronTime,
    Field::MaximumRvTime,
    Field::SpinOrbitAlignment,
    // physical parameters
    Field::Mass,
    Field::Radius,
    Field::Temperature,
    Field::Age,
    Field::SpectralType,
    // magnitudes
    Field::MagB,
    Field::MagV,
    Field::MagR,
    Field::MagI,
    Field::MagJ,
    Field::MagH,
    Field::MagK,
    // discovery metadata
    Field::DiscoveryMethod,
    Field::DiscoveryYear,
    Field::IsTransiting,
];

pub fn comparable_fields(kind: EntityKind) -> &'static [Field] {
    match kind {
        EntityKind::System => SYSTEM_FIELDS,
        EntityKind::Star => STAR_FIELDS,
        EntityKind::Planet => PLANET_FIELDS,
    }
}

// ============================================================================
// TOLERANCE
// ============================================================================

/// Numeric divergence threshold.
///
/// Two numbers diverge when `|a - b| > max(absolute, relative * max(|a|, |b|))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    pub const DEFAULT_RELATIVE: f64 = 1e-3;
    pub const DEFAULT_ABSOLUTE: f64 = 1e-9;

    pub fn exceeded(&self, a: f64, b: f64) -> bool {
        let allowed = self.absolute.max(self.relative * a.abs().max(b.abs()));
        (a - b).abs() > allowed
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            relative: Self::DEFAULT_RELATIVE,
            absolute: Self::DEFAULT_ABSOLUTE,
        }
    }
}

// ============================================================================
// COMPARATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Comparator {
    pub tolerance: Tolerance,
}

impl Comparator {
    pub fn new() -> Self {
        Comparator {
            tolerance: Tolerance::default(),
        }
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Comparator { tolerance }
    }

    /// Does the candidate value carry information the catalog value lacks or contradicts?
    pub fn diverges(&self, catalog: &Value, candidate: &Value) -> bool {
        match (catalog, candidate) {
            (_, Value::Unknown) => false,
            (Value::List(_), _) | (_, Value::List(_)) => false,
            (Value::Unknown, _) => true,
            (Value::Number(a), Value::Number(b)) => self.tolerance.exceeded(*a, *b),
            (Value::Text(a), Value::Text(b)) => a != b,
            _ => true,
        }
    }

    /// Compare two records of the same kind, timestamping changes with the current time.
    pub fn compare(
        &self,
        canonical: &Record,
        candidate: &Record,
        source: SourceTag,
    ) -> Vec<ProposedChange> {
        self.compare_at(canonical, candidate, source, Utc::now())
    }

    pub fn compare_at(
        &self,
        canonical: &Record,
        candidate: &Record,
        source: SourceTag,
        detected_at: DateTime<Utc>,
    ) -> Vec<ProposedChange> {
        if canonical.kind() != candidate.kind() {
            tracing::debug!(
                "not comparing {} '{}' with {} '{}'",
                canonical.kind(),
                canonical.name(),
                candidate.kind(),
                candidate.name()
            );
            return Vec::new();
        }

        let (star, planet) = match canonical.kind() {
            EntityKind::Planet => (
                canonical.host_name().unwrap_or(canonical.name()).to_string(),
                Some(canonical.name().to_string()),
            ),
            _ => (canonical.name().to_string(), None),
        };

        let mut changes = Vec::new();
        for field in comparable_fields(canonical.kind()) {
            let (Some(catalog_value), Some(source_value)) =
                (canonical.get(*field), candidate.get(*field))
            else {
                continue;
            };
            if self.diverges(catalog_value, source_value) {
                changes.push(ProposedChange::new(
                    star.clone(),
                    planet.clone(),
                    *field,
                    catalog_value.clone(),
                    source_value.clone(),
                    source,
                    detected_at,
                ));
            }
        }

        tracing::debug!(
            "{} '{}' vs {}: {} divergent field(s)",
            canonical.kind(),
            canonical.name(),
            source.code(),
            changes.len()
        );
        changes
    }
}

// ============================================================================
// TESTS
// ============================================================================
