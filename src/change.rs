// 📝 Proposed Changes - one field-level divergence awaiting review
//
// Identity of a change (for blacklist membership and de-duplication) is
// the tuple (star, planet, field, source, catalog value, source value).
// The detection timestamp and display index are NOT part of it.

use crate::record::{Field, Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Format used everywhere a timestamp is shown or persisted as plain text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// SOURCE TAG
// ============================================================================

/// External feeds compared against the authoritative catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// exoplanet.eu catalog
    Eu,
    /// NASA Exoplanet Archive
    Nasa,
}

impl SourceTag {
    pub const ALL: [SourceTag; 2] = [SourceTag::Eu, SourceTag::Nasa];

    /// Short code for persistence
    pub fn code(&self) -> &'static str {
        match self {
            SourceTag::Eu => "eu",
            SourceTag::Nasa => "nasa",
        }
    }

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            SourceTag::Eu => "exoplanet.eu",
            SourceTag::Nasa => "NASA Exoplanet Archive",
        }
    }

    pub fn from_code(code: &str) -> Option<SourceTag> {
        SourceTag::ALL.iter().copied().find(|tag| tag.code() == code)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// PROPOSED CHANGE
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedChange {
    /// Canonical star the change belongs to
    pub star: String,

    /// Planet of that star, when the divergence is on a planet field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planet: Option<String>,

    pub field: Field,

    /// Value currently in the authoritative catalog
    pub catalog_value: Value,

    /// Value proposed by the external source
    pub source_value: Value,

    pub source: SourceTag,

    /// When the divergence was detected
    pub timestamp: DateTime<Utc>,

    /// 0-based display index, assigned by the primary ordering only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// The identity-bearing part of a change.
#[derive(Serialize)]
struct ChangeKey<'a> {
    star: &'a str,
    planet: Option<&'a str>,
    field: Field,
    source: SourceTag,
    catalog_value: Value,
    source_value: Value,
}

impl ProposedChange {
    pub fn new(
        star: impl Into<String>,
        planet: Option<String>,
        field: Field,
        catalog_value: Value,
        source_value: Value,
        source: SourceTag,
        timestamp: DateTime<Utc>,
    ) -> Self {
        ProposedChange {
            star: star.into(),
            planet,
            field,
            catalog_value,
            source_value,
            source,
            timestamp,
            index: None,
        }
    }

    fn key(&self) -> ChangeKey<'_> {
        ChangeKey {
            star: &self.star,
            planet: self.planet.as_deref(),
            field: self.field,
            source: self.source,
            catalog_value: self.catalog_value.normalized(),
            source_value: self.source_value.normalized(),
        }
    }

    /// Stable SHA-256 over the identity tuple (hex, 64 chars).
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        // serializing plain data cannot fail
        let encoded = serde_json::to_string(&self.key()).unwrap_or_default();
        hasher.update(encoded.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Entity label: "star" or "star / planet"
    pub fn entity(&self) -> String {
        match &self.planet {
            Some(planet) => format!("{} / {}", self.star, planet),
            None => self.star.clone(),
        }
    }

    /// 1-based index shown to reviewers
    pub fn display_index(&self) -> Option<usize> {
        self.index.map(|i| i + 1)
    }

    /// Multi-line rendering used by `show`.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Star:            {}\n", self.star));
        if let Some(planet) = &self.planet {
            out.push_str(&format!("Planet:          {}\n", planet));
        }
        out.push_str(&format!("Field:           {}\n", self.field));
        out.push_str(&format!("Catalog value:   {}\n", self.catalog_value));
        out.push_str(&format!("Proposed value:  {}\n", self.source_value));
        out.push_str(&format!("Source:          {}\n", self.source));
        out.push_str(&format!(
            "Detected:        {}",
            self.timestamp.format(TIMESTAMP_FORMAT)
        ));
        out
    }
}

impl PartialEq for ProposedChange {
    fn eq(&self, other: &Self) -> bool {
        self.star == other.star
            && self.planet == other.planet
            && self.field == other.field
            && self.source == other.source
            && self.catalog_value == other.catalog_value
            && self.source_value == other.source_value
    }
}

impl Eq for ProposedChange {}

impl Hash for ProposedChange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.star.hash(state);
        self.planet.hash(state);
        self.field.hash(state);
        self.source.hash(state);
        self.catalog_value.hash(state);
        self.source_value.hash(state);
    }
}

impl fmt::Display for ProposedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} -> {} ({})",
            self.entity(),
            self.field,
            self.catalog_value,
            self.source_value,
            self.source.code()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn change_at(hour: u32) -> ProposedChange {
        ProposedChange::new(
            "Kepler-10",
            Some("Kepler-10 b".to_string()),
            Field::Mass,
            Value::Unknown,
            Value::Number(0.0103),
            SourceTag::Eu,
            Utc.with_ymd_and_hms(2026, 10, 1, hour, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_equality_ignores_timestamp_and_index() {
        let a = change_at(1);
        let mut b = change_at(9);
        b.index = Some(4);

        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_equality_covers_values_and_source() {
        let base = change_at(1);

        let mut other_source = base.clone();
        other_source.source = SourceTag::Nasa;
        assert_ne!(base, other_source);
        assert_ne!(base.fingerprint(), other_source.fingerprint());

        let mut other_value = base.clone();
        other_value.source_value = Value::Number(0.02);
        assert_ne!(base, other_value);

        let mut star_level = base.clone();
        star_level.planet = None;
        assert_ne!(base, star_level);
    }

    #[test]
    fn test_signed_zero_has_one_identity() {
        let mut positive = change_at(1);
        positive.source_value = Value::Number(0.0);
        let mut negative = change_at(1);
        negative.source_value = Value::Number(-0.0);

        assert_eq!(positive, negative);
        assert_eq!(positive.fingerprint(), negative.fingerprint());
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = change_at(1).fingerprint();
        assert_eq!(fp.len(), 64);
    }

    #[test]
    fn test_describe_and_display() {
        let change = change_at(3);
        let text = change.describe();
        assert!(text.contains("Planet:          Kepler-10 b"));
        assert!(text.contains("Catalog value:   N/A"));
        assert!(text.contains("Detected:        2026-10-01 03:00:00"));
        assert_eq!(
            change.to_string(),
            "Kepler-10 / Kepler-10 b mass: N/A -> 0.0103 (eu)"
        );
    }

    #[test]
    fn test_source_codes() {
        for tag in SourceTag::ALL {
            assert_eq!(SourceTag::from_code(tag.code()), Some(tag));
        }
        assert_eq!(SourceTag::from_code("oec"), None);
    }

    #[test]
    fn test_serde_keeps_identity() {
        let mut change = change_at(5);
        change.index = Some(2);
        let json = serde_json::to_string(&change).unwrap();
        let back: ProposedChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
        assert_eq!(back.index, Some(2));
        assert_eq!(back.timestamp, change.timestamp);
    }
}
