// 🪐 Record Model - typed catalog entities (systems, stars, planets)
//
// A Record is built once through RecordBuilder and is immutable afterwards.
// Every field that applies to the record's kind is present after compile():
// empty or unparseable text is stored as Value::Unknown, never left absent.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Text shown for a field the source did not provide.
pub const UNKNOWN_TEXT: &str = "N/A";

// ============================================================================
// VALUE
// ============================================================================

/// A coerced field value.
///
/// Numbers are always finite, which is what makes the manual `Eq`/`Hash`
/// impls below sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Number(f64),
    Text(String),
    Unknown,
    List(Vec<Value>),
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            // 0.0 and -0.0 compare equal, so they must hash equal
            Value::Number(n) => (if *n == 0.0 { 0.0f64 } else { *n }).to_bits().hash(state),
            Value::Text(text) => text.hash(state),
            Value::Unknown => {}
            Value::List(items) => items.hash(state),
        }
    }
}

impl Value {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Same value with -0.0 folded into 0.0, matching `Eq`/`Hash`.
    pub fn normalized(&self) -> Value {
        match self {
            Value::Number(n) if *n == 0.0 => Value::Number(0.0),
            Value::List(items) => Value::List(items.iter().map(Value::normalized).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(text) => write!(f, "{}", text),
            Value::Unknown => write!(f, "{}", UNKNOWN_TEXT),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// Coerce raw source text into a Value.
///
/// Missing or blank text is Unknown; text that parses as a finite number is a
/// Number; anything else is kept as Text. Never fails.
pub fn coerce(raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Unknown;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Unknown;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(trimmed.to_string()),
    }
}

/// Coerce text destined for a numeric field: non-numeric text is Unknown.
pub fn coerce_numeric(raw: Option<&str>) -> Value {
    match coerce(raw) {
        Value::Text(_) => Value::Unknown,
        other => other,
    }
}

// ============================================================================
// ENTITY KINDS AND FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    System,
    Star,
    Planet,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::System => "system",
            EntityKind::Star => "star",
            EntityKind::Planet => "planet",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's raw text is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    Numeric,
    Text,
    List,
}

/// The closed set of catalog fields.
///
/// Declaration order is the order used when changes are sorted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Field {
    OtherNames,
    // System position
    RightAscension,
    Declination,
    Distance,
    // Physical parameters
    Mass,
    Radius,
    Temperature,
    Age,
    Metallicity,
    SpectralType,
    // Magnitudes
    MagB,
    MagV,
    MagR,
    MagI,
    MagJ,
    MagH,
    MagK,
    // Orbital elements
    SemiMajorAxis,
    Separation,
    Eccentricity,
    Periastron,
    Longitude,
    MeanAnomaly,
    AscendingNode,
    Inclination,
    ImpactParameter,
    Period,
    TransitTime,
    PeriastronTime,
    MaximumRvTime,
    SpinOrbitAlignment,
    // Discovery metadata
    DiscoveryMethod,
    DiscoveryYear,
    IsTransiting,
    // Bookkeeping
    Description,
    LastUpdate,
}

impl Field {
    pub const ALL: [Field; 36] = [
        Field::OtherNames,
        Field::RightAscension,
        Field::Declination,
        Field::Distance,
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
        Field::DiscoveryMethod,
        Field::DiscoveryYear,
        Field::IsTransiting,
        Field::Description,
        Field::LastUpdate,
    ];

    /// Catalog tag name (as used by the XML catalog)
    pub fn name(&self) -> &'static str {
        match self {
            Field::OtherNames => "othernames",
            Field::RightAscension => "rightascension",
            Field::Declination => "declination",
            Field::Distance => "distance",
            Field::Mass => "mass",
            Field::Radius => "radius",
            Field::Temperature => "temperature",
            Field::Age => "age",
            Field::Metallicity => "metallicity",
            Field::SpectralType => "spectraltype",
            Field::MagB => "magB",
            Field::MagV => "magV",
            Field::MagR => "magR",
            Field::MagI => "magI",
            Field::MagJ => "magJ",
            Field::MagH => "magH",
            Field::MagK => "magK",
            Field::SemiMajorAxis => "semimajoraxis",
            Field::Separation => "separation",
            Field::Eccentricity => "eccentricity",
            Field::Periastron => "periastron",
            Field::Longitude => "longitude",
            Field::MeanAnomaly => "meananomaly",
            Field::AscendingNode => "ascendingnode",
            Field::Inclination => "inclination",
            Field::ImpactParameter => "impactparameter",
            Field::Period => "period",
            Field::TransitTime => "transittime",
            Field::PeriastronTime => "periastrontime",
            Field::MaximumRvTime => "maximumrvtime",
            Field::SpinOrbitAlignment => "spinorbitalignment",
            Field::DiscoveryMethod => "discoverymethod",
            Field::DiscoveryYear => "discoveryyear",
            Field::IsTransiting => "istransiting",
            Field::Description => "description",
            Field::LastUpdate => "lastupdate",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn shape(&self) -> FieldShape {
        match self {
            Field::OtherNames => FieldShape::List,
            Field::RightAscension
            | Field::Declination
            | Field::SpectralType
            | Field::DiscoveryMethod
            | Field::Description
            | Field::LastUpdate => FieldShape::Text,
            _ => FieldShape::Numeric,
        }
    }

    pub fn applies_to(&self, kind: EntityKind) -> bool {
        use EntityKind::*;
        match self {
            Field::OtherNames | Field::Description => true,
            Field::RightAscension | Field::Declination | Field::Distance => kind == System,
            Field::Mass
            | Field::Radius
            | Field::Temperature
            | Field::Age
            | Field::SpectralType
            | Field::MagB
            | Field::MagV
            | Field::MagR
            | Field::MagI
            | Field::MagJ
            | Field::MagH
            | Field::MagK => kind == Star || kind == Planet,
            Field::Metallicity => kind == Star,
            _ => kind == Planet,
        }
    }

    /// Coerce raw text according to this field's shape.
    pub fn coerce(&self, raw: Option<&str>) -> Value {
        match self.shape() {
            FieldShape::Numeric => coerce_numeric(raw),
            FieldShape::Text | FieldShape::List => coerce(raw),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_name(s).ok_or_else(|| RecordError::UnknownField(s.to_string()))
    }
}

impl TryFrom<String> for Field {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.name().to_string()
    }
}

/// References from one record to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Link {
    /// planet -> host star
    Host,
    /// star -> enclosing system
    System,
}

impl Link {
    pub fn from_name(name: &str) -> Option<Link> {
        match name {
            "host" | "star" => Some(Link::Host),
            "system" => Some(Link::System),
            _ => None,
        }
    }

    fn accepts(&self, owner: EntityKind, target: EntityKind) -> bool {
        match self {
            Link::Host => owner == EntityKind::Planet && target == EntityKind::Star,
            Link::System => owner == EntityKind::Star && target == EntityKind::System,
        }
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record name must not be empty")]
    MissingName,

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' does not apply to a {kind}")]
    NotApplicable { field: Field, kind: EntityKind },

    #[error("field '{0}' holds a list; use add_val_list")]
    ListField(Field),

    #[error("field '{0}' is not a list field")]
    NotAList(Field),

    #[error("list field '{0}' has not been started; call add_val_list first")]
    ListNotStarted(Field),
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone)]
pub struct Record {
    kind: EntityKind,
    name: String,
    fields: BTreeMap<Field, Value>,
    links: BTreeMap<Link, Arc<Record>>,
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a field, `None` only when the field does not apply to this kind.
    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &Value)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn link(&self, link: Link) -> Option<&Record> {
        self.links.get(&link).map(|r| r.as_ref())
    }

    /// Host star name for a planet.
    pub fn host_name(&self) -> Option<&str> {
        self.link(Link::Host).map(|host| host.name())
    }

    pub fn other_names(&self) -> Vec<String> {
        match self.fields.get(&Field::OtherNames) {
            Some(Value::List(items)) => items
                .iter()
                .filter(|v| !v.is_unknown())
                .map(|v| v.to_string())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// True if `name` is this record's name or one of its alternate names.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.other_names().iter().any(|alias| alias == name)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)?;
        for (field, value) in &self.fields {
            if !value.is_unknown() {
                write!(f, " {}:{}", field, value)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Initial contents of a list field.
#[derive(Debug, Clone)]
pub enum ListSeed {
    /// Already-ordered sequence, stored as given
    Values(Vec<Value>),
    /// Single raw value, coerced and wrapped into a one-element list
    Raw(Option<String>),
}

impl From<Vec<Value>> for ListSeed {
    fn from(values: Vec<Value>) -> Self {
        ListSeed::Values(values)
    }
}

impl From<&str> for ListSeed {
    fn from(raw: &str) -> Self {
        ListSeed::Raw(Some(raw.to_string()))
    }
}

impl From<Option<&str>> for ListSeed {
    fn from(raw: Option<&str>) -> Self {
        ListSeed::Raw(raw.map(|s| s.to_string()))
    }
}

/// Accumulates fields for one Record. `compile` consumes the builder.
#[derive(Debug)]
pub struct RecordBuilder {
    kind: EntityKind,
    name: String,
    fields: BTreeMap<Field, Value>,
    links: BTreeMap<Link, Arc<Record>>,
}

impl RecordBuilder {
    pub fn new(kind: EntityKind, name: &str) -> Result<Self, RecordError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RecordError::MissingName);
        }
        Ok(RecordBuilder {
            kind,
            name: name.to_string(),
            fields: BTreeMap::new(),
            links: BTreeMap::new(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    fn resolve(&self, key: &str) -> Result<Field, RecordError> {
        let field: Field = key.parse()?;
        if !field.applies_to(self.kind) {
            return Err(RecordError::NotApplicable {
                field,
                kind: self.kind,
            });
        }
        Ok(field)
    }

    /// Coerce and store a scalar field.
    pub fn add_val(&mut self, key: &str, raw: Option<&str>) -> Result<&mut Self, RecordError> {
        let field = self.resolve(key)?;
        if field.shape() == FieldShape::List {
            return Err(RecordError::ListField(field));
        }
        self.fields.insert(field, field.coerce(raw));
        Ok(self)
    }

    /// Start (or restart) a list field.
    pub fn add_val_list(
        &mut self,
        key: &str,
        seed: impl Into<ListSeed>,
    ) -> Result<&mut Self, RecordError> {
        let field = self.resolve(key)?;
        if field.shape() != FieldShape::List {
            return Err(RecordError::NotAList(field));
        }
        let values = match seed.into() {
            ListSeed::Values(values) => values,
            ListSeed::Raw(raw) => vec![coerce(raw.as_deref())],
        };
        self.fields.insert(field, Value::List(values));
        Ok(self)
    }

    /// Append to a list field started with `add_val_list`.
    pub fn add_to_val_list(
        &mut self,
        key: &str,
        raw: Option<&str>,
    ) -> Result<&mut Self, RecordError> {
        let field = self.resolve(key)?;
        if field.shape() != FieldShape::List {
            return Err(RecordError::NotAList(field));
        }
        match self.fields.get_mut(&field) {
            Some(Value::List(items)) => {
                items.push(coerce(raw));
                Ok(self)
            }
            _ => Err(RecordError::ListNotStarted(field)),
        }
    }

    /// Link another record. Unknown link names, a missing target, or a target
    /// of the wrong kind leave the builder untouched.
    pub fn add_obj(&mut self, key: &str, target: Option<Arc<Record>>) -> &mut Self {
        let (Some(link), Some(target)) = (Link::from_name(key), target) else {
            return self;
        };
        if link.accepts(self.kind, target.kind) {
            self.links.insert(link, target);
        } else {
            tracing::debug!(
                "ignoring {:?} link from {} '{}' to {} '{}'",
                link,
                self.kind,
                self.name,
                target.kind,
                target.name
            );
        }
        self
    }

    pub fn compile(self) -> Record {
        let RecordBuilder {
            kind,
            name,
            mut fields,
            links,
        } = self;

        for field in Field::ALL.iter().filter(|f| f.applies_to(kind)) {
            fields.entry(*field).or_insert_with(|| match field.shape() {
                FieldShape::List => Value::List(Vec::new()),
                _ => Value::Unknown,
            });
        }

        Record {
            kind,
            name,
            fields,
            links,
        }
    }
}

/// Total order over values used as a sort tie-breaker.
pub(crate) fn value_order(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Unknown => 0,
            Value::Number(_) => 1,
            Value::Text(_) => 2,
            Value::List(_) => 3,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = value_order(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_never_fails() {
        assert_eq!(coerce(None), Value::Unknown);
        assert_eq!(coerce(Some("")), Value::Unknown);
        assert_eq!(coerce(Some("   ")), Value::Unknown);
        assert_eq!(coerce(Some("1.3")), Value::Number(1.3));
        assert_eq!(coerce(Some(" 42 ")), Value::Number(42.0));
        assert_eq!(coerce(Some("G2V")), Value::Text("G2V".to_string()));
        // non-finite parses are kept as text
        assert_eq!(coerce(Some("inf")), Value::Text("inf".to_string()));
    }

    #[test]
    fn test_numeric_field_rejects_text() {
        assert_eq!(Field::Mass.coerce(Some("heavy")), Value::Unknown);
        assert_eq!(Field::Mass.coerce(Some("")), Value::Unknown);
        assert_eq!(Field::Mass.coerce(Some("0.5")), Value::Number(0.5));
        assert_eq!(
            Field::SpectralType.coerce(Some("K1III")),
            Value::Text("K1III".to_string())
        );
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("magv"), None);
        assert!(matches!(
            "colour".parse::<Field>(),
            Err(RecordError::UnknownField(_))
        ));
    }

    #[test]
    fn test_builder_fills_every_applicable_field() {
        let mut builder = RecordBuilder::new(EntityKind::Planet, "Kepler-10 b").unwrap();
        builder
            .add_val("mass", Some("0.0103"))
            .unwrap()
            .add_val("radius", Some(""))
            .unwrap();
        let planet = builder.compile();

        assert_eq!(planet.name(), "Kepler-10 b");
        assert_eq!(planet.get(Field::Mass), Some(&Value::Number(0.0103)));
        assert_eq!(planet.get(Field::Radius), Some(&Value::Unknown));
        assert_eq!(planet.get(Field::Period), Some(&Value::Unknown));
        assert_eq!(planet.get(Field::OtherNames), Some(&Value::List(vec![])));
        // star-only field is not present on a planet
        assert_eq!(planet.get(Field::Metallicity), None);
    }

    #[test]
    fn test_builder_requires_name() {
        assert_eq!(
            RecordBuilder::new(EntityKind::Star, "  ").unwrap_err(),
            RecordError::MissingName
        );
    }

    #[test]
    fn test_builder_rejects_unknown_and_inapplicable_fields() {
        let mut builder = RecordBuilder::new(EntityKind::Star, "Sun").unwrap();
        assert_eq!(
            builder.add_val("colour", Some("yellow")).unwrap_err(),
            RecordError::UnknownField("colour".to_string())
        );
        assert_eq!(
            builder.add_val("period", Some("365")).unwrap_err(),
            RecordError::NotApplicable {
                field: Field::Period,
                kind: EntityKind::Star
            }
        );
    }

    #[test]
    fn test_list_fields() {
        let mut builder = RecordBuilder::new(EntityKind::Star, "Kepler-10").unwrap();
        assert_eq!(
            builder.add_to_val_list("othernames", Some("KOI-72")).unwrap_err(),
            RecordError::ListNotStarted(Field::OtherNames)
        );
        assert_eq!(
            builder.add_to_val_list("mass", Some("1")).unwrap_err(),
            RecordError::NotAList(Field::Mass)
        );
        assert_eq!(
            builder.add_val("othernames", Some("KOI-72")).unwrap_err(),
            RecordError::ListField(Field::OtherNames)
        );

        builder
            .add_val_list("othernames", "KOI-72")
            .unwrap()
            .add_to_val_list("othernames", Some("KIC 11904151"))
            .unwrap();
        let star = builder.compile();

        assert_eq!(star.other_names(), vec!["KOI-72", "KIC 11904151"]);
        assert!(star.answers_to("KOI-72"));
        assert!(star.answers_to("Kepler-10"));
        assert!(!star.answers_to("Kepler-11"));
    }

    #[test]
    fn test_list_seed_from_sequence() {
        let mut builder = RecordBuilder::new(EntityKind::System, "Kepler-10").unwrap();
        builder
            .add_val_list(
                "othernames",
                vec![Value::Text("KOI-72".into()), Value::Text("TYC 1".into())],
            )
            .unwrap();
        assert_eq!(builder.compile().other_names().len(), 2);
    }

    #[test]
    fn test_add_obj_capability_check() {
        let star = Arc::new(RecordBuilder::new(EntityKind::Star, "Kepler-10").unwrap().compile());
        let other_planet =
            Arc::new(RecordBuilder::new(EntityKind::Planet, "Kepler-10 c").unwrap().compile());

        let mut builder = RecordBuilder::new(EntityKind::Planet, "Kepler-10 b").unwrap();
        builder
            .add_obj("host", Some(other_planet))
            .add_obj("host", None)
            .add_obj("moon", Some(star.clone()));
        assert!(builder.compile().host_name().is_none());

        let mut builder = RecordBuilder::new(EntityKind::Planet, "Kepler-10 b").unwrap();
        builder.add_obj("host", Some(star));
        assert_eq!(builder.compile().host_name(), Some("Kepler-10"));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Number(1.0).to_string(), "1");
        assert_eq!(Value::Number(1.3).to_string(), "1.3");
        assert_eq!(Value::Unknown.to_string(), UNKNOWN_TEXT);
        assert_eq!(
            Value::List(vec![Value::Text("a".into()), Value::Number(2.0)]).to_string(),
            "a, 2"
        );
    }
}
