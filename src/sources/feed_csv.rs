// 📊 Tabular feed reader (exoplanet.eu / NASA Exoplanet Archive CSV exports)
//
// Both feeds publish one row per planet with the host star's parameters
// repeated on every row. The star record is built from the first row seen
// for each host; later rows only contribute planets.

use super::{CatalogSnapshot, CatalogSource, FeedSource};
use crate::change::SourceTag;
use crate::record::{EntityKind, Field, Record, RecordBuilder};
use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// COLUMN MAPS
// ============================================================================

/// Which columns of a feed hold which catalog fields.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    pub host: &'static str,
    /// Candidate planet-name columns, first present one wins
    pub planet: &'static [&'static str],
    pub star_fields: &'static [(&'static str, Field)],
    pub planet_fields: &'static [(&'static str, Field)],
    pub comment: Option<u8>,
}

pub const EU_COLUMNS: ColumnMap = ColumnMap {
    host: "star_name",
    planet: &["# name", "name"],
    star_fields: &[
        ("star_mass", Field::Mass),
        ("star_radius", Field::Radius),
        ("star_teff", Field::Temperature),
        ("star_age", Field::Age),
        ("star_metallicity", Field::Metallicity),
        ("star_sp_type", Field::SpectralType),
        ("mag_v", Field::MagV),
        ("mag_i", Field::MagI),
        ("mag_j", Field::MagJ),
        ("mag_h", Field::MagH),
        ("mag_k", Field::MagK),
    ],
    planet_fields: &[
        ("mass", Field::Mass),
        ("radius", Field::Radius),
        ("orbital_period", Field::Period),
        ("semi_major_axis", Field::SemiMajorAxis),
        ("eccentricity", Field::Eccentricity),
        ("inclination", Field::Inclination),
        ("angular_distance", Field::Separation),
        ("discovered", Field::DiscoveryYear),
        ("omega", Field::Periastron),
        ("tperi", Field::PeriastronTime),
        ("tzero_tr", Field::TransitTime),
        ("temp_calculated", Field::Temperature),
        ("detection_type", Field::DiscoveryMethod),
        ("impact_parameter", Field::ImpactParameter),
        ("lambda_angle", Field::SpinOrbitAlignment),
    ],
    comment: None,
};

pub const NASA_COLUMNS: ColumnMap = ColumnMap {
    host: "pl_hostname",
    planet: &["pl_name"],
    star_fields: &[
        ("st_mass", Field::Mass),
        ("st_rad", Field::Radius),
        ("st_teff", Field::Temperature),
        ("st_age", Field::Age),
        ("st_metfe", Field::Metallicity),
        ("st_spstr", Field::SpectralType),
        ("st_vmag", Field::MagV),
        ("st_jmag", Field::MagJ),
        ("st_hmag", Field::MagH),
        ("st_kmag", Field::MagK),
    ],
    planet_fields: &[
        ("pl_orbper", Field::Period),
        ("pl_orbsmax", Field::SemiMajorAxis),
        ("pl_orbeccen", Field::Eccentricity),
        ("pl_orbincl", Field::Inclination),
        ("pl_bmassj", Field::Mass),
        ("pl_radj", Field::Radius),
        ("pl_disc", Field::DiscoveryYear),
        ("pl_discmethod", Field::DiscoveryMethod),
        ("pl_tranflag", Field::IsTransiting),
        ("pl_eqt", Field::Temperature),
    ],
    // the archive prefixes its exports with '#' metadata lines
    comment: Some(b'#'),
};

pub fn column_map(tag: SourceTag) -> &'static ColumnMap {
    match tag {
        SourceTag::Eu => &EU_COLUMNS,
        SourceTag::Nasa => &NASA_COLUMNS,
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Resolve mapped columns against the header row; unmapped columns are skipped.
fn resolve_columns(
    headers: &csv::StringRecord,
    columns: &'static [(&'static str, Field)],
) -> Vec<(usize, Field)> {
    columns
        .iter()
        .filter_map(|(name, field)| {
            headers
                .iter()
                .position(|h| h.trim() == *name)
                .map(|idx| (idx, *field))
        })
        .collect()
}

fn fill(builder: &mut RecordBuilder, row: &csv::StringRecord, columns: &[(usize, Field)]) -> Result<()> {
    for (idx, field) in columns {
        builder.add_val(field.name(), row.get(*idx))?;
    }
    Ok(())
}

/// Parse one feed export into a snapshot of stars and planets.
pub fn parse_feed<R: Read>(input: R, tag: SourceTag) -> Result<CatalogSnapshot> {
    let map = column_map(tag);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .comment(map.comment)
        .from_reader(input);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read {} header row", tag))?
        .clone();
    let Some(host_idx) = headers.iter().position(|h| h.trim() == map.host) else {
        bail!("{} feed is missing column '{}'", tag, map.host);
    };
    let Some(planet_idx) = map
        .planet
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
    else {
        bail!("{} feed is missing column '{}'", tag, map.planet.join("' / '"));
    };
    let star_columns = resolve_columns(&headers, map.star_fields);
    let planet_columns = resolve_columns(&headers, map.planet_fields);

    let mut snapshot = CatalogSnapshot::new();
    let mut stars: HashMap<String, Arc<Record>> = HashMap::new();
    let mut seen_planets: HashSet<(String, String)> = HashSet::new();

    for (line_num, result) in reader.records().enumerate() {
        let row = result
            .with_context(|| format!("Failed to parse {} CSV line {}", tag, line_num + 2))?;

        let host = row.get(host_idx).unwrap_or("").trim();
        let planet_name = row.get(planet_idx).unwrap_or("").trim();
        if host.is_empty() || planet_name.is_empty() {
            tracing::debug!("{} line {}: no host or planet name", tag, line_num + 2);
            continue;
        }

        let star = match stars.get(host) {
            Some(star) => star.clone(),
            None => {
                let mut builder = RecordBuilder::new(EntityKind::Star, host)?;
                fill(&mut builder, &row, &star_columns)
                    .with_context(|| format!("{} line {}", tag, line_num + 2))?;
                let star = Arc::new(builder.compile());
                stars.insert(host.to_string(), star.clone());
                snapshot.push(star.clone());
                star
            }
        };

        if !seen_planets.insert((host.to_string(), planet_name.to_string())) {
            tracing::debug!("{} line {}: duplicate planet '{}'", tag, line_num + 2, planet_name);
            continue;
        }
        let mut builder = RecordBuilder::new(EntityKind::Planet, planet_name)?;
        fill(&mut builder, &row, &planet_columns)
            .with_context(|| format!("{} line {}", tag, line_num + 2))?;
        builder.add_obj("host", Some(star));
        snapshot.push(Arc::new(builder.compile()));
    }

    Ok(snapshot)
}

// ============================================================================
// FILE SOURCE
// ============================================================================

/// A feed export on disk.
pub struct CsvFeed {
    tag: SourceTag,
    path: PathBuf,
}

impl CsvFeed {
    pub fn new(tag: SourceTag, path: impl Into<PathBuf>) -> Self {
        CsvFeed {
            tag,
            path: path.into(),
        }
    }
}

impl CatalogSource for CsvFeed {
    fn describe(&self) -> String {
        format!("{} feed {}", self.tag, self.path.display())
    }

    fn load(&self) -> Result<CatalogSnapshot> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;
        parse_feed(file, self.tag)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }
}

impl FeedSource for CsvFeed {
    fn tag(&self) -> SourceTag {
        self.tag
    }
}
