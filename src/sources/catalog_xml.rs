// 📖 Authoritative catalog reader (Open Exoplanet Catalogue XML)
//
//   <system>
//     <name>..</name> <rightascension>..</rightascension> ...
//     <star>
//       <name>Kepler-10</name> <name>KOI-72</name> <mass>0.91</mass> ...
//       <planet> <name>Kepler-10 b</name> <mass>0.0103</mass> ... </planet>
//     </star>
//     <binary> <star>..</star> <star>..</star> </binary>
//   </system>
//
// Parsing happens in two passes: the event stream is flattened into drafts
// (document order, parents before children), then drafts are compiled into
// records so each child can link to its already-built parent.

use super::{CatalogSnapshot, CatalogSource};
use crate::record::{EntityKind, Record, RecordBuilder, Value};
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::PathBuf;
use std::sync::Arc;

/// Catalog file on disk.
pub struct XmlCatalog {
    path: PathBuf,
}

impl XmlCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XmlCatalog { path: path.into() }
    }
}

impl CatalogSource for XmlCatalog {
    fn describe(&self) -> String {
        format!("catalog {}", self.path.display())
    }

    fn load(&self) -> Result<CatalogSnapshot> {
        let xml = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog {}", self.path.display()))?;
        parse_catalog_str(&xml)
            .with_context(|| format!("Failed to parse catalog {}", self.path.display()))
    }
}

// ============================================================================
// PASS 1: EVENTS -> DRAFTS
// ============================================================================

struct Draft {
    kind: EntityKind,
    names: Vec<String>,
    values: Vec<(String, String)>,
    parent: Option<usize>,
}

enum Open {
    Entity(usize),
    /// <systems>, <binary>: elements that only group entities
    Container,
    Field { tag: String, text: String },
    Ignored,
}

fn entity_kind(tag: &[u8]) -> Option<EntityKind> {
    match tag {
        b"system" => Some(EntityKind::System),
        b"star" => Some(EntityKind::Star),
        b"planet" => Some(EntityKind::Planet),
        _ => None,
    }
}

/// Nearest enclosing entity of the kind `kind` links to.
fn parent_for(kind: EntityKind, stack: &[Open], drafts: &[Draft]) -> Option<usize> {
    let wanted = match kind {
        EntityKind::System => return None,
        EntityKind::Star => EntityKind::System,
        EntityKind::Planet => EntityKind::Star,
    };
    stack.iter().rev().find_map(|open| match open {
        Open::Entity(idx) if drafts[*idx].kind == wanted => Some(*idx),
        _ => None,
    })
}

fn predefined_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => None,
    }
}

fn collect_drafts(xml: &str) -> Result<Vec<Draft>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut drafts: Vec<Draft> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("malformed XML near byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) => {
                let local = e.local_name();
                let tag = local.as_ref();
                let open = if let Some(kind) = entity_kind(tag) {
                    let parent = parent_for(kind, &stack, &drafts);
                    drafts.push(Draft {
                        kind,
                        names: Vec::new(),
                        values: Vec::new(),
                        parent,
                    });
                    Open::Entity(drafts.len() - 1)
                } else if tag == b"systems" || tag == b"binary" {
                    Open::Container
                } else if matches!(stack.last(), Some(Open::Entity(_))) {
                    Open::Field {
                        tag: String::from_utf8_lossy(tag).to_string(),
                        text: String::new(),
                    }
                } else {
                    Open::Ignored
                };
                stack.push(open);
            }
            Event::Text(ref e) => {
                if let Some(Open::Field { text, .. }) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(ref e) => {
                if let Some(Open::Field { text, .. }) = stack.last_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(ref e) => {
                if let Some(Open::Field { text, .. }) = stack.last_mut() {
                    match predefined_entity(e.as_ref()) {
                        Some(c) => text.push(c),
                        None => {
                            text.push('&');
                            text.push_str(&String::from_utf8_lossy(e.as_ref()));
                            text.push(';');
                        }
                    }
                }
            }
            Event::End(_) => {
                if let Some(Open::Field { tag, text }) = stack.pop() {
                    if let Some(Open::Entity(idx)) = stack.last() {
                        let draft = &mut drafts[*idx];
                        let text = text.trim().to_string();
                        if tag == "name" {
                            if !text.is_empty() {
                                draft.names.push(text);
                            }
                        } else {
                            draft.values.push((tag, text));
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(drafts)
}

// ============================================================================
// PASS 2: DRAFTS -> RECORDS
// ============================================================================

fn build(draft: &Draft, parent: Option<Arc<Record>>) -> Option<Record> {
    let Some((name, aliases)) = draft.names.split_first() else {
        tracing::warn!("skipping unnamed {} in catalog", draft.kind);
        return None;
    };
    let mut builder = match RecordBuilder::new(draft.kind, name) {
        Ok(builder) => builder,
        Err(err) => {
            tracing::warn!("skipping {} '{}': {}", draft.kind, name, err);
            return None;
        }
    };

    let aliases: Vec<Value> = aliases.iter().map(|a| Value::Text(a.clone())).collect();
    if let Err(err) = builder.add_val_list("othernames", aliases) {
        tracing::debug!("{} '{}': {}", draft.kind, name, err);
    }
    for (tag, text) in &draft.values {
        // the catalog carries tags we do not model (images, lists, ...)
        if let Err(err) = builder.add_val(tag, Some(text)) {
            tracing::debug!("{} '{}': ignoring <{}>: {}", draft.kind, name, tag, err);
        }
    }
    let link = match draft.kind {
        EntityKind::Star => "system",
        _ => "host",
    };
    builder.add_obj(link, parent);
    Some(builder.compile())
}

/// Parse catalog XML text into a snapshot.
pub fn parse_catalog_str(xml: &str) -> Result<CatalogSnapshot> {
    let drafts = collect_drafts(xml)?;
    let mut built: Vec<Option<Arc<Record>>> = Vec::with_capacity(drafts.len());
    let mut snapshot = CatalogSnapshot::new();

    for draft in &drafts {
        let parent = draft.parent.and_then(|idx| built[idx].clone());
        let record = build(draft, parent).map(Arc::new);
        if let Some(record) = &record {
            snapshot.push(record.clone());
        }
        built.push(record);
    }

    tracing::debug!(
        "catalog: {} systems, {} stars, {} planets",
        snapshot.systems.len(),
        snapshot.stars.len(),
        snapshot.planets.len()
    );
    Ok(snapshot)
}
