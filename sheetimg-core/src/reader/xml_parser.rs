//! XML parsing utilities for locating embedded pictures inside XLSX packages
//!
//! An XLSX file is a zip of XML parts wired together by relationship files:
//! `xl/workbook.xml` lists sheets by relationship id, each worksheet's rels
//! point at its drawing part, and each drawing's rels point at media parts.

use super::workbook::{AnchorKind, EmbeddedImage, ImageAnchor, MediaSource};
use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// One `<Relationship>` entry of a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Compare the last segment of the relationship type URI,
    /// e.g. `drawing` or `image`
    pub fn is_type(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// A sheet entry from `xl/workbook.xml`, resolved to its part path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    pub name: String,
    /// Part path inside the package, e.g. `xl/worksheets/sheet1.xml`
    pub part: Option<String>,
}

/// Sheets and view state read from `xl/workbook.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookInfo {
    pub sheets: Vec<SheetPart>,
    /// `workbookView@activeTab`, 0 when absent
    pub active_tab: usize,
}

/// A picture found in a drawing part, before its media is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingPicture {
    pub anchor: ImageAnchor,
    /// `a:blip@r:embed`
    pub embed: Option<String>,
}

/// Path of the relationships part belonging to `part`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that owns the relationship
pub fn resolve_part_path(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_part.split('/').collect();
    // Drop the file name of the source part
    segments.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    segments.join("/")
}

/// Parse the content of a `.rels` part
pub fn parse_relationships<R: BufRead>(source: R) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut rel = Relationship {
                        id: String::new(),
                        rel_type: String::new(),
                        target: String::new(),
                        external: false,
                    };
                    for attr in e.attributes().flatten() {
                        let value: String = attr.unescape_value().unwrap_or_default().into();
                        match attr.key.as_ref() {
                            b"Id" => rel.id = value,
                            b"Type" => rel.rel_type = value,
                            b"Target" => rel.target = value,
                            b"TargetMode" => rel.external = value == "External",
                            _ => {}
                        }
                    }
                    if !rel.id.is_empty() {
                        relationships.push(rel);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Read the relationships of `part`. A part without rels has none.
pub fn read_relationships(
    archive: &mut ZipArchive<impl Read + Seek>,
    part: &str,
) -> Result<Vec<Relationship>> {
    let rels_xml = match archive.by_name(&rels_path_for(part)) {
        Ok(file) => file,
        Err(_) => return Ok(Vec::new()),
    };
    parse_relationships(BufReader::new(rels_xml))
}

/// Parse sheet entries and the active tab out of `xl/workbook.xml` content
pub fn parse_workbook_xml<R: BufRead>(source: R) -> Result<(Vec<(String, String)>, usize)> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut active_tab = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    let mut name = String::new();
                    let mut rel_id = String::new();
                    for attr in e.attributes().flatten() {
                        // `r:id` matches on local name, whatever the prefix is bound to
                        match attr.key.local_name().as_ref() {
                            b"name" => name = attr.unescape_value().unwrap_or_default().into(),
                            b"id" => rel_id = attr.unescape_value().unwrap_or_default().into(),
                            _ => {}
                        }
                    }
                    sheets.push((name, rel_id));
                }
                // Only the first view counts
                b"workbookView" if active_tab.is_none() => {
                    let mut tab = 0usize;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"activeTab" {
                            if let Ok(val) = String::from_utf8_lossy(&attr.value).parse::<usize>() {
                                tab = val;
                            }
                        }
                    }
                    active_tab = Some(tab);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab.unwrap_or(0)))
}

/// Read `xl/workbook.xml` and resolve every sheet to its worksheet part
pub fn extract_workbook_info(archive: &mut ZipArchive<impl Read + Seek>) -> Result<WorkbookInfo> {
    let (entries, active_tab) = {
        let workbook_xml = match archive.by_name(WORKBOOK_PART) {
            Ok(file) => file,
            Err(_) => return Ok(WorkbookInfo::default()),
        };
        parse_workbook_xml(BufReader::new(workbook_xml))?
    };

    let rels = read_relationships(archive, WORKBOOK_PART)?;

    let sheets = entries
        .into_iter()
        .map(|(name, rel_id)| {
            let part = rels
                .iter()
                .find(|r| r.id == rel_id)
                .map(|r| resolve_part_path(WORKBOOK_PART, &r.target));
            SheetPart { name, part }
        })
        .collect();

    Ok(WorkbookInfo { sheets, active_tab })
}

fn anchor_kind(name: &[u8]) -> Option<AnchorKind> {
    match name {
        b"twoCellAnchor" => Some(AnchorKind::TwoCell),
        b"oneCellAnchor" => Some(AnchorKind::OneCell),
        b"absoluteAnchor" => Some(AnchorKind::Absolute),
        _ => None,
    }
}

fn blip_embed(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"embed")
        .map(|attr| attr.unescape_value().unwrap_or_default().into())
}

/// Parse a drawing part and return its pictures.
///
/// Pictures are listed two-cell anchors first, then one-cell, then absolute,
/// each group in document order. Anchors that hold no picture (shapes,
/// charts) are skipped.
pub fn parse_drawing_pictures<R: BufRead>(source: R) -> Result<Vec<DrawingPicture>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut pictures = Vec::new();

    let mut current: Option<DrawingPicture> = None;
    let mut has_picture = false;
    let mut in_from = false;
    let mut in_row = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let local = e.local_name();
                if let Some(kind) = anchor_kind(local.as_ref()) {
                    current = Some(DrawingPicture {
                        anchor: ImageAnchor {
                            kind,
                            from_row: None,
                        },
                        embed: None,
                    });
                    has_picture = false;
                } else if let Some(picture) = current.as_mut() {
                    match local.as_ref() {
                        b"from" => in_from = true,
                        b"row" if in_from => in_row = true,
                        b"pic" => has_picture = true,
                        b"blip" if picture.embed.is_none() => picture.embed = blip_embed(&e),
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(picture) = current.as_mut() {
                    if e.local_name().as_ref() == b"blip" && picture.embed.is_none() {
                        picture.embed = blip_embed(&e);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(picture) = current.as_mut().filter(|_| in_row) {
                    picture.anchor.from_row = Some(e.unescape().unwrap_or_default().to_string());
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"from" => in_from = false,
                    b"row" => in_row = false,
                    name if anchor_kind(name).is_some() => {
                        if let Some(picture) = current.take() {
                            if has_picture {
                                pictures.push(picture);
                            }
                        }
                        in_from = false;
                        in_row = false;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    // Stable sort keeps document order within each anchor kind
    pictures.sort_by_key(|picture| picture.anchor.kind);
    Ok(pictures)
}

fn read_part_bytes(archive: &mut ZipArchive<impl Read + Seek>, part: &str) -> Result<Vec<u8>> {
    let mut file = archive.by_name(part)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn resolve_media(
    archive: &mut ZipArchive<impl Read + Seek>,
    drawing_part: &str,
    drawing_rels: &[Relationship],
    embed: Option<&str>,
) -> MediaSource {
    let Some(rel_id) = embed else {
        return MediaSource::Unresolved {
            reason: "picture has no embedded image reference".to_string(),
        };
    };
    let Some(rel) = drawing_rels.iter().find(|r| r.id == rel_id) else {
        return MediaSource::Unresolved {
            reason: format!("relationship '{}' not found in {}", rel_id, drawing_part),
        };
    };
    if rel.external {
        return MediaSource::Unresolved {
            reason: format!("image is linked, not embedded ({})", rel.target),
        };
    }

    let part = resolve_part_path(drawing_part, &rel.target);
    match read_part_bytes(archive, &part) {
        Ok(bytes) => MediaSource::Embedded { part, bytes },
        Err(e) => MediaSource::Unresolved {
            reason: format!("{}: {}", part, e),
        },
    }
}

/// Collect the pictures of a worksheet in stored order: drawings in the
/// order of the worksheet rels, pictures within a drawing as listed by
/// [`parse_drawing_pictures`]
pub fn extract_sheet_images(
    archive: &mut ZipArchive<impl Read + Seek>,
    sheet_part: &str,
) -> Result<Vec<EmbeddedImage>> {
    let mut images = Vec::new();

    let sheet_rels = read_relationships(archive, sheet_part)?;
    let drawing_parts: Vec<String> = sheet_rels
        .iter()
        .filter(|r| r.is_type("drawing") && !r.external)
        .map(|r| resolve_part_path(sheet_part, &r.target))
        .collect();

    for drawing_part in drawing_parts {
        let pictures = {
            let drawing_xml = match archive.by_name(&drawing_part) {
                Ok(file) => file,
                Err(_) => continue,
            };
            parse_drawing_pictures(BufReader::new(drawing_xml))?
        };
        let drawing_rels = read_relationships(archive, &drawing_part)?;

        for picture in pictures {
            let media = resolve_media(
                archive,
                &drawing_part,
                &drawing_rels,
                picture.embed.as_deref(),
            );
            images.push(EmbeddedImage {
                anchor: picture.anchor,
                media,
            });
        }
    }

    Ok(images)
}
