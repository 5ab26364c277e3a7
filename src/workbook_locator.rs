//! Locates the first worksheet's archive entry path.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::archive::ArchiveReader;
use crate::error::{ExcelError, Result};

/// Finds the entry path of the first worksheet in an opened XLSX archive.
pub struct WorkbookLocator;

impl WorkbookLocator {
    pub fn locate(archive: &mut ArchiveReader) -> Result<String> {
        if let Some(target) = Self::locate_via_relationships(archive) {
            return Ok(target);
        }

        let mut candidates: Vec<String> = archive
            .names()
            .filter(|name| is_worksheet_entry(name))
            .map(|name| name.to_string())
            .collect();
        candidates.sort();

        candidates.into_iter().next().ok_or_else(|| {
            let available = archive.names().collect::<Vec<_>>().join(", ");
            ExcelError::SheetNotFound {
                sheet: "sheet1".to_string(),
                available,
            }
        })
    }

    fn locate_via_relationships(archive: &mut ArchiveReader) -> Option<String> {
        let workbook_xml = archive.read_entry_to_string("xl/workbook.xml").ok()?;
        let rels_xml = archive
            .read_entry_to_string("xl/_rels/workbook.xml.rels")
            .ok()?;

        let rel_id = first_sheet_relationship_id(&workbook_xml)?;
        let target = relationship_target(&rels_xml, &rel_id)?;
        Some(normalize_target(&target))
    }
}

fn is_worksheet_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let Some(rest) = lower.strip_prefix("xl/worksheets/") else {
        return false;
    };
    !rest.is_empty() && !rest.contains('/') && rest.ends_with(".xml")
}

/// Stream-scans `workbook.xml` for the first `<sheet>` element and returns
/// its relationship id (`r:id`, matched by local name `id` so any namespace
/// prefix is accepted).
fn first_sheet_relationship_id(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" {
                        let value = attr.unescape_value().ok()?;
                        return Some(value.into_owned());
                    }
                }
                return None;
            }
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Stream-scans the relationships XML for a `<Relationship Id="…">` whose
/// id equals `rel_id` and returns its `Target`.
fn relationship_target(xml: &str, rel_id: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|v| v.into_owned()),
                        b"Target" => target = attr.unescape_value().ok().map(|v| v.into_owned()),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rel_id) {
                    return target;
                }
            }
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn normalize_target(target: &str) -> String {
    let mut normalized = target.replace('\\', "/");
    if let Some(stripped) = normalized.strip_prefix('/') {
        normalized = stripped.to_string();
    }
    if !normalized.starts_with("xl/") {
        normalized = format!("xl/{normalized}");
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;

    fn build_archive(path: &std::path::Path, entries: &[(&str, &str)]) {
        let mut writer = ArchiveWriter::create(path).unwrap();
        for (name, content) in entries {
            writer.start_entry(name).unwrap();
            writer.write_data(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn locates_via_relationships() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wb.zip");
        build_archive(
            &path,
            &[
                (
                    "xl/workbook.xml",
                    r#"<workbook><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                ),
                (
                    "xl/_rels/workbook.xml.rels",
                    r#"<Relationships><Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
                ),
                ("xl/worksheets/sheet1.xml", "<worksheet/>"),
            ],
        );

        let mut archive = ArchiveReader::open(&path).unwrap();
        let located = WorkbookLocator::locate(&mut archive).unwrap();
        assert_eq!(located, "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn falls_back_to_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wb.zip");
        build_archive(
            &path,
            &[
                ("xl/worksheets/sheet2.xml", "<worksheet/>"),
                ("xl/worksheets/sheet1.xml", "<worksheet/>"),
            ],
        );

        let mut archive = ArchiveReader::open(&path).unwrap();
        let located = WorkbookLocator::locate(&mut archive).unwrap();
        assert_eq!(located, "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn fails_when_no_worksheet_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wb.zip");
        build_archive(&path, &[("xl/workbook.xml", "<workbook/>")]);

        let mut archive = ArchiveReader::open(&path).unwrap();
        assert!(WorkbookLocator::locate(&mut archive).is_err());
    }

    #[test]
    fn normalizes_target_paths() {
        assert_eq!(normalize_target("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(normalize_target("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(normalize_target("worksheets\\sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
