//! Assembles a minimal-but-valid XLSX package: four byte-exact fixed parts
//! plus the generated worksheet body.

use std::path::Path;

use crate::archive::ArchiveWriter;
use crate::error::Result;

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#, "\n",
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#, "\n",
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#, "\n",
    r#"<Default Extension="xml" ContentType="application/xml"/>"#, "\n",
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#, "\n",
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#, "\n",
    r#"</Types>"#,
);

const RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#, "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#, "\n",
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#, "\n",
    r#"</Relationships>"#,
);

const WORKBOOK_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#, "\n",
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#, "\n",
    r#"<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>"#, "\n",
    r#"</workbook>"#,
);

const WORKBOOK_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#, "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#, "\n",
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#, "\n",
    r#"</Relationships>"#,
);

/// Writes the fixed package parts plus the worksheet body into a fresh
/// archive at `output_path`. Discards the whole archive (unlinking whatever
/// was written so far) the moment any part fails to add.
pub struct PackageAssembler;

impl PackageAssembler {
    pub fn assemble(output_path: &Path, worksheet_path: &Path) -> Result<()> {
        let mut archive = ArchiveWriter::create(output_path)?;

        match Self::write_parts(&mut archive, worksheet_path) {
            Ok(()) => archive.finish(),
            Err(err) => {
                archive.discard();
                Err(err)
            }
        }
    }

    fn write_parts(archive: &mut ArchiveWriter, worksheet_path: &Path) -> Result<()> {
        archive.start_entry("[Content_Types].xml")?;
        archive.write_data(CONTENT_TYPES_XML.as_bytes())?;

        archive.start_entry("_rels/.rels")?;
        archive.write_data(RELS_XML.as_bytes())?;

        archive.start_entry("xl/workbook.xml")?;
        archive.write_data(WORKBOOK_XML.as_bytes())?;

        archive.start_entry("xl/_rels/workbook.xml.rels")?;
        archive.write_data(WORKBOOK_RELS_XML.as_bytes())?;

        archive.start_entry("xl/worksheets/sheet1.xml")?;
        archive.write_data_from_file(worksheet_path)?;

        Ok(())
    }
}
