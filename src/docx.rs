//! WordprocessingML writer for single-section text documents.

use crate::error::AppError;
use std::io::{Cursor, Write};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

pub const CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const FONT: &str = "Times New Roman";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
    Both,
}

impl Align {
    fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Both => "both",
        }
    }
}

/// A run of text with uniform formatting. `size` is in half-points.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub size: u32,
    pub bold: bool,
}

impl Run {
    pub fn new(text: impl Into<String>, size: u32) -> Self {
        Run {
            text: text.into(),
            size,
            bold: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub align: Align,
    /// First-line indent in twips.
    pub first_line: Option<u32>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn new(align: Align) -> Self {
        Paragraph {
            align,
            first_line: None,
            runs: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Paragraph::new(Align::Left)
    }

    pub fn indent(mut self, twips: u32) -> Self {
        self.first_line = Some(twips);
        self
    }

    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Concatenated text, used by tests and logs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Escapes markup characters and drops the control characters XML 1.0 does
/// not allow, which would make Word reject the document.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_control() && c < '\u{80}' => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            _ => out.push(c),
        }
    }
    out
}

fn write_run(xml: &mut String, run: &Run) {
    xml.push_str("<w:r><w:rPr>");
    xml.push_str(&format!(
        "<w:rFonts w:ascii=\"{f}\" w:hAnsi=\"{f}\" w:cs=\"{f}\"/>",
        f = FONT
    ));
    if run.bold {
        xml.push_str("<w:b/>");
    }
    xml.push_str(&format!(
        "<w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/></w:rPr>",
        s = run.size
    ));
    // Tabs are separate elements in WordprocessingML.
    for (i, piece) in run.text.split('\t').enumerate() {
        if i > 0 {
            xml.push_str("<w:tab/>");
        }
        if !piece.is_empty() {
            xml.push_str("<w:t xml:space=\"preserve\">");
            xml.push_str(&xml_escape(piece));
            xml.push_str("</w:t>");
        }
    }
    xml.push_str("</w:r>");
}

/// `word/document.xml` for the given paragraphs.
pub fn document_xml(paragraphs: &[Paragraph]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>",
    );
    for p in paragraphs {
        xml.push_str("<w:p><w:pPr>");
        xml.push_str(&format!("<w:jc w:val=\"{}\"/>", p.align.as_str()));
        if let Some(twips) = p.first_line {
            xml.push_str(&format!("<w:ind w:firstLine=\"{}\"/>", twips));
        }
        xml.push_str("</w:pPr>");
        for run in &p.runs {
            write_run(&mut xml, run);
        }
        xml.push_str("</w:p>");
    }
    xml.push_str(
        "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1134\" w:right=\"850\" w:bottom=\"1134\" w:left=\"1701\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/>\
         </w:sectPr></w:body></w:document>",
    );
    xml
}

/// Packages the paragraphs as a `.docx` file.
pub fn build(paragraphs: &[Paragraph]) -> Result<Vec<u8>, AppError> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        ("_rels/.rels", RELS_XML.to_string()),
        ("word/document.xml", document_xml(paragraphs)),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in &parts {
        zip.start_file(*name, options)?;
        zip.write_all(xml.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_document_xml_formatting() {
        let paragraphs = vec![
            Paragraph::new(Align::Center).run(Run::new("A & B", 32).bold()),
            Paragraph::new(Align::Both)
                .indent(720)
                .run(Run::new("x\ty", 22)),
        ];
        let xml = document_xml(&paragraphs);

        assert!(xml.contains("<w:jc w:val=\"center\"/>"));
        assert!(xml.contains("<w:b/><w:sz w:val=\"32\"/>"));
        assert!(xml.contains("A &amp; B"));
        assert!(xml.contains("<w:ind w:firstLine=\"720\"/>"));
        assert!(xml.contains("x</w:t><w:tab/><w:t xml:space=\"preserve\">y"));
        assert!(xml.ends_with("</w:document>"));
    }

    #[test]
    fn test_control_characters_are_dropped() {
        assert_eq!(xml_escape("Иванов\u{0001} И.\u{001F}И."), "Иванов И.И.");
        assert_eq!(xml_escape("a\u{000B}b\u{FFFF}"), "ab");
        assert_eq!(xml_escape("line\r\nnext"), "line\r\nnext");
        assert_eq!(xml_escape("\"<ЭСК>\""), "&quot;&lt;ЭСК&gt;&quot;");
    }

    #[test]
    fn test_build_is_a_readable_archive() {
        let paragraphs = vec![
            Paragraph::new(Align::Center).run(Run::new("СЛУЖЕБНАЯ ЗАПИСКА", 28).bold()),
            Paragraph::new(Align::Both).run(Run::new("Сотрудник\u{0007} ЭСК", 24)),
        ];
        let bytes = build(&paragraphs).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        for part in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            assert!(names.iter().any(|n| n == part), "{}", part);
        }

        let mut document = archive.by_name("word/document.xml").unwrap();
        assert_eq!(document.compression(), CompressionMethod::Deflated);
        let mut xml = String::new();
        document.read_to_string(&mut xml).unwrap();
        assert_eq!(xml, document_xml(&paragraphs));
        assert!(xml.contains("Сотрудник ЭСК"));
    }
}
