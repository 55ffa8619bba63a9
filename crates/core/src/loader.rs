use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use lopdf::Document;
use quick_xml::events::Event;
use quick_xml::Reader;
use walkdir::WalkDir;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Markdown,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
    }
}

// Sorted output keeps chunk order stable across runs.
pub fn discover_documents(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|item| item.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        if DocumentFormat::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn read_document(path: &Path) -> Result<String, IngestError> {
    match DocumentFormat::from_path(path) {
        Some(DocumentFormat::Text) | Some(DocumentFormat::Markdown) => read_text_file(path),
        Some(DocumentFormat::Pdf) => read_pdf(path),
        Some(DocumentFormat::Docx) => read_docx(path),
        None => Ok(String::new()),
    }
}

// Windows-1252 maps every byte, so the fallback decode cannot fail.
fn read_text_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;

    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(error) => {
            let (decoded, _, _) = WINDOWS_1252.decode(error.as_bytes());
            Ok(decoded.into_owned())
        }
    }
}

fn read_pdf(path: &Path) -> Result<String, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::Pdf(error.to_string()))?;

    let mut parts = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::Pdf(error.to_string()))?;

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(format!("[Page {page_no}] {trimmed}"));
        }
    }

    if parts.is_empty() {
        return Err(IngestError::Pdf(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(parts.join("\n\n"))
}

// A .docx is a ZIP archive; the body lives in word/document.xml.
fn read_docx(path: &Path) -> Result<String, IngestError> {
    let file = fs::File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|error| IngestError::Docx(error.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|error| IngestError::Docx(error.to_string()))?
        .read_to_string(&mut xml)?;

    let paragraphs = docx_paragraph_texts(&xml)?;
    Ok(paragraphs.join("\n"))
}

fn docx_paragraph_texts(xml: &str) -> Result<Vec<String>, IngestError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader
            .read_event()
            .map_err(|error| IngestError::Docx(error.to_string()))?
        {
            Event::Start(ref element) if element.name().as_ref() == b"w:t" => {
                in_text_run = true;
            }
            Event::End(ref element) => match element.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Event::Text(ref text) if in_text_run => {
                let unescaped = text
                    .unescape()
                    .map_err(|error| IngestError::Docx(error.to_string()))?;
                current.push_str(&unescaped);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::{discover_documents, docx_paragraph_texts, read_document, DocumentFormat};
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn extension_lookup_is_case_insensitive_and_closed() {
        assert_eq!(DocumentFormat::from_extension("TXT"), Some(DocumentFormat::Text));
        assert_eq!(DocumentFormat::from_extension("Md"), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_extension("pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("html"), None);
        assert_eq!(DocumentFormat::from_path(Path::new("notes")), None);
    }

    #[test]
    fn discovery_is_recursive_and_skips_unsupported_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;

        fs::write(dir.path().join("a.txt"), "alpha")?;
        fs::write(nested.join("b.md"), "beta")?;
        fs::write(dir.path().join("ignored.html"), "<p>nope</p>")?;

        let files = discover_documents(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| {
            DocumentFormat::from_path(path).is_some()
        }));
        Ok(())
    }

    #[test]
    fn utf8_text_reads_verbatim() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("plain.txt");
        fs::write(&path, "héllo wörld")?;

        assert_eq!(read_document(&path)?, "héllo wörld");
        Ok(())
    }

    #[test]
    fn invalid_utf8_falls_back_to_windows_1252() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("legacy.txt");
        // "café" with a Windows-1252 e-acute (0xE9), invalid as UTF-8.
        File::create(&path)?.write_all(&[b'c', b'a', b'f', 0xE9])?;

        assert_eq!(read_document(&path)?, "café");
        Ok(())
    }

    #[test]
    fn corrupt_pdf_reports_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%not really a pdf")?;

        assert!(read_document(&path).is_err());
        Ok(())
    }

    #[test]
    fn pdf_without_readable_text_is_a_per_file_error() -> Result<(), Box<dyn std::error::Error>> {
        use lopdf::{dictionary, Document, Object};

        let dir = tempdir()?;
        let path = dir.path().join("blank.pdf");

        // Structurally valid single-page PDF with no content streams.
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        document.save(&path)?;

        assert!(read_document(&path).is_err());
        Ok(())
    }

    #[test]
    fn docx_body_xml_yields_nonempty_paragraphs() -> Result<(), Box<dyn std::error::Error>> {
        let xml = r#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
                <w:p><w:r><w:t>  </w:t></w:r></w:p>
                <w:p>
                  <w:r><w:t>Second </w:t></w:r>
                  <w:r><w:t>paragraph.</w:t></w:r>
                </w:p>
              </w:body>
            </w:document>"#;

        let paragraphs = docx_paragraph_texts(xml)?;
        assert_eq!(paragraphs, vec!["First paragraph.", "Second paragraph."]);
        Ok(())
    }
}
