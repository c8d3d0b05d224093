//! Maven POM rewriting.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

const PARENT_VERSION_PATH: [&[u8]; 3] = [b"project", b"parent", b"version"];

/// Set `/project/parent/version` of a POM document to `version`.
///
/// Everything else is written back as read. Returns `Ok(None)` if the POM has
/// no parent version.
pub fn set_parent_version(pom: &str, version: &str) -> Result<Option<String>, String> {
    let mut reader = Reader::from_str(pom);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut replaced = false;
    // Inside the target element, and whether its text was already written.
    let mut in_target = false;
    let mut wrote_text = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            format!("invalid XML at position {}: {e}", reader.buffer_position())
        })?;
        let out = match event {
            Event::Eof => break,
            Event::Start(start) => {
                path.push(start.local_name().as_ref().to_vec());
                if is_target(&path) {
                    in_target = true;
                    wrote_text = false;
                }
                Event::Start(start)
            }
            Event::Empty(empty) => {
                path.push(empty.local_name().as_ref().to_vec());
                let target = is_target(&path);
                path.pop();
                if target {
                    let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                    write(&mut writer, Event::Start(BytesStart::new(name.clone())))?;
                    write(&mut writer, Event::Text(BytesText::new(version)))?;
                    replaced = true;
                    Event::End(BytesEnd::new(name))
                } else {
                    Event::Empty(empty)
                }
            }
            Event::Text(_) | Event::CData(_) if in_target => {
                if wrote_text {
                    continue;
                }
                wrote_text = true;
                replaced = true;
                Event::Text(BytesText::new(version))
            }
            Event::End(end) => {
                if in_target && is_target(&path) {
                    if !wrote_text {
                        write(&mut writer, Event::Text(BytesText::new(version)))?;
                        replaced = true;
                    }
                    in_target = false;
                }
                path.pop();
                Event::End(end)
            }
            other => other,
        };
        write(&mut writer, out)?;
    }

    if !replaced {
        return Ok(None);
    }
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| format!("rewritten POM is not UTF-8: {e}"))
}

fn is_target(path: &[Vec<u8>]) -> bool {
    path.len() == PARENT_VERSION_PATH.len()
        && path
            .iter()
            .zip(PARENT_VERSION_PATH)
            .all(|(have, want)| have.as_slice() == want)
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), String> {
    writer
        .write_event(event)
        .map_err(|e| format!("could not write XML: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <!-- build parent -->
    <parent>
        <groupId>de.fhdo.lemma</groupId>
        <version>0.8.0</version>
    </parent>
    <version>0.8.0</version>
</project>
"#;

    #[test]
    fn replaces_only_the_parent_version() {
        let updated = set_parent_version(POM, "0.8.5-SNAPSHOT").unwrap().unwrap();
        assert_eq!(updated, POM.replacen("<version>0.8.0</version>\n    </parent>", "<version>0.8.5-SNAPSHOT</version>\n    </parent>", 1));
        assert!(updated.contains("    <version>0.8.0</version>\n</project>"));
        assert!(updated.contains("<!-- build parent -->"));
    }

    #[test]
    fn empty_parent_version_is_filled() {
        let pom = "<project><parent><version/></parent></project>";
        assert_eq!(
            set_parent_version(pom, "1.0").unwrap().unwrap(),
            "<project><parent><version>1.0</version></parent></project>"
        );
        let pom = "<project><parent><version></version></parent></project>";
        assert_eq!(
            set_parent_version(pom, "1.0").unwrap().unwrap(),
            "<project><parent><version>1.0</version></parent></project>"
        );
    }

    #[test]
    fn pom_without_parent() {
        assert_eq!(
            set_parent_version("<project><version>1</version></project>", "2").unwrap(),
            None
        );
    }

    #[test]
    fn malformed_pom() {
        assert!(set_parent_version("<project><parent></project>", "2").is_err());
    }
}
