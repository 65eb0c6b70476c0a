use std::collections::HashSet;
use std::io::{Cursor, Write};

use bytes::Bytes;
use uuid::Uuid;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// Keys are namespaced per event; a random prefix keeps same-named uploads
/// from clobbering each other.
pub fn object_key(event_id: Uuid, filename: &str) -> String {
    format!("files/{}/{}-{}", event_id, Uuid::new_v4(), sanitize(filename))
}

fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Bundle the given (name, bytes) pairs into a deflate-compressed archive.
/// Duplicate names get a numeric suffix so no entry shadows another.
pub fn build_zip(entries: &[(String, Bytes)]) -> anyhow::Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut seen: HashSet<String> = HashSet::new();

    for (name, data) in entries {
        let mut entry_name = name.clone();
        let mut n = 1;
        while !seen.insert(entry_name.clone()) {
            entry_name = format!("{n}_{name}");
            n += 1;
        }
        writer.start_file(&entry_name, options)?;
        writer.write_all(data)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn object_key_is_namespaced_and_sanitized() {
        let event_id = Uuid::new_v4();
        let key = object_key(event_id, "my report (final).pdf");
        assert!(key.starts_with(&format!("files/{event_id}/")));
        assert!(key.ends_with("my_report__final_.pdf"));
    }

    #[test]
    fn empty_filename_falls_back_to_placeholder() {
        let key = object_key(Uuid::new_v4(), "");
        assert!(key.ends_with("-file"));
    }

    #[test]
    fn zip_contains_every_entry() {
        let entries = vec![
            ("a.txt".to_string(), Bytes::from_static(b"alpha")),
            ("b.txt".to_string(), Bytes::from_static(b"beta")),
        ];
        let bytes = build_zip(&entries).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut content = String::new();
        archive
            .by_name("a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "alpha");
    }

    #[test]
    fn duplicate_names_are_suffixed_not_dropped() {
        let entries = vec![
            ("photo.jpg".to_string(), Bytes::from_static(b"one")),
            ("photo.jpg".to_string(), Bytes::from_static(b"two")),
        ];
        let bytes = build_zip(&entries).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"photo.jpg"));
        assert!(names.contains(&"1_photo.jpg"));
    }
}
