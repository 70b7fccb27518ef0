//! Custom assertions for archives and run output

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Read every entry of the zip at `archive` into a name -> content map
pub fn archive_entries(archive: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = std::fs::File::open(archive)
        .unwrap_or_else(|e| panic!("failed to open archive {}: {}", archive.display(), e));
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entries = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.insert(entry.name().to_string(), content);
    }
    entries
}

/// Assert the archive holds exactly `expected` entry names
pub fn assert_archive_names(archive: &Path, expected: &[&str]) {
    let entries = archive_entries(archive);
    let names: Vec<&str> = entries.keys().map(String::as_str).collect();
    let mut expected: Vec<&str> = expected.to_vec();
    expected.sort();
    assert_eq!(names, expected, "archive {} entries", archive.display());
}
