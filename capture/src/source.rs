//! Re-openable table sources.
//!
//! An import reads every table twice: once for the id bounds and once for
//! the rows. Each pass opens its own reader and drops it when done.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// A table that can be opened any number of times.
pub trait TableSource {
    /// Name used in logs and errors.
    fn name(&self) -> String;

    fn exists(&self) -> bool;

    /// Open a fresh reader positioned at the header row.
    fn open(&self) -> io::Result<Box<dyn BufRead + '_>>;
}

/// Table stored in a file.
#[derive(Debug, Clone)]
pub struct FileTable {
    path: PathBuf,
}

impl FileTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for FileTable {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }
}

/// Table held in memory.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    text: String,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl TableSource for MemoryTable {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn exists(&self) -> bool {
        true
    }

    fn open(&self) -> io::Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(Cursor::new(self.text.as_bytes())))
    }
}

/// Read the first line of a table without its line ending.
///
/// Returns `None` for an empty table.
pub fn read_header(reader: &mut dyn BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(|c: char| c == '\n' || c == '\r').len();
    line.truncate(trimmed);
    Ok(Some(line))
}

/// Call `f` with every data row of a reader positioned after the header.
///
/// Rows end at EOF or at the first blank line. Line endings are stripped.
/// Returns the number of rows visited.
pub fn for_each_row(reader: &mut dyn BufRead, mut f: impl FnMut(&str)) -> io::Result<usize> {
    let mut line = String::new();
    let mut rows = 0;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let row = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
        if row.trim().is_empty() {
            break;
        }
        f(row);
        rows += 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_table_reopens() {
        let table = MemoryTable::new("mem", "VTX,IDX\r\n0,0\n");
        for _ in 0..2 {
            let mut reader = table.open().unwrap();
            assert_eq!(read_header(&mut reader).unwrap().as_deref(), Some("VTX,IDX"));
            let mut rest = String::new();
            reader.read_line(&mut rest).unwrap();
            assert_eq!(rest, "0,0\n");
        }
    }

    #[test]
    fn test_empty_table_has_no_header() {
        let table = MemoryTable::new("empty", "");
        let mut reader = table.open().unwrap();
        assert_eq!(read_header(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_rows_stop_at_blank_line() {
        let table = MemoryTable::new("rows", "H\r\na\r\nb\n  \nc\n");
        let mut reader = table.open().unwrap();
        read_header(&mut reader).unwrap();
        let mut rows = Vec::new();
        let count = for_each_row(&mut reader, |row| rows.push(row.to_string())).unwrap();
        assert_eq!(count, 2);
        assert_eq!(rows, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file() {
        let table = FileTable::new("definitely/not/here.csv");
        assert!(!table.exists());
        assert!(table.open().is_err());
        assert_eq!(table.name(), table.path().display().to_string());
    }
}
