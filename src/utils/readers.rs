use super::Result;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, Read as ioRead};
use std::path::Path;

/// Opens a plain or gzip-compressed text file for line-based reading.
pub fn open_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    fn is_gzipped(path: &Path) -> bool {
        let path_str = path.to_string_lossy().to_lowercase();
        path_str.ends_with(".gz") || path_str.ends_with(".gzip")
    }
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(format!("Invalid gzip header: {}", path.to_string_lossy()).into())
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

/// Splits a tab-delimited line into fields, ignoring a trailing carriage return.
pub fn split_tabs(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n']).split('\t').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::{BufRead, Write};

    #[test]
    fn open_reader_reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        std::fs::write(&plain, "a\tb\nc\td\n").unwrap();
        let lines: Vec<String> = open_reader(&plain).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a\tb", "c\td"]);

        let gz = dir.path().join("plain.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"x\ty\n").unwrap();
        encoder.finish().unwrap();
        let lines: Vec<String> = open_reader(&gz).unwrap().lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["x\ty"]);
    }

    #[test]
    fn open_reader_missing_file_err() {
        assert!(open_reader(Path::new("/nonexistent/file.txt")).is_err());
    }

    #[test]
    fn split_tabs_strips_line_endings() {
        assert_eq!(split_tabs("a\tb\t\r\n"), vec!["a", "b", ""]);
    }
}
