//! Ratings input: line parsing and splitting into map partitions.
//!
//! Lines are kept as raw bytes until a map task parses them, so one badly
//! encoded line is a malformed record rather than an unreadable file.

use copairs_common::{CommonError, ErrorContext, JobConfig};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::shuffle::hash_partition;
use crate::traits::{PairsError, PairsResult};
use crate::types::{ItemId, Rating, Score, UserId};

/// Parses `user SEP item SEP rating [SEP ...]` lines.
#[derive(Debug, Clone)]
pub struct RecordParser {
    separator: String,
}

impl RecordParser {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn from_config(config: &JobConfig) -> Self {
        Self::new(config.effective_separator())
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Parse one raw line. Bytes that are not valid UTF-8 make the record malformed.
    pub fn parse_bytes(&self, line: &[u8]) -> PairsResult<Option<Rating>> {
        match std::str::from_utf8(line) {
            Ok(text) => self.parse(text),
            Err(e) => Err(PairsError::malformed(
                String::from_utf8_lossy(line),
                format!("invalid UTF-8: {}", e),
            )),
        }
    }

    /// Parse one line. Returns `Ok(None)` for blank lines.
    pub fn parse(&self, line: &str) -> PairsResult<Option<Rating>> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let mut fields = line.split(self.separator.as_str()).map(str::trim);
        let (Some(user), Some(item), Some(score)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(PairsError::malformed(line, "expected user, item and rating fields"));
        };

        let user = user
            .parse::<UserId>()
            .map_err(|e| PairsError::malformed(line, format!("user id {:?}: {}", user, e)))?;
        let item = item
            .parse::<ItemId>()
            .map_err(|e| PairsError::malformed(line, format!("item id {:?}: {}", item, e)))?;
        let score = score
            .parse::<Score>()
            .map_err(|e| PairsError::malformed(line, format!("rating {:?}: {}", score, e)))?;

        Ok(Some(Rating::new(user, item, score)))
    }
}

/// Collect input files under `path` in sorted order.
///
/// Directories are walked recursively. Hidden files and files starting
/// with `_` are skipped.
pub fn list_input_files<P: AsRef<Path>>(path: P) -> PairsResult<Vec<PathBuf>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CommonError::not_found_error(format!(
            "input path {} not found",
            path.display()
        ))
        .into());
    }

    let mut files = Vec::new();
    collect_files(path, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(path: &Path, out: &mut Vec<PathBuf>) -> PairsResult<()> {
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }

    let entries = fs::read_dir(path)
        .with_io_context(|| format!("Failed to list directory {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_io_context(|| format!("Failed to read entry in {}", path.display()))?;
        let entry_path = entry.path();
        let skipped = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'));
        if skipped {
            continue;
        }
        if entry_path.is_dir() {
            collect_files(&entry_path, out)?;
        } else {
            out.push(entry_path);
        }
    }
    Ok(())
}

/// One input line without its terminator.
pub type RawLine = Vec<u8>;

/// Read every line of every input file under `path`.
///
/// Lines are split on `\n` with a trailing `\r` removed. No decoding
/// happens here.
pub fn read_input_lines<P: AsRef<Path>>(path: P) -> PairsResult<Vec<RawLine>> {
    let mut lines = Vec::new();
    for file in list_input_files(path)? {
        let reader = BufReader::new(
            File::open(&file)
                .with_io_context(|| format!("Failed to open input file {}", file.display()))?,
        );
        let before = lines.len();
        for line in reader.split(b'\n') {
            let mut line =
                line.with_io_context(|| format!("Failed to read input file {}", file.display()))?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
        }
        debug!(file = %file.display(), lines = lines.len() - before, "Read input file");
    }
    Ok(lines)
}

/// Assign lines to at most `num_splits` map partitions by user.
///
/// Every rating of one user lands in the same partition, so each user's
/// qualifying set is complete inside a single map task. Lines that do not
/// parse are spread round-robin and reported by the map task that gets them.
pub fn split_by_user(
    lines: Vec<RawLine>,
    num_splits: usize,
    parser: &RecordParser,
) -> Vec<Vec<RawLine>> {
    let num_splits = num_splits.clamp(1, u32::MAX as usize);
    let mut splits: Vec<Vec<RawLine>> = vec![Vec::new(); num_splits];
    for (i, line) in lines.into_iter().enumerate() {
        let split = match parser.parse_bytes(&line) {
            Ok(Some(rating)) => hash_partition(&rating.user, num_splits as u32, 0) as usize,
            _ => i % num_splits,
        };
        splits[split].push(line);
    }
    splits.retain(|split| !split.is_empty());
    splits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tab_separated() {
        let parser = RecordParser::new("\t");
        let rating = parser.parse("196\t242\t3\t881250949").unwrap().unwrap();
        assert_eq!(rating, Rating::new(196, 242, 3));
    }

    #[test]
    fn test_parse_double_colon() {
        let parser = RecordParser::new("::");
        let rating = parser.parse("1::1193::5::978300760").unwrap().unwrap();
        assert_eq!(rating, Rating::new(1, 1193, 5));

        let rating = parser.parse(" 7 :: 8 :: 4").unwrap().unwrap();
        assert_eq!(rating, Rating::new(7, 8, 4));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let parser = RecordParser::new("\t");
        assert!(parser.parse("").unwrap().is_none());
        assert!(parser.parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_malformed_records() {
        let parser = RecordParser::new("\t");
        for line in ["1\t2", "a\t2\t3", "1\tb\t3", "1\t2\tfive", "1,2,3", "-1\t2\t3"] {
            let err = parser.parse(line).unwrap_err();
            assert!(
                matches!(err, PairsError::MalformedRecord { .. }),
                "{line:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        let parser = RecordParser::new("\t");
        let err = parser.parse_bytes(b"\xff\xfe\t3\t5").unwrap_err();
        assert!(matches!(err, PairsError::MalformedRecord { .. }));
        assert_eq!(
            parser.parse_bytes(b"4\t3\t5").unwrap(),
            Some(Rating::new(4, 3, 5))
        );
    }

    #[test]
    fn test_split_by_user_keeps_users_together() {
        let parser = RecordParser::new("\t");
        let mut lines: Vec<RawLine> = Vec::new();
        for i in 0..60u64 {
            lines.push(format!("{}\t{}\t5", i % 7, i).into_bytes());
        }
        lines.push(b"garbage".to_vec());

        let splits = split_by_user(lines, 3, &parser);
        assert!(splits.len() <= 3);
        assert_eq!(splits.iter().map(Vec::len).sum::<usize>(), 61);

        for user in 0..7u64 {
            let holders = splits
                .iter()
                .filter(|split| {
                    split.iter().any(|line| {
                        matches!(parser.parse_bytes(line), Ok(Some(r)) if r.user == user)
                    })
                })
                .count();
            assert_eq!(holders, 1, "user {user} spread over {holders} splits");
        }

        assert!(split_by_user(Vec::new(), 4, &parser).is_empty());
        assert_eq!(split_by_user(vec![b"1\t2\t5".to_vec()], 0, &parser).len(), 1);
    }

    #[test]
    fn test_read_input_lines_keeps_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ratings"), b"1\t10\t5\r\n\xff\t1\t5\n2\t3\t4").unwrap();

        let lines = read_input_lines(dir.path()).unwrap();
        assert_eq!(
            lines,
            vec![b"1\t10\t5".to_vec(), b"\xff\t1\t5".to_vec(), b"2\t3\t4".to_vec()]
        );
    }

    #[test]
    fn test_list_input_files_skips_markers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.data"), "2\t1\t5\n").unwrap();
        fs::write(dir.path().join("a.data"), "1\t1\t5\n").unwrap();
        fs::write(dir.path().join("_SUCCESS"), "").unwrap();
        fs::write(dir.path().join(".crc"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.data"), "3\t1\t5\n").unwrap();

        let files = list_input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.data", "b.data", "c.data"]);

        let lines = read_input_lines(dir.path()).unwrap();
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_missing_input() {
        let err = list_input_files("/nonexistent/ratings").unwrap_err();
        assert!(matches!(err, PairsError::Common(CommonError::NotFoundError { .. })));
    }
}
