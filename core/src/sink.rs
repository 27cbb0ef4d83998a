//! Output sinks for final pair counts.

use copairs_common::{CommonError, ErrorContext};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::pair_key::PairCount;
use crate::traits::PairsResult;

/// Marker written once every partition has been persisted.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Receives the output of each reduce partition, then a single commit.
pub trait PairSink {
    fn write_partition(&mut self, partition: usize, pairs: &[PairCount]) -> PairsResult<()>;

    fn commit(&mut self) -> PairsResult<()>;
}

/// Name of the text file holding reduce partition `partition`.
pub fn part_file_name(partition: usize) -> String {
    format!("part-r-{:05}", partition)
}

/// Writes one `part-r-NNNNN` text file per reduce partition.
///
/// The directory is only created when the first partition is written, so a
/// job that fails before its output stage leaves nothing on disk.
#[derive(Debug)]
pub struct TextFileSink {
    dir: PathBuf,
    created: bool,
    files_written: usize,
}

impl TextFileSink {
    /// Prepare a sink for `dir`, which must not exist yet.
    pub fn new<P: AsRef<Path>>(dir: P) -> PairsResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() {
            return Err(already_exists(&dir).into());
        }
        Ok(Self {
            dir,
            created: false,
            files_written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&mut self) -> PairsResult<()> {
        if self.created {
            return Ok(());
        }
        if let Some(parent) = self.dir.parent() {
            fs::create_dir_all(parent).with_io_context(|| {
                format!("Failed to create output parent {}", parent.display())
            })?;
        }
        // create_dir fails if another writer got there first
        fs::create_dir(&self.dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                already_exists(&self.dir)
            } else {
                CommonError::io_error_with_source(
                    format!("Failed to create output directory {}", self.dir.display()),
                    e,
                )
            }
        })?;
        self.created = true;
        Ok(())
    }
}

fn already_exists(dir: &Path) -> CommonError {
    CommonError::io_error(format!("output directory {} already exists", dir.display()))
}

impl PairSink for TextFileSink {
    fn write_partition(&mut self, partition: usize, pairs: &[PairCount]) -> PairsResult<()> {
        self.ensure_dir()?;
        let path = self.dir.join(part_file_name(partition));
        let file = File::create(&path)
            .with_io_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        for pair in pairs {
            writeln!(writer, "{}", pair)
                .with_io_context(|| format!("Failed to write {}", path.display()))?;
        }
        writer
            .flush()
            .with_io_context(|| format!("Failed to flush {}", path.display()))?;

        self.files_written += 1;
        debug!(path = %path.display(), records = pairs.len(), "Wrote output partition");
        Ok(())
    }

    fn commit(&mut self) -> PairsResult<()> {
        self.ensure_dir()?;
        let marker = self.dir.join(SUCCESS_MARKER);
        File::create(&marker)
            .with_io_context(|| format!("Failed to create {}", marker.display()))?;
        debug!(dir = %self.dir.display(), files = self.files_written, "Committed output");
        Ok(())
    }
}

/// Keeps output in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    partitions: Vec<(usize, Vec<PairCount>)>,
    committed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// All pairs written so far, sorted by `(low, high)`.
    pub fn pairs(&self) -> Vec<PairCount> {
        let mut pairs: Vec<PairCount> = self
            .partitions
            .iter()
            .flat_map(|(_, pairs)| pairs.iter().copied())
            .collect();
        pairs.sort();
        pairs
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }
}

impl PairSink for MemorySink {
    fn write_partition(&mut self, partition: usize, pairs: &[PairCount]) -> PairsResult<()> {
        self.partitions.push((partition, pairs.to_vec()));
        Ok(())
    }

    fn commit(&mut self) -> PairsResult<()> {
        self.committed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PairsError;

    fn pc(low: u64, high: u64, count: u64) -> PairCount {
        PairCount { low, high, count }
    }

    #[test]
    fn test_part_file_name() {
        assert_eq!(part_file_name(0), "part-r-00000");
        assert_eq!(part_file_name(12), "part-r-00012");
    }

    #[test]
    fn test_text_file_sink_writes_parts_and_marker() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        let mut sink = TextFileSink::new(&out).unwrap();
        assert!(!out.exists());
        sink.write_partition(0, &[pc(1, 2, 3), pc(1, 5, 1)]).unwrap();
        sink.write_partition(1, &[]).unwrap();
        sink.commit().unwrap();

        let part0 = fs::read_to_string(out.join("part-r-00000")).unwrap();
        assert_eq!(part0, "<1, 2>\t3\n<1, 5>\t1\n");
        assert_eq!(fs::read_to_string(out.join("part-r-00001")).unwrap(), "");
        assert!(out.join(SUCCESS_MARKER).exists());
    }

    #[test]
    fn test_text_file_sink_refuses_existing_dir() {
        let root = tempfile::tempdir().unwrap();
        let err = TextFileSink::new(root.path()).unwrap_err();
        assert!(matches!(err, PairsError::Common(CommonError::IoError { .. })));
    }

    #[test]
    fn test_text_file_sink_commit_only_creates_dir() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("nested").join("out");
        let mut sink = TextFileSink::new(&out).unwrap();
        sink.commit().unwrap();
        assert!(out.join(SUCCESS_MARKER).exists());
    }

    #[test]
    fn test_memory_sink() {
        let mut sink = MemorySink::new();
        sink.write_partition(1, &[pc(4, 9, 1)]).unwrap();
        sink.write_partition(0, &[pc(1, 2, 2)]).unwrap();
        assert!(!sink.is_committed());
        sink.commit().unwrap();

        assert!(sink.is_committed());
        assert_eq!(sink.num_partitions(), 2);
        assert_eq!(sink.pairs(), vec![pc(1, 2, 2), pc(4, 9, 1)]);
    }
}
