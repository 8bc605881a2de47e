//! Timestamped topology snapshots
//!
//! Reads a directory tree of edge-list files whose names carry a date, e.g.
//! `201603.relationship.gz` for March 2016, and yields one [`Snapshot`] per
//! file in timestamp order. Files whose names do not match the format are
//! ignored; files that cannot be read or parsed are skipped with a warning.
//!
//! Edge lists hold one edge per line, `a b [extra...]`, separated by
//! whitespace or `|`. Lines starting with `#` are comments. Files ending in
//! `.gz` are decompressed on the fly.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use chrono::format::{Item, Parsed, StrftimeItems};
use flate2::read::GzDecoder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use fracture_core::{Graph, Network, NodeId};

use crate::error::SourceError;

/// File name format of CAIDA-style relationship dumps
pub const DEFAULT_FILENAME_FORMAT: &str = "%Y%m.relationship.gz";

/// Label format used as the result-store timestamp
pub const DEFAULT_LABEL_FORMAT: &str = "%Y-%m";

/// One network state at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot<N: Network = Graph> {
    pub network: N,
    pub timestamp: NaiveDate,
    /// Human-readable timestamp, e.g. `2016-03`
    pub label: String,
}

impl<N: Network> Snapshot<N> {
    pub fn new(network: N, timestamp: NaiveDate, label: impl Into<String>) -> Self {
        Self {
            network,
            timestamp,
            label: label.into(),
        }
    }
}

/// Lazy, timestamp-ordered sequence of snapshots from a directory
///
/// Discovery happens in [`open`](Self::open); each file is read only when
/// the iterator reaches it, so one network is in memory at a time.
#[derive(Debug)]
pub struct TopologySource {
    pending: std::vec::IntoIter<(NaiveDate, PathBuf)>,
    label_format: String,
}

impl TopologySource {
    /// Discover every file under `dir` whose name matches `filename_format`
    pub fn open(dir: impl AsRef<Path>, filename_format: &str) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        check_format(filename_format)?;

        let mut found = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            match parse_timestamp(&name, filename_format) {
                Ok(timestamp) => found.push((timestamp, entry.path().to_path_buf())),
                Err(e) => debug!(file = %name, error = %e, "Ignoring file"),
            }
        }

        // Stable: equal dates keep walk order
        found.sort_by_key(|(timestamp, _)| *timestamp);
        info!(
            dir = %dir.display(),
            snapshots = found.len(),
            "Discovered topology snapshots"
        );

        Ok(Self {
            pending: found.into_iter(),
            label_format: DEFAULT_LABEL_FORMAT.to_string(),
        })
    }

    /// Use a different strftime format for snapshot labels
    pub fn with_label_format(mut self, format: impl Into<String>) -> Result<Self, SourceError> {
        let format = format.into();
        check_format(&format)?;
        self.label_format = format;
        Ok(self)
    }

    /// Files not yet yielded, including any that will turn out unreadable
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Iterator for TopologySource {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Self::Item> {
        for (timestamp, path) in self.pending.by_ref() {
            match read_edge_list(&path) {
                Ok(network) => {
                    let label = timestamp.format(&self.label_format).to_string();
                    return Some(Snapshot::new(network, timestamp, label));
                }
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable topology file"
                ),
            }
        }
        None
    }
}

fn check_format(format: &str) -> Result<(), SourceError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SourceError::InvalidFormat {
            name: String::new(),
            format: format.to_string(),
            reason: "unsupported strftime directive".to_string(),
        });
    }
    Ok(())
}

/// Parse the date a file name carries
///
/// Missing day (and month) fields default to 1.
pub fn parse_timestamp(name: &str, format: &str) -> Result<NaiveDate, SourceError> {
    let invalid = |reason: String| SourceError::InvalidFormat {
        name: name.to_string(),
        format: format.to_string(),
        reason,
    };

    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, name, StrftimeItems::new(format))
        .map_err(|e| invalid(e.to_string()))?;

    // Fails only when the name already fixed a value
    let _ = parsed.set_month(1);
    let _ = parsed.set_day(1);

    parsed.to_naive_date().map_err(|e| invalid(e.to_string()))
}

/// Read one edge-list file, decompressing `.gz` files
pub fn read_edge_list(path: &Path) -> Result<Graph, SourceError> {
    let file = File::open(path)?;
    let gzipped = path.extension().is_some_and(|ext| ext == "gz");

    if gzipped {
        parse_edge_list(BufReader::new(GzDecoder::new(file)), path)
    } else {
        parse_edge_list(BufReader::new(file), path)
    }
}

/// Parse edge-list text; `path` only labels errors
pub fn parse_edge_list<R: BufRead>(reader: R, path: &Path) -> Result<Graph, SourceError> {
    let mut graph = Graph::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line
            .split(|c: char| c.is_whitespace() || c == '|')
            .filter(|field| !field.is_empty());

        let mut endpoint = || -> Result<NodeId, SourceError> {
            let field = fields.next().ok_or_else(|| SourceError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                reason: "expected two node ids".to_string(),
            })?;
            field.parse::<u64>().map(NodeId).map_err(|e| SourceError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("invalid node id {field:?}: {e}"),
            })
        };

        let a = endpoint()?;
        let b = endpoint()?;
        graph.connect(a, b);
    }

    Ok(graph)
}
