// src/catalog.rs - Dataset discovery and the cell/organelle catalog

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use regex::Regex;

use crate::errors::{OrgaplexError, Result};

/// Suffix of every per-cell, per-organelle statistics folder
pub const STATISTICS_SUFFIX: &str = "_Statistics";

/// File name fragment of shortest-distance exports
pub const DISTANCE_FILE_MARKER: &str = "Shortest_Distance_to_Surfaces_Surfaces";

/// How the statistics folders are arranged under the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLayout {
    /// `input/control_1_ER_Statistics/...`
    Direct,
    /// `input/<group>/control_1_ER_Statistics/...`
    Nested { group: String },
}

impl fmt::Display for DatasetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLayout::Direct => write!(f, "Direct"),
            DatasetLayout::Nested { group } => write!(f, "Nested ({})", group),
        }
    }
}

/// A folder or file name that did not match the expected naming.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    pub path: PathBuf,
    pub message: String,
}

/// One statistics folder
#[derive(Debug, Clone)]
pub struct CellFolder {
    pub path: PathBuf,
    pub cell_id: String,
    pub organelle: String,
}

struct NamePatterns {
    folder: Regex,
    target: Regex,
}

impl NamePatterns {
    fn new() -> Self {
        Self {
            // control_1_ER_Statistics -> ("control_1", "ER")
            folder: Regex::new(r"^(.+?)_([A-Z][A-Z0-9a-z]*)_Statistics$")
                .expect("folder pattern is valid"),
            // ..._Surfaces=LD.csv -> "LD"
            target: Regex::new(r"Surfaces=([A-Z][A-Z0-9a-z]*)").expect("target pattern is valid"),
        }
    }
}

/// Immutable mapping from (cell, organelle) to measurement folders.
pub struct Catalog {
    input_dir: PathBuf,
    search_dir: PathBuf,
    layout: DatasetLayout,
    folders: Vec<CellFolder>,
    all_organelles: Vec<String>,
    cells_by_organelle: HashMap<String, Vec<String>>,
    folder_index: HashMap<(String, String), usize>,
    parse_warnings: Vec<ParseWarning>,
    patterns: NamePatterns,
}

impl Catalog {
    /// Detect the layout under `input_dir` and index every statistics folder.
    pub fn build<P: AsRef<Path>>(input_dir: P) -> Result<Self> {
        let input_dir = input_dir.as_ref().to_path_buf();
        let (layout, search_dir) = detect_structure(&input_dir)?;
        info!("Structure: {} - searching {}", layout, search_dir.display());

        let patterns = NamePatterns::new();
        let mut parse_warnings = Vec::new();
        let mut folders = Vec::new();

        for dir in sorted_subdirs(&search_dir)? {
            let name = match dir.file_name().and_then(|n| n.to_str()) {
                Some(name) if name.ends_with(STATISTICS_SUFFIX) => name.to_string(),
                _ => continue,
            };

            match patterns.folder.captures(&name) {
                Some(caps) => folders.push(CellFolder {
                    path: dir.clone(),
                    cell_id: caps[1].to_string(),
                    organelle: caps[2].to_string(),
                }),
                None => {
                    let warning = ParseWarning {
                        path: dir.clone(),
                        message: format!("could not parse cell ID and organelle from {}", name),
                    };
                    warn!("{}", warning.message);
                    parse_warnings.push(warning);
                }
            }
        }

        if folders.is_empty() {
            return Err(OrgaplexError::Structure(format!(
                "no valid cell folders could be parsed in {}",
                search_dir.display()
            )));
        }

        let mut cells_by_organelle: HashMap<String, Vec<String>> = HashMap::new();
        let mut folder_index = HashMap::new();
        for (i, folder) in folders.iter().enumerate() {
            let key = (folder.cell_id.clone(), folder.organelle.clone());
            if folder_index.contains_key(&key) {
                let warning = ParseWarning {
                    path: folder.path.clone(),
                    message: format!(
                        "duplicate folder for {}/{}, keeping the first",
                        folder.cell_id, folder.organelle
                    ),
                };
                warn!("{}", warning.message);
                parse_warnings.push(warning);
                continue;
            }
            folder_index.insert(key, i);
            cells_by_organelle
                .entry(folder.organelle.clone())
                .or_default()
                .push(folder.cell_id.clone());
        }

        let all_organelles: Vec<String> = cells_by_organelle.keys().cloned().collect::<BTreeSet<_>>().into_iter().collect();

        let catalog = Self {
            input_dir,
            search_dir,
            layout,
            folders,
            all_organelles,
            cells_by_organelle,
            folder_index,
            parse_warnings,
            patterns,
        };

        for line in catalog.summary().lines() {
            info!("{}", line);
        }

        Ok(catalog)
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn parse_warnings(&self) -> &[ParseWarning] {
        &self.parse_warnings
    }

    /// Sorted organelle names.
    pub fn all_organelles(&self) -> &[String] {
        &self.all_organelles
    }

    pub fn has_organelle(&self, organelle: &str) -> bool {
        self.cells_by_organelle.contains_key(organelle)
    }

    /// Unique cell ids in discovery order.
    pub fn cell_ids(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.folders
            .iter()
            .filter(|f| seen.insert(f.cell_id.clone()))
            .map(|f| f.cell_id.clone())
            .collect()
    }

    /// Cells owning a folder for `organelle`, in catalog order.
    pub fn cells_by_organelle(&self, organelle: &str) -> &[String] {
        self.cells_by_organelle
            .get(organelle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn folder_path(&self, cell_id: &str, organelle: &str) -> Option<&Path> {
        self.folder_index
            .get(&(cell_id.to_string(), organelle.to_string()))
            .map(|&i| self.folders[i].path.as_path())
    }

    /// Organelle folders of one cell, in catalog order.
    pub fn folders_for_cell<'a>(&'a self, cell_id: &'a str) -> impl Iterator<Item = &'a CellFolder> + 'a {
        self.folders
            .iter()
            .enumerate()
            .filter(move |(i, f)| {
                f.cell_id == cell_id
                    && self.folder_index.get(&(f.cell_id.clone(), f.organelle.clone())) == Some(i)
            })
            .map(|(_, f)| f)
    }

    /// Shortest-distance files of `organelle` in `cell_id`, with the parsed
    /// target organelle, sorted by file name. Self-distances and repeated
    /// targets are skipped.
    pub fn distance_files(&self, cell_id: &str, organelle: &str) -> Vec<(PathBuf, String)> {
        let folder = match self.folder_path(cell_id, organelle) {
            Some(folder) => folder,
            None => return Vec::new(),
        };

        let mut files: Vec<PathBuf> = match fs::read_dir(folder) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_distance_file(p))
                .collect(),
            Err(e) => {
                warn!("Could not list {}: {}", folder.display(), e);
                return Vec::new();
            }
        };
        files.sort();

        let mut seen = BTreeSet::new();
        let mut result = Vec::new();
        for path in files {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let target = match self.patterns.target.captures(name) {
                Some(caps) => caps[1].to_string(),
                None => {
                    warn!("Could not identify target in {}", name);
                    continue;
                }
            };
            if target == organelle {
                debug!("Skipping self-distance file {}", name);
                continue;
            }
            if !seen.insert(target.clone()) {
                warn!("Duplicate distance file for {}/{} -> {}: {}", cell_id, organelle, target, name);
                continue;
            }
            result.push((path, target));
        }
        result
    }

    /// Path of a per-organelle metric file, e.g. `control_1_ER_Volume.csv`.
    pub fn metric_file(&self, cell_id: &str, organelle: &str, suffix: &str) -> Option<PathBuf> {
        self.folder_path(cell_id, organelle)
            .map(|folder| folder.join(format!("{}_{}_{}.csv", cell_id, organelle, suffix)))
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Input directory: {}", self.input_dir.display()),
            format!("Layout: {}", self.layout),
            format!("Statistics folders: {}", self.folder_index.len()),
            format!("Unique cells: {}", self.cell_ids().len()),
            format!(
                "Organelles ({}): {}",
                self.all_organelles.len(),
                self.all_organelles.join(", ")
            ),
        ];
        if !self.parse_warnings.is_empty() {
            lines.push(format!("Skipped names: {}", self.parse_warnings.len()));
        }
        lines.join("\n")
    }
}

fn is_distance_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.contains(DISTANCE_FILE_MARKER)
        && path
            .extension()
            .map(|ext| ext.to_ascii_lowercase() == "csv")
            .unwrap_or(false)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn has_statistics_dirs(dirs: &[PathBuf]) -> bool {
    dirs.iter().any(|d| {
        d.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(STATISTICS_SUFFIX))
            .unwrap_or(false)
    })
}

/// Classify the layout under `input_dir` and return the directory holding the
/// statistics folders.
pub fn detect_structure(input_dir: &Path) -> Result<(DatasetLayout, PathBuf)> {
    if !input_dir.is_dir() {
        return Err(OrgaplexError::InvalidPath(input_dir.to_path_buf()));
    }

    let subdirs = sorted_subdirs(input_dir)?;
    if has_statistics_dirs(&subdirs) {
        return Ok((DatasetLayout::Direct, input_dir.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for subdir in subdirs {
        if has_statistics_dirs(&sorted_subdirs(&subdir)?) {
            candidates.push(subdir);
        }
    }

    let search_dir = match candidates.first() {
        Some(dir) => dir.clone(),
        None => {
            return Err(OrgaplexError::Structure(format!(
                "no folders ending with '{}' found in {} or its subdirectories",
                STATISTICS_SUFFIX,
                input_dir.display()
            )))
        }
    };

    if candidates.len() > 1 {
        warn!(
            "Found {} subdirectories with data, using {}",
            candidates.len(),
            search_dir.display()
        );
    }

    let group = search_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok((DatasetLayout::Nested { group }, search_dir))
}
