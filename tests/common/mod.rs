// Temporary Imaris-style datasets for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct Dataset {
    tmp: TempDir,
    root: PathBuf,
}

impl Dataset {
    /// Statistics folders directly under the input directory.
    pub fn direct() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        Self { tmp, root }
    }

    /// Statistics folders inside `group/` under the input directory.
    pub fn nested(group: &str) -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(group);
        fs::create_dir_all(&root).unwrap();
        Self { tmp, root }
    }

    pub fn input_dir(&self) -> &Path {
        self.tmp.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.tmp.path().join("results")
    }

    pub fn folder(&self, cell: &str, organelle: &str) -> PathBuf {
        let path = self.root.join(format!("{}_{}_Statistics", cell, organelle));
        fs::create_dir_all(&path).unwrap();
        path
    }

    fn write_series(path: &Path, title: &str, values: &[String]) {
        let mut content = format!(" \n{}\n====================\n{},Unit,Category\n", title, title);
        for v in values {
            content.push_str(&format!("{},um,Surface\n", v));
        }
        fs::write(path, content).unwrap();
    }

    pub fn distances(&self, cell: &str, bait: &str, target: &str, values: &[f64]) -> &Self {
        let path = self.folder(cell, bait).join(format!(
            "{}_{}_Shortest_Distance_to_Surfaces_Surfaces={}.csv",
            cell, bait, target
        ));
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Self::write_series(&path, "Shortest Distance to Surfaces", &values);
        self
    }

    /// Raw cells, so tests can plant empty or non-numeric entries.
    pub fn metric_raw(&self, cell: &str, organelle: &str, suffix: &str, values: &[&str]) -> &Self {
        let path = self
            .folder(cell, organelle)
            .join(format!("{}_{}_{}.csv", cell, organelle, suffix));
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        Self::write_series(&path, suffix, &values);
        self
    }

    pub fn metric(&self, cell: &str, organelle: &str, suffix: &str, values: &[f64]) -> &Self {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        self.metric_raw(cell, organelle, suffix, &refs)
    }
}

/// Three ER cells against LD and Mito; `control_1` has one surface in each
/// combination.
pub fn er_dataset() -> Dataset {
    let ds = Dataset::direct();
    ds.distances("control_1", "ER", "LD", &[-0.1, 0.2, -0.3, 5.0])
        .distances("control_1", "ER", "Mito", &[0.05, -0.2, -0.1, 3.0])
        .distances("control_2", "ER", "LD", &[-1.0, -1.0])
        .distances("control_2", "ER", "Mito", &[2.0, -1.0])
        .distances("control_10", "ER", "LD", &[1.0, 1.0, 1.0])
        .distances("control_10", "ER", "Mito", &[1.0, 1.0, -0.5]);
    ds.folder("control_1", "LD");
    ds.folder("control_1", "Mito");
    ds
}
