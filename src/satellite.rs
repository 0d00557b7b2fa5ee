//! Satellite tables hold environmental and resource flows per unit of sector output.
use crate::id::Label;
use crate::input::read_labelled_matrix;
use crate::matrix::{LabelledMatrix, MatrixAccumulator};
use anyhow::Result;
use indexmap::IndexSet;
use log::{debug, info};
use std::path::Path;

/// Accumulates satellite data from any number of sources.
///
/// Sources may contribute partial quantities for the same flow and sector, in which case they are
/// summed.
#[derive(Debug, Default)]
pub struct SatelliteTableBuilder(MatrixAccumulator);

impl SatelliteTableBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flow x sector matrix to the table
    pub fn add(&mut self, flows: &LabelledMatrix) {
        self.0.add(flows);
    }

    /// Read a flow x sector matrix from a CSV file and add it to the table
    pub fn add_file(&mut self, file_path: &Path) -> Result<()> {
        debug!("Adding satellite data from {}", file_path.display());
        let flows = read_labelled_matrix(file_path)?;
        self.add(&flows);
        Ok(())
    }

    /// Freeze the accumulated data into a [`SatelliteTable`]
    pub fn build(self) -> SatelliteTable {
        SatelliteTable(self.0.build())
    }
}

/// A consolidated table of flows (rows) per unit output of sectors (columns)
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteTable(LabelledMatrix);

impl SatelliteTable {
    /// Create a satellite table from the given CSV files, merged in order.
    pub fn from_files<P: AsRef<Path>>(file_paths: &[P]) -> Result<Self> {
        info!("Creating satellite table");
        let mut builder = SatelliteTableBuilder::new();
        for file_path in file_paths {
            builder.add_file(file_path.as_ref())?;
        }

        Ok(builder.build())
    }

    /// The table as a flow x sector matrix
    pub fn matrix(&self) -> &LabelledMatrix {
        &self.0
    }

    /// The flows in the table
    pub fn flows(&self) -> &IndexSet<Label> {
        self.0.row_labels()
    }

    /// The sectors in the table
    pub fn sectors(&self) -> &IndexSet<Label> {
        self.0.col_labels()
    }

    /// The amount of a flow per unit output of a sector (zero if absent)
    pub fn get(&self, flow: &str, sector: &str) -> f64 {
        self.0.get(flow, sector)
    }

    /// Whether the table contains no data
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_from_files() {
        let dir = tempdir().unwrap();
        let ghg = dir.path().join("ghg.csv");
        let water = dir.path().join("water.csv");
        fs::write(&ghg, "flow,s1,s2\nCO2,1,2\n").unwrap();
        fs::write(&water, "flow,s2,s3\nwater,3,4\nco2,0.5,\n").unwrap();

        let table = SatelliteTable::from_files(&[&ghg, &water]).unwrap();
        assert_eq!(table.flows().len(), 2);
        assert_eq!(table.sectors().len(), 3);
        assert_eq!(table.get("co2", "s1"), 1.0);
        assert_eq!(table.get("co2", "s2"), 2.5);
        assert_eq!(table.get("water", "s1"), 0.0);
        assert_eq!(table.get("water", "s3"), 4.0);

        // Merge order does not matter
        assert_eq!(SatelliteTable::from_files(&[&water, &ghg]).unwrap(), table);
    }

    #[test]
    fn test_from_files_missing() {
        let dir = tempdir().unwrap();
        assert!(SatelliteTable::from_files(&[dir.path().join("missing.csv")]).is_err());
    }

    #[test]
    fn test_no_sources() {
        let table = SatelliteTable::from_files::<&Path>(&[]).unwrap();
        assert!(table.is_empty());
    }
}
