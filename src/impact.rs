//! Impact assessment tables hold characterisation factors, which convert flows into scores for
//! impact categories.
use crate::id::Label;
use crate::input::read_labelled_matrix;
use crate::matrix::{LabelledMatrix, MatrixAccumulator};
use anyhow::Result;
use indexmap::IndexSet;
use log::{debug, info};
use std::path::Path;

/// Accumulates characterisation factors from any number of sources
#[derive(Debug, Default)]
pub struct ImpactTableBuilder(MatrixAccumulator);

impl ImpactTableBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a category x flow matrix of factors
    pub fn add(&mut self, factors: &LabelledMatrix) {
        self.0.add(factors);
    }

    /// Read a category x flow matrix from a CSV file and add it
    pub fn add_file(&mut self, file_path: &Path) -> Result<()> {
        debug!("Adding impact factors from {}", file_path.display());
        let factors = read_labelled_matrix(file_path)?;
        self.add(&factors);
        Ok(())
    }

    /// Freeze the accumulated data into an [`ImpactTable`]
    pub fn build(self) -> ImpactTable {
        ImpactTable(self.0.build())
    }
}

/// A consolidated table of characterisation factors, impact category (rows) x flow (columns)
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactTable(LabelledMatrix);

impl ImpactTable {
    /// Create an impact table from the given CSV files, merged in order.
    pub fn from_files<P: AsRef<Path>>(file_paths: &[P]) -> Result<Self> {
        info!("Creating impact assessment table");
        let mut builder = ImpactTableBuilder::new();
        for file_path in file_paths {
            builder.add_file(file_path.as_ref())?;
        }

        Ok(builder.build())
    }

    /// The table as a category x flow matrix
    pub fn matrix(&self) -> &LabelledMatrix {
        &self.0
    }

    /// The impact categories
    pub fn categories(&self) -> &IndexSet<Label> {
        self.0.row_labels()
    }

    /// The flows with characterisation factors
    pub fn flows(&self) -> &IndexSet<Label> {
        self.0.col_labels()
    }

    /// The factor for a category and flow (zero if absent)
    pub fn get(&self, category: &str, flow: &str) -> f64 {
        self.0.get(category, flow)
    }

    /// Whether the table contains no factors
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
        let gwp = dir.path().join("gwp.csv");
        let acid = dir.path().join("acid.csv");
        fs::write(&gwp, "category,CO2,CH4\nGlobal warming,1,25\n").unwrap();
        fs::write(&acid, "category,so2\nacidification,1\n").unwrap();

        let table = ImpactTable::from_files(&[gwp, acid]).unwrap();
        assert_eq!(
            table.categories().iter().map(Label::as_str).collect::<Vec<_>>(),
            ["acidification", "global warming"]
        );
        assert_eq!(table.get("global warming", "ch4"), 25.0);
        assert_eq!(table.get("acidification", "co2"), 0.0);
        assert_eq!(table.flows().len(), 3);
    }
}
