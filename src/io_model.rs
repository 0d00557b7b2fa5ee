//! Construction of the direct requirements coefficients matrix from supply and use tables.
//!
//! The supply table has commodities as rows and industries as columns. The use table has the same
//! commodities as rows; its columns are the industries of the supply table plus any number of
//! final demand categories, which are not part of the square system.
//!
//! The industry-by-industry direct requirements matrix is `A = D . B` where `D` is the market share
//! matrix (industry x commodity) and `B` the commodity requirements per unit of industry output
//! (commodity x industry).
use crate::error::ModelError;
use crate::id::Label;
use crate::input::read_labelled_matrix;
use crate::matrix::{LabelledMatrix, LabelledVector};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::DMatrix;
use std::path::Path;

/// An input-output model built from supply and use tables
#[derive(Debug, Clone, PartialEq)]
pub struct IOModel {
    /// Supply table (commodity x industry), after scrap reallocation
    supply: LabelledMatrix,
    /// Use table with rows ordered like the supply table
    use_table: LabelledMatrix,
    /// Sectors whose output is reallocated to the industries generating them
    scrap_sectors: IndexSet<Label>,
}

/// Format a list of labels for an error message
fn format_labels<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = &'a Label>,
{
    labels.into_iter().map(|label| format!("'{label}'")).join(", ")
}

/// Check that the commodities and industries of the supply and use tables correspond
fn check_alignment(supply: &LabelledMatrix, use_table: &LabelledMatrix) -> Result<()> {
    let supply_commodities = supply.row_labels();
    let use_commodities = use_table.row_labels();

    let missing_from_use = supply_commodities
        .iter()
        .filter(|label| !use_commodities.contains(*label))
        .collect_vec();
    if !missing_from_use.is_empty() {
        Err(ModelError::alignment(format!(
            "commodities {} are in the supply table but not the use table",
            format_labels(missing_from_use)
        )))?;
    }

    let missing_from_supply = use_commodities
        .iter()
        .filter(|label| !supply_commodities.contains(*label))
        .collect_vec();
    if !missing_from_supply.is_empty() {
        Err(ModelError::alignment(format!(
            "commodities {} are in the use table but not the supply table",
            format_labels(missing_from_supply)
        )))?;
    }

    let missing_industries = supply
        .col_labels()
        .iter()
        .filter(|label| !use_table.col_labels().contains(*label))
        .collect_vec();
    if !missing_industries.is_empty() {
        Err(ModelError::alignment(format!(
            "industries {} are in the supply table but not the use table",
            format_labels(missing_industries)
        )))?;
    }

    Ok(())
}

/// Reallocate the output of scrap industries to the industries which generate scrap.
///
/// For each scrap sector `k` which is an industry of the supply table, the column of the scrap
/// industry is distributed over the other industries in proportion to their production of the
/// scrap commodity `k`. The scrap industry is left with no output. If no other industry produces
/// the scrap commodity, the column is left unchanged.
///
/// Values are only moved between columns, so the total of the table is conserved.
pub fn reallocate_scrap(
    supply: &LabelledMatrix,
    scrap_sectors: &IndexSet<Label>,
) -> LabelledMatrix {
    let mut data = supply.data().clone();
    for scrap in scrap_sectors {
        let Some(k) = supply.col_labels().get_index_of(scrap) else {
            warn!("Scrap sector '{scrap}' is not an industry of the supply table; ignoring");
            continue;
        };
        let Some(scrap_row) = supply.row_labels().get_index_of(scrap) else {
            warn!(
                "Scrap sector '{scrap}' is not a commodity of the supply table; \
                its output cannot be reallocated"
            );
            continue;
        };

        // Industries which produce the scrap commodity as a byproduct
        let generators = (0..data.ncols())
            .filter(|&j| j != k && data[(scrap_row, j)] > 0.0)
            .map(|j| (j, data[(scrap_row, j)]))
            .collect_vec();
        let total: f64 = generators.iter().map(|(_, amount)| amount).sum();
        if generators.is_empty() || total <= 0.0 {
            warn!("No industry generates scrap '{scrap}'; its output is not reallocated");
            continue;
        }

        let scrap_output = data.column(k).clone_owned();
        for (j, amount) in generators {
            data.column_mut(j).axpy(amount / total, &scrap_output, 1.0);
        }
        data.column_mut(k).fill(0.0);
        debug!("Reallocated output of scrap sector '{scrap}'");
    }

    LabelledMatrix::from_parts(
        supply.row_labels().clone(),
        supply.col_labels().clone(),
        data,
    )
}

impl IOModel {
    /// Create a new [`IOModel`] from supply and use tables.
    ///
    /// # Arguments
    ///
    /// * `supply` - Supply table with commodities as rows and industries as columns
    /// * `use_table` - Use table with commodities as rows and industries plus final demand
    ///   categories as columns
    /// * `scrap_sectors` - Labels of scrap sectors (normalised)
    pub fn new<I>(
        supply: &LabelledMatrix,
        use_table: &LabelledMatrix,
        scrap_sectors: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Label>,
    {
        check_alignment(supply, use_table)?;

        let scrap_sectors: IndexSet<Label> = scrap_sectors.into_iter().collect();
        let supply = if scrap_sectors.is_empty() {
            supply.clone()
        } else {
            reallocate_scrap(supply, &scrap_sectors)
        };

        // Put commodities of the use table in the same order as the supply table
        let use_table = use_table.reindex(supply.row_labels(), use_table.col_labels());

        Ok(Self {
            supply,
            use_table,
            scrap_sectors,
        })
    }

    /// Construct an [`IOModel`] from supply and use tables stored in CSV files.
    ///
    /// # Arguments
    ///
    /// * `supply_table_csv` - Path to the supply table
    /// * `use_table_csv` - Path to the use table
    /// * `scrap_sectors` - Labels of scrap sectors (case-insensitive)
    pub fn from_csv<I, S>(
        supply_table_csv: &Path,
        use_table_csv: &Path,
        scrap_sectors: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        info!("Creating IO model");
        let supply = read_labelled_matrix(supply_table_csv)?;
        let use_table = read_labelled_matrix(use_table_csv)?;
        let scrap_sectors = scrap_sectors
            .into_iter()
            .map(|label| Label::new(label.as_ref()));

        Self::new(&supply, &use_table, scrap_sectors).with_context(|| {
            format!(
                "Supply table {} and use table {} do not form a valid model",
                supply_table_csv.display(),
                use_table_csv.display()
            )
        })
    }

    /// The industries of the model, in the order used for the coefficients matrix
    pub fn industries(&self) -> &IndexSet<Label> {
        self.supply.col_labels()
    }

    /// The commodities of the model
    pub fn commodities(&self) -> &IndexSet<Label> {
        self.supply.row_labels()
    }

    /// The scrap sectors of the model
    pub fn scrap_sectors(&self) -> &IndexSet<Label> {
        &self.scrap_sectors
    }

    /// The supply table after scrap reallocation
    pub fn supply_table(&self) -> &LabelledMatrix {
        &self.supply
    }

    /// Total output of each industry (after scrap reallocation)
    pub fn industry_outputs(&self) -> LabelledVector {
        self.supply.column_sums()
    }

    /// Total output of each commodity
    pub fn commodity_outputs(&self) -> LabelledVector {
        self.supply.row_sums()
    }

    /// The market share matrix (industry x commodity).
    ///
    /// Entry `(i, c)` is the share of the total output of commodity `c` which is produced by
    /// industry `i`. Commodities with no output have zero shares.
    pub fn market_shares(&self) -> LabelledMatrix {
        let commodity_outputs = self.commodity_outputs();
        let mut shares = self.supply.data().transpose();
        for (c, mut column) in shares.column_iter_mut().enumerate() {
            let total = commodity_outputs.values()[c];
            if total == 0.0 {
                column.fill(0.0);
            } else {
                column /= total;
            }
        }

        LabelledMatrix::from_parts(
            self.industries().clone(),
            self.commodities().clone(),
            shares,
        )
    }

    /// The commodity requirements per unit of industry output (commodity x industry).
    ///
    /// Industries with no output have zero requirements.
    pub fn commodity_requirements(&self) -> LabelledMatrix {
        let industry_outputs = self.industry_outputs();
        let intermediate = self
            .use_table
            .reindex(self.commodities(), self.industries());

        let mut data: DMatrix<f64> = intermediate.data().clone();
        for (j, mut column) in data.column_iter_mut().enumerate() {
            let total = industry_outputs.values()[j];
            if total == 0.0 {
                let industry = &self.industries()[j];
                if self.scrap_sectors.contains(industry) {
                    debug!("Scrap industry '{industry}' has no output after reallocation");
                } else {
                    warn!("Industry '{industry}' has no output; using zero coefficients");
                }
                column.fill(0.0);
            } else {
                column /= total;
            }
        }

        LabelledMatrix::from_parts(self.commodities().clone(), self.industries().clone(), data)
    }

    /// Calculate the industry-by-industry direct requirements coefficients matrix `A`.
    ///
    /// The result is square with the industries of the supply table as both row and column
    /// labels, in the same order.
    pub fn get_dr_coefficients(&self) -> Result<LabelledMatrix> {
        let shares = self.market_shares();
        let requirements = self.commodity_requirements();
        let data = shares.data() * requirements.data();
        let drc = LabelledMatrix::from_parts(
            self.industries().clone(),
            self.industries().clone(),
            data,
        );
        ensure!(
            drc.is_finite(),
            "Direct requirements coefficients contain non-finite values"
        );

        Ok(drc)
    }

    /// The final demand block of the use table (commodity x final demand category)
    pub fn final_demand(&self) -> LabelledMatrix {
        let categories: IndexSet<Label> = self
            .use_table
            .col_labels()
            .iter()
            .filter(|label| !self.industries().contains(*label))
            .cloned()
            .collect();
        self.use_table.reindex(self.commodities(), &categories)
    }

    /// Total final demand of the use table, converted to industries via the market shares.
    ///
    /// For a balanced set of tables, the total output calculated from this demand equals the
    /// industry outputs.
    pub fn industry_final_demand(&self) -> LabelledVector {
        let commodity_demand = self.final_demand().row_sums();
        let values = self.market_shares().data() * commodity_demand.values();
        LabelledVector::from_parts(self.industries().clone(), values)
    }
}

/// Calculate the direct requirements coefficients matrix from supply and use tables in CSV files
pub fn coefficients_from_sut<I, S>(
    supply_table_csv: &Path,
    use_table_csv: &Path,
    scrap_sectors: I,
) -> Result<LabelledMatrix>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    IOModel::from_csv(supply_table_csv, use_table_csv, scrap_sectors)?.get_dr_coefficients()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{
        assert_matrix_approx_eq, assert_vector_approx_eq, drc, labelled_matrix, labelled_vector,
        supply_table, use_table,
    };
    use float_cmp::assert_approx_eq;
    use nalgebra::dmatrix;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    /// Supply table where industry 2 produces some of commodity 1 and industry 1 produces scrap
    fn supply_with_scrap() -> LabelledMatrix {
        labelled_matrix(
            &["c1", "c2", "scrap"],
            &["c1", "c2", "scrap"],
            dmatrix![
                90.0, 10.0, 0.0;
                0.0, 60.0, 0.0;
                6.0, 2.0, 4.0
            ],
        )
    }

    fn use_with_scrap() -> LabelledMatrix {
        labelled_matrix(
            &["c1", "c2", "scrap"],
            &["c1", "c2", "scrap", "f01"],
            dmatrix![
                10.0, 5.0, 1.0, 80.0;
                8.0, 6.0, 1.0, 55.0;
                1.0, 1.0, 0.0, 10.0
            ],
        )
    }

    #[rstest]
    fn test_dr_coefficients_two_sectors(
        supply_table: LabelledMatrix,
        use_table: LabelledMatrix,
        drc: LabelledMatrix,
    ) {
        let model = IOModel::new(&supply_table, &use_table, []).unwrap();
        let actual = model.get_dr_coefficients().unwrap();
        assert_matrix_approx_eq(&actual, &drc);
        assert!(actual.is_square_aligned());
    }

    #[rstest]
    fn test_dr_coefficients_idempotent(supply_table: LabelledMatrix, use_table: LabelledMatrix) {
        let model = IOModel::new(&supply_table, &use_table, []).unwrap();
        assert_eq!(
            model.get_dr_coefficients().unwrap(),
            model.get_dr_coefficients().unwrap()
        );
    }

    #[rstest]
    fn test_use_table_aligned_by_label(supply_table: LabelledMatrix) {
        // Same use table as the fixture, but with commodities and industries in a different order
        let use_table = labelled_matrix(
            &["ind2", "ind1"],
            &["f01000", "ind2", "ind1"],
            dmatrix![
                35.0, 15.0, 0.0;
                80.0, 0.0, 20.0
            ],
        );
        let model = IOModel::new(&supply_table, &use_table, []).unwrap();
        assert_matrix_approx_eq(&model.get_dr_coefficients().unwrap(), &drc());
    }

    #[test]
    fn test_dr_coefficients_secondary_production() {
        let supply = labelled_matrix(
            &["c1", "c2"],
            &["i1", "i2"],
            dmatrix![
                80.0, 20.0;
                0.0, 100.0
            ],
        );
        let use_table = labelled_matrix(
            &["c1", "c2"],
            &["i1", "i2"],
            dmatrix![
                8.0, 24.0;
                16.0, 12.0
            ],
        );
        let model = IOModel::new(&supply, &use_table, []).unwrap();

        // g = [80, 120], q = [100, 100]
        // D = [[0.8, 0], [0.2, 1]], B = [[0.1, 0.2], [0.2, 0.1]]
        let expected = labelled_matrix(
            &["i1", "i2"],
            &["i1", "i2"],
            dmatrix![
                0.08, 0.16;
                0.22, 0.14
            ],
        );
        assert_matrix_approx_eq(&model.get_dr_coefficients().unwrap(), &expected);
    }

    #[test]
    fn test_zero_output_industry_has_zero_coefficients() {
        let supply = labelled_matrix(&["c1", "c2"], &["i1", "i2"], dmatrix![10.0, 0.0; 0.0, 0.0]);
        let use_table = labelled_matrix(&["c1", "c2"], &["i1", "i2"], dmatrix![1.0, 5.0; 2.0, 5.0]);
        let model = IOModel::new(&supply, &use_table, []).unwrap();
        let drc = model.get_dr_coefficients().unwrap();
        assert!(drc.is_finite());
        assert_eq!(drc.get("i1", "i2"), 0.0);
        assert_eq!(drc.get("i2", "i2"), 0.0);
        assert_approx_eq!(f64, drc.get("i1", "i1"), 0.1);
    }

    #[rstest]
    fn test_misaligned_commodities(supply_table: LabelledMatrix) {
        let use_table = labelled_matrix(&["ind1", "other"], &["ind1", "ind2"], DMatrix::zeros(2, 2));
        let err = IOModel::new(&supply_table, &use_table, []).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ModelError>(),
            Some(&ModelError::alignment(
                "commodities 'ind2' are in the supply table but not the use table"
            ))
        );
    }

    #[rstest]
    fn test_missing_industry(supply_table: LabelledMatrix) {
        let use_table = labelled_matrix(&["ind1", "ind2"], &["ind1", "f01"], DMatrix::zeros(2, 2));
        let err = IOModel::new(&supply_table, &use_table, []).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tables are not aligned: industries 'ind2' are in the supply table but not the use table"
        );
    }

    #[test]
    fn test_reallocate_scrap_conserves_output() {
        let supply = supply_with_scrap();
        let scrap = ["scrap".into()].into_iter().collect();
        let reallocated = reallocate_scrap(&supply, &scrap);

        assert_approx_eq!(f64, reallocated.total(), supply.total());

        // The scrap industry has no output left
        assert_eq!(reallocated.column_sums().get("scrap"), 0.0);

        // Its output is split 6:2 between the industries generating scrap
        assert_approx_eq!(f64, reallocated.get("scrap", "c1"), 6.0 + 3.0);
        assert_approx_eq!(f64, reallocated.get("scrap", "c2"), 2.0 + 1.0);
    }

    #[test]
    fn test_reallocate_scrap_without_generators() {
        let supply = labelled_matrix(&["a", "scrap"], &["a", "scrap"], dmatrix![5.0, 0.0; 0.0, 3.0]);
        let scrap = ["scrap".into(), "unknown".into()].into_iter().collect();
        assert_eq!(reallocate_scrap(&supply, &scrap), supply);
    }

    #[rstest]
    #[case::several_scrap_sectors(
        labelled_matrix(
            &["c1", "c2", "s1", "s2"],
            &["c1", "c2", "s1", "s2"],
            dmatrix![
                90.0, 10.0, 0.0, 0.0;
                0.0, 60.0, 0.0, 0.0;
                6.0, 2.0, 4.0, 0.0;
                0.0, 3.0, 0.0, 5.0
            ],
        ),
        &["s1", "s2"],
        &["s1", "s2"],
        &[]
    )]
    #[case::scrap_industry_not_a_commodity(
        labelled_matrix(
            &["c1", "c2", "scrap"],
            &["c1", "c2", "scrap", "waste"],
            dmatrix![
                90.0, 10.0, 0.0, 1.0;
                0.0, 60.0, 0.0, 2.0;
                6.0, 2.0, 4.0, 0.0
            ],
        ),
        &["scrap", "waste"],
        &["scrap"],
        &["waste"]
    )]
    fn test_reallocate_scrap_sectors(
        #[case] supply: LabelledMatrix,
        #[case] scrap_sectors: &[&str],
        #[case] emptied: &[&str],
        #[case] unchanged: &[&str],
    ) {
        let scrap = scrap_sectors.iter().map(|&label| Label::new(label)).collect();
        let reallocated = reallocate_scrap(&supply, &scrap);

        assert_approx_eq!(f64, reallocated.total(), supply.total());
        let outputs = reallocated.column_sums();
        for &industry in emptied {
            assert_eq!(outputs.get(industry), 0.0);
        }
        for &industry in unchanged {
            for commodity in supply.row_labels() {
                assert_eq!(
                    reallocated.get(commodity.as_str(), industry),
                    supply.get(commodity.as_str(), industry)
                );
            }
        }
    }

    #[rstest]
    fn test_scrap_generator_without_co_producers(
        supply_table: LabelledMatrix,
        use_table: LabelledMatrix,
    ) {
        // ind1 is the only producer of its commodity, so there is nothing to reallocate it to
        let model = IOModel::new(&supply_table, &use_table, ["ind1".into()]).unwrap();
        let without_scrap = IOModel::new(&supply_table, &use_table, []).unwrap();
        assert_eq!(
            model.get_dr_coefficients().unwrap(),
            without_scrap.get_dr_coefficients().unwrap()
        );
    }

    #[test]
    fn test_scrap_industry_has_no_requirements() {
        let model = IOModel::new(
            &supply_with_scrap(),
            &use_with_scrap(),
            ["SCRAP ".into()],
        )
        .unwrap();
        let drc = model.get_dr_coefficients().unwrap();
        assert!(drc.is_square_aligned());
        assert!(drc.is_finite());
        for industry in model.industries() {
            assert_eq!(drc.get(industry.as_str(), "scrap"), 0.0);
        }

        // Total industry output is conserved by the reallocation
        assert_approx_eq!(
            f64,
            model.industry_outputs().sum(),
            supply_with_scrap().column_sums().sum()
        );
    }

    #[rstest]
    fn test_final_demand(supply_table: LabelledMatrix, use_table: LabelledMatrix) {
        let model = IOModel::new(&supply_table, &use_table, []).unwrap();
        assert_eq!(
            model.final_demand(),
            labelled_matrix(&["ind1", "ind2"], &["f01000"], dmatrix![80.0; 35.0])
        );
        assert_vector_approx_eq(
            &model.industry_final_demand(),
            &labelled_vector(&["ind1", "ind2"], &[80.0, 35.0]),
        );
    }

    #[test]
    fn test_coefficients_from_sut() {
        let dir = tempdir().unwrap();
        let supply_path = dir.path().join("supply.csv");
        let use_path = dir.path().join("use.csv");
        fs::write(&supply_path, "Commodity,Ind1,IND2\nind1,100,0\nind2,0,50\n").unwrap();
        fs::write(&use_path, "Commodity,ind1,ind2,F01000\nIND1,20,0,80\nind2,,15,35\n").unwrap();

        let actual = coefficients_from_sut(&supply_path, &use_path, Vec::<String>::new()).unwrap();
        assert_matrix_approx_eq(&actual, &drc());
    }
}
