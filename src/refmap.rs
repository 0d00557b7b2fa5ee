//! Reference data describing the units, compartments, locations and sectors of a model.
//!
//! Each kind of reference data is read from a CSV file. Units, compartments and locations have
//! built-in defaults which are used when no file is provided.
use crate::id::Label;
use crate::input::{input_err_msg, parse_csv, read_csv};
use anyhow::{Context, Result, ensure};
use include_dir::{Dir, include_dir};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use strum::{Display, EnumIter};

/// The directory containing the built-in reference data
static DATA_DIR: Dir = include_dir!("data");

/// The kinds of reference data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RefMapKind {
    /// Units of measurement
    Unit,
    /// Environmental compartments (e.g. air, water)
    Compartment,
    /// Geographic locations
    Location,
    /// Sectors of the economy
    Sector,
}

impl RefMapKind {
    /// The name of the file with built-in data for this kind, if there is one
    fn default_file_name(self) -> Option<&'static str> {
        match self {
            Self::Unit => Some("units.csv"),
            Self::Compartment => Some("compartments.csv"),
            Self::Location => Some("locations.csv"),
            Self::Sector => None,
        }
    }
}

/// A record of reference data
pub trait RefRecord: DeserializeOwned {
    /// The kind of reference data
    const KIND: RefMapKind;

    /// The label by which the record is looked up
    fn key(&self) -> &Label;
}

/// A unit of measurement
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Unit {
    /// The unit symbol (e.g. "kg")
    pub name: Label,
    /// The quantity measured by the unit (e.g. "mass")
    pub quantity: String,
}

/// An environmental compartment which flows are emitted to or taken from
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Compartment {
    /// Name of the compartment (e.g. "air")
    pub name: Label,
    /// A longer description
    pub description: String,
}

/// A geographic location
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Location {
    /// Location code (e.g. "us")
    pub code: Label,
    /// Full name of the location
    pub name: String,
}

/// A sector of the economy
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sector {
    /// Sector code as used in the coefficients matrix (e.g. "1111a0")
    pub code: Label,
    /// Name of the sector
    pub name: String,
    /// Sector category
    #[serde(default)]
    pub category: String,
    /// Sector sub-category
    #[serde(default)]
    pub sub_category: String,
    /// Location code of the sector
    #[serde(default)]
    pub location: Option<Label>,
}

macro_rules! impl_ref_record {
    ($t:ty, $kind:expr, $key:ident) => {
        impl RefRecord for $t {
            const KIND: RefMapKind = $kind;

            fn key(&self) -> &Label {
                &self.$key
            }
        }
    };
}

impl_ref_record!(Unit, RefMapKind::Unit, name);
impl_ref_record!(Compartment, RefMapKind::Compartment, name);
impl_ref_record!(Location, RefMapKind::Location, code);
impl_ref_record!(Sector, RefMapKind::Sector, code);

/// A map of reference records, keyed by label
#[derive(Debug, Clone, PartialEq)]
pub struct RefMap<T>(IndexMap<Label, T>);

/// Units, keyed by name
pub type UnitMap = RefMap<Unit>;
/// Compartments, keyed by name
pub type CompartmentMap = RefMap<Compartment>;
/// Locations, keyed by code
pub type LocationMap = RefMap<Location>;
/// Sectors, keyed by code
pub type SectorMap = RefMap<Sector>;

impl<T: RefRecord> RefMap<T> {
    /// Create a map from records, checking that keys are unique
    fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut map = IndexMap::new();
        for record in records {
            let key = record.key().clone();
            ensure!(!key.as_str().is_empty(), "Empty {} label", T::KIND);
            ensure!(
                map.insert(key.clone(), record).is_none(),
                "Duplicate {} '{key}'",
                T::KIND
            );
        }

        Ok(Self(map))
    }

    /// Read reference data from a CSV file
    pub fn read(file_path: &Path) -> Result<Self> {
        debug!("Reading {} data from {}", T::KIND, file_path.display());
        Self::from_records(read_csv(file_path)?).with_context(|| input_err_msg(file_path))
    }

    /// The built-in reference data for this kind (empty if there is none)
    pub fn create_default() -> Self {
        let Some(file_name) = T::KIND.default_file_name() else {
            return Self(IndexMap::new());
        };

        let csv_data = DATA_DIR
            .get_file(file_name)
            .and_then(|file| file.contents_utf8())
            .expect("Built-in reference data is missing");
        let records = parse_csv(csv_data).expect("Built-in reference data is invalid");
        Self::from_records(records).expect("Built-in reference data has duplicate entries")
    }

    /// Read reference data from a file if one is given, otherwise use the built-in data
    pub fn read_or_default(file_path: Option<&Path>) -> Result<Self> {
        match file_path {
            Some(file_path) => Self::read(file_path),
            None => Ok(Self::create_default()),
        }
    }

    /// Look up a record by its label
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.get(crate::id::normalise_label(key).as_str())
    }

    /// Whether a record exists for the label
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over the records
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.values()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no records
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
