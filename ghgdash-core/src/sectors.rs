//! Global greenhouse-gas emissions broken down by sector.
//!
//! Read from sheet [`SHEET`] of the breakdown workbook, or from a CSV export of that
//! sheet. Shares are percentages of total global emissions.

use crate::errors::GhgResult;
use crate::observation::FloatValue;
use calamine::{open_workbook_auto, RangeDeserializerBuilder, Reader};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

pub const ENERGY: &str = "Energy";
pub const AFOLU: &str = "Agriculture, Forestry & Land Use (AFOLU)";
pub const INDUSTRIAL_PROCESSES: &str = "Industrial processes";
pub const WASTE: &str = "Waste";

/// Worksheet holding the full breakdown
pub const SHEET: &str = "All";

const WORKBOOK_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorShare {
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Sub-sector", default, deserialize_with = "blank_as_none")]
    pub sub_sector: Option<String>,
    #[serde(
        rename = "Sub-sector (further breakdown)",
        default,
        deserialize_with = "blank_as_none"
    )]
    pub sub_sub_sector: Option<String>,
    #[serde(rename = "Share of global greenhouse gas emissions (%)")]
    pub share: FloatValue,
}

/// All rows of the breakdown sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectorTable {
    shares: Vec<SectorShare>,
}

impl SectorTable {
    /// Load the breakdown from a workbook (sheet [`SHEET`]) or a CSV file, chosen by
    /// file extension
    pub fn from_path(path: impl AsRef<Path>) -> GhgResult<Self> {
        let path = path.as_ref();
        let table = if is_workbook(path) {
            Self::from_xlsx(path, SHEET)?
        } else {
            Self::from_reader(File::open(path)?)?
        };
        info!(path = %path.display(), rows = table.shares.len(), "Loaded sector breakdown");
        Ok(table)
    }

    /// Read one worksheet of a spreadsheet workbook.
    ///
    /// The first row holds the column names. Blank cells are missing values.
    pub fn from_xlsx(path: impl AsRef<Path>, sheet: &str) -> GhgResult<Self> {
        let mut workbook = open_workbook_auto(path.as_ref())?;
        let range = workbook.worksheet_range(sheet)?;
        let shares = RangeDeserializerBuilder::new()
            .from_range::<_, SectorShare>(&range)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { shares })
    }

    pub fn from_reader<R: Read>(reader: R) -> GhgResult<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let shares = reader
            .deserialize::<SectorShare>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { shares })
    }

    pub fn shares(&self) -> &[SectorShare] {
        &self.shares
    }

    /// Rows belonging to a top-level sector
    pub fn sector<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SectorShare> {
        self.shares.iter().filter(move |share| share.sector == name)
    }

    /// Sum of all shares, in percent
    pub fn total_share(&self) -> FloatValue {
        self.shares.iter().map(|share| share.share).sum()
    }
}
