//! Global emissions by sector, one panel per top-level sector

use ghgdash_core::observation::FloatValue;
use ghgdash_core::sectors::{SectorShare, SectorTable, AFOLU, ENERGY, INDUSTRIAL_PROCESSES, WASTE};
use serde::Serialize;

pub const TITLE: &str = "Global Emissions by Sectors";

/// Which column names the slices of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceLabel {
    SubSector,
    FurtherBreakdown,
}

impl SliceLabel {
    fn label<'a>(&self, share: &'a SectorShare) -> &'a str {
        let sub_sector = share.sub_sector.as_deref().unwrap_or(&share.sector);
        match self {
            SliceLabel::SubSector => sub_sector,
            SliceLabel::FurtherBreakdown => share.sub_sub_sector.as_deref().unwrap_or(sub_sector),
        }
    }
}

/// Panels in display order
pub const PANELS: [(&str, &str, SliceLabel); 4] = [
    (ENERGY, "Energy", SliceLabel::SubSector),
    (AFOLU, "Agriculture, Forestry & Land Use", SliceLabel::FurtherBreakdown),
    (INDUSTRIAL_PROCESSES, "Industrial processes", SliceLabel::FurtherBreakdown),
    (WASTE, "Waste", SliceLabel::FurtherBreakdown),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub share: FloatValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorPanel {
    pub sector: &'static str,
    pub title: &'static str,
    pub slices: Vec<Slice>,
}

impl SectorPanel {
    pub fn total(&self) -> FloatValue {
        self.slices.iter().map(|slice| slice.share).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorBreakdown {
    pub title: &'static str,
    pub panels: Vec<SectorPanel>,
}

pub fn sector_breakdown(table: &SectorTable) -> SectorBreakdown {
    let panels = PANELS
        .iter()
        .map(|(sector, title, labelled_by)| SectorPanel {
            sector: *sector,
            title: *title,
            slices: table
                .sector(*sector)
                .map(|share| Slice {
                    label: labelled_by.label(share).to_string(),
                    share: share.share,
                })
                .collect(),
        })
        .collect();

    SectorBreakdown {
        title: TITLE,
        panels,
    }
}
