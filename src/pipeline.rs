//! Status pipeline model.
//!
//! The fixed, ordered set of sales stages a lead moves through, the certificate
//! types sold, and the partition of a flat lead list into per-stage columns.
//! Stages are a closed enum internally; the Portuguese display label is only
//! used at the storage/API boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::models::Lead;

/// One of the fixed pipeline stages, in board order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum PipelineStage {
    #[serde(rename = "Novo Lead")]
    New,
    #[serde(rename = "Aguardando Documentação")]
    WaitingDocs,
    #[serde(rename = "Agendado")]
    Scheduled,
    #[serde(rename = "Emitido")]
    Issued,
    #[serde(rename = "Perdido")]
    Lost,
}

impl PipelineStage {
    pub const COUNT: usize = 5;

    /// All stages in the order the board renders them.
    pub const ALL: [PipelineStage; Self::COUNT] = [
        PipelineStage::New,
        PipelineStage::WaitingDocs,
        PipelineStage::Scheduled,
        PipelineStage::Issued,
        PipelineStage::Lost,
    ];

    /// Position of the stage on the board (0-based).
    pub fn index(self) -> usize {
        match self {
            PipelineStage::New => 0,
            PipelineStage::WaitingDocs => 1,
            PipelineStage::Scheduled => 2,
            PipelineStage::Issued => 3,
            PipelineStage::Lost => 4,
        }
    }

    /// Value stored in the `leads.status` column and sent over the API.
    pub fn label(self) -> &'static str {
        match self {
            PipelineStage::New => "Novo Lead",
            PipelineStage::WaitingDocs => "Aguardando Documentação",
            PipelineStage::Scheduled => "Agendado",
            PipelineStage::Issued => "Emitido",
            PipelineStage::Lost => "Perdido",
        }
    }

    /// Kanban column heading.
    pub fn column_title(self) -> &'static str {
        match self {
            PipelineStage::New => "Novos Leads",
            PipelineStage::WaitingDocs => "Documentação",
            PipelineStage::Scheduled => "Agendados",
            PipelineStage::Issued => "Emitidos",
            PipelineStage::Lost => "Perdidos",
        }
    }

    /// Accent colour name used for the column marker.
    pub fn accent(self) -> &'static str {
        match self {
            PipelineStage::New => "blue",
            PipelineStage::WaitingDocs => "amber",
            PipelineStage::Scheduled => "indigo",
            PipelineStage::Issued => "emerald",
            PipelineStage::Lost => "slate",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a status string is not one of the pipeline labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pipeline stage '{}'", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for PipelineStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.label() == trimmed)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Kind of digital certificate being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CertificateType {
    A1,
    A3,
    #[serde(rename = "Nuvem")]
    Cloud,
}

impl CertificateType {
    pub fn label(self) -> &'static str {
        match self {
            CertificateType::A1 => "A1",
            CertificateType::A3 => "A3",
            CertificateType::Cloud => "Nuvem",
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CertificateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A1" => Ok(CertificateType::A1),
            "A3" => Ok(CertificateType::A3),
            "Nuvem" => Ok(CertificateType::Cloud),
            other => Err(format!("unknown certificate type '{}'", other)),
        }
    }
}

/// Leads partitioned by stage. Every stage always has a (possibly empty) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardGrouping {
    columns: [Vec<Lead>; PipelineStage::COUNT],
}

impl Default for BoardGrouping {
    fn default() -> Self {
        Self {
            columns: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl BoardGrouping {
    pub fn column(&self, stage: PipelineStage) -> &[Lead] {
        &self.columns[stage.index()]
    }

    pub(crate) fn column_mut(&mut self, stage: PipelineStage) -> &mut Vec<Lead> {
        &mut self.columns[stage.index()]
    }

    /// Columns in board order.
    pub fn iter(&self) -> impl Iterator<Item = (PipelineStage, &[Lead])> {
        PipelineStage::ALL
            .into_iter()
            .map(move |stage| (stage, self.column(stage)))
    }

    /// Total number of cards across all columns.
    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locates a card by lead id.
    pub fn position_of(&self, lead_id: &str) -> Option<(PipelineStage, usize)> {
        self.iter().find_map(|(stage, leads)| {
            leads
                .iter()
                .position(|lead| lead.id == lead_id)
                .map(|index| (stage, index))
        })
    }
}

/// Partitions `leads` by status, keeping their relative order within each stage.
pub fn group_by_stage(leads: &[Lead]) -> BoardGrouping {
    let mut grouping = BoardGrouping::default();
    for lead in leads {
        grouping.column_mut(lead.status).push(lead.clone());
    }
    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::lead;

    #[test]
    fn test_stage_labels_round_trip_through_from_str() {
        for stage in PipelineStage::ALL {
            assert_eq!(stage.label().parse::<PipelineStage>(), Ok(stage));
        }
        assert!("Novo".parse::<PipelineStage>().is_err());
        assert!("".parse::<PipelineStage>().is_err());
    }

    #[test]
    fn test_stage_order_matches_index() {
        for (i, stage) in PipelineStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
    }

    #[test]
    fn test_stage_serializes_as_display_label() {
        let json = serde_json::to_string(&PipelineStage::WaitingDocs).unwrap();
        assert_eq!(json, "\"Aguardando Documentação\"");

        let stage: PipelineStage = serde_json::from_str("\"Emitido\"").unwrap();
        assert_eq!(stage, PipelineStage::Issued);
    }

    #[test]
    fn test_certificate_type_cloud_uses_portuguese_label() {
        assert_eq!("Nuvem".parse::<CertificateType>(), Ok(CertificateType::Cloud));
        assert_eq!(
            serde_json::to_string(&CertificateType::Cloud).unwrap(),
            "\"Nuvem\""
        );
        assert!("OUTRO".parse::<CertificateType>().is_err());
    }

    #[test]
    fn test_group_by_stage_is_total_and_ordered() {
        let leads = vec![
            lead("a", PipelineStage::Scheduled),
            lead("b", PipelineStage::New),
            lead("c", PipelineStage::Scheduled),
        ];

        let grouping = group_by_stage(&leads);

        assert_eq!(grouping.iter().count(), PipelineStage::COUNT);
        assert_eq!(grouping.len(), 3);
        let scheduled: Vec<&str> = grouping
            .column(PipelineStage::Scheduled)
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(scheduled, vec!["a", "c"]);
        assert!(grouping.column(PipelineStage::Lost).is_empty());
        assert_eq!(grouping.position_of("c"), Some((PipelineStage::Scheduled, 1)));
        assert_eq!(grouping.position_of("zzz"), None);
    }

    #[test]
    fn test_group_by_stage_of_empty_list() {
        let grouping = group_by_stage(&[]);
        assert!(grouping.is_empty());
        assert_eq!(grouping, BoardGrouping::default());
    }
}
