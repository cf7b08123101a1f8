//! Panel update records for terminal display

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{percent_label, PanelPhase, PanelTicket};

/// Published on every panel transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelUpdate {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Panel instance; None once closed
    pub ticket: Option<PanelTicket>,
    /// Phase after the transition
    pub phase: PanelPhase,
    /// Subject of the email shown (raw, not escaped)
    pub subject: Option<String>,
    /// Whether the full body is revealed
    pub expanded: bool,
}

impl PanelUpdate {
    pub fn new(
        ticket: Option<PanelTicket>,
        phase: PanelPhase,
        subject: Option<String>,
        expanded: bool,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            ticket,
            phase,
            subject,
            expanded,
        }
    }

    /// Score column text
    pub fn score_text(&self) -> String {
        match self.phase {
            PanelPhase::Resulted { probability, band } => {
                format!("{} ({})", percent_label(probability), band)
            }
            PanelPhase::Loading => crate::LOADING_LABEL.to_string(),
            PanelPhase::Errored => crate::ERROR_LABEL.to_string(),
            PanelPhase::MetadataShown | PanelPhase::Empty => "-".to_string(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.phase.color_code();
        let reset = PanelPhase::color_reset();

        format!(
            "{}[{}] panel={} | score={} | {}{}",
            color,
            self.timestamp.format("%H:%M:%S%.3f"),
            self.phase,
            self.score_text(),
            self.subject.as_deref().unwrap_or("-"),
            reset
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "panel={} | ticket={} | score={} | subject={}",
            self.phase,
            self.ticket.map(|t| t.0.to_string()).unwrap_or_else(|| "-".to_string()),
            self.score_text(),
            self.subject.as_deref().unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskBand;

    #[test]
    fn test_parseable_string() {
        let update = PanelUpdate::new(
            Some(PanelTicket(3)),
            PanelPhase::Resulted { probability: 0.9, band: RiskBand::High },
            Some("Hello".to_string()),
            false,
        );
        assert_eq!(
            update.to_parseable_string(),
            "panel=RESULTED | ticket=3 | score=90.00% (HIGH) | subject=Hello"
        );
    }

    #[test]
    fn test_closed_panel_string() {
        let update = PanelUpdate::new(None, PanelPhase::Empty, None, false);
        assert!(update.to_parseable_string().starts_with("panel=EMPTY | ticket=-"));
    }
}
