//! Analysis of an existing trunk-recorder config: what each source covers today and what the
//! allocator would give it under a given budget.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::allocate::{RecorderBudget, RecorderShare, controls_in_range, recorder_share};
use crate::error::{PlanError, PlanResult};
use crate::plan::{Hz, Receiver, to_mhz};
use crate::recorder_config::TrunkRecorderConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub receiver: Receiver,
    pub current_recorders: u32,
    pub controls: Vec<Hz>,
    pub recommended: RecorderShare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAnalysis {
    pub control_channels: Vec<Hz>,
    pub sources: Vec<SourceReport>,
    pub budget: RecorderBudget,
}

impl ConfigAnalysis {
    pub fn current_total(&self) -> u32 {
        self.sources.iter().map(|s| s.current_recorders).sum()
    }

    pub fn recommended_total(&self) -> u32 {
        self.sources.iter().map(|s| s.recommended.recorders).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Current Configuration Analysis ===\n");
        let _ = writeln!(out, "Control Channels: {}", self.control_channels.len());
        for (i, cc) in self.control_channels.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} Hz ({:.3} MHz)", i + 1, cc, to_mhz(*cc));
        }

        let _ = writeln!(out, "\nRTL-SDR Sources: {}", self.sources.len());
        for s in &self.sources {
            let rx = &s.receiver;
            let _ = writeln!(out, "\n  RTL-SDR {}:", rx.index);
            let _ = writeln!(out, "    Center: {} Hz ({:.3} MHz)", rx.center, to_mhz(rx.center));
            let _ = writeln!(
                out,
                "    Range: {} - {} Hz ({:.3} - {:.3} MHz)",
                rx.lower(),
                rx.upper(),
                to_mhz(rx.lower()),
                to_mhz(rx.upper())
            );
            let _ = writeln!(out, "    Bandwidth: {:.1} MHz", to_mhz(rx.bandwidth));
            let _ = writeln!(out, "    Digital Recorders: {}", s.current_recorders);
            let _ = writeln!(out, "    Control Channels in range: {}", s.controls.len());
            for cc in &s.controls {
                let _ = writeln!(out, "      - {} Hz ({:.3} MHz)", cc, to_mhz(*cc));
            }
        }
        let _ = writeln!(out, "\nTotal Digital Recorders: {}", self.current_total());

        let n = self.sources.len().max(1) as i64;
        let _ = writeln!(out, "\n=== Recommended Allocation ===");
        let _ = writeln!(
            out,
            "Target: {} total recorders, {}-{} per device",
            self.budget.total, self.budget.min_per_device, self.budget.max_per_device
        );
        let _ = writeln!(
            out,
            "Base per device: {} / {} = {}, remainder {}",
            self.budget.total,
            n,
            self.budget.total / n,
            self.budget.total % n
        );
        for s in &self.sources {
            let r = &s.recommended;
            let _ = writeln!(
                out,
                "  RTL-SDR {}: {} recorders (was {})",
                s.receiver.index, r.recorders, s.current_recorders
            );
            let _ = writeln!(
                out,
                "    Base: {}, Control bonus: {}, Remainder: {}",
                r.base, r.control_bonus, r.remainder
            );
        }
        let _ = writeln!(out, "\nRecommended total: {}", self.recommended_total());
        out
    }
}

/// Reports on every source of `config` against the first system's control channels.
pub fn analyze(config: &TrunkRecorderConfig, budget: &RecorderBudget) -> PlanResult<ConfigAnalysis> {
    budget.validate()?;
    if config.sources.is_empty() {
        return Err(PlanError::EmptyInput);
    }

    let control_channels = config
        .systems
        .first()
        .map(|s| s.control_channels.clone())
        .unwrap_or_default();
    let control_set: BTreeSet<Hz> = control_channels.iter().copied().collect();

    let count = config.sources.len();
    let sources = config
        .sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let receiver = Receiver::new(index, source.center, source.rate);
            let controls: Vec<Hz> = control_channels
                .iter()
                .copied()
                .filter(|&cc| receiver.covers(cc))
                .collect();
            let recommended = recorder_share(
                index,
                count,
                controls_in_range(&receiver, &control_set),
                budget,
            );
            SourceReport {
                receiver,
                current_recorders: source.digital_recorders,
                controls,
                recommended,
            }
        })
        .collect();

    Ok(ConfigAnalysis {
        control_channels,
        sources,
        budget: *budget,
    })
}
