//! Coverage reporter.
//! Text projections of a plan for the operator: receiver requirements and a fixed-width
//! frequency scale with each receiver's window, center and covered frequencies.

use std::fmt::Write;

use crate::error::PlanResult;
use crate::partition::receivers_needed;
use crate::plan::{AllocationPlan, Hz, to_mhz};

const SCALE_WIDTH: usize = 60;
const TICK_EVERY: usize = 10;
const CENTER_MARK: char = '█';
const FREQ_MARK: char = '●';
const SPAN_MARK: char = '═';

/// Receiver count summary shown before the operator commits to a configuration.
pub fn requirements(frequencies: &[Hz], bandwidth: Hz) -> PlanResult<String> {
    let (Some(&min), Some(&max)) = (frequencies.iter().min(), frequencies.iter().max()) else {
        return Ok(String::new());
    };
    let needed = receivers_needed(max - min, bandwidth)?;

    let mut out = String::new();
    let _ = writeln!(out, "📻 RTL-SDR Requirements:");
    let _ = writeln!(out, "   Frequency range: {:.3} - {:.3} MHz", to_mhz(min), to_mhz(max));
    let _ = writeln!(out, "   Total span: {:.3} MHz", to_mhz(max - min));
    let _ = writeln!(out, "   RTL-SDR dongles needed: {}", needed);
    let _ = writeln!(out, "   (Each RTL-SDR covers ~{:.1} MHz bandwidth)", to_mhz(bandwidth));
    let _ = writeln!(
        out,
        "⚠️  Make sure you have {} RTL-SDR dongles connected before deployment.",
        needed
    );
    Ok(out)
}

/// Maps `mhz` onto the scale. Python-style truncation toward zero, then clamped to the scale.
fn position(mhz: f64, start: f64, end: f64) -> i64 {
    ((mhz - start) / (end - start) * SCALE_WIDTH as f64) as i64
}

fn clamp_to_scale(pos: i64) -> Option<usize> {
    (0..=SCALE_WIDTH as i64).contains(&pos).then_some(pos as usize)
}

/// Renders the receiver coverage graph for `plan` over `frequencies`.
pub fn render_coverage(frequencies: &[Hz], plan: &AllocationPlan) -> String {
    let (Some(&min), Some(&max)) = (frequencies.iter().min(), frequencies.iter().max()) else {
        return String::new();
    };
    let (min_mhz, max_mhz) = (to_mhz(min), to_mhz(max));
    let scale_start = min_mhz.floor();
    let scale_end = max_mhz.floor() + 1.0;

    let mut out = String::new();
    let _ = writeln!(out, "📊 RTL-SDR Frequency Distribution");
    let _ = writeln!(out, "{}", "=".repeat(50));
    let _ = writeln!(
        out,
        "\nFrequency Range: {:.3} - {:.3} MHz (Span: {:.3} MHz)\n",
        min_mhz,
        max_mhz,
        max_mhz - min_mhz
    );

    let scale: String = (0..=SCALE_WIDTH)
        .map(|i| if i % TICK_EVERY == 0 { '|' } else { '-' })
        .collect();
    let _ = writeln!(
        out,
        "{:3.0}{}{:3.0} MHz",
        scale_start,
        &scale[3..scale.len() - 3],
        scale_end
    );

    for rx in &plan.receivers {
        let center_mhz = to_mhz(rx.center);
        let half_mhz = to_mhz(rx.bandwidth) / 2.0;

        let mut line = vec![' '; SCALE_WIDTH + 1];
        let start = position(center_mhz - half_mhz, scale_start, scale_end).max(0);
        let end = position(center_mhz + half_mhz, scale_start, scale_end).min(SCALE_WIDTH as i64);
        for pos in start..=end {
            if let Some(p) = clamp_to_scale(pos) {
                line[p] = SPAN_MARK;
            }
        }

        let center_pos = clamp_to_scale(position(center_mhz, scale_start, scale_end));
        if let Some(p) = center_pos {
            line[p] = CENTER_MARK;
        }

        let covered: Vec<Hz> = frequencies.iter().copied().filter(|&f| rx.covers(f)).collect();
        for &f in &covered {
            if let Some(p) = clamp_to_scale(position(to_mhz(f), scale_start, scale_end)) {
                if line[p] != CENTER_MARK {
                    line[p] = FREQ_MARK;
                }
            }
        }

        let _ = writeln!(
            out,
            "RTL={} [{:7.3} MHz]: {} ({} freqs)",
            rx.index,
            center_mhz,
            line.into_iter().collect::<String>(),
            covered.len()
        );
    }

    let _ = writeln!(
        out,
        "\nLegend: {} = RTL Center  {} = Frequency  {} = Coverage Range",
        CENTER_MARK, FREQ_MARK, SPAN_MARK
    );
    if let Some(rx) = plan.receivers.first() {
        let _ = writeln!(
            out,
            "Each RTL covers ±{:.1} MHz from center frequency",
            to_mhz(rx.bandwidth) / 2.0
        );
    }
    out
}
