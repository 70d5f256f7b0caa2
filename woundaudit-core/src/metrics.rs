//! Clinical metrics: measurements, surface areas, risk findings, healing
//! trajectory and the categorical risk score.
//!
//! Weights and thresholds are fixed constants. Changing the clinical
//! weighting means a new version of `risk_score`, not a parameter.

use crate::error::{AuditError, Result};
use crate::types::{ClinicalMetrics, Measurement, RiskFindings, RiskScore, TrajectoryStatus};
use regex::Regex;
use std::sync::LazyLock;

pub const DRAINAGE_WEIGHT: u32 = 2;
pub const TUNNELING_WEIGHT: u32 = 3;
pub const PERIWOUND_REDNESS_WEIGHT: u32 = 2;
/// Scores up to and including this value are Moderate; above is High
pub const MODERATE_CEILING: u32 = 5;

static MEASUREMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Measurement: (\d+(?:\.\d+)?) x (\d+(?:\.\d+)?) cm x (\d+(?:\.\d+)?)").unwrap()
});

static SURFACE_AREA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Surface Area: (\d+(?:\.\d+)?)").unwrap());

static DRAINAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Drainage/Exudate: Yes").unwrap());

static TUNNELING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tunneling: Yes").unwrap());

static PERIWOUND_REDNESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Periwound Skin:[^\n]*(?:redness|erythema)").unwrap()
});

/// All `Measurement: L x W cm x D` occurrences, in document order
pub fn parse_measurements(text: &str) -> Vec<Measurement> {
    MEASUREMENT_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            Some(Measurement {
                length: caps[1].parse().ok()?,
                width: caps[2].parse().ok()?,
                depth: caps[3].parse().ok()?,
            })
        })
        .collect()
}

/// All `Surface Area: N` values, in document order
pub fn parse_surface_areas(text: &str) -> Vec<f64> {
    SURFACE_AREA_REGEX
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

pub fn count_findings(text: &str) -> RiskFindings {
    RiskFindings {
        drainage: DRAINAGE_REGEX.find_iter(text).count() as u32,
        tunneling: TUNNELING_REGEX.find_iter(text).count() as u32,
        periwound_redness: PERIWOUND_REDNESS_REGEX.find_iter(text).count() as u32,
    }
}

/// Percent change between the two most recent surface areas, rounded to
/// two decimals. Positive means the wound shrank.
///
/// Returns `Ok(None)` with fewer than two values and `InvalidMeasurement`
/// when the earlier value is zero.
pub fn healing_trajectory(areas: &[f64]) -> Result<Option<f64>> {
    let [.., previous, latest] = areas else {
        return Ok(None);
    };

    if *previous == 0.0 {
        return Err(AuditError::InvalidMeasurement(
            "previous surface area is zero".to_string(),
        ));
    }

    let change = (previous - latest) / previous * 100.0;
    if !change.is_finite() {
        return Err(AuditError::InvalidMeasurement(format!(
            "non-finite change from {previous} to {latest}"
        )));
    }
    let rounded = (change * 100.0).round() / 100.0;
    // -0.0 would print as "-0%"
    Ok(Some(if rounded == 0.0 { 0.0 } else { rounded }))
}

pub fn risk_points(findings: &RiskFindings) -> u32 {
    DRAINAGE_WEIGHT * findings.drainage
        + TUNNELING_WEIGHT * findings.tunneling
        + PERIWOUND_REDNESS_WEIGHT * findings.periwound_redness
}

pub fn risk_score(findings: &RiskFindings) -> RiskScore {
    match risk_points(findings) {
        0 => RiskScore::Low,
        points if points <= MODERATE_CEILING => RiskScore::Moderate,
        _ => RiskScore::High,
    }
}

/// Run every metric over one note. Trajectory problems degrade into a
/// status; they never abort.
pub fn compute_metrics(text: &str) -> ClinicalMetrics {
    let measurements = parse_measurements(text);
    let surface_areas = parse_surface_areas(text);
    let findings = count_findings(text);

    let trajectory = match healing_trajectory(&surface_areas) {
        Ok(Some(value)) => TrajectoryStatus::Percent { value },
        Ok(None) => TrajectoryStatus::NotEnoughData,
        Err(e) => {
            tracing::warn!(error = %e, "healing trajectory unavailable");
            TrajectoryStatus::Unavailable {
                reason: match e {
                    AuditError::InvalidMeasurement(reason) => reason,
                    other => other.to_string(),
                },
            }
        }
    };

    ClinicalMetrics {
        measurements,
        surface_areas,
        risk_points: risk_points(&findings),
        risk_score: risk_score(&findings),
        findings,
        trajectory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings(drainage: u32, tunneling: u32, periwound_redness: u32) -> RiskFindings {
        RiskFindings {
            drainage,
            tunneling,
            periwound_redness,
        }
    }

    #[test]
    fn trajectory_needs_two_values() {
        assert_eq!(healing_trajectory(&[]).unwrap(), None);
        assert_eq!(healing_trajectory(&[12.0]).unwrap(), None);
    }

    #[test]
    fn trajectory_uses_last_two_values() {
        assert_eq!(healing_trajectory(&[10.0, 8.0]).unwrap(), Some(20.0));
        assert_eq!(healing_trajectory(&[50.0, 10.0, 8.0]).unwrap(), Some(20.0));
        assert_eq!(healing_trajectory(&[3.0, 2.0]).unwrap(), Some(33.33));
        // Growth is negative
        assert_eq!(healing_trajectory(&[8.0, 10.0]).unwrap(), Some(-25.0));
        assert_eq!(healing_trajectory(&[6.0, 6.0]).unwrap(), Some(0.0));
    }

    #[test]
    fn zero_previous_area_is_invalid() {
        let err = healing_trajectory(&[0.0, 4.0]).unwrap_err();
        assert!(matches!(err, AuditError::InvalidMeasurement(_)));
    }

    #[test]
    fn negligible_growth_rounds_to_plain_zero() {
        let percent = healing_trajectory(&[1000.0, 1000.01]).unwrap().unwrap();
        assert_eq!(percent, 0.0);
        assert!(percent.is_sign_positive());
        assert_eq!(
            TrajectoryStatus::Percent { value: percent }.to_string(),
            "0% surface area reduction"
        );
    }

    #[test]
    fn risk_score_thresholds() {
        assert_eq!(risk_score(&findings(0, 0, 0)), RiskScore::Low);
        assert_eq!(risk_score(&findings(1, 1, 0)), RiskScore::Moderate);
        assert_eq!(risk_points(&findings(1, 1, 0)), 5);
        assert_eq!(risk_score(&findings(2, 1, 0)), RiskScore::High);
        assert_eq!(risk_points(&findings(2, 1, 0)), 7);
        assert_eq!(risk_score(&findings(0, 0, 1)), RiskScore::Moderate);
    }

    #[test]
    fn risk_score_is_monotonic_in_each_count() {
        for base in 0..4 {
            for extra in 0..4 {
                let lo = findings(base, base, base);
                assert!(risk_score(&findings(base + extra, base, base)) >= risk_score(&lo));
                assert!(risk_score(&findings(base, base + extra, base)) >= risk_score(&lo));
                assert!(risk_score(&findings(base, base, base + extra)) >= risk_score(&lo));
            }
        }
    }

    #[test]
    fn parses_measurements_in_order() {
        let text = "Measurement: 4.2 x 3 cm x 0.5\nlater\nMeasurement: 3 x 2.5 cm x 0.3";
        let measurements = parse_measurements(text);
        assert_eq!(measurements.len(), 2);
        assert_eq!(
            measurements[0],
            Measurement {
                length: 4.2,
                width: 3.0,
                depth: 0.5
            }
        );
        assert_eq!(measurements[1].depth, 0.3);
    }

    #[test]
    fn periwound_redness_is_case_insensitive_and_line_bound() {
        let text = "Periwound Skin: mild REDNESS noted\nPeriwound Skin: intact\nredness elsewhere\nperiwound skin: Erythema";
        assert_eq!(count_findings(text).periwound_redness, 2);
    }

    #[test]
    fn negative_markers_are_not_counted() {
        let text = "Drainage/Exudate: No\nTunneling: No\nDrainage/Exudate: Yes";
        let counts = count_findings(text);
        assert_eq!(counts.drainage, 1);
        assert_eq!(counts.tunneling, 0);
    }

    #[test]
    fn end_to_end_note_metrics() {
        let metrics = compute_metrics(
            "Surface Area: 10\nSurface Area: 8\nDrainage/Exudate: Yes\nTunneling: Yes",
        );
        assert_eq!(metrics.trajectory, TrajectoryStatus::Percent { value: 20.0 });
        assert_eq!(metrics.findings, findings(1, 1, 0));
        assert_eq!(metrics.risk_points, 5);
        assert_eq!(metrics.risk_score, RiskScore::Moderate);
    }

    #[test]
    fn degenerate_trajectory_degrades_instead_of_zero() {
        let metrics = compute_metrics("Surface Area: 0\nSurface Area: 3");
        assert!(matches!(metrics.trajectory, TrajectoryStatus::Unavailable { .. }));
        assert_eq!(metrics.trajectory.percent(), None);
    }
}
