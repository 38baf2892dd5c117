use crate::domain::simulation::ImpactSummary;
use crate::domain::trajectory::Trajectory;
use std::collections::{BTreeMap, BTreeSet};

/// Difference between two prices, with the percentage left undefined when the
/// baseline is exactly zero.
pub fn impact_between(baseline: f64, shocked: f64) -> ImpactSummary {
    let difference = shocked - baseline;
    let pct_change = if baseline == 0.0 {
        None
    } else {
        Some(100.0 * difference / baseline)
    };
    ImpactSummary {
        baseline,
        shocked,
        difference,
        pct_change,
    }
}

/// Impact at each checkpoint week both trajectories reach. Checkpoints past
/// the end of either trajectory are left out, never extrapolated.
pub fn compute_impact(
    baseline: &Trajectory,
    counterfactual: &Trajectory,
    checkpoints: &BTreeSet<u32>,
) -> BTreeMap<u32, ImpactSummary> {
    checkpoints
        .iter()
        .filter_map(|&week| {
            let b = baseline.value_at(week)?;
            let c = counterfactual.value_at(week)?;
            Some((week, impact_between(b, c)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoints(weeks: &[u32]) -> BTreeSet<u32> {
        weeks.iter().copied().collect()
    }

    #[test]
    fn difference_and_percentage() {
        let base = Trajectory::from_values(&[80.0, 82.0]);
        let cf = Trajectory::from_values(&[84.0, 77.9]);
        let out = compute_impact(&base, &cf, &checkpoints(&[1, 2]));

        let w1 = out[&1];
        assert_eq!(w1.difference, 4.0);
        assert_eq!(w1.pct_change, Some(5.0));

        let w2 = out[&2];
        assert!((w2.difference + 4.1).abs() < 1e-9);
        assert!((w2.pct_change.unwrap() + 5.0).abs() < 1e-9);
    }

    #[test]
    fn checkpoint_past_horizon_is_omitted() {
        let base = Trajectory::from_values(&[1.0; 5]);
        let cf = Trajectory::from_values(&[2.0; 5]);
        let out = compute_impact(&base, &cf, &checkpoints(&[1, 12]));
        assert!(out.contains_key(&1));
        assert!(!out.contains_key(&12));
    }

    #[test]
    fn zero_baseline_leaves_percentage_undefined() {
        let base = Trajectory::from_values(&[0.0]);
        let cf = Trajectory::from_values(&[3.0]);
        let out = compute_impact(&base, &cf, &checkpoints(&[1]));
        assert_eq!(out[&1].difference, 3.0);
        assert_eq!(out[&1].pct_change, None);

        let json = serde_json::to_value(out[&1]).unwrap();
        assert!(json["pct_change"].is_null());
    }

    #[test]
    fn week_zero_is_never_a_checkpoint() {
        let base = Trajectory::from_values(&[1.0]);
        let out = compute_impact(&base, &base, &checkpoints(&[0]));
        assert!(out.is_empty());
    }
}
