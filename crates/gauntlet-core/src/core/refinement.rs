// crates/gauntlet-core/src/core/refinement.rs
// ============================================================================
// Module: Gauntlet Refinement Analysis
// Description: Toggle-dominance and clustering analysis over top passes.
// Purpose: Drive the bounded range-refinement loop between sweeps.
// Dependencies: crate::core::ranges, serde
// ============================================================================

//! ## Overview
//! After each sweep the top passes are analyzed per parameter: boolean
//! toggles for value dominance, numerics for clustering. A non-KEEP
//! recommendation on any parameter produces an aggregate `refine`
//! recommendation, bounded by the refinement iteration cap. The analysis
//! record is persisted so reports can show why ranges were narrowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::ranges::OptimizationRange;

// ============================================================================
// SECTION: Per-Parameter Recommendations
// ============================================================================

/// Recommendation for a boolean toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleRecommendation {
    /// Pin the toggle to true.
    FixTrue,
    /// Pin the toggle to false.
    FixFalse,
    /// Keep sweeping both values.
    Keep,
}

/// Dominance analysis of one boolean toggle.
///
/// # Invariants
/// - Shares are fractions in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleAnalysis {
    /// Share of `true` among the top-N passes.
    pub top_share_true: f64,
    /// Share of `true` across the full pass set.
    pub all_share_true: f64,
    /// Derived recommendation.
    pub recommendation: ToggleRecommendation,
}

/// Recommendation for a numeric parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterRecommendation {
    /// Narrow the range to the observed top-N span.
    Narrow {
        /// Suggested new grid start.
        start: f64,
        /// Suggested new grid step.
        step: f64,
        /// Suggested new grid stop.
        stop: f64,
    },
    /// Widen the range; the sweep exercised too few distinct values.
    Widen,
    /// Keep the current range.
    Keep,
}

/// Clustering analysis of one numeric parameter.
///
/// # Invariants
/// - `cv` is `stddev / |mean|`, zero when the mean is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    /// Mean of the parameter over the top-N passes.
    pub mean: f64,
    /// Standard deviation over the top-N passes.
    pub stddev: f64,
    /// Coefficient of variation over the top-N passes.
    pub cv: f64,
    /// Distinct values exercised across the full pass set.
    pub distinct_values: u64,
    /// Derived recommendation.
    pub recommendation: ClusterRecommendation,
}

/// Analysis record for one parameter.
///
/// # Invariants
/// - Exactly one of `toggle` / `cluster` is populated, matching the
///   parameter kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamAnalysis {
    /// Parameter name.
    pub name: String,
    /// Toggle analysis for boolean parameters.
    pub toggle: Option<ToggleAnalysis>,
    /// Clustering analysis for numeric parameters.
    pub cluster: Option<ClusterAnalysis>,
}

impl ParamAnalysis {
    /// Returns true when the parameter's recommendation is not KEEP.
    #[must_use]
    pub fn recommends_change(&self) -> bool {
        let toggle_change = self
            .toggle
            .as_ref()
            .is_some_and(|analysis| analysis.recommendation != ToggleRecommendation::Keep);
        let cluster_change = self.cluster.as_ref().is_some_and(|analysis| {
            !matches!(analysis.recommendation, ClusterRecommendation::Keep)
        });
        toggle_change || cluster_change
    }
}

// ============================================================================
// SECTION: Aggregate Analysis
// ============================================================================

/// Aggregate refinement analysis for one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementAnalysis {
    /// Per-parameter analyses in range order.
    pub params: Vec<ParamAnalysis>,
    /// True when any parameter recommends a change and the iteration budget
    /// allows another sweep.
    pub recommend_refine: bool,
    /// True when a change was recommended but the iteration cap forced the
    /// pipeline to proceed.
    pub forced_proceed: bool,
    /// Ranges the analysis suggests for the next sweep.
    pub suggested_ranges: Vec<OptimizationRange>,
}

/// External or automatic decision at the refine pause point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RefineDecision {
    /// Continue to pass selection with the current results.
    Proceed,
    /// Re-run the sweep with refined ranges.
    Refine {
        /// Ranges for the next sweep iteration.
        ranges: Vec<OptimizationRange>,
    },
}
