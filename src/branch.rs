//! Experiment enrollment.
//!
//! Eligibility and branch assignment hash different inputs built from the
//! same user id, so which users pass the eligibility sample says nothing
//! about which branch they end up in.

use tracing::debug;

use crate::{
    output::to_json,
    sampling::{SamplingError, ratio_sample, stable_sample},
    value::Value,
};

/// One arm of an experiment; `ratio` is its weight among all branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub slug: String,
    pub ratio: u64,
}

impl Branch {
    pub fn new(slug: impl Into<String>, ratio: u64) -> Self {
        Branch {
            slug: slug.into(),
            ratio,
        }
    }
}

/// Sampling input for branch assignment.
pub fn branch_input(user_id: &str, recipe_slug: &str) -> String {
    format!("{}-{}-branch", user_id, recipe_slug)
}

/// Picks the branch `user_id` belongs to in `recipe_slug`, weighted by the
/// branch ratios.
///
/// # Examples
///
/// ```
/// use targex::branch::{Branch, choose_branch};
///
/// let branches = [Branch::new("control", 1), Branch::new("treatment", 1)];
/// let branch = choose_branch("user-1", "new-onboarding", &branches).unwrap();
///
/// // Always the same answer for the same user and recipe
/// assert_eq!(branch, choose_branch("user-1", "new-onboarding", &branches).unwrap());
/// ```
pub fn choose_branch<'b>(
    user_id: &str,
    recipe_slug: &str,
    branches: &'b [Branch],
) -> Result<&'b Branch, SamplingError> {
    let ratios: Vec<u64> = branches.iter().map(|branch| branch.ratio).collect();
    let index = ratio_sample(&branch_input(user_id, recipe_slug), &ratios)?;
    let branch = branches.get(index).ok_or(SamplingError::NoRatios)?;

    debug!(user_id, recipe_slug, branch = %branch.slug, "chose branch");
    Ok(branch)
}

/// Sampling input for recipe eligibility: `[user_id, recipe_id]` as
/// compact JSON.
pub fn eligibility_input(user_id: &str, recipe_id: i64) -> String {
    to_json(&Value::Array(vec![
        Value::from(user_id),
        Value::Integer(recipe_id),
    ]))
}

/// Whether `user_id` is in the sampled `rate` share of recipe `recipe_id`.
pub fn is_eligible(user_id: &str, recipe_id: i64, rate: f64) -> Result<bool, SamplingError> {
    let eligible = stable_sample(&eligibility_input(user_id, recipe_id), rate)?;
    debug!(user_id, recipe_id, rate, eligible, "sampled eligibility");
    Ok(eligible)
}
