//! Goal Evaluator
//!
//! Compares a day's or week's activity summary against the active goals.
//!
//! Key rules:
//! - progress is `current / target` clamped to [0, 1]
//! - a non-positive target has zero progress but is always achieved
//! - user-entered targets are validated here and never reach the store invalid

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, ValidationError};
use crate::models::{GoalPeriod, GoalType, UserGoal};
use crate::store::{LiveQuery, RecordStore, Table};
use crate::summary::ActivitySummary;
use crate::time_utils::week_start;

// ---------------------------------------------------------------------------
/// Evaluation: pure progress computation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub progress: f64,
    pub achieved: bool,
}

pub fn evaluate(target: f64, current: f64) -> Evaluation {
    let progress = if target > 0.0 {
        (current / target).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Evaluation {
        progress,
        achieved: current >= target,
    }
}

// ---------------------------------------------------------------------------
/// Goal Progress: one goal evaluated against a summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: Option<i64>,
    pub goal_type: GoalType,
    pub label: String,
    pub target: f64,
    pub current: f64,
    pub progress: f64,
    pub achieved: bool,
}

impl GoalProgress {
    pub fn new(goal_type: GoalType, target: f64, current: f64) -> Self {
        let Evaluation { progress, achieved } = evaluate(target, current);
        Self {
            goal_id: None,
            goal_type,
            label: label(goal_type, GoalPeriod::Daily).to_string(),
            target,
            current,
            progress,
            achieved,
        }
    }

    pub fn for_goal(goal: &UserGoal, summary: &ActivitySummary) -> Self {
        let mut progress = Self::new(goal.goal_type, goal.target_value, current_value(goal.goal_type, summary));
        progress.goal_id = Some(goal.id);
        progress.label = label(goal.goal_type, goal.period).to_string();
        progress
    }
}

fn label(goal_type: GoalType, period: GoalPeriod) -> &'static str {
    match (period, goal_type) {
        (GoalPeriod::Daily, GoalType::Steps) => "Daily Steps",
        (GoalPeriod::Daily, GoalType::DistanceKm) => "Distance",
        (GoalPeriod::Daily, GoalType::ActiveMinutes) => "Active Minutes",
        (GoalPeriod::Daily, GoalType::CaloriesBurned) => "Calories Burned",
        (GoalPeriod::Weekly, GoalType::Steps) => "Weekly Steps",
        (GoalPeriod::Weekly, GoalType::DistanceKm) => "Weekly Distance",
        (GoalPeriod::Weekly, GoalType::ActiveMinutes) => "Weekly Active Minutes",
        (GoalPeriod::Weekly, GoalType::CaloriesBurned) => "Weekly Calories Burned",
    }
}

/// The summary value a goal of this type is measured against, in the goal's unit
pub fn current_value(goal_type: GoalType, summary: &ActivitySummary) -> f64 {
    match goal_type {
        GoalType::Steps => summary.total_steps as f64,
        GoalType::DistanceKm => summary.total_distance_km(),
        GoalType::ActiveMinutes => summary.total_active_minutes(),
        GoalType::CaloriesBurned => summary.total_calories,
    }
}

// ---------------------------------------------------------------------------
/// Input Validation
// ---------------------------------------------------------------------------

/// Parse a goal target typed by the user
pub fn parse_target(input: &str) -> Result<f64, ValidationError> {
    let value: f64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::field("target_value", "Target must be a positive number."))?;

    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::field(
            "target_value",
            "Target must be a positive number.",
        ));
    }

    Ok(value)
}

// ---------------------------------------------------------------------------
/// Store-backed daily and weekly progress
// ---------------------------------------------------------------------------

impl RecordStore {
    /// Progress of every active daily goal for `date` against that day's activities
    pub async fn daily_goal_progress(&self, date: NaiveDate) -> Result<Vec<GoalProgress>, StoreError> {
        let goals = self.active_daily_goals_for_date(date).await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let summary = self.daily_summary(date).await?;
        Ok(goals
            .iter()
            .map(|goal| GoalProgress::for_goal(goal, &summary))
            .collect())
    }

    pub fn live_daily_goal_progress(&self, date: NaiveDate) -> LiveQuery<Vec<GoalProgress>> {
        LiveQuery::new(self, &[Table::Activities, Table::Goals], move |store| async move {
            store.daily_goal_progress(date).await
        })
    }

    /// Progress of every active weekly goal against the Monday-based week containing `date`
    pub async fn weekly_goal_progress(&self, date: NaiveDate) -> Result<Vec<GoalProgress>, StoreError> {
        let goals = self.active_weekly_goals(week_start(date)).await?;
        if goals.is_empty() {
            return Ok(Vec::new());
        }

        let summary = self.weekly_summary(date).await?;
        Ok(goals
            .iter()
            .map(|goal| GoalProgress::for_goal(goal, &summary))
            .collect())
    }

    pub fn live_weekly_goal_progress(&self, date: NaiveDate) -> LiveQuery<Vec<GoalProgress>> {
        LiveQuery::new(self, &[Table::Activities, Table::Goals], move |store| async move {
            store.weekly_goal_progress(date).await
        })
    }
}

// ---------------------------------------------------------------------------
/// Tests
// ---------------------------------------------------------------------------
