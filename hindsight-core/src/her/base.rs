//! Trajectory relabeling for hindsight experience replay.
use super::{GoalStrategy, HerConfig};
use crate::replay_buffer::{ArrayBatch, GoalBatch, TransitionBatch};
use crate::ExperienceBufferBase;
use anyhow::Result;
use log::debug;

/// One full episode, kept as parallel per-step sequences until relabeling.
///
/// The rollout loop appends a step at a time; rewards are not kept because
/// relabeling recomputes them against the substituted goal.
#[derive(Clone, Debug, Default)]
pub struct HindsightTrajectory {
    states: Vec<Vec<f32>>,
    actions: Vec<Vec<f32>>,
    next_states: Vec<Vec<f32>>,
    dones: Vec<i8>,
    achieved_goals: Vec<Vec<f32>>,
    next_achieved_goals: Vec<Vec<f32>>,
    desired_goals: Vec<Vec<f32>>,
}

impl HindsightTrajectory {
    /// Creates an empty trajectory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one environment step.
    #[allow(clippy::too_many_arguments)]
    pub fn push_step(
        &mut self,
        state: Vec<f32>,
        action: Vec<f32>,
        next_state: Vec<f32>,
        done: bool,
        achieved_goal: Vec<f32>,
        next_achieved_goal: Vec<f32>,
        desired_goal: Vec<f32>,
    ) {
        self.states.push(state);
        self.actions.push(action);
        self.next_states.push(next_state);
        self.dones.push(done as i8);
        self.achieved_goals.push(achieved_goal);
        self.next_achieved_goals.push(next_achieved_goal);
        self.desired_goals.push(desired_goal);
    }

    /// Number of steps in the episode.
    pub fn len(&self) -> usize {
        self.dones.len()
    }

    /// Returns `true` if no step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.dones.is_empty()
    }
}

/// Counters produced by one relabeling pass, for experiment tracking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelabelStats {
    /// Number of relabeled transitions stored.
    pub stored: usize,

    /// How many relabeled transitions landed within the goal tolerance.
    pub within_tolerance: usize,
}

/// Relabels `trajectory` and stores the hindsight transitions in `buffer`.
///
/// `reward_fn` recomputes the reward of a relabeled transition from
/// `(action, achieved_goal, next_achieved_goal, desired_goal, tolerance)`
/// and reports whether the substituted goal was met within tolerance;
/// anything else it needs (the environment, distance metrics) is captured
/// by the closure. Transitions are stored non-normalized; normalization is
/// the buffer consumer's concern at sample time.
pub fn store_hindsight_trajectory<B, F>(
    buffer: &mut B,
    trajectory: &HindsightTrajectory,
    config: &HerConfig,
    reward_fn: &mut F,
) -> Result<RelabelStats>
where
    B: ExperienceBufferBase<Item = TransitionBatch<ArrayBatch, ArrayBatch>>,
    F: FnMut(&[f32], &[f32], &[f32], &[f32], f32) -> (f32, bool),
{
    let mut stats = RelabelStats::default();
    let len = trajectory.len();

    for idx in 0..len {
        match config.strategy {
            GoalStrategy::Final => {
                let new_desired = trajectory.next_achieved_goals[len - 1].clone();
                store_relabeled(buffer, trajectory, idx, new_desired, config, reward_fn, &mut stats)?;
            }
            GoalStrategy::Future => {
                for k in 0..config.num_goals {
                    // no future step left to borrow a goal from
                    if idx + k >= len - 1 {
                        break;
                    }
                    let j = idx + 1 + fastrand::usize(..len - idx - 1);
                    let new_desired = trajectory.next_achieved_goals[j].clone();
                    store_relabeled(buffer, trajectory, idx, new_desired, config, reward_fn, &mut stats)?;
                }
            }
            GoalStrategy::None => break,
        }
    }

    debug!(
        "hindsight relabeling stored {} transitions, {} within tolerance",
        stats.stored, stats.within_tolerance
    );
    Ok(stats)
}

fn store_relabeled<B, F>(
    buffer: &mut B,
    trajectory: &HindsightTrajectory,
    idx: usize,
    new_desired: Vec<f32>,
    config: &HerConfig,
    reward_fn: &mut F,
    stats: &mut RelabelStats,
) -> Result<()>
where
    B: ExperienceBufferBase<Item = TransitionBatch<ArrayBatch, ArrayBatch>>,
    F: FnMut(&[f32], &[f32], &[f32], &[f32], f32) -> (f32, bool),
{
    let achieved = &trajectory.achieved_goals[idx];
    let next_achieved = &trajectory.next_achieved_goals[idx];
    let (reward, within_tol) = reward_fn(
        &trajectory.actions[idx],
        achieved,
        next_achieved,
        &new_desired,
        config.tolerance,
    );

    let batch = TransitionBatch::new(
        ArrayBatch::from_rows(&[trajectory.states[idx].as_slice()]),
        ArrayBatch::from_rows(&[trajectory.actions[idx].as_slice()]),
        ArrayBatch::from_rows(&[trajectory.next_states[idx].as_slice()]),
        vec![reward],
        vec![trajectory.dones[idx]],
    )
    .with_goals(GoalBatch {
        achieved: ArrayBatch::from_rows(&[achieved.as_slice()]),
        next_achieved: ArrayBatch::from_rows(&[next_achieved.as_slice()]),
        desired: ArrayBatch::from_rows(&[new_desired.as_slice()]),
    });
    buffer.push(batch)?;

    stats.stored += 1;
    if within_tol {
        stats.within_tolerance += 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{store_hindsight_trajectory, HindsightTrajectory};
    use crate::her::{GoalStrategy, HerConfig};
    use crate::replay_buffer::{ArrayBatch, ReplayBuffer, ReplayBufferConfig};
    use crate::{ExperienceBufferBase, ReplayBufferBase};

    fn trajectory(n: usize) -> HindsightTrajectory {
        let mut t = HindsightTrajectory::new();
        for i in 0..n {
            let x = i as f32;
            t.push_step(
                vec![x, x],
                vec![0.1 * x],
                vec![x + 1.0, x + 1.0],
                i + 1 == n,
                vec![x],
                vec![x + 1.0],
                vec![100.0],
            );
        }
        t
    }

    fn goal_buffer(capacity: usize) -> ReplayBuffer<ArrayBatch, ArrayBatch> {
        ReplayBuffer::build(
            &ReplayBufferConfig::default()
                .capacity(capacity)
                .goal_shape(Some(vec![1])),
        )
    }

    #[test]
    fn test_none_strategy_stores_nothing() {
        let mut buffer = goal_buffer(8);
        let config = HerConfig::default().strategy(GoalStrategy::None);
        let stats = store_hindsight_trajectory(
            &mut buffer,
            &trajectory(5),
            &config,
            &mut |_a, _g, _ng, _d, _tol| (0.0, false),
        )
        .unwrap();
        assert_eq!(stats.stored, 0);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_empty_trajectory_is_a_no_op() {
        let mut buffer = goal_buffer(8);
        let stats = store_hindsight_trajectory(
            &mut buffer,
            &HindsightTrajectory::new(),
            &HerConfig::default(),
            &mut |_a, _g, _ng, _d, _tol| (0.0, false),
        )
        .unwrap();
        assert_eq!(stats.stored, 0);
    }

    #[test]
    fn test_tolerance_tally() {
        let mut buffer = goal_buffer(16);
        // reward function reports tolerance for even achieved goals
        let stats = store_hindsight_trajectory(
            &mut buffer,
            &trajectory(4),
            &HerConfig::default(),
            &mut |_a, g, _ng, _d, _tol| (-1.0, g[0] as i64 % 2 == 0),
        )
        .unwrap();
        assert_eq!(stats.stored, 4);
        assert_eq!(stats.within_tolerance, 2);
    }
}
