use env::rand::Rng;
use gridworld::{Action, BoundaryPolicy, CellKind, Coordinate, ObstaclePolicy, Transition, OFF_GRID_PENALTY};

/// Index of the first maximum. NaN entries never win.
pub fn argmax_first(values: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (idx, &value) in values.iter().enumerate() {
        if value > best_value {
            best = idx;
            best_value = value;
        }
    }
    best
}

pub fn max_q(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|q| !q.is_nan())
        .fold(f64::NEG_INFINITY, f64::max)
}

pub fn epsilon_greedy(values: &[f64; Action::COUNT], epsilon: f64, rng: &mut impl Rng) -> Action {
    if rng.random::<f64>() < epsilon {
        Action::ALL[rng.random_range(0..Action::COUNT)]
    } else {
        Action::ALL[argmax_first(values)]
    }
}

/// `Q(s,a) + α (r + γ max_a' Q(s',a') - Q(s,a))`
pub fn bellman_update(current_q: f64, reward: f64, max_next_q: f64, alpha: f64, discount_factor: f64) -> f64 {
    current_q + alpha * (reward + discount_factor * max_next_q - current_q)
}

/// Where the `max_a' Q(s', a')` term of an update comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NextStateValue {
    /// A fixed value; no lookup needed.
    Fixed(f64),
    /// Look up the best action-value of this cell.
    Lookup(Coordinate),
}

impl NextStateValue {
    pub fn resolve(self, lookup: impl FnOnce(Coordinate) -> f64) -> f64 {
        match self {
            NextStateValue::Fixed(value) => value,
            NextStateValue::Lookup(cell) => lookup(cell),
        }
    }
}

/// Decide how a transition feeds the update, or `None` when it must not update at all.
///
/// Terminal cells are never left, so they contribute 0. A move rejected at the
/// border contributes [`OFF_GRID_PENALTY`]. A clamped move and a penalised
/// obstacle bump look up the cell the agent stayed in. A no-op obstacle bump
/// skips the update entirely.
pub fn next_state_value(
    transition: &Transition,
    boundary: BoundaryPolicy,
    obstacles: ObstaclePolicy,
) -> Option<NextStateValue> {
    match transition.hit {
        CellKind::Win | CellKind::Lose => Some(NextStateValue::Fixed(0.0)),
        CellKind::OutOfBounds => match boundary {
            BoundaryPolicy::Reject => Some(NextStateValue::Fixed(OFF_GRID_PENALTY)),
            BoundaryPolicy::Clamp => Some(NextStateValue::Lookup(transition.next)),
        },
        CellKind::Obstacle => match obstacles {
            ObstaclePolicy::NoOp => None,
            ObstaclePolicy::Penalize(_) => Some(NextStateValue::Lookup(transition.next)),
        },
        CellKind::Open => Some(NextStateValue::Lookup(transition.next)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env::rand::SeedableRng;
    use gridworld::GridConfig;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn argmax_prefers_the_first_maximum() {
        assert_eq!(argmax_first(&[0.0, 0.0, 0.0, 0.0]), 0);
        assert_eq!(argmax_first(&[-1.0, 2.0, 2.0, 0.0]), 1);
        assert_eq!(argmax_first(&[f64::NAN, -3.0, -2.0, f64::NAN]), 2);
        assert_eq!(max_q(&[f64::NAN, -3.0, -2.0]), -2.0);
    }

    #[test]
    fn bellman_update_is_a_fixed_point_at_zero_error() {
        for q in [-0.7, 0.0, 0.25, 1.0] {
            // r = 0, γ = 1, max Q(s') = Q(s,a)
            assert_eq!(bellman_update(q, 0.0, q, 0.1, 1.0), q);
        }
        assert!((bellman_update(0.0, 1.0, 0.0, 0.1, 0.9) - 0.1).abs() < 1e-12);
        assert!((bellman_update(0.0, 0.0, OFF_GRID_PENALTY, 0.1, 0.9) + 0.0891).abs() < 1e-12);
    }

    #[test]
    fn zero_epsilon_is_purely_greedy() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let values = [0.0, 0.4, 0.1, 0.4];
        for _ in 0..50 {
            assert_eq!(epsilon_greedy(&values, 0.0, &mut rng), Action::Right);
        }
    }

    #[test]
    fn full_epsilon_explores_every_action() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let values = [1.0, 0.0, 0.0, 0.0];
        let mut seen = [false; Action::COUNT];
        for _ in 0..200 {
            seen[epsilon_greedy(&values, 1.0, &mut rng).index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn next_state_values_follow_the_policies() {
        let grid = GridConfig::new(
            3,
            [Coordinate::new(1, 1)],
            Coordinate::new(2, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 2),
        )
        .unwrap();
        let reject = BoundaryPolicy::Reject;
        let noop = ObstaclePolicy::NoOp;

        let off = grid.step(Coordinate::new(2, 0), Action::Left);
        assert_eq!(
            next_state_value(&off, reject, noop),
            Some(NextStateValue::Fixed(OFF_GRID_PENALTY))
        );
        let clamped = grid.clone().with_boundary(BoundaryPolicy::Clamp).step(Coordinate::new(2, 0), Action::Left);
        assert_eq!(
            next_state_value(&clamped, BoundaryPolicy::Clamp, noop),
            Some(NextStateValue::Lookup(Coordinate::new(2, 0)))
        );

        let bump = grid.step(Coordinate::new(1, 0), Action::Right);
        assert_eq!(next_state_value(&bump, reject, noop), None);
        assert_eq!(
            next_state_value(&bump, reject, ObstaclePolicy::Penalize(-0.5)),
            Some(NextStateValue::Lookup(Coordinate::new(1, 0)))
        );

        let win = grid.step(Coordinate::new(0, 1), Action::Right);
        assert_eq!(next_state_value(&win, reject, noop), Some(NextStateValue::Fixed(0.0)));

        let open = grid.step(Coordinate::new(2, 0), Action::Up);
        assert_eq!(
            next_state_value(&open, reject, noop),
            Some(NextStateValue::Lookup(Coordinate::new(1, 0)))
        );
    }
}
