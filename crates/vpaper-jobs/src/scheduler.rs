//! Worker selection policy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Where a file was routed and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// The first idle worker.
    Idle(usize),
    /// No worker was idle; picked uniformly at random.
    Random(usize),
}

impl Assignment {
    pub fn worker(self) -> usize {
        match self {
            Assignment::Idle(i) | Assignment::Random(i) => i,
        }
    }
}

/// Picks the first idle worker, falling back to a random one.
pub struct Scheduler {
    rng: StdRng,
}

impl Scheduler {
    /// A fixed `seed` makes the fallback choice reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Choose a worker given each worker's idle flag, in pool order.
    ///
    /// Returns `None` only for an empty pool.
    pub fn assign(&mut self, idle: &[bool]) -> Option<Assignment> {
        if idle.is_empty() {
            return None;
        }
        if let Some(i) = idle.iter().position(|&is_idle| is_idle) {
            return Some(Assignment::Idle(i));
        }
        Some(Assignment::Random(self.rng.gen_range(0..idle.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_idle_worker_wins() {
        let mut s = Scheduler::new(Some(1));
        assert_eq!(s.assign(&[false, true, true]), Some(Assignment::Idle(1)));
        assert_eq!(s.assign(&[true, true]), Some(Assignment::Idle(0)));
    }

    #[test]
    fn test_empty_pool() {
        assert_eq!(Scheduler::new(None).assign(&[]), None);
    }

    #[test]
    fn test_random_fallback_is_uniform() {
        let mut s = Scheduler::new(Some(7));
        let busy = [false; 4];
        let mut counts = [0usize; 4];
        let rounds = 40_000;
        for _ in 0..rounds {
            match s.assign(&busy) {
                Some(Assignment::Random(i)) => counts[i] += 1,
                other => panic!("unexpected assignment {other:?}"),
            }
        }
        for n in counts {
            // expected 10_000 each
            assert!((9_000..11_000).contains(&n), "{counts:?}");
        }
    }

    #[test]
    fn test_seed_makes_choices_reproducible() {
        let busy = [false; 8];
        let mut a = Scheduler::new(Some(99));
        let mut b = Scheduler::new(Some(99));
        let picks_a: Vec<_> = (0..32).map(|_| a.assign(&busy)).collect();
        let picks_b: Vec<_> = (0..32).map(|_| b.assign(&busy)).collect();
        assert_eq!(picks_a, picks_b);
    }
}
