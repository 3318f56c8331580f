//! Simulated pH probe: a bounded random walk.

use std::time::Duration;

use ph_traits::PhProbe;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PhError;
use crate::sample::{PH_MAX, PH_MIN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub start_ph: f64,
    /// Largest change between consecutive readings.
    pub max_step: f64,
    pub min_ph: f64,
    pub max_ph: f64,
    pub seed: Option<u64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            start_ph: 7.0,
            max_step: 0.15,
            min_ph: 4.0,
            max_ph: 10.0,
            seed: None,
        }
    }
}

/// Random-walk probe. Each reading moves by a uniform step in
/// `[-max_step, max_step)` and is clamped to `[min_ph, max_ph]`.
#[derive(Debug)]
pub struct SimulatedProbe {
    current: f64,
    params: SimParams,
    rng: StdRng,
}

impl SimulatedProbe {
    pub fn new(params: SimParams) -> Result<Self, PhError> {
        let in_scale = |v: f64| v.is_finite() && (PH_MIN..=PH_MAX).contains(&v);
        if !in_scale(params.min_ph) || !in_scale(params.max_ph) || params.min_ph >= params.max_ph
        {
            return Err(PhError::Config(
                "simulator bounds must lie in [0, 14] with min < max".into(),
            ));
        }
        if !params.max_step.is_finite() || params.max_step < 0.0 {
            return Err(PhError::Config("simulator max_step must be >= 0".into()));
        }
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            current: params.start_ph.clamp(params.min_ph, params.max_ph),
            params,
            rng,
        })
    }

    /// Last value produced (or the start value before the first read).
    pub fn current(&self) -> f64 {
        self.current
    }

    fn step(&mut self) -> f64 {
        let change = (self.rng.r#gen::<f64>() - 0.5) * 2.0 * self.params.max_step;
        self.current = (self.current + change).clamp(self.params.min_ph, self.params.max_ph);
        self.current
    }
}

impl PhProbe for SimulatedProbe {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> SimParams {
        SimParams {
            seed: Some(seed),
            ..SimParams::default()
        }
    }

    #[test]
    fn walk_stays_in_bounds_and_steps_are_small() {
        let mut p = SimulatedProbe::new(params(7)).expect("valid params");
        let mut prev = p.current();
        for _ in 0..2_000 {
            let v = p.read(Duration::ZERO).expect("read");
            assert!((4.0..=10.0).contains(&v));
            assert!((v - prev).abs() <= 0.15 + 1e-12);
            prev = v;
        }
    }

    #[test]
    fn same_seed_same_walk() {
        let mut a = SimulatedProbe::new(params(42)).expect("valid params");
        let mut b = SimulatedProbe::new(params(42)).expect("valid params");
        for _ in 0..50 {
            assert_eq!(
                a.read(Duration::ZERO).expect("read"),
                b.read(Duration::ZERO).expect("read")
            );
        }
    }

    #[test]
    fn inverted_bounds_rejected() {
        let bad = SimParams {
            min_ph: 9.0,
            max_ph: 5.0,
            ..SimParams::default()
        };
        assert!(SimulatedProbe::new(bad).is_err());
    }
}
