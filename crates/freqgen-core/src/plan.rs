//! The `Plan` value: everything the solver's and encoder's sizing math
//! determine about a requested (frequency, duty cycle) before any resource
//! is touched.

use crate::encoder;
use crate::error::FreqGenError;
use crate::solver::{self, F_APB};

/// Pure output of the Solver + Encoder sizing math for one requested
/// `(Fout, D)` pair. Computing a `Plan` touches no hardware, registry, or
/// pool state — see [`crate::lifecycle::info`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub freq_actual: f64,
    pub duty_actual: f64,
    pub prescaler: u8,
    pub nh: u32,
    pub nl: u32,
    pub onitems: usize,
    pub nrep: u32,
    pub nitems: usize,
    pub mem_blocks: u8,
    pub jitter_seconds: f64,
}

impl Plan {
    /// `N = NH + NL`, the period count in prescaled clock ticks.
    pub fn n(&self) -> u32 {
        self.nh + self.nl
    }

    pub(crate) fn from_solution(solved: solver::SolvedFrequency) -> Result<Plan, FreqGenError> {
        let onitems = encoder::count(solved.nh, solved.nl);
        let sizing = encoder::size_buffer(onitems)?;
        let n = solved.n() as f64;
        Ok(Plan {
            freq_actual: F_APB / (solved.prescaler as f64 * n),
            duty_actual: solved.nh as f64 / n,
            prescaler: solved.prescaler,
            nh: solved.nh,
            nl: solved.nl,
            onitems: sizing.onitems,
            nrep: sizing.nrep,
            nitems: sizing.nitems,
            mem_blocks: sizing.mem_blocks,
            jitter_seconds: solved.prescaler as f64 / F_APB,
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::lifecycle::info;

    #[test]
    fn one_hertz_even_duty_uses_the_largest_exact_prescaler() {
        let plan = info(1.0, 0.5).unwrap();
        assert_eq!(plan.prescaler, 250);
        assert_eq!(plan.n(), 320_000);
        assert_eq!(plan.nh, 160_000);
        assert_eq!(plan.nl, 160_000);
        assert_eq!(plan.mem_blocks, 1);
        assert!((plan.freq_actual - 1.0).abs() < 1e-9);
        assert!((plan.duty_actual - 0.5).abs() < 1e-9);
    }

    #[test]
    fn one_megahertz_quarter_duty_falls_back_to_no_prescaling() {
        let plan = info(1_000_000.0, 0.25).unwrap();
        assert_eq!(plan.prescaler, 1);
        assert_eq!(plan.n(), 80);
        assert_eq!(plan.nh, 20);
        assert_eq!(plan.nl, 60);
        assert_eq!(plan.onitems, 1);
        assert!((plan.freq_actual - 1_000_000.0).abs() < 1e-6);
        assert!((plan.duty_actual - 0.25).abs() < 1e-9);
    }

    #[test]
    fn plan_respects_its_own_invariants() {
        for (fout, duty) in [(1.0, 0.5), (60.0, 0.3), (1000.0, 0.5), (1_000_000.0, 0.25)] {
            let plan = info(fout, duty).unwrap();
            assert!(plan.nh >= 1 && plan.nl >= 1);
            assert!(plan.mem_blocks <= 8);
            assert!(plan.nitems <= 64 * plan.mem_blocks as usize);
        }
    }
}
