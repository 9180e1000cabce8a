use nalgebra::SVector;

use crate::error::SimError;

// ---------------------------------------------------------------------------
// Dormand-Prince 5(4) with dense output
// ---------------------------------------------------------------------------

/// Right-hand side `dy/dt = f(t, y)`.
///
/// Takes `&mut self` so a system can keep running bookkeeping (impact
/// latch, running maxima) as it is evaluated.
pub trait OdeSystem<const N: usize> {
    fn rhs(&mut self, t: f64, y: &SVector<f64, N>) -> Result<SVector<f64, N>, SimError>;
}

const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th order weights (also row 7 of the tableau)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the 5th and 4th order weights
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

// Dense output (Hairer, Norsett & Wanner)
const D1: f64 = -12715105075.0 / 11282082432.0;
const D3: f64 = 87487479700.0 / 32700410799.0;
const D4: f64 = -10690763975.0 / 1880347072.0;
const D5: f64 = 701980252875.0 / 199316789632.0;
const D6: f64 = -1453857185.0 / 822651844.0;
const D7: f64 = 69997945.0 / 29380423.0;

/// Integration statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Step-size controller, `h_new = safety * h * err^(-1/5)`.
#[derive(Debug, Clone, Copy)]
pub struct StepController {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for StepController {
    fn default() -> Self {
        Self {
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
        }
    }
}

impl StepController {
    fn factor(&self, error: f64) -> f64 {
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-0.2)).clamp(self.min_factor, self.max_factor)
    }
}

/// One accepted step, kept for interpolation inside it.
struct Dense<const N: usize> {
    t: f64,
    h: f64,
    r: [SVector<f64, N>; 5],
}

impl<const N: usize> Dense<N> {
    fn at(&self, t: f64) -> SVector<f64, N> {
        let s = (t - self.t) / self.h;
        let s1 = 1.0 - s;
        let [r1, r2, r3, r4, r5] = &self.r;
        r1 + (r2 + (r3 + (r4 + r5 * s1) * s) * s1) * s
    }
}

/// Adaptive Dormand-Prince 5(4) solver.
#[derive(Debug, Clone)]
pub struct DormandPrince {
    pub atol: f64,
    pub rtol: f64,
    pub controller: StepController,
    pub h_min: f64,
    pub max_steps: u64,
    pub stats: Stats,
}

impl Default for DormandPrince {
    fn default() -> Self {
        Self::new(1e-9, 1e-9)
    }
}

impl DormandPrince {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self {
            atol,
            rtol,
            controller: StepController::default(),
            h_min: 1e-10,
            max_steps: 10_000_000,
            stats: Stats::default(),
        }
    }

    /// Integrate from `t0` to `t1`, reporting the solution on the grid
    /// `t0 + k * dt` (interpolated) and exactly at `t1`.
    ///
    /// The observer is called at `t0`, then at every grid point strictly
    /// inside `(t0, t1)`, then at `t1`. Returns the state at `t1`.
    pub fn integrate_const<const N: usize, S, F>(
        &mut self,
        sys: &mut S,
        t0: f64,
        y0: SVector<f64, N>,
        t1: f64,
        dt: f64,
        observe: F,
    ) -> Result<SVector<f64, N>, SimError>
    where
        S: OdeSystem<N>,
        F: FnMut(&mut S, f64, &SVector<f64, N>) -> Result<(), SimError>,
    {
        self.integrate_on_grid(sys, t0, y0, t1, t0, dt, observe)
    }

    /// Like [`integrate_const`](Self::integrate_const), but the interior
    /// observations fall on `origin + k * dt`, so consecutive windows of
    /// one segment share a single output cadence.
    pub fn integrate_on_grid<const N: usize, S, F>(
        &mut self,
        sys: &mut S,
        t0: f64,
        y0: SVector<f64, N>,
        t1: f64,
        origin: f64,
        dt: f64,
        mut observe: F,
    ) -> Result<SVector<f64, N>, SimError>
    where
        S: OdeSystem<N>,
        F: FnMut(&mut S, f64, &SVector<f64, N>) -> Result<(), SimError>,
    {
        observe(sys, t0, &y0)?;
        if !(t1 > t0) {
            return Ok(y0);
        }

        let span = t1 - t0;
        let grid_eps = dt * 1e-9;
        // First grid point strictly after t0
        let mut grid_index = ((t0 - origin) / dt).floor().max(0.0) as u64 + 1;
        let mut next_grid = origin + grid_index as f64 * dt;
        while next_grid <= t0 + grid_eps {
            grid_index += 1;
            next_grid = origin + grid_index as f64 * dt;
        }

        let mut t = t0;
        let mut y = y0;
        let mut k1 = self.eval(sys, t, &y)?;
        let mut h = dt.min(span);
        let mut steps = 0u64;

        while t < t1 {
            steps += 1;
            if steps > self.max_steps {
                return Err(SimError::StepSizeUnderflow { time: t, step: h });
            }

            let mut h_try = h.min(t1 - t);
            // Stretch onto t1 rather than leaving a sliver
            if t1 - (t + h_try) < 1e-12 * span.max(1.0) {
                h_try = t1 - t;
            }
            if h_try < self.h_min && t1 - t > self.h_min {
                return Err(SimError::StepSizeUnderflow { time: t, step: h_try });
            }

            let k2 = self.eval(sys, t + C2 * h_try, &(y + k1 * (A21 * h_try)))?;
            let k3 = self.eval(sys, t + C3 * h_try, &(y + (k1 * A31 + k2 * A32) * h_try))?;
            let k4 = self.eval(sys, t + C4 * h_try, &(y + (k1 * A41 + k2 * A42 + k3 * A43) * h_try))?;
            let k5 = self.eval(
                sys,
                t + C5 * h_try,
                &(y + (k1 * A51 + k2 * A52 + k3 * A53 + k4 * A54) * h_try),
            )?;
            let k6 = self.eval(
                sys,
                t + h_try,
                &(y + (k1 * A61 + k2 * A62 + k3 * A63 + k4 * A64 + k5 * A65) * h_try),
            )?;
            let y_new = y + (k1 * B1 + k3 * B3 + k4 * B4 + k5 * B5 + k6 * B6) * h_try;
            let t_new = if t1 - (t + h_try) <= 0.0 { t1 } else { t + h_try };
            let k7 = self.eval(sys, t_new, &y_new)?;

            let err_vec = (k1 * E1 + k3 * E3 + k4 * E4 + k5 * E5 + k6 * E6 + k7 * E7) * h_try;
            let error = err_vec
                .iter()
                .zip(y.iter().zip(y_new.iter()))
                .map(|(e, (a, b))| e.abs() / (self.atol + self.rtol * a.abs().max(b.abs())))
                .fold(0.0_f64, f64::max);

            if error <= 1.0 {
                self.stats.accepted_steps += 1;

                if next_grid <= t_new && next_grid < t1 - grid_eps {
                    let diff = y_new - y;
                    let bspl = k1 * h_try - diff;
                    let dense = Dense {
                        t,
                        h: h_try,
                        r: [
                            y,
                            diff,
                            bspl,
                            diff - k7 * h_try - bspl,
                            (k1 * D1 + k3 * D3 + k4 * D4 + k5 * D5 + k6 * D6 + k7 * D7) * h_try,
                        ],
                    };
                    while next_grid <= t_new && next_grid < t1 - grid_eps {
                        observe(sys, next_grid, &dense.at(next_grid))?;
                        grid_index += 1;
                        next_grid = origin + grid_index as f64 * dt;
                    }
                }

                t = t_new;
                y = y_new;
                k1 = k7;
                h = h_try * self.controller.factor(error);
            } else {
                self.stats.rejected_steps += 1;
                h = h_try * self.controller.factor(error).min(1.0);
            }
        }

        observe(sys, t1, &y)?;
        Ok(y)
    }

    fn eval<const N: usize, S: OdeSystem<N>>(
        &mut self,
        sys: &mut S,
        t: f64,
        y: &SVector<f64, N>,
    ) -> Result<SVector<f64, N>, SimError> {
        self.stats.fn_evals += 1;
        sys.rhs(t, y)
    }
}
