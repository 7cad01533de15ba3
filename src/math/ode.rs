/// Derivative buffer reused across steps.
pub struct StepWorkspace {
    pub dy: Vec<f64>,
}

impl StepWorkspace {
    pub fn new(n: usize) -> Self {
        Self { dy: vec![0.0; n] }
    }

    pub fn resize(&mut self, n: usize) {
        if self.dy.len() != n {
            self.dy.resize(n, 0.0);
        }
    }
}

/// Forward-difference step for a system of difference equations.
/// `f` fills `ws.dy` with the per-unit-time change of every component; the state then
/// advances by `dt * dy`. With `dt = 1` this is the plain daily update of a
/// compartmental model.
pub fn euler_step_ws<F>(y: &mut [f64], t: f64, dt: f64, ws: &mut StepWorkspace, mut f: F)
where
    F: FnMut(f64, &[f64], &mut [f64]),
{
    let n = y.len();
    ws.resize(n);
    ws.dy.fill(0.0);

    f(t, y, &mut ws.dy);

    for i in 0..n {
        y[i] += dt * ws.dy[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_steps_follow_the_difference_equation() {
        let decay = |_t: f64, y: &[f64], dy: &mut [f64]| {
            dy[0] = -0.5 * y[0];
            dy[1] = 0.5 * y[0];
        };
        let mut y = vec![10.0, 0.0];
        let mut ws = StepWorkspace::new(1);
        for day in 0..5 {
            euler_step_ws(&mut y, day as f64, 1.0, &mut ws, decay);
        }
        assert_eq!(ws.dy.len(), 2);
        assert!((y[0] - 10.0 * 0.5f64.powi(5)).abs() < 1e-12);
        assert!((y[0] + y[1] - 10.0).abs() < 1e-12);
    }
}
