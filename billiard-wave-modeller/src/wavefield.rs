use ndarray::Array2;

/// Two coupled real arrays of the same shape.
///
/// For the wave variant `phi` is the displacement now and `psi` the
/// displacement one micro-step earlier. For the Schrödinger variant `phi`
/// and `psi` are the real and imaginary parts at the same time level.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub phi: Array2<f64>,
    pub psi: Array2<f64>,
}

impl FieldState {
    pub fn new(nx: usize, ny: usize) -> Self {
        FieldState {
            phi: Array2::zeros((nx, ny)),
            psi: Array2::zeros((nx, ny)),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.phi.dim()
    }

    pub fn at(&self, i: usize, j: usize) -> (f64, f64) {
        (self.phi[[i, j]], self.psi[[i, j]])
    }

    /// `phi² + psi²` per cell; the probability density of a complex field.
    pub fn modulus_squared(&self) -> Array2<f64> {
        let mut density = Array2::<f64>::zeros(self.shape());
        ndarray::Zip::from(&mut density)
            .and(&self.phi)
            .and(&self.psi)
            .for_each(|d, &p, &q| *d = p * p + q * q);
        density
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_at() {
        let mut a = FieldState::new(3, 4);
        assert_eq!(a.shape(), (3, 4));
        a.phi[[1, 2]] = 2.0;
        a.psi[[0, 3]] = -1.0;
        assert_eq!(a.at(1, 2), (2.0, 0.0));
        assert_eq!(a.at(0, 3), (0.0, -1.0));
    }

    #[test]
    fn test_modulus_squared() {
        let mut a = FieldState::new(2, 2);
        a.phi[[1, 1]] = 3.0;
        a.psi[[1, 1]] = 4.0;
        let density = a.modulus_squared();
        assert_eq!(density[[1, 1]], 25.0);
        assert_eq!(density[[0, 0]], 0.0);
    }
}
