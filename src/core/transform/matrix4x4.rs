use std::ops;

/// Row-major 4x4 camera matrix as sent by the renderer.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Matrix4x4 {
    pub m: [f32; 16],
}

impl Default for Matrix4x4 {
    fn default() -> Self {
        Matrix4x4::identity()
    }
}

impl Matrix4x4 {
    pub fn identity() -> Self {
        Matrix4x4 {
            m: [
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn translate(x: f32, y: f32, z: f32) -> Self {
        Matrix4x4 {
            m: [
                1.0, 0.0, 0.0, x, 0.0, 1.0, 0.0, y, 0.0, 0.0, 1.0, z, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn scale(x: f32, y: f32, z: f32) -> Self {
        Matrix4x4 {
            m: [
                x, 0.0, 0.0, 0.0, 0.0, y, 0.0, 0.0, 0.0, 0.0, z, 0.0, 0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.m
    }

    /// Translation column, i.e. the camera position for a camera-to-world matrix.
    pub fn translation(&self) -> [f32; 3] {
        return [self.m[3], self.m[7], self.m[11]];
    }

    pub fn inverse(&self) -> Option<Self> {
        let mut indxc = [0; 4];
        let mut indxr = [0; 4];
        let mut ipiv = [0; 4];
        let mut minv: [f32; 16] = self.m;
        for i in 0..4 {
            let mut irow = 0;
            let mut icol = 0;
            let mut big: f32 = 0.0;
            // Choose pivot
            for j in 0..4 {
                if ipiv[j] != 1 {
                    for k in 0..4 {
                        if ipiv[k] == 0 {
                            if f32::abs(minv[4 * j + k]) >= big {
                                big = f32::abs(minv[4 * j + k]);
                                irow = j;
                                icol = k;
                            }
                        } else if ipiv[k] > 1 {
                            return None;
                        }
                    }
                }
            }
            ipiv[icol] += 1;
            if irow != icol {
                for k in 0..4 {
                    minv.swap(4 * irow + k, 4 * icol + k);
                }
            }
            indxr[i] = irow;
            indxc[i] = icol;
            if minv[4 * icol + icol] == 0.0 {
                return None;
            }

            let pivinv = 1.0 / minv[4 * icol + icol];
            minv[4 * icol + icol] = 1.0;
            for j in 0..4 {
                minv[4 * icol + j] *= pivinv;
            }

            for j in 0..4 {
                if j != icol {
                    let save = minv[4 * j + icol];
                    minv[4 * j + icol] = 0.0;
                    for k in 0..4 {
                        minv[4 * j + k] -= minv[4 * icol + k] * save;
                    }
                }
            }
        }

        // Swap columns to reflect permutation
        for j in [3, 2, 1, 0] {
            if indxr[j] != indxc[j] {
                for k in 0..4 {
                    minv.swap(4 * k + indxr[j], 4 * k + indxc[j]);
                }
            }
        }

        return Some(Matrix4x4 { m: minv });
    }
}

fn mul4x4(a: &[f32], b: &[f32]) -> f32 {
    return a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3];
}

impl ops::Mul<Matrix4x4> for Matrix4x4 {
    type Output = Matrix4x4;
    fn mul(self, rhs: Matrix4x4) -> Matrix4x4 {
        let mut m = [0.0; 16];
        for i in 0..4 {
            for j in 0..4 {
                let col = [rhs.m[j], rhs.m[4 + j], rhs.m[8 + j], rhs.m[12 + j]];
                m[4 * i + j] = mul4x4(&self.m[4 * i..4 * i + 4], &col);
            }
        }
        Matrix4x4 { m }
    }
}

impl From<[f32; 16]> for Matrix4x4 {
    fn from(v: [f32; 16]) -> Self {
        Matrix4x4 { m: v }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_001() {
        let m1 = Matrix4x4::scale(4.0, 4.0, 4.0);
        let m2 = m1.inverse().unwrap();
        assert_eq!(m2, Matrix4x4::scale(0.25, 0.25, 0.25));
    }

    #[test]
    fn test_002() {
        let m1 = Matrix4x4::translate(4.0, 4.0, 4.0);
        let m2 = m1.inverse().unwrap();
        assert_eq!(m2, Matrix4x4::translate(-4.0, -4.0, -4.0));
        assert_eq!(m1 * m2, Matrix4x4::identity());
    }

    #[test]
    fn test_003() {
        let m = Matrix4x4::translate(1.0, 2.0, 3.0);
        assert_eq!(m.translation(), [1.0, 2.0, 3.0]);
        assert_eq!(m.as_slice()[3], 1.0);
        assert_eq!(&m.as_slice()[12..], &[0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_004() {
        let singular = Matrix4x4::from([0.0; 16]);
        assert!(singular.inverse().is_none());
    }
}
