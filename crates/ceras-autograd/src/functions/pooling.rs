//! Pooling - Spatial Down- and Up-Sampling of NHWC Batches
//!
//! @version 0.1.0
//! @author Ceras Development Team

use parking_lot::RwLock;

use ceras_core::error::{Error, Result};
use ceras_tensor::{Tensor, View4d};

use super::nhwc;
use crate::expression::Expression;
use crate::operator::UnaryFunction;

fn check_stride(stride: usize, op: &str) -> Result<()> {
    if stride < 2 {
        return Err(Error::invalid_operation(format!(
            "{op} expects a stride greater than 1, got {stride}"
        )));
    }
    Ok(())
}

// =============================================================================
// Max Pooling
// =============================================================================

/// Maximum over non-overlapping `stride x stride` windows.
///
/// Remembers which input element won each window; the backward pass routes
/// the gradient to those elements only.
#[derive(Debug)]
pub struct MaxPooling2d {
    stride: usize,
    winners: RwLock<Vec<usize>>,
}

impl UnaryFunction for MaxPooling2d {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "max_pooling_2d")?;
        let s = self.stride;
        let (oh, ow) = (h / s, w / s);

        let src = input.as_slice();
        let mut out = Vec::with_capacity(n * oh * ow * c);
        let mut winners = Vec::with_capacity(n * oh * ow * c);
        for b in 0..n {
            for r in 0..oh {
                for col in 0..ow {
                    for ch in 0..c {
                        let at = |rr: usize, cc: usize| ((b * h + rr) * w + cc) * c + ch;
                        let mut best = at(r * s, col * s);
                        for rr in r * s..(r + 1) * s {
                            for cc in col * s..(col + 1) * s {
                                if src[at(rr, cc)] > src[best] {
                                    best = at(rr, cc);
                                }
                            }
                        }
                        out.push(src[best]);
                        winners.push(best);
                    }
                }
            }
        }
        drop(src);

        *self.winners.write() = winners;
        Tensor::from_vec(out, &[n, oh, ow, c])
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let winners = self.winners.read();
        if winners.len() != grad.size() {
            return Err(Error::gradient("max_pooling_2d backward without a matching forward"));
        }
        let mut ans = vec![0.0f32; input.size()];
        for (&i, &g) in winners.iter().zip(grad.as_slice().iter()) {
            ans[i] += g;
        }
        Tensor::from_vec(ans, input.shape())
    }

    fn name(&self) -> &'static str {
        "MaxPooling2d"
    }
}

/// Max pooling with a square window of side `stride`.
pub fn max_pooling_2d(ex: &Expression, stride: usize) -> Result<Expression> {
    check_stride(stride, "max_pooling_2d")?;
    Ok(Expression::unary(
        MaxPooling2d {
            stride,
            winners: RwLock::new(Vec::new()),
        },
        ex,
    ))
}

// =============================================================================
// Average Pooling
// =============================================================================

/// Mean over non-overlapping `stride x stride` windows.
#[derive(Debug, Clone, Copy)]
pub struct AveragePooling2d {
    stride: usize,
}

impl UnaryFunction for AveragePooling2d {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "average_pooling_2d")?;
        let s = self.stride;
        let (oh, ow) = (h / s, w / s);
        let factor = 1.0 / (s * s) as f32;

        let src = View4d::new(input.as_slice(), n, h, w, c)?;
        let mut out = View4d::new(vec![0.0f32; n * oh * ow * c], n, oh, ow, c)?;
        for b in 0..n {
            for r in 0..oh * s {
                for col in 0..ow * s {
                    for ch in 0..c {
                        out[(b, r / s, col / s, ch)] += src[(b, r, col, ch)] * factor;
                    }
                }
            }
        }
        drop(src);
        Tensor::from_vec(out.into_inner(), &[n, oh, ow, c])
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "average_pooling_2d")?;
        let s = self.stride;
        let (oh, ow) = (h / s, w / s);
        let factor = 1.0 / (s * s) as f32;

        let g = View4d::new(grad.as_slice(), n, oh, ow, c)?;
        let mut ans = View4d::new(vec![0.0f32; input.size()], n, h, w, c)?;
        for b in 0..n {
            for r in 0..oh * s {
                for col in 0..ow * s {
                    for ch in 0..c {
                        ans[(b, r, col, ch)] = g[(b, r / s, col / s, ch)] * factor;
                    }
                }
            }
        }
        drop(g);
        Tensor::from_vec(ans.into_inner(), input.shape())
    }

    fn name(&self) -> &'static str {
        "AveragePooling2d"
    }
}

/// Average pooling with a square window of side `stride`.
pub fn average_pooling_2d(ex: &Expression, stride: usize) -> Result<Expression> {
    check_stride(stride, "average_pooling_2d")?;
    Ok(Expression::unary(AveragePooling2d { stride }, ex))
}

// =============================================================================
// Up Sampling
// =============================================================================

/// Repeats every pixel into a `stride x stride` block.
#[derive(Debug, Clone, Copy)]
pub struct UpSampling2d {
    stride: usize,
}

impl UnaryFunction for UpSampling2d {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "up_sampling_2d")?;
        let s = self.stride;

        let src = View4d::new(input.as_slice(), n, h, w, c)?;
        let mut out = View4d::new(vec![0.0f32; input.size() * s * s], n, h * s, w * s, c)?;
        for b in 0..n {
            for r in 0..h * s {
                for col in 0..w * s {
                    for ch in 0..c {
                        out[(b, r, col, ch)] = src[(b, r / s, col / s, ch)];
                    }
                }
            }
        }
        drop(src);
        Tensor::from_vec(out.into_inner(), &[n, h * s, w * s, c])
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "up_sampling_2d")?;
        let s = self.stride;

        let g = View4d::new(grad.as_slice(), n, h * s, w * s, c)?;
        let mut ans = View4d::new(vec![0.0f32; input.size()], n, h, w, c)?;
        for b in 0..n {
            for r in 0..h * s {
                for col in 0..w * s {
                    for ch in 0..c {
                        ans[(b, r / s, col / s, ch)] += g[(b, r, col, ch)];
                    }
                }
            }
        }
        drop(g);
        Tensor::from_vec(ans.into_inner(), input.shape())
    }

    fn name(&self) -> &'static str {
        "UpSampling2d"
    }
}

/// Nearest-neighbour up-sampling by `stride` in both spatial directions.
pub fn up_sampling_2d(ex: &Expression, stride: usize) -> Result<Expression> {
    check_stride(stride, "up_sampling_2d")?;
    Ok(Expression::unary(UpSampling2d { stride }, ex))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    fn image() -> Variable {
        // one 4x4 single-channel image holding 0..16
        Variable::new(Tensor::from_vec((0..16).map(|x| x as f32).collect(), &[1, 4, 4, 1]).unwrap())
    }

    #[test]
    fn test_max_pooling() {
        let v = image();
        let y = max_pooling_2d(&Expression::from(&v), 2).unwrap();
        assert_eq!(y.forward().unwrap().to_vec(), vec![5.0, 7.0, 13.0, 15.0]);

        y.backward(&Tensor::ones(&[1, 2, 2, 1])).unwrap();
        let g = v.gradient().to_vec();
        assert_eq!(g.iter().sum::<f32>(), 4.0);
        assert_eq!(g[5], 1.0);
        assert_eq!(g[15], 1.0);
        assert_eq!(g[0], 0.0);
    }

    #[test]
    fn test_average_pooling() {
        let v = image();
        let y = average_pooling_2d(&Expression::from(&v), 2).unwrap();
        assert_eq!(y.forward().unwrap().to_vec(), vec![2.5, 4.5, 10.5, 12.5]);

        y.backward(&Tensor::ones(&[1, 2, 2, 1])).unwrap();
        assert_eq!(v.gradient().to_vec(), vec![0.25; 16]);
    }

    #[test]
    fn test_up_sampling() {
        let v = Variable::new(Tensor::from_vec(vec![1.0, 2.0], &[1, 1, 2, 1]).unwrap());
        let y = up_sampling_2d(&Expression::from(&v), 2).unwrap();
        let out = y.forward().unwrap();
        assert_eq!(out.shape(), &[1, 2, 4, 1]);
        assert_eq!(out.to_vec(), vec![1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);

        y.backward(&Tensor::ones(&[1, 2, 4, 1])).unwrap();
        assert_eq!(v.gradient().to_vec(), vec![4.0, 4.0]);
    }

    #[test]
    fn test_stride_must_exceed_one() {
        let v = image();
        assert!(max_pooling_2d(&Expression::from(&v), 1).is_err());
        assert!(average_pooling_2d(&Expression::from(&v), 0).is_err());
        assert!(up_sampling_2d(&Expression::from(&v), 1).is_err());
    }
}
