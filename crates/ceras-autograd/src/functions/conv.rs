//! Convolution - Image-to-Column Lowering, Conv2D and Spatial Padding
//!
//! Convolution is lowered to a matrix product: `img2col` unrolls every
//! receptive field of an NHWC batch into one column, the kernel is
//! flattened into rows, and a single `multiply` does the rest. Gradients
//! flow back through the same composite graph.
//!
//! The unrolled column order is `(kernel_row, kernel_col, channel)`, the
//! same order in which a `[NC, kr, kc, CH]` kernel flattens, so row `i` of
//! the flattened kernel multiplies row `i` of the column matrix.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use parking_lot::RwLock;

use ceras_core::error::{Error, Result};
use ceras_tensor::{Tensor, View4d};

use super::{multiply, nhwc, reshape, transpose};
use crate::expression::Expression;
use crate::operator::UnaryFunction;
use crate::variable::Variable;

const PADDED: usize = usize::MAX;

// =============================================================================
// Img2Col
// =============================================================================

/// Geometry of an image-to-column lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Img2ColConfig {
    /// Kernel extent as `(rows, cols)`.
    pub kernel: (usize, usize),
    /// Zero padding on each side as `(rows, cols)`.
    pub padding: (usize, usize),
    /// Step between receptive fields as `(rows, cols)`.
    pub stride: (usize, usize),
    /// Spacing between kernel taps as `(rows, cols)`.
    pub dilation: (usize, usize),
}

impl Img2ColConfig {
    /// A `kr x kc` kernel with no padding, unit stride and no dilation.
    #[must_use]
    pub fn new(kernel_rows: usize, kernel_cols: usize) -> Self {
        Self {
            kernel: (kernel_rows, kernel_cols),
            padding: (0, 0),
            stride: (1, 1),
            dilation: (1, 1),
        }
    }

    fn output_extent(input: usize, kernel: usize, padding: usize, stride: usize, dilation: usize) -> Option<usize> {
        let span = dilation * (kernel - 1) + 1;
        (input + 2 * padding).checked_sub(span).map(|room| room / stride + 1)
    }

    /// Output `(rows, cols)` for an input of `rows x cols` pixels.
    pub fn output_size(&self, rows: usize, cols: usize) -> Result<(usize, usize)> {
        let out_r = Self::output_extent(rows, self.kernel.0, self.padding.0, self.stride.0, self.dilation.0);
        let out_c = Self::output_extent(cols, self.kernel.1, self.padding.1, self.stride.1, self.dilation.1);
        match (out_r, out_c) {
            (Some(r), Some(c)) => Ok((r, c)),
            _ => Err(Error::invalid_operation(format!(
                "kernel {:?} with dilation {:?} does not fit a padded {rows}x{cols} image",
                self.kernel, self.dilation
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        let (kr, kc) = self.kernel;
        if kr == 0 || kc == 0 || self.stride.0 == 0 || self.stride.1 == 0 || self.dilation.0 == 0 || self.dilation.1 == 0 {
            return Err(Error::invalid_operation(format!(
                "kernel, stride and dilation must be positive, got {self:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct IndexRecord {
    shape: Vec<usize>,
    rows: usize,
    cols: usize,
    index: Vec<usize>,
}

/// Unrolls `[BS, R, C, CH]` into `[kr*kc*CH, BS*out_r*out_c]`.
///
/// The gather index is built once per input shape and reused.
#[derive(Debug)]
pub struct Img2Col {
    config: Img2ColConfig,
    record: RwLock<Option<IndexRecord>>,
}

impl Img2Col {
    fn build_index(&self, shape: &[usize]) -> Result<IndexRecord> {
        let (bs, rows, cols, channels) = nhwc(shape, "img2col")?;
        let (out_r, out_c) = self.config.output_size(rows, cols)?;
        let (kr, kc) = self.config.kernel;
        let (pr, pc) = self.config.padding;
        let (sr, sc) = self.config.stride;
        let (dr, dc) = self.config.dilation;

        let matrix_rows = kr * kc * channels;
        let matrix_cols = bs * out_r * out_c;
        let mut index = vec![PADDED; matrix_rows * matrix_cols];

        for h_off in 0..kr {
            for w_off in 0..kc {
                for ch in 0..channels {
                    let row = (h_off * kc + w_off) * channels + ch;
                    for b in 0..bs {
                        for h in 0..out_r {
                            // coordinates in the padded image
                            let r = h * sr + h_off * dr;
                            for w in 0..out_c {
                                let c = w * sc + w_off * dc;
                                let col = (b * out_r + h) * out_c + w;
                                if r >= pr && r - pr < rows && c >= pc && c - pc < cols {
                                    index[row * matrix_cols + col] =
                                        ((b * rows + r - pr) * cols + c - pc) * channels + ch;
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(IndexRecord {
            shape: shape.to_vec(),
            rows: matrix_rows,
            cols: matrix_cols,
            index,
        })
    }
}

impl UnaryFunction for Img2Col {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let mut record = self.record.write();
        if record.as_ref().map_or(true, |r| r.shape != input.shape()) {
            *record = Some(self.build_index(input.shape())?);
        }
        let Some(record) = record.as_ref() else {
            return Err(Error::internal("img2col index missing after build"));
        };

        let src = input.as_slice();
        let data: Vec<f32> = record
            .index
            .iter()
            .map(|&i| if i == PADDED { 0.0 } else { src[i] })
            .collect();
        drop(src);
        Tensor::from_vec(data, &[record.rows, record.cols])
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let record = self.record.read();
        let record = record
            .as_ref()
            .filter(|r| r.shape == input.shape())
            .ok_or_else(|| Error::gradient("img2col backward without a matching forward"))?;

        let mut ans = vec![0.0f32; input.size()];
        let g = grad.as_slice();
        for (&i, &gv) in record.index.iter().zip(g.iter()) {
            if i != PADDED {
                ans[i] += gv;
            }
        }
        drop(g);
        Tensor::from_vec(ans, input.shape())
    }

    fn name(&self) -> &'static str {
        "Img2Col"
    }
}

/// Unrolls the receptive fields of an NHWC expression into columns.
pub fn img2col(ex: &Expression, config: Img2ColConfig) -> Result<Expression> {
    config.validate()?;
    Ok(Expression::unary(
        Img2Col {
            config,
            record: RwLock::new(None),
        },
        ex,
    ))
}

// =============================================================================
// Conv2D
// =============================================================================

/// Padding mode of a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// No padding; the output shrinks.
    #[default]
    Valid,
    /// Pad so that a unit-stride output keeps the input extent.
    Same,
}

/// Geometry of a 2-D convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dConfig {
    /// Input image extent as `(rows, cols)`.
    pub input: (usize, usize),
    /// Stride as `(rows, cols)`.
    pub stride: (usize, usize),
    /// Dilation as `(rows, cols)`.
    pub dilation: (usize, usize),
    /// Padding mode.
    pub padding: Padding,
}

impl Conv2dConfig {
    /// Unit stride, no dilation, valid padding over a `rows x cols` input.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            input: (rows, cols),
            stride: (1, 1),
            dilation: (1, 1),
            padding: Padding::Valid,
        }
    }

    /// Sets the stride.
    #[must_use]
    pub fn stride(mut self, rows: usize, cols: usize) -> Self {
        self.stride = (rows, cols);
        self
    }

    /// Sets the dilation.
    #[must_use]
    pub fn dilation(mut self, rows: usize, cols: usize) -> Self {
        self.dilation = (rows, cols);
        self
    }

    /// Sets the padding mode.
    #[must_use]
    pub fn padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

fn same_padding(kernel: usize, dilation: usize, stride: usize) -> Result<usize> {
    let total = (kernel + (kernel - 1) * (dilation - 1))
        .checked_sub(stride)
        .ok_or_else(|| Error::invalid_operation(format!("stride {stride} exceeds kernel span {kernel}")))?;
    if total % 2 != 0 {
        return Err(Error::invalid_operation(format!(
            "same padding needs an even total padding, got {total}"
        )));
    }
    Ok(total / 2)
}

/// 2-D convolution of an NHWC batch with a `[NC, kr, kc, CH]` kernel.
///
/// The result has shape `[BS, out_r, out_c, NC]`.
pub fn conv2d(ex: &Expression, kernel: &Variable, config: Conv2dConfig) -> Result<Expression> {
    let shape = kernel.shape();
    let &[new_channels, kr, kc, channels] = shape.as_slice() else {
        return Err(Error::invalid_operation(format!(
            "conv2d kernel must be [out_channels, rows, cols, in_channels], got {shape:?}"
        )));
    };

    let mut lowering = Img2ColConfig::new(kr, kc);
    lowering.stride = config.stride;
    lowering.dilation = config.dilation;
    lowering.validate()?;
    if config.padding == Padding::Same {
        lowering.padding = (
            same_padding(kr, config.dilation.0, config.stride.0)?,
            same_padding(kc, config.dilation.1, config.stride.1)?,
        );
    }
    let (out_r, out_c) = lowering.output_size(config.input.0, config.input.1)?;

    let columns = img2col(ex, lowering)?; // [kr*kc*CH, BS*out_r*out_c]
    let flat_kernel = reshape(&Expression::from(kernel), &[new_channels, kr * kc * channels], false)?;
    let product = multiply(&flat_kernel, &columns); // [NC, BS*out_r*out_c]
    reshape(&transpose(&product), &[out_r, out_c, new_channels], true)
}

// =============================================================================
// Zero Padding and Cropping
// =============================================================================

/// Extents added to or removed from each side of an NHWC image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margins {
    /// Rows above.
    pub top: usize,
    /// Rows below.
    pub bottom: usize,
    /// Columns on the left.
    pub left: usize,
    /// Columns on the right.
    pub right: usize,
}

impl Margins {
    /// Builds margins from `(top, bottom, left, right)`.
    #[must_use]
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        Self { top, bottom, left, right }
    }
}

/// Copies the `[rows, cols]` window of `src` at `(r0, c0)` into `dst`
/// at `(d0, e0)`, for every batch item and channel.
fn copy_window(
    src: &Tensor<f32>,
    dst_shape: [usize; 4],
    from: (usize, usize),
    to: (usize, usize),
    extent: (usize, usize),
) -> Result<Tensor<f32>> {
    let (n, h, w, c) = nhwc(src.shape(), "padding")?;
    let [dn, dh, dw, dc] = dst_shape;
    let input = View4d::new(src.to_vec(), n, h, w, c)?;
    let mut out = View4d::new(vec![0.0f32; dn * dh * dw * dc], dn, dh, dw, dc)?;
    for b in 0..n {
        for r in 0..extent.0 {
            for col in 0..extent.1 {
                for ch in 0..c {
                    out[(b, to.0 + r, to.1 + col, ch)] = input[(b, from.0 + r, from.1 + col, ch)];
                }
            }
        }
    }
    Tensor::from_vec(out.into_inner(), &dst_shape)
}

/// Surrounds every image with zeros.
#[derive(Debug, Clone, Copy)]
pub struct ZeroPadding2d {
    margins: Margins,
}

impl UnaryFunction for ZeroPadding2d {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "zero_padding_2d")?;
        let m = self.margins;
        copy_window(
            input,
            [n, h + m.top + m.bottom, w + m.left + m.right, c],
            (0, 0),
            (m.top, m.left),
            (h, w),
        )
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "zero_padding_2d")?;
        copy_window(grad, [n, h, w, c], (self.margins.top, self.margins.left), (0, 0), (h, w))
    }

    fn name(&self) -> &'static str {
        "ZeroPadding2d"
    }
}

/// Pads an NHWC expression with zeros.
#[must_use]
pub fn zero_padding_2d(ex: &Expression, margins: Margins) -> Expression {
    Expression::unary(ZeroPadding2d { margins }, ex)
}

/// Removes a border from every image.
#[derive(Debug, Clone, Copy)]
pub struct Cropping2d {
    margins: Margins,
}

impl Cropping2d {
    fn cropped(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        let m = self.margins;
        match (h.checked_sub(m.top + m.bottom), w.checked_sub(m.left + m.right)) {
            (Some(r), Some(c)) if r > 0 && c > 0 => Ok((r, c)),
            _ => Err(Error::invalid_operation(format!(
                "cannot crop {m:?} from a {h}x{w} image"
            ))),
        }
    }
}

impl UnaryFunction for Cropping2d {
    fn forward(&self, input: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "cropping_2d")?;
        let (rows, cols) = self.cropped(h, w)?;
        copy_window(input, [n, rows, cols, c], (self.margins.top, self.margins.left), (0, 0), (rows, cols))
    }

    fn backward(&self, input: &Tensor<f32>, _output: &Tensor<f32>, grad: &Tensor<f32>) -> Result<Tensor<f32>> {
        let (n, h, w, c) = nhwc(input.shape(), "cropping_2d")?;
        let (rows, cols) = self.cropped(h, w)?;
        copy_window(grad, [n, h, w, c], (0, 0), (self.margins.top, self.margins.left), (rows, cols))
    }

    fn name(&self) -> &'static str {
        "Cropping2d"
    }
}

/// Crops a border from an NHWC expression.
#[must_use]
pub fn cropping_2d(ex: &Expression, margins: Margins) -> Expression {
    Expression::unary(Cropping2d { margins }, ex)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward::{gradcheck, numerical_gradient};
    use crate::functions::{elementwise_product, sum_reduce};

    fn image(shape: &[usize]) -> Tensor<f32> {
        let n: usize = shape.iter().product();
        Tensor::from_vec((0..n).map(|x| x as f32).collect(), shape).unwrap()
    }

    #[test]
    fn test_img2col_shape_and_values() {
        // one 3x3 single-channel image, 2x2 kernel
        let x = Expression::constant(image(&[1, 3, 3, 1]));
        let cols = img2col(&x, Img2ColConfig::new(2, 2)).unwrap();
        let out = cols.forward().unwrap();
        assert_eq!(out.shape(), &[4, 4]);
        // first row: top-left tap of every window
        assert_eq!(&out.to_vec()[..4], &[0.0, 1.0, 3.0, 4.0]);
        // last row: bottom-right tap
        assert_eq!(&out.to_vec()[12..], &[4.0, 5.0, 7.0, 8.0]);
    }

    #[test]
    fn test_img2col_padding_is_zero() {
        let x = Expression::constant(Tensor::ones(&[1, 2, 2, 1]));
        let mut config = Img2ColConfig::new(3, 3);
        config.padding = (1, 1);
        let out = img2col(&x, config).unwrap().forward().unwrap();
        assert_eq!(out.shape(), &[9, 4]);
        // every window sees the 4 real pixels exactly once
        assert_eq!(out.sum_all(), 16.0);
    }

    #[test]
    fn test_conv2d_valid() {
        let x = Expression::constant(image(&[1, 3, 3, 1]));
        let k = Variable::new(Tensor::ones(&[2, 2, 2, 1]));
        let y = conv2d(&x, &k, Conv2dConfig::new(3, 3)).unwrap();
        let out = y.forward().unwrap();
        assert_eq!(out.shape(), &[1, 2, 2, 2]);
        // window sums 0+1+3+4, 1+2+4+5, 3+4+6+7, 4+5+7+8 for both filters
        assert_eq!(out.to_vec(), vec![8.0, 8.0, 12.0, 12.0, 20.0, 20.0, 24.0, 24.0]);
    }

    #[test]
    fn test_conv2d_same_keeps_extent() {
        let x = Expression::constant(Tensor::ones(&[2, 4, 4, 3]));
        let k = Variable::new(Tensor::ones(&[5, 3, 3, 3]));
        let y = conv2d(&x, &k, Conv2dConfig::new(4, 4).padding(Padding::Same)).unwrap();
        assert_eq!(y.forward().unwrap().shape(), &[2, 4, 4, 5]);
    }

    #[test]
    fn test_conv2d_kernel_gradient_matches_numerical() {
        let x = Expression::constant(image(&[2, 4, 4, 2]).mul_scalar(0.1));
        let k = Variable::new(image(&[3, 2, 2, 2]).mul_scalar(0.05));
        let weights = Expression::constant(image(&[2, 3, 3, 3]).mul_scalar(0.01));
        let y = conv2d(&x, &k, Conv2dConfig::new(4, 4)).unwrap();
        let loss = sum_reduce(&elementwise_product(&y, &weights));

        let numerical = numerical_gradient(&loss, &k, 5e-2).unwrap();
        loss.forward().unwrap();
        loss.backward(&Tensor::ones(&[1])).unwrap();
        assert!(gradcheck(&k.gradient(), &numerical, 1e-2, 1e-2));
    }

    #[test]
    fn test_zero_padding_and_cropping() {
        let v = Variable::new(image(&[1, 2, 2, 1]));
        let padded = zero_padding_2d(&Expression::from(&v), Margins::new(1, 0, 0, 2));
        let out = padded.forward().unwrap();
        assert_eq!(out.shape(), &[1, 3, 4, 1]);
        assert_eq!(out.to_vec(), vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 3.0, 0.0, 0.0]);

        let back = cropping_2d(&padded, Margins::new(1, 0, 0, 2));
        assert_eq!(back.forward().unwrap().to_vec(), vec![0.0, 1.0, 2.0, 3.0]);

        back.backward(&Tensor::ones(&[1, 2, 2, 1])).unwrap();
        assert_eq!(v.gradient().to_vec(), vec![1.0; 4]);

        let too_much = cropping_2d(&Expression::from(&v), Margins::new(1, 1, 0, 0));
        assert!(too_much.forward().is_err());
    }
}
