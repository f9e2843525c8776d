//! MNIST Dataset - Handwritten Digit Recognition
//!
//! Reads the four IDX files of the MNIST distribution, either raw or
//! gzipped:
//!
//! - `train-images-idx3-ubyte` / `train-labels-idx1-ubyte`
//! - `t10k-images-idx3-ubyte` / `t10k-labels-idx1-ubyte`
//!
//! Images come back as `[n, 28, 28]` bytes and labels one-hot encoded as
//! `[n, 10]` floats.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use tracing::debug;

use ceras_core::error::{Error, Result};
use ceras_tensor::Tensor;

/// Magic number of an IDX image file.
pub const IMAGE_MAGIC: u32 = 2051;
/// Magic number of an IDX label file.
pub const LABEL_MAGIC: u32 = 2049;
/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;

// =============================================================================
// MNIST Data
// =============================================================================

/// The training and test splits of MNIST.
#[derive(Debug, Clone)]
pub struct MnistData {
    /// `[60000, 28, 28]` training images.
    pub train_images: Tensor<u8>,
    /// `[60000, 10]` one-hot training labels.
    pub train_labels: Tensor<f32>,
    /// `[10000, 28, 28]` test images.
    pub test_images: Tensor<u8>,
    /// `[10000, 10]` one-hot test labels.
    pub test_labels: Tensor<f32>,
}

/// Loads MNIST from `dir`.
pub fn load_data(dir: impl AsRef<Path>) -> Result<MnistData> {
    let dir = dir.as_ref();
    let data = MnistData {
        train_images: load_images(dir, "train-images-idx3-ubyte")?,
        train_labels: load_labels(dir, "train-labels-idx1-ubyte")?,
        test_images: load_images(dir, "t10k-images-idx3-ubyte")?,
        test_labels: load_labels(dir, "t10k-labels-idx1-ubyte")?,
    };
    for (images, labels) in [
        (&data.train_images, &data.train_labels),
        (&data.test_images, &data.test_labels),
    ] {
        if images.shape()[0] != labels.shape()[0] {
            return Err(Error::serialization(format!(
                "image count ({}) does not match label count ({})",
                images.shape()[0],
                labels.shape()[0]
            )));
        }
    }
    debug!(
        train = data.train_images.shape()[0],
        test = data.test_images.shape()[0],
        dir = %dir.display(),
        "loaded MNIST"
    );
    Ok(data)
}

/// Scales bytes to `[0, 1]` floats and flattens every image to a row.
pub fn flatten_images(images: &Tensor<u8>) -> Result<Tensor<f32>> {
    let samples = *images.shape().first().ok_or(Error::EmptyTensor)?;
    let row: usize = images.shape()[1..].iter().product();
    images
        .as_type::<f32>()?
        .map(|x| x / 255.0)
        .reshape_to(&[samples, row])
}

// =============================================================================
// IDX Files
// =============================================================================

/// Opens `name` in `dir`, preferring a gzipped copy.
fn open(dir: &Path, name: &str) -> Result<Box<dyn Read>> {
    let gz_path = dir.join(format!("{name}.gz"));
    if gz_path.exists() {
        return Ok(Box::new(GzDecoder::new(BufReader::new(File::open(gz_path)?))));
    }
    let path = dir.join(name);
    if path.exists() {
        return Ok(Box::new(BufReader::new(File::open(path)?)));
    }
    Err(Error::IoError {
        message: format!("could not find {name} or {name}.gz in {}", dir.display()),
    })
}

fn check_magic(reader: &mut impl Read, expected: u32, name: &str) -> Result<()> {
    let magic = reader.read_u32::<BigEndian>()?;
    if magic != expected {
        return Err(Error::serialization(format!(
            "invalid magic number {magic} in {name}, expected {expected}"
        )));
    }
    Ok(())
}

fn load_images(dir: &Path, name: &str) -> Result<Tensor<u8>> {
    let mut reader = open(dir, name)?;
    read_images(&mut reader, name)
}

fn load_labels(dir: &Path, name: &str) -> Result<Tensor<f32>> {
    let mut reader = open(dir, name)?;
    read_labels(&mut reader, name)
}

/// Parses an IDX3 image stream: magic, count, rows and columns as
/// big-endian `u32`, then one byte per pixel.
pub fn read_images(reader: &mut impl Read, name: &str) -> Result<Tensor<u8>> {
    check_magic(reader, IMAGE_MAGIC, name)?;
    let samples = reader.read_u32::<BigEndian>()? as usize;
    let rows = reader.read_u32::<BigEndian>()? as usize;
    let cols = reader.read_u32::<BigEndian>()? as usize;

    let size = samples
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(cols))
        .ok_or_else(|| {
            Error::serialization(format!(
                "{name} declares {samples} images of {rows}x{cols}, which overflows"
            ))
        })?;
    let pixels = read_body(reader, size, name)?;
    Tensor::from_vec(pixels, &[samples, rows, cols])
}

/// Reads exactly `size` bytes, growing the buffer only as data arrives so a
/// corrupt header cannot force a huge allocation.
fn read_body(reader: &mut impl Read, size: usize, name: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(size as u64).read_to_end(&mut body)?;
    if body.len() != size {
        return Err(Error::serialization(format!(
            "{name} is truncated: expected {size} bytes, found {}",
            body.len()
        )));
    }
    Ok(body)
}

/// Parses an IDX1 label stream (magic and count as big-endian `u32`, then
/// one byte per label) into one-hot rows.
pub fn read_labels(reader: &mut impl Read, name: &str) -> Result<Tensor<f32>> {
    check_magic(reader, LABEL_MAGIC, name)?;
    let samples = reader.read_u32::<BigEndian>()? as usize;

    let labels = read_body(reader, samples, name)?;

    let mut one_hot = vec![0.0f32; samples * NUM_CLASSES];
    for (row, &label) in labels.iter().enumerate() {
        let label = usize::from(label);
        if label >= NUM_CLASSES {
            return Err(Error::serialization(format!(
                "label {label} at index {row} of {name} is not a digit"
            )));
        }
        one_hot[row * NUM_CLASSES + label] = 1.0;
    }
    Tensor::from_vec(one_hot, &[samples, NUM_CLASSES])
}

// =============================================================================
// Tests
// =============================================================================
