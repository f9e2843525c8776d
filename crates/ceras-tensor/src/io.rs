//! Tensor I/O - Plain-Text and JSON Persistence
//!
//! The text format stores one tensor in two lines:
//!
//! ```text
//! 2 3 4
//! 0.1 0.2 ... 2.4
//! ```
//!
//! The first line is the number of dimensions followed by the dimensions;
//! the second line holds every element in row-major order. Several tensors
//! can follow each other in one stream, which is how sessions persist
//! their variables.
//!
//! `TensorData` is the serde-friendly snapshot used for JSON export.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ceras_core::dtype::{Float, Scalar};
use ceras_core::error::{Error, Result};

use crate::tensor::Tensor;

// =============================================================================
// Text Format
// =============================================================================

/// Writes `tensor` to `writer` in the two-line text format.
pub fn write_tensor<T: Scalar, W: Write>(writer: &mut W, tensor: &Tensor<T>) -> Result<()> {
    write!(writer, "{}", tensor.ndim())?;
    for dim in tensor.shape() {
        write!(writer, " {dim}")?;
    }
    writeln!(writer)?;

    for (i, x) in tensor.as_slice().iter().enumerate() {
        if i > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{x}")?;
    }
    writeln!(writer)?;
    Ok(())
}

fn next_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(Error::serialization("unexpected end of tensor stream"));
    }
    Ok(line)
}

fn parse_token<V: FromStr>(token: &str) -> Result<V> {
    token
        .parse()
        .map_err(|_| Error::serialization(format!("cannot parse '{token}'")))
}

/// Reads one tensor in the two-line text format from `reader`.
pub fn read_tensor<T, R>(reader: &mut R) -> Result<Tensor<T>>
where
    T: Scalar + FromStr,
    R: BufRead,
{
    let header = next_line(reader)?;
    let mut tokens = header.split_whitespace();
    let ndim: usize = parse_token(
        tokens
            .next()
            .ok_or_else(|| Error::serialization("missing tensor header"))?,
    )?;
    let shape = tokens.map(parse_token).collect::<Result<Vec<usize>>>()?;
    if shape.len() != ndim {
        return Err(Error::serialization(format!(
            "header declares {ndim} dimensions but lists {}",
            shape.len()
        )));
    }

    let body = next_line(reader)?;
    let data = body
        .split_whitespace()
        .map(parse_token)
        .collect::<Result<Vec<T>>>()?;

    Tensor::from_vec(data, &shape)
}

/// Saves `tensor` to the file at `path`.
pub fn save_tensor<T: Scalar>(path: impl AsRef<Path>, tensor: &Tensor<T>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_tensor(&mut writer, tensor)?;
    writer.flush()?;
    Ok(())
}

/// Loads a tensor from the file at `path`.
pub fn load_tensor<T>(path: impl AsRef<Path>) -> Result<Tensor<T>>
where
    T: Scalar + FromStr,
{
    let mut reader = BufReader::new(File::open(path)?);
    read_tensor(&mut reader)
}

// =============================================================================
// Serde Snapshot
// =============================================================================

/// Owned, serializable copy of a tensor's shape and values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    /// Tensor dimensions.
    pub shape: Vec<usize>,
    /// Row-major element values.
    pub values: Vec<f64>,
}

impl TensorData {
    /// Snapshots a floating point tensor.
    pub fn from_tensor<T: Float>(tensor: &Tensor<T>) -> Self {
        Self {
            shape: tensor.shape().to_vec(),
            values: tensor.as_slice().iter().map(|x| x.to_f64_lossless()).collect(),
        }
    }

    /// Rebuilds a tensor from the snapshot.
    pub fn to_tensor<T: Float>(&self) -> Result<Tensor<T>> {
        let data = self.values.iter().map(|&x| T::from_f64(x)).collect();
        Tensor::from_vec(data, &self.shape)
    }

    /// Serializes the snapshot to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::serialization(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_text_format_layout() {
        let t = Tensor::from_vec(vec![1.0_f32, 2.5, -3.0, 4.0], &[2, 2]).unwrap();
        let mut buffer = Vec::new();
        write_tensor(&mut buffer, &t).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "2 2 2\n1 2.5 -3 4\n");
    }

    #[test]
    fn test_stream_of_tensors() {
        let a = Tensor::from_vec(vec![0.125_f32, 0.5], &[2]).unwrap();
        let b = Tensor::from_vec(vec![7.0_f32; 6], &[1, 2, 3]).unwrap();
        let mut buffer = Vec::new();
        write_tensor(&mut buffer, &a).unwrap();
        write_tensor(&mut buffer, &b).unwrap();

        let mut reader = Cursor::new(buffer);
        let a2: Tensor<f32> = read_tensor(&mut reader).unwrap();
        let b2: Tensor<f32> = read_tensor(&mut reader).unwrap();
        assert_eq!(a2.to_vec(), a.to_vec());
        assert_eq!(b2.shape(), &[1, 2, 3]);
        assert!(read_tensor::<f32, _>(&mut reader).is_err());
    }

    #[test]
    fn test_malformed_input() {
        let mut reader = Cursor::new("2 2 2\n1 2 x 4\n");
        assert!(matches!(
            read_tensor::<f32, _>(&mut reader),
            Err(Error::SerializationError { .. })
        ));
        let mut reader = Cursor::new("3 2 2\n1 2 3 4\n");
        assert!(read_tensor::<f32, _>(&mut reader).is_err());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tensor.txt");
        let t = Tensor::from_vec(vec![1.0_f64, 2.0, 3.0], &[3]).unwrap();
        save_tensor(&path, &t).unwrap();
        let back: Tensor<f64> = load_tensor(&path).unwrap();
        assert_eq!(back.to_vec(), t.to_vec());
    }

    #[test]
    fn test_json_snapshot() {
        let t = Tensor::from_vec(vec![1.0_f32, 2.0], &[1, 2]).unwrap();
        let json = TensorData::from_tensor(&t).to_json().unwrap();
        let back: Tensor<f32> = TensorData::from_json(&json).unwrap().to_tensor().unwrap();
        assert_eq!(back.shape(), &[1, 2]);
        assert_eq!(back.to_vec(), vec![1.0, 2.0]);
    }
}
