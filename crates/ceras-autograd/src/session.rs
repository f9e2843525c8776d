//! Session - Binding Inputs and Persisting Variables
//!
//! A `Session` binds tensors to place holders, evaluates expressions and
//! remembers every variable it has seen, so that the trained state of a
//! graph can be written to disk and read back.
//!
//! The saved file starts with one line listing the variable ids in
//! ascending order, followed by each variable's tensor in the two-line
//! text format of `ceras_tensor::io`. Ids are assigned in creation order,
//! so a graph rebuilt the same way in a new process restores cleanly.
//!
//! Dropping a session unbinds every place holder it bound.
//!
//! @version 0.1.0
//! @author Ceras Development Team

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use ceras_core::error::{Error, Result};
use ceras_tensor::{read_tensor, write_tensor, Tensor};

use crate::expression::Expression;
use crate::place_holder::PlaceHolder;
use crate::variable::Variable;

// =============================================================================
// Session
// =============================================================================

/// Evaluation context that owns place holder bindings and variable records.
#[derive(Debug, Default)]
pub struct Session {
    place_holders: Vec<PlaceHolder>,
    variables: BTreeMap<u64, Variable>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `tensor` to `place_holder` and takes ownership of the binding.
    pub fn bind(&mut self, place_holder: &PlaceHolder, tensor: Tensor<f32>) {
        tracing::trace!(id = place_holder.id(), shape = ?tensor.shape(), "bind place holder");
        place_holder.bind(tensor);
        if !self.place_holders.iter().any(|p| p.id() == place_holder.id()) {
            self.place_holders.push(place_holder.clone());
        }
    }

    /// Replaces the tensor bound to `place_holder` without recording it.
    pub fn rebind(&mut self, place_holder: &PlaceHolder, tensor: Tensor<f32>) {
        place_holder.bind(tensor);
    }

    /// Records `variable` so that it is saved and restored with the session.
    pub fn remember(&mut self, variable: &Variable) {
        self.variables
            .entry(variable.id())
            .or_insert_with(|| variable.clone());
    }

    /// Evaluates `expression` and remembers every variable below it.
    pub fn run(&mut self, expression: &Expression) -> Result<Tensor<f32>> {
        for variable in expression.variables() {
            self.remember(&variable);
        }
        expression.forward()
    }

    /// Evaluates `expression` for its side effects only.
    ///
    /// Typically called before [`Session::restore`] so that the session
    /// knows the variables of the graph.
    pub fn tap(&mut self, expression: &Expression) -> Result<()> {
        self.run(expression).map(|_| ())
    }

    /// The remembered variables, ordered by id.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        self.variables.values().cloned().collect()
    }

    /// Writes every remembered variable to the file at `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);

        let ids: Vec<String> = self.variables.keys().map(u64::to_string).collect();
        writeln!(writer, "{}", ids.join(" "))?;
        for variable in self.variables.values() {
            write_tensor(&mut writer, &variable.data())?;
        }
        writer.flush()?;

        tracing::debug!(path = %path.display(), variables = self.variables.len(), "session saved");
        Ok(())
    }

    /// Reads variable data saved by [`Session::save`] into the remembered
    /// variables, in place.
    pub fn restore(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut reader = BufReader::new(File::open(path)?);

        let mut header = String::new();
        reader.read_line(&mut header)?;
        let ids = header
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<u64>()
                    .map_err(|_| Error::serialization(format!("invalid variable id '{token}'")))
            })
            .collect::<Result<Vec<u64>>>()?;

        // Nothing is overwritten until every tensor has been read and checked.
        let mut pending = Vec::with_capacity(ids.len());
        for id in &ids {
            let variable = self
                .variables
                .get(id)
                .ok_or(Error::UnknownVariable { id: *id })?;
            let tensor: Tensor<f32> = read_tensor(&mut reader)?;
            let data = variable.data();
            if data.shape() != tensor.shape() {
                return Err(Error::shape_mismatch(data.shape(), tensor.shape()));
            }
            pending.push((data, tensor));
        }
        for (data, tensor) in &pending {
            data.copy_from(tensor)?;
        }

        tracing::debug!(path = %path.display(), variables = ids.len(), "session restored");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for place_holder in &self.place_holders {
            place_holder.reset();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::plus;

    #[test]
    fn test_run_remembers_variables() {
        let x = PlaceHolder::new();
        let w = Variable::new(Tensor::ones(&[2]));
        let y = plus(&Expression::from(&x), &Expression::from(&w));

        let mut session = Session::new();
        session.bind(&x, Tensor::full(&[2], 2.0));
        assert_eq!(session.run(&y).unwrap().to_vec(), vec![3.0, 3.0]);
        assert_eq!(session.variables().len(), 1);

        session.rebind(&x, Tensor::zeros(&[2]));
        assert_eq!(session.run(&y).unwrap().to_vec(), vec![1.0, 1.0]);
        assert_eq!(session.variables().len(), 1);
    }

    #[test]
    fn test_drop_unbinds_place_holders() {
        let x = PlaceHolder::new();
        {
            let mut session = Session::new();
            session.bind(&x, Tensor::ones(&[1]));
            assert!(x.is_bound());
        }
        assert!(!x.is_bound());
    }

    #[test]
    fn test_save_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let a = Variable::new(Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap());
        let b = Variable::new(Tensor::from_vec(vec![0.5], &[1]).unwrap());
        let y = plus(&Expression::from(&a), &Expression::from(&b));

        let mut session = Session::new();
        session.tap(&y).unwrap();
        session.save(&path).unwrap();

        a.data().reset(0.0);
        b.data().reset(0.0);
        session.restore(&path).unwrap();
        assert_eq!(a.data().to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(b.data().to_vec(), vec![0.5]);
    }

    #[test]
    fn test_restore_unknown_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let mut saver = Session::new();
        saver.remember(&Variable::new(Tensor::ones(&[1])));
        saver.save(&path).unwrap();

        let mut loader = Session::new();
        loader.remember(&Variable::new(Tensor::ones(&[1])));
        assert!(matches!(loader.restore(&path), Err(Error::UnknownVariable { .. })));
    }

    #[test]
    fn test_restore_shape_mismatch_leaves_variables_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let a = Variable::new(Tensor::ones(&[2, 2]));
        let b = Variable::new(Tensor::ones(&[1]));
        let mut session = Session::new();
        session.remember(&a);
        session.remember(&b);

        let mut file = BufWriter::new(File::create(&path).unwrap());
        writeln!(file, "{} {}", a.id(), b.id()).unwrap();
        write_tensor(&mut file, &Tensor::full(&[2, 2], 7.0_f32)).unwrap();
        write_tensor(&mut file, &Tensor::full(&[3], 7.0_f32)).unwrap();
        file.flush().unwrap();
        drop(file);

        match session.restore(&path) {
            Err(Error::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, vec![1]);
                assert_eq!(actual, vec![3]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(a.data().to_vec(), vec![1.0; 4]);
        assert_eq!(b.data().to_vec(), vec![1.0]);
    }

    #[test]
    fn test_restore_unknown_id_leaves_variables_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.txt");

        let a = Variable::new(Tensor::ones(&[2]));
        let stranger = Variable::new(Tensor::ones(&[1]));
        let mut saver = Session::new();
        saver.remember(&a);
        saver.remember(&stranger);
        a.data().reset(5.0);
        saver.save(&path).unwrap();
        a.data().reset(1.0);

        let mut loader = Session::new();
        loader.remember(&a);
        assert!(matches!(loader.restore(&path), Err(Error::UnknownVariable { .. })));
        assert_eq!(a.data().to_vec(), vec![1.0, 1.0]);
    }
}
