//! End-to-end integration tests for Ceras.
//! These build graphs, train and persist them the way a user would.

use ceras::prelude::*;

fn tensor(data: Vec<f32>, shape: &[usize]) -> Tensor<f32> {
    Tensor::from_vec(data, shape).unwrap()
}

fn xor_data() -> (Tensor<f32>, Tensor<f32>) {
    (
        tensor(vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0], &[4, 2]),
        tensor(vec![0.0, 1.0, 1.0, 0.0], &[4, 1]),
    )
}

/// Test 1: graph arithmetic and gradients
#[test]
fn test_expression_gradients() {
    let a = Variable::new(tensor(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]));
    let b = Variable::new(tensor(vec![1.0, 0.0, 0.0, 1.0], &[2, 2]));
    let ea = Expression::from(&a);
    let eb = Expression::from(&b);

    // sum(a·b + a) with b the identity
    let loss = sum_reduce(&(&(&ea * &eb) + &ea));
    assert_eq!(loss.forward().unwrap().to_vec(), vec![20.0]);

    loss.backward(&Tensor::ones(&[1])).unwrap();
    let numerical = numerical_gradient(&loss, &a, 1e-2).unwrap();
    loss.forward().unwrap();
    loss.backward(&Tensor::ones(&[1])).unwrap();
    assert!(gradcheck(&a.gradient(), &numerical, 1e-2, 1e-2));
}

/// Test 2: a hand-built network learns XOR
#[test]
fn test_xor_training_loop() {
    let x = PlaceHolder::new();
    let y = PlaceHolder::new();

    let hidden = Dense::new(2, 16).unwrap();
    let output = Dense::new(16, 1).unwrap();
    let h = tanh(&hidden.forward(&Expression::from(&x)).unwrap());
    let prediction = sigmoid(&output.forward(&h).unwrap());
    let loss = mean_squared_error(&prediction, &Expression::from(&y));

    let (inputs, targets) = xor_data();
    let mut session = Session::new();
    session.bind(&x, inputs.clone());
    session.bind(&y, targets.clone());

    let mut optimizer = Adam::new(&loss, 1, 0.05).unwrap();
    let first = session.run(&loss).unwrap().to_vec()[0];
    let mut last = first;
    for _ in 0..1000 {
        last = session.run(&loss).unwrap().to_vec()[0];
        optimizer.step().unwrap();
    }
    assert!(last < first * 0.5, "loss went from {first} to {last}");

    let _phase = LearningPhaseGuard::prediction();
    let predicted = session.run(&prediction).unwrap();
    let accuracy = binary_accuracy(&predicted, &targets, 0.5).unwrap();
    assert!(accuracy >= 0.75, "accuracy {accuracy}");
}

/// Test 3: compiled models train, evaluate and predict
#[test]
fn test_compiled_model_fit() {
    let x = input();
    let net = Sequential::new()
        .add(Dense::new(2, 8).unwrap())
        .add(Tanh)
        .add(Dense::new(8, 1).unwrap())
        .add(Sigmoid);
    let y = net.forward(&x).unwrap();
    let model = Model::new(&x, &y).unwrap();
    assert_eq!(model.num_parameters(), 2 * 8 + 8 + 8 + 1);

    let mut compiled = model
        .compile(mse, |loss| Ok(Sgd::new(loss, 4, 4.0)?.momentum(0.5)))
        .unwrap();
    let (inputs, targets) = xor_data();
    let before = compiled.evaluate(&inputs, &targets, 4).unwrap();
    let (training, validation) = compiled.fit(&inputs, &targets, 4, 200, true, 0.0).unwrap();
    let after = compiled.evaluate(&inputs, &targets, 4).unwrap();

    assert_eq!(training.len(), 200);
    assert_eq!(validation, vec![0.0; 200]);
    assert!(after < before, "loss went from {before} to {after}");
    assert_eq!(compiled.predict(&inputs).unwrap().shape(), &[4, 1]);
}

/// Test 4: frozen models do not move
#[test]
fn test_frozen_model_keeps_weights() {
    let x = input();
    let dense = Dense::new(3, 2).unwrap();
    let y = dense.forward(&x).unwrap();
    let model = Model::new(&x, &y).unwrap();
    let mut compiled = model.compile(mse, |loss| Sgd::new(loss, 2, 0.5)).unwrap();

    compiled.trainable(false);
    let before = dense.weight.data().to_vec();
    compiled
        .train_on_batch(&Tensor::ones(&[2, 3]), &Tensor::zeros(&[2, 2]))
        .unwrap();
    assert_eq!(dense.weight.data().to_vec(), before);

    compiled.trainable(true);
    compiled
        .train_on_batch(&Tensor::ones(&[2, 3]), &Tensor::zeros(&[2, 2]))
        .unwrap();
    assert_ne!(dense.weight.data().to_vec(), before);
}

/// Test 5: calling a model on a new input composes graphs
#[test]
fn test_model_composition() {
    let u = input();
    let encoder = Dense::from_weights(tensor(vec![1.0, 1.0], &[2, 1]), Tensor::zeros(&[1, 1])).unwrap();
    let inner = Model::new(&u, &encoder.forward(&u).unwrap()).unwrap();

    let x = input();
    let scaled = &x * 2.0;
    let outer = Model::new(&x, &inner.call(&scaled).unwrap()).unwrap();

    let out = outer.predict(&tensor(vec![1.0, 2.0], &[1, 2])).unwrap();
    assert_eq!(out.to_vec(), vec![6.0]);
    assert!(outer.output().variables().iter().any(|v| v.ptr_eq(&encoder.weight)));
}

/// Test 6: session save and restore
#[test]
fn test_session_save_restore() {
    let x = PlaceHolder::new();
    let dense = Dense::new(4, 3).unwrap();
    let y = dense.forward(&Expression::from(&x)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.txt");

    let mut session = Session::new();
    session.bind(&x, Tensor::ones(&[2, 4]));
    let expected = session.run(&y).unwrap().to_vec();
    session.save(&path).unwrap();

    dense.weight.data().reset(0.0);
    dense.bias.data().reset(0.0);
    assert_eq!(session.run(&y).unwrap().to_vec(), vec![0.0; 6]);

    session.restore(&path).unwrap();
    assert_eq!(session.run(&y).unwrap().to_vec(), expected);
}

/// Test 7: a small convolutional classifier has the right shapes and trains
#[test]
fn test_conv_pipeline() {
    let x = input();
    let net = Sequential::new()
        .add(Conv2D::new(4, (3, 3), (8, 8, 1)).unwrap().padding(Padding::Same))
        .add(BatchNormalization::new(&[8, 8, 4], 0.9).unwrap())
        .add(ReLU)
        .add(MaxPooling2D::new(2))
        .add(Dropout::new(0.25).unwrap())
        .add(Flatten)
        .add(Dense::new(4 * 4 * 4, 3).unwrap());
    let logits = net.forward(&x).unwrap();
    let model = Model::new(&x, &logits).unwrap();

    let mut compiled = model
        .compile(cross_entropy_loss, |loss| Adam::new(loss, 2, 0.01))
        .unwrap();

    let images = random(&[2, 8, 8, 1], 0.0f32, 1.0).unwrap();
    let labels = tensor(vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0], &[2, 3]);
    let loss = compiled.train_on_batch(&images, &labels).unwrap();
    assert!(loss.is_finite());

    let predicted = compiled.predict(&images).unwrap();
    assert_eq!(predicted.shape(), &[2, 3]);
    assert!(!predicted.has_nan());
}

/// Test 8: the learning phase switches dropout off for prediction
#[test]
fn test_prediction_disables_dropout() {
    let x = input();
    let y = Dropout::new(0.5).unwrap().forward(&x).unwrap();
    let model = Model::new(&x, &y).unwrap();

    let ones = Tensor::ones(&[1, 64]);
    assert_eq!(model.predict(&ones).unwrap().to_vec(), vec![1.0; 64]);

    x.as_place_holder().unwrap().bind(ones);
    let trained = y.forward().unwrap().to_vec();
    assert!(trained.iter().any(|&v| v == 0.0));
}
