use megani::{Activation, Matrix, NetworkBuilder, OptimizerKind};

fn main() -> megani::Result<()> {
    // RUST_LOG=debug shows network construction.
    env_logger::init();

    // y = [x0 + x1, x0 - x1] on four samples, trained as a single batch.
    let x = Matrix::from_rows(&[
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![2.0, -1.0],
    ])?;
    let y = Matrix::from_rows(&[
        vec![1.0, -1.0],
        vec![1.0, 1.0],
        vec![2.0, 0.0],
        vec![1.0, 3.0],
    ])?;

    let mut net = NetworkBuilder::new(2, 4, 0.02)?
        .dense(8, Activation::Tanh)?
        .dense(2, Activation::Identity)?
        .optimizer(OptimizerKind::Momentum { momentum: 0.9 })
        .build_with_seed(0)?;

    for epoch in 0..=2_000 {
        net.fit(&x, &y)?;
        if epoch % 500 == 0 {
            let out = net.predict(&x)?;
            let sse: f64 = out
                .as_slice()
                .iter()
                .zip(y.as_slice())
                .map(|(o, t)| (o - t) * (o - t))
                .sum();
            println!("epoch={epoch} sse={sse:.6}");
        }
    }

    let out = net.predict(&x)?;
    for r in 0..out.height() {
        println!("x={:?} y={:?}", x.row(r), out.row(r));
    }
    Ok(())
}
