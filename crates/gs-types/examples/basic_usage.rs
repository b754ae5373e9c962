use gs_types::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("gs-types basic usage");

    // A configuration keeps its keys sorted, whatever the insertion order.
    let config = Configuration::new()
        .with("kernel", "rbf")
        .with("gamma", 0.1)
        .with("C", 10);
    println!("Configuration: {config}");

    // Sample matrix and a fold over it.
    let x = Matrix::from_rows(vec![
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![2.0, 2.0],
        vec![3.0, 1.0],
    ])?;
    let fold = Fold::new(vec![0, 1, 2], vec![3]);
    let train = x.select_rows(&fold.train)?;
    let test = x.select_rows(&fold.test)?;
    println!(
        "Fold: train {:?}, test {:?}",
        train.shape(),
        test.shape()
    );

    // Precomputed kernels are sliced on both axes.
    let kernel = Matrix::new(4, 4, (0..16).map(f64::from).collect())?;
    let k_test = kernel.select_block(&fold.test, &fold.train)?;
    println!("Kernel test block: {:?} -> {:?}", k_test.shape(), k_test.as_slice());

    // A candidate summary as the search reports it.
    let summary = ConfigurationSummary {
        candidate: 0,
        rank: 1,
        configuration: config,
        mean_score: 0.8,
        fold_scores: vec![0.8, 0.9, 0.7],
    };
    println!("Summary: {summary}");

    // Grid axes reject multi-dimensional arrays.
    let axis = CandidateValues::Array {
        shape: vec![2, 2],
        data: vec![1.into(), 2.into(), 3.into(), 4.into()],
    };
    if let Err(e) = axis.validate("alpha") {
        println!("Rejected axis: {e}");
    }

    Ok(())
}
