//! Walk through the storage kinds and the dispatcher

use std::time::Instant;

use linkern::{KernelConfig, Matrix, Operand, Vector};

fn main() -> linkern::Result<()> {
    linkern::set_kernel_config(KernelConfig::from_env());

    println!("Building a 3x3 CSR matrix...");
    let csr = Matrix::csr_from_triplets(3, 3, &[(0, 0, 2.0), (1, 1, 3.0), (2, 2, 4.0), (0, 2, 1.0)])?;
    println!("   Kind: {}", csr.kind());
    println!("   Non-zeros: {}", csr.non_zero_count());

    // CSR x CSR stays sparse
    let start = Instant::now();
    let gram = csr.multiply(&csr.transpose())?;
    println!(
        "A * A^T ({}) computed in {:.3}ms",
        gram.kind(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    for row in 0..3 {
        println!("   {:?}", gram.row(row)?.to_vec());
    }

    // Mixed kinds take the generic fallback when the result kind differs
    let diagonal = Matrix::diagonal_from_values(3, 3, vec![1.0, -1.0, 0.5])?;
    let mut result = Matrix::dense(3, 3)?;
    csr.add_into(&diagonal, &mut result)?;
    println!("\nA + D written into {} storage:", result.kind());
    for row in 0..3 {
        println!("   {:?}", result.row(row)?.to_vec());
    }

    // Off-diagonal writes into a diagonal result are rejected up front
    let mut target = Matrix::diagonal(3, 3)?;
    match csr.add_into(&diagonal, &mut target) {
        Ok(()) => println!("\nUnexpected success"),
        Err(e) => println!("\nRejected as expected: {e}"),
    }

    // Self-aliasing is explicit
    let mut doubled = csr.clone();
    doubled.add_in_place(Operand::This)?;
    println!("\nA + A trace: {}", doubled.trace()?);

    let x = Vector::sparse_from_slice(&[1.0, 0.0, 2.0])?;
    let y = csr.multiply_vector(&x)?;
    println!("\nA * x = {:?} ({})", y.to_vec(), y.kind());
    println!("   |A * x|_2 = {:.4}", y.l2_norm());
    println!("   Frobenius |A| = {:.4}", csr.frobenius_norm());

    Ok(())
}
