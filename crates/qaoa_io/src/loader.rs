use anyhow::{Context, Result, ensure};
use num_complex::Complex;
use qaoa_core::state::MAX_QUBITS;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

/// Bytes per stored amplitude: two little-endian `f64`.
pub const AMPLITUDE_BYTES: usize = 16;

/// Loads a full state vector of `2^num_qubits` amplitudes.
///
/// The file holds the amplitudes in basis-index order, each as its real part
/// followed by its imaginary part, both little-endian `f64`.
pub fn load_amplitudes<P: AsRef<Path>>(path: P, num_qubits: u32) -> Result<Vec<Complex<f64>>> {
    ensure!(
        num_qubits <= MAX_QUBITS,
        "{num_qubits} qubits exceeds the supported {MAX_QUBITS}"
    );
    let path = path.as_ref();
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open amplitude file {}", path.display()))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    let expected = AMPLITUDE_BYTES << num_qubits;
    ensure!(
        buffer.len() == expected,
        "{} holds {} bytes, expected {expected} for {num_qubits} qubits",
        path.display(),
        buffer.len()
    );

    buffer
        .chunks_exact(AMPLITUDE_BYTES)
        .map(|chunk| -> Result<Complex<f64>> {
            let (re, im) = chunk.split_at(AMPLITUDE_BYTES / 2);
            Ok(Complex::new(
                f64::from_le_bytes(re.try_into()?),
                f64::from_le_bytes(im.try_into()?),
            ))
        })
        .collect()
}

/// Writes amplitudes in the format read by [`load_amplitudes`].
pub fn save_amplitudes<P: AsRef<Path>>(path: P, amplitudes: &[Complex<f64>]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create amplitude file {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for a in amplitudes {
        out.write_all(&a.re.to_le_bytes())?;
        out.write_all(&a.im.to_le_bytes())?;
    }
    out.flush()?;
    Ok(())
}

/// Returns the contiguous shard owned by `rank` out of `ranks` equal shards.
pub fn slice_shard<T>(global: &[T], rank: usize, ranks: usize) -> Result<&[T]> {
    ensure!(
        ranks.is_power_of_two() && ranks <= global.len(),
        "cannot split {} amplitudes across {ranks} ranks",
        global.len()
    );
    ensure!(rank < ranks, "rank {rank} out of range for {ranks} ranks");
    let local = global.len() / ranks;
    Ok(&global[rank * local..(rank + 1) * local])
}
