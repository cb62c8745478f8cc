//! I/O utilities for MaxCut instances and state vectors.
//!
//! Provides functions for reading and writing weighted graphs (dense
//! adjacency matrices and DIMACS edge lists) and raw complex amplitude
//! files. These utilities handle file format parsing and conversion to the
//! data structures consumed by `qaoa_core`.

/// Binary amplitude file utilities.
///
/// Reads and writes state vectors stored as little-endian `(re, im)` pairs
/// of 64-bit floats, and slices a global vector into per-rank shards.
pub mod loader;

/// Parser for graph description files.
///
/// Accepts dense `matrix N` files and DIMACS `p edge N M` files, validates
/// the result, and constructs an `AdjacencyMatrix`. Also writes graphs back
/// out in DIMACS form.
pub mod parser;
