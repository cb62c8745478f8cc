//! Parser for graph description files.
//!
//! Two line-oriented formats are accepted. The first non-comment line selects
//! the format:
//!
//! ```text
//! # dense: N rows of N non-negative integers
//! matrix 3
//! 0 1 1
//! 1 0 1
//! 1 1 0
//! ```
//!
//! ```text
//! c DIMACS: 1-indexed vertices, optional weight (default 1)
//! p edge 3 3
//! e 1 2
//! e 2 3 4
//! e 1 3
//! ```
//!
//! Blank lines and lines starting with `#` or a `c` token are skipped in
//! both formats. Every parsed graph is validated before it is returned.

use anyhow::{Context, Result, anyhow, bail, ensure};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{self as ch, digit1, space1};
use nom::combinator::{all_consuming, map, map_res, opt};
use nom::multi::separated_list1;
use nom::sequence::{pair, preceded, tuple};
use qaoa_core::graph::AdjacencyMatrix;
use qaoa_core::state::MAX_QUBITS;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Header {
    Matrix(usize),
    Dimacs { vertices: usize, edges: usize },
}

fn count(input: &str) -> IResult<&str, usize> {
    map_res(digit1, str::parse::<usize>)(input)
}

fn header(input: &str) -> IResult<&str, Header> {
    alt((
        map(preceded(pair(tag("matrix"), space1), count), Header::Matrix),
        map(
            tuple((tag("p"), space1, tag("edge"), space1, count, space1, count)),
            |(_, _, _, _, vertices, _, edges)| Header::Dimacs { vertices, edges },
        ),
    ))(input)
}

fn matrix_row(input: &str) -> IResult<&str, Vec<u32>> {
    separated_list1(space1, ch::u32)(input)
}

fn edge_line(input: &str) -> IResult<&str, (usize, usize, Option<u32>)> {
    tuple((
        preceded(pair(tag("e"), space1), count),
        preceded(space1, count),
        opt(preceded(space1, ch::u32)),
    ))(input)
}

fn is_skipped(line: &str) -> bool {
    line.is_empty() || line.starts_with('#') || line.split_whitespace().next() == Some("c")
}

/// Runs `parser` over the whole line and reports failures with the line number.
fn parse_line<'a, O>(
    line: &'a str,
    lineno: usize,
    what: &str,
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> Result<O> {
    all_consuming(parser)(line)
        .map(|(_, out)| out)
        .map_err(|e| anyhow!("line {lineno}: malformed {what}: {e}"))
}

/// Parses a graph description held in memory.
///
/// # Errors
///
/// Fails on a missing or unknown header, a malformed line, a row or edge
/// count that disagrees with the header, a vertex outside the graph, or a
/// matrix that is not symmetric with a zero diagonal.
pub fn parse_graph(input: &str) -> Result<AdjacencyMatrix> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !is_skipped(line));

    let (lineno, first) = lines.next().ok_or_else(|| anyhow!("graph file has no header"))?;
    let parsed = parse_line(first, lineno, "header", header)?;
    let vertices = match parsed {
        Header::Matrix(n) => n,
        Header::Dimacs { vertices, .. } => vertices,
    };
    ensure!(
        vertices <= MAX_QUBITS as usize,
        "line {lineno}: {vertices} vertices exceeds the supported {MAX_QUBITS}"
    );

    let graph = match parsed {
        Header::Matrix(n) => {
            let mut rows = Vec::with_capacity(n);
            for (lineno, line) in lines {
                let row = parse_line(line, lineno, "matrix row", matrix_row)?;
                ensure!(
                    row.len() == n,
                    "line {lineno}: expected {n} entries, found {}",
                    row.len()
                );
                rows.push(row);
            }
            ensure!(rows.len() == n, "expected {n} matrix rows, found {}", rows.len());
            AdjacencyMatrix::from_rows(rows).context("invalid adjacency matrix")?
        }
        Header::Dimacs { vertices, edges } => {
            let mut graph = AdjacencyMatrix::with_vertices(vertices)?;
            let mut seen = 0usize;
            for (lineno, line) in lines {
                let (u, v, w) = parse_line(line, lineno, "edge line", edge_line)?;
                if u == 0 || v == 0 {
                    bail!("line {lineno}: DIMACS vertices start at 1");
                }
                graph
                    .add_edge(u - 1, v - 1, w.unwrap_or(1))
                    .with_context(|| format!("line {lineno}: invalid edge {u}-{v}"))?;
                seen += 1;
            }
            ensure!(seen == edges, "header declares {edges} edges, found {seen}");
            graph
        }
    };

    graph.validate().context("graph failed validation")?;
    Ok(graph)
}

/// Loads a graph file in either supported format.
pub fn load_graph_file<P: AsRef<Path>>(path: P) -> Result<AdjacencyMatrix> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open graph file {}", path.display()))?;
    parse_graph(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes `graph` in DIMACS form with explicit weights.
pub fn write_dimacs<W: Write>(graph: &AdjacencyMatrix, mut out: W) -> Result<()> {
    let edges: Vec<_> = graph.edges().collect();
    writeln!(out, "p edge {} {}", graph.num_vertices(), edges.len())?;
    for (v, u, w) in edges {
        writeln!(out, "e {} {} {}", v + 1, u + 1, w)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dense_matrix() {
        let g = parse_graph("# triangle\nmatrix 3\n0 1 1\n1 0 1\n\n1 1 0\n").unwrap();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 3);
        assert_eq!(g.weight(2, 0), 1);
    }

    #[test]
    fn parses_weighted_dimacs() {
        let text = "c example\np edge 4 3\ne 1 2\ne 2 3 5\nc trailing comment\ne 4 1 2\n";
        let g = parse_graph(text).unwrap();
        assert_eq!(g.num_vertices(), 4);
        assert_eq!(g.num_edges(), 8);
        assert_eq!(g.weight(1, 2), 5);
        assert_eq!(g.weight(0, 3), 2);
    }

    #[test]
    fn repeated_dimacs_edge_accumulates() {
        let g = parse_graph("p edge 2 2\ne 1 2\ne 2 1 3\n").unwrap();
        assert_eq!(g.weight(0, 1), 4);
    }

    #[test]
    fn rejects_bad_inputs() {
        let cases = [
            "",
            "graph 3\n",
            "p edge 3 2\ne 1 2\n",
            "p edge 3 1\ne 0 2\n",
            "p edge 3 1\ne 1 4\n",
            "p edge 3 1\ne 2 2\n",
            "p edge 3 1\ne 1 x\n",
            "matrix 2\n0 1\n",
            "matrix 2\n0 1\n0 0\n",
            "matrix 2\n1 0\n0 0\n",
            "matrix 2\n0 1 0\n1 0\n",
        ];
        for text in cases {
            assert!(parse_graph(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn rejects_oversized_headers() {
        for text in ["p edge 5000000000 0\n", "# big\nmatrix 1000000\n", "p edge 49 0\n"] {
            let err = parse_graph(text).unwrap_err();
            assert!(format!("{err}").contains("exceeds"), "{err}");
        }
        assert_eq!(parse_graph("p edge 48 0\n").unwrap().num_vertices(), 48);
    }

    #[test]
    fn errors_name_the_line() {
        let err = parse_graph("p edge 3 2\ne 1 2\n\ne 1 2 -1\n").unwrap_err();
        assert!(format!("{err}").contains("line 4"), "{err}");
    }

    #[test]
    fn dimacs_written_then_loaded_matches() {
        let g = parse_graph("matrix 4\n0 2 0 1\n2 0 3 0\n0 3 0 0\n1 0 0 0\n").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write_dimacs(&g, &mut file).unwrap();
        file.flush().unwrap();
        let loaded = load_graph_file(file.path()).unwrap();
        assert_eq!(loaded, g);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.col");
        let err = load_graph_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.col"));
    }
}
