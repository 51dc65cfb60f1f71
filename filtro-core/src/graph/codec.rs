//! Line-oriented text encodings for edges, matchings and cluster records.
//!
//! Readers skip blank lines and `#` comments silently. Any other line that
//! fails to parse is skipped and counted in [`Loaded::malformed`].

use std::{
    io::{self, BufRead},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::error::ParseError;

use super::{DEFAULT_WEIGHT, Edge, Vertex, VertexRecord};

/// Records decoded from a text stream plus the count of rejected lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded<T> {
    /// Successfully decoded records in input order.
    pub records: Vec<T>,
    /// Number of lines that failed to parse.
    pub malformed: usize,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

/// Edges decoded from an edge list.
pub type LoadedEdges = Loaded<Edge>;

/// Records decoded from an adjacency list.
pub type LoadedAdjacency = Loaded<VertexRecord>;

fn is_ignorable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

/// Parses one edge line.
///
/// Accepts `u v`, `u v w`, `u<TAB>v<SPACE>w` and `u,v`: two or three
/// fields separated by whitespace or commas. A missing weight defaults to
/// [`DEFAULT_WEIGHT`]. Returns `Ok(None)` for blank and comment lines.
///
/// # Errors
/// Returns [`ParseError`] when the field count is wrong or the weight is not
/// a finite number.
///
/// # Examples
/// ```
/// use filtro_core::{Edge, parse_edge_line};
///
/// let edge = parse_edge_line("4\t2 0.5").expect("valid line").expect("not blank");
/// assert_eq!(edge, Edge::new(2, 4, 0.5));
/// assert!(parse_edge_line("1 2 heavy").is_err());
/// ```
pub fn parse_edge_line(line: &str) -> Result<Option<Edge>, ParseError> {
    let line = line.trim();
    if is_ignorable(line) {
        return Ok(None);
    }
    let fields: Vec<&str> = line
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|field| !field.is_empty())
        .collect();
    let (u, v, weight) = match fields.as_slice() {
        [u, v] => (*u, *v, None),
        [u, v, w] => (*u, *v, Some(*w)),
        other => {
            return Err(ParseError::FieldCount {
                expected: "2 or 3",
                found: other.len(),
            });
        }
    };
    let weight = match weight {
        Some(raw) => parse_weight(raw)?,
        None => DEFAULT_WEIGHT,
    };
    Ok(Some(Edge::new(u.parse::<Vertex>()?, v.parse::<Vertex>()?, weight)))
}

fn parse_weight(raw: &str) -> Result<f64, ParseError> {
    let weight = raw.parse::<f64>().map_err(|_| ParseError::InvalidWeight {
        raw: Arc::from(raw),
    })?;
    if !weight.is_finite() {
        return Err(ParseError::NonFiniteWeight {
            raw: Arc::from(raw),
        });
    }
    Ok(weight)
}

/// Parses one adjacency line of the form `vertex<TAB>n1,n2,...`.
///
/// The neighbour list may be absent or empty. Returns `Ok(None)` for blank
/// and comment lines.
///
/// # Errors
/// Returns [`ParseError::FieldCount`] when the line has more than two
/// tab-separated fields, [`ParseError::EmptyVertex`] when the key or a
/// neighbour token is empty and [`ParseError::InvalidVertex`] when a token
/// contains whitespace or a comma.
///
/// # Examples
/// ```
/// use filtro_core::parse_adjacency_line;
///
/// let record = parse_adjacency_line("1\t3,2").expect("valid line").expect("not blank");
/// assert_eq!(record.neighbours().len(), 2);
/// assert!(parse_adjacency_line("1 2,3").is_err());
/// ```
pub fn parse_adjacency_line(line: &str) -> Result<Option<VertexRecord>, ParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if is_ignorable(line.trim()) {
        return Ok(None);
    }
    let fields: Vec<&str> = line.split('\t').collect();
    let (key, rest) = match fields.as_slice() {
        [key] => (*key, ""),
        [key, rest] => (*key, *rest),
        other => {
            return Err(ParseError::FieldCount {
                expected: "1 or 2",
                found: other.len(),
            });
        }
    };
    let vertex = key.parse::<Vertex>()?;
    let neighbours = rest
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse::<Vertex>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(VertexRecord::new(vertex, neighbours)))
}

fn read_lines<R, T, F>(reader: R, kind: &'static str, parse: F) -> io::Result<Loaded<T>>
where
    R: BufRead,
    F: Fn(&str) -> Result<Option<T>, ParseError>,
{
    let mut loaded = Loaded::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse(&line) {
            Ok(Some(record)) => loaded.records.push(record),
            Ok(None) => {}
            Err(error) => {
                debug!(
                    line = index.saturating_add(1),
                    code = error.code().as_str(),
                    %error,
                    kind,
                    "skipping malformed record"
                );
                loaded.malformed = loaded.malformed.saturating_add(1);
            }
        }
    }
    if loaded.malformed > 0 {
        warn!(
            kind,
            malformed = loaded.malformed,
            records = loaded.records.len(),
            "input contained malformed records"
        );
        crate::controller::record_malformed(loaded.malformed as u64);
    }
    Ok(loaded)
}

/// Reads an edge list, skipping and counting malformed lines.
///
/// # Errors
/// Returns any I/O error raised by `reader`.
pub fn read_edges<R: BufRead>(reader: R) -> io::Result<LoadedEdges> {
    read_lines(reader, "edge", parse_edge_line)
}

/// Reads an adjacency list, skipping and counting malformed lines.
///
/// # Errors
/// Returns any I/O error raised by `reader`.
pub fn read_adjacency<R: BufRead>(reader: R) -> io::Result<LoadedAdjacency> {
    read_lines(reader, "adjacency", parse_adjacency_line)
}

/// Formats a spanning-forest edge as `u<TAB>v<SPACE>weight`.
#[must_use]
pub fn format_mst_edge(edge: &Edge) -> String {
    format!("{}\t{} {}", edge.lower(), edge.higher(), edge.weight())
}

/// Formats a matched pair as `u,v`.
#[must_use]
pub fn format_matched_pair(edge: &Edge) -> String {
    format!("{},{}", edge.lower(), edge.higher())
}

/// Formats a weighted matched pair as `u<TAB>v<TAB>weight`.
#[must_use]
pub fn format_weighted_pair(edge: &Edge) -> String {
    format!("{}\t{}\t{}", edge.lower(), edge.higher(), edge.weight())
}

/// Formats a cluster record as `vertex<TAB>comma-joined-members`.
#[must_use]
pub fn format_cluster_record(record: &VertexRecord) -> String {
    format!(
        "{}\t{}",
        record.vertex(),
        join_vertices(record.neighbours().iter())
    )
}

/// Formats a final component as `representative<TAB>comma-joined-members`.
#[must_use]
pub fn format_component(representative: &Vertex, members: &[Vertex]) -> String {
    format!("{representative}\t{}", join_vertices(members.iter()))
}

fn join_vertices<'a>(vertices: impl Iterator<Item = &'a Vertex>) -> String {
    vertices
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
