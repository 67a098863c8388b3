//! Text graph formats: GML, edge lists and dense adjacency matrices

use crate::graph::{BuildReport, Graph, GraphBuilder};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File extensions `load_graph` understands
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["gml", "edgelist", "edges", "txt", "parquet"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Load a graph, choosing the reader by file extension
pub fn load_graph(path: &Path) -> Result<(Graph, BuildReport)> {
    let ext = extension(path).unwrap_or_default();
    log::debug!("Loading {} as {}", path.display(), ext);

    let result = match ext.as_str() {
        "gml" => read_gml(&read_text(path)?),
        "edgelist" | "edges" => read_edge_list(&read_text(path)?),
        "txt" => {
            let text = read_text(path)?;
            match read_adjacency_matrix(&text) {
                Ok(loaded) => Ok(loaded),
                Err(err) => {
                    log::debug!("{} is not an adjacency matrix ({err}); trying edge list", path.display());
                    read_edge_list(&text)
                }
            }
        }
        "parquet" => super::parquet::load_edge_table(path),
        other => Err(anyhow!("unsupported graph format '.{other}'")),
    };
    result.with_context(|| format!("failed to load {}", path.display()))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

/// Graph files in `dir` keyed by file stem, in name order
pub fn iter_graph_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let supported = extension(&path)
            .map(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or(false);
        if !supported {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.entry(stem.to_string()).or_insert(path);
        }
    }
    Ok(files)
}

// ---------------------------------------------------------------------------
// GML
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
    Quoted(String),
}

#[derive(Debug, Clone, PartialEq)]
enum GmlValue {
    Scalar(String),
    List(Vec<(String, GmlValue)>),
}

impl GmlValue {
    fn scalar(&self) -> Option<&str> {
        match self {
            GmlValue::Scalar(s) => Some(s),
            GmlValue::List(_) => None,
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '[' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ']' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '#' => {
                // Comment to end of line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(c) => s.push(c),
                        None => bail!("unterminated string in GML"),
                    }
                }
                tokens.push(Token::Quoted(unescape(&s)));
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut s = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '[' || c == ']' || c == '"' {
                        break;
                    }
                    s.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(s));
            }
        }
    }
    Ok(tokens)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

fn unescape(s: &str) -> String {
    s.replace("&quot;", "\"").replace("&amp;", "&")
}

fn parse_list(tokens: &mut std::vec::IntoIter<Token>, nested: bool) -> Result<Vec<(String, GmlValue)>> {
    let mut entries = Vec::new();
    loop {
        let key = match tokens.next() {
            Some(Token::Word(key)) => key,
            Some(Token::Close) if nested => return Ok(entries),
            None if !nested => return Ok(entries),
            None => bail!("unbalanced '[' in GML"),
            Some(other) => bail!("expected a GML key, found {other:?}"),
        };
        let value = match tokens.next() {
            Some(Token::Open) => GmlValue::List(parse_list(tokens, true)?),
            Some(Token::Word(v)) | Some(Token::Quoted(v)) => GmlValue::Scalar(v),
            Some(Token::Close) | None => bail!("GML key '{key}' has no value"),
        };
        entries.push((key, value));
    }
}

/// Parse GML text. Nodes are named by their `label` when present, else their
/// `id`; edges may carry a `weight`.
pub fn read_gml(text: &str) -> Result<(Graph, BuildReport)> {
    let tokens = tokenize(text)?;
    let document = parse_list(&mut tokens.into_iter(), false)?;

    let graph = document
        .iter()
        .find_map(|(key, value)| match value {
            GmlValue::List(entries) if key == "graph" => Some(entries),
            _ => None,
        })
        .ok_or_else(|| anyhow!("GML document has no 'graph' block"))?;

    let field = |entries: &[(String, GmlValue)], name: &str| -> Option<String> {
        entries
            .iter()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.scalar())
            .map(str::to_string)
    };

    let mut names: BTreeMap<String, String> = BTreeMap::new();
    let mut node_order = Vec::new();
    for (key, value) in graph {
        if let (true, GmlValue::List(entries)) = (key == "node", value) {
            let id = field(entries, "id").ok_or_else(|| anyhow!("GML node without an id"))?;
            let name = field(entries, "label").unwrap_or_else(|| id.clone());
            if names.insert(id.clone(), name).is_some() {
                bail!("duplicate GML node id {id}");
            }
            node_order.push(id);
        }
    }

    let mut builder = GraphBuilder::with_capacity(node_order.len());
    for id in &node_order {
        builder.get_or_create_node(&names[id]);
    }

    for (key, value) in graph {
        if let (true, GmlValue::List(entries)) = (key == "edge", value) {
            let source = field(entries, "source").ok_or_else(|| anyhow!("GML edge without a source"))?;
            let target = field(entries, "target").ok_or_else(|| anyhow!("GML edge without a target"))?;
            let resolve = |id: &str| {
                names
                    .get(id)
                    .cloned()
                    .ok_or_else(|| anyhow!("GML edge references unknown node {id}"))
            };
            let weight = field(entries, "weight")
                .map(|w| w.parse::<f64>().with_context(|| format!("bad edge weight '{w}'")))
                .transpose()?;
            builder.add_edge(&resolve(&source)?, &resolve(&target)?, weight)?;
        }
    }

    Ok(builder.build()?)
}

/// Render a graph as GML, labelling nodes with their external ids
pub fn to_gml(graph: &Graph) -> String {
    let mut out = String::from("graph [\n");
    for node in 0..graph.node_count {
        let _ = write!(
            out,
            "  node [\n    id {}\n    label \"{}\"\n  ]\n",
            node,
            escape(&graph.label(node))
        );
    }
    for (u, v, w) in graph.edges() {
        let _ = write!(
            out,
            "  edge [\n    source {}\n    target {}\n    weight {}\n  ]\n",
            u, v, w
        );
    }
    out.push_str("]\n");
    out
}

pub fn write_gml(graph: &Graph, path: &Path) -> Result<()> {
    fs::write(path, to_gml(graph)).with_context(|| format!("cannot write {}", path.display()))
}

// ---------------------------------------------------------------------------
// Edge lists and adjacency matrices
// ---------------------------------------------------------------------------

/// Parse `u v [weight]` lines; `#` starts a comment. A trailing
/// `{'weight': w}` attribute dict is also accepted.
pub fn read_edge_list(text: &str) -> Result<(Graph, BuildReport)> {
    let mut builder = GraphBuilder::with_capacity(1024);

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (src, dst) = match (parts.next(), parts.next()) {
            (Some(src), Some(dst)) => (src, dst),
            _ => bail!("line {}: expected 'source target [weight]'", line_no + 1),
        };
        let rest: Vec<&str> = parts.collect();
        let weight = parse_edge_weight(&rest.join(" "))
            .with_context(|| format!("line {}: bad weight", line_no + 1))?;
        builder.add_edge(src, dst, weight)?;
    }

    Ok(builder.build()?)
}

fn parse_edge_weight(rest: &str) -> Result<Option<f64>> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(None);
    }
    if rest.starts_with('{') {
        // {'weight': 2.0} or {} as written by attribute-dict edge lists
        let value = rest
            .split(|c: char| c == ':' || c == ',' || c == '}')
            .skip_while(|part| !part.contains("weight"))
            .nth(1);
        return match value {
            Some(v) => Ok(Some(v.trim().parse::<f64>()?)),
            None => Ok(None),
        };
    }
    let first = rest.split_whitespace().next().unwrap_or(rest);
    Ok(Some(first.parse::<f64>()?))
}

/// Parse a whitespace-separated square matrix. Nodes are named `0..n`;
/// entry (i, j) with i < j is the edge weight, zero meaning no edge.
pub fn read_adjacency_matrix(text: &str) -> Result<(Graph, BuildReport)> {
    let rows: Vec<Vec<f64>> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            l.split_whitespace()
                .map(|x| x.parse::<f64>().map_err(|e| anyhow!("'{x}': {e}")))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<_>>()?;

    let n = rows.len();
    if n == 0 {
        bail!("empty adjacency matrix");
    }
    if let Some(bad) = rows.iter().position(|r| r.len() != n) {
        bail!("row {} has {} entries, expected {}", bad, rows[bad].len(), n);
    }

    let mut builder = GraphBuilder::with_capacity(n);
    for (i, row) in rows.iter().enumerate() {
        for (j, &upper) in row.iter().enumerate().skip(i + 1) {
            let w = if upper != 0.0 { upper } else { rows[j][i] };
            if w != 0.0 {
                builder.add_edge(&i.to_string(), &j.to_string(), Some(w))?;
            }
        }
    }

    Ok(builder.build()?)
}

/// Write the dense adjacency matrix, one row per line. Unweighted output
/// writes 0/1 integers.
pub fn write_adjacency_matrix(graph: &Graph, path: &Path, weighted: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    let matrix = graph.adjacency_matrix(weighted);

    for row in matrix.rows() {
        let line = row
            .iter()
            .map(|x| if weighted { format!("{x:e}") } else { format!("{}", *x as u8) })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GML: &str = r#"
graph [
  directed 0
  # a comment
  node [ id 0 label "alpha" ]
  node [ id 1 label "beta" ]
  node [ id 2 ]
  edge [ source 0 target 1 weight 2.5 ]
  edge [ source 1 target 2 ]
  edge [ source 2 target 2 ]
]
"#;

    #[test]
    fn parses_gml_labels_and_weights() {
        let (graph, report) = read_gml(SAMPLE_GML).unwrap();
        assert_eq!(graph.node_count, 3);
        assert_eq!(graph.label(0), "alpha");
        assert_eq!(graph.label(2), "2");
        assert_eq!(graph.edge_weight(0, 1), Some(2.5));
        assert_eq!(graph.edge_weight(1, 2), Some(1.0));
        assert_eq!(report.self_loops_removed, 1);
    }

    #[test]
    fn gml_output_reads_back() {
        let (graph, _) = read_gml(SAMPLE_GML).unwrap();
        let (again, _) = read_gml(&to_gml(&graph)).unwrap();
        assert_eq!(again.node_ids, graph.node_ids);
        assert_eq!(again.edges().collect::<Vec<_>>(), graph.edges().collect::<Vec<_>>());
    }

    #[test]
    fn rejects_edges_to_unknown_nodes() {
        let text = "graph [ node [ id 0 ] edge [ source 0 target 9 ] ]";
        assert!(read_gml(text).is_err());
    }

    #[test]
    fn edge_list_formats() {
        let text = "# header\na b 3\nb c {'weight': 0.5}\nc d {}\n";
        let (graph, _) = read_edge_list(text).unwrap();
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.edge_weight(0, 1), Some(3.0));
        assert_eq!(graph.edge_weight(1, 2), Some(0.5));
        assert_eq!(graph.edge_weight(2, 3), Some(1.0));
    }

    #[test]
    fn adjacency_matrix_and_fallback() {
        let (graph, _) = read_adjacency_matrix("0 1 0\n1 0 2\n0 2 0\n").unwrap();
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge_weight(1, 2), Some(2.0));

        assert!(read_adjacency_matrix("0 1\n1 0 0\n").is_err());
        assert!(read_adjacency_matrix("a b\n").is_err());
    }
}
