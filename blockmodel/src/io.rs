//! Writing fitted models as plain text or JSON, and reading them back.

use crate::blockmodel::Blockmodel;
use crate::graph::UndirectedGraph;
use crate::selection::{aic, bic};
use matrix_util::common_io::open_buf_reader;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

/// Output format of a fitted model
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// human-readable text
    Plain,
    /// structured JSON
    Json,
    /// no output
    Null,
}

/// Writes one fitted model to a stream
pub trait ModelWriter {
    fn write(&self, model: &Blockmodel, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Writer for the given format
pub fn model_writer(format: OutputFormat) -> Box<dyn ModelWriter> {
    match format {
        OutputFormat::Plain => Box::new(PlainTextWriter),
        OutputFormat::Json => Box::new(JsonWriter),
        OutputFormat::Null => Box::new(NullWriter),
    }
}

/// Comment-prefixed summary, the probability matrix, then one
/// `vertex<TAB>type` line per vertex
pub struct PlainTextWriter;

impl ModelWriter for PlainTextWriter {
    fn write(&self, model: &Blockmodel, out: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(out, "# Vertices: {}", model.num_vertices())?;
        writeln!(out, "# Edges: {}", model.graph().num_edges())?;
        writeln!(out, "# Types: {}", model.num_types())?;
        writeln!(out, "# Log-likelihood: {:.6}", model.log_likelihood())?;
        writeln!(out, "# AIC: {:.6}", aic(model))?;
        writeln!(out, "# BIC: {:.6}", bic(model))?;

        writeln!(out, "# Probabilities:")?;
        for row in model.probabilities().rows() {
            let line: Vec<String> = row.iter().map(|p| format!("{:.6}", p)).collect();
            writeln!(out, "# {}", line.join("\t"))?;
        }

        writeln!(out, "# Types:")?;
        for (v, t) in model.types().iter().enumerate() {
            writeln!(out, "{}\t{}", v, t)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Pretty-printed [`FittedModel`]
pub struct JsonWriter;

impl ModelWriter for JsonWriter {
    fn write(&self, model: &Blockmodel, out: &mut dyn Write) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &FittedModel::from(model))?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

/// Discards the model
pub struct NullWriter;

impl ModelWriter for NullWriter {
    fn write(&self, _model: &Blockmodel, _out: &mut dyn Write) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Serialized form of a fitted model, independent of the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub num_types: usize,
    pub num_vertices: usize,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub types: Vec<usize>,
    pub probabilities: Vec<Vec<f64>>,
}

impl From<&Blockmodel<'_>> for FittedModel {
    fn from(model: &Blockmodel<'_>) -> Self {
        FittedModel {
            num_types: model.num_types(),
            num_vertices: model.num_vertices(),
            log_likelihood: model.log_likelihood(),
            aic: aic(model),
            bic: bic(model),
            types: model.types().to_vec(),
            probabilities: model
                .probabilities()
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

impl FittedModel {
    /// Check that the fields describe one consistent model
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.num_types == 0 {
            return Err(anyhow::anyhow!("a fitted model needs at least one type"));
        }
        if self.types.len() != self.num_vertices {
            return Err(anyhow::anyhow!(
                "{} types listed for {} vertices",
                self.types.len(),
                self.num_vertices
            ));
        }
        if let Some(&t) = self.types.iter().find(|&&t| t >= self.num_types) {
            return Err(anyhow::anyhow!("type {} outside 0..{}", t, self.num_types));
        }
        if self.probabilities.len() != self.num_types
            || self.probabilities.iter().any(|row| row.len() != self.num_types)
        {
            return Err(anyhow::anyhow!(
                "probability matrix is not {0} x {0}",
                self.num_types
            ));
        }
        Ok(())
    }

    /// Rebuild a live model over `graph` from the stored assignment
    pub fn into_blockmodel(self, graph: &UndirectedGraph) -> anyhow::Result<Blockmodel<'_>> {
        if graph.num_vertices() != self.num_vertices {
            return Err(anyhow::anyhow!(
                "model has {} vertices but the graph has {}",
                self.num_vertices,
                graph.num_vertices()
            ));
        }
        Blockmodel::with_types(graph, self.num_types, self.types)
    }
}

/// Read a model written by [`JsonWriter`]
pub fn read_json_model<R: BufRead>(reader: R) -> anyhow::Result<FittedModel> {
    let model: FittedModel = serde_json::from_reader(reader)?;
    model.validate()?;
    Ok(model)
}

/// Read a JSON model from a file (gzipped or not) or `-` for stdin
pub fn read_json_model_file(input_file: &str) -> anyhow::Result<FittedModel> {
    read_json_model(open_buf_reader(input_file)?)
        .map_err(|e| anyhow::anyhow!("{}: {}", input_file, e))
}
