//! Fitted models and their persistence.
//!
//! A model file is a JSON document holding the model kind, the fitted
//! parameters and the version of the crate that wrote it. There is no
//! compatibility guarantee across versions; a mismatch is only logged.

use crate::core::classifier::SvmClassifier;
use crate::core::reduction::{Projection, ReductionKind};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{info, warn};

/// Kind of a fitted model; doubles as the model file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Pca,
    Ica,
    Svm,
}

impl ModelKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ModelKind::Pca => "pca",
            ModelKind::Ica => "ica",
            ModelKind::Svm => "svm",
        }
    }
}

impl From<ReductionKind> for ModelKind {
    fn from(kind: ReductionKind) -> Self {
        match kind {
            ReductionKind::Pca => ModelKind::Pca,
            ReductionKind::Ica => ModelKind::Ica,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An owned fitted model, as loaded from storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "model", content = "params", rename_all = "lowercase")]
pub enum Model {
    Reduction(Projection),
    Classifier(SvmClassifier),
}

/// A borrowed fitted model, as saved to storage.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "model", content = "params", rename_all = "lowercase")]
pub enum ModelRef<'a> {
    Reduction(&'a Projection),
    Classifier(&'a SvmClassifier),
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: &'a str,
    model: ModelRef<'a>,
}

#[derive(Deserialize)]
struct OwnedEnvelope {
    version: String,
    model: Model,
}

impl<'a> ModelRef<'a> {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelRef::Reduction(p) => p.kind().into(),
            ModelRef::Classifier(_) => ModelKind::Svm,
        }
    }

    /// Serialize to any writer.
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        let envelope = Envelope {
            version: crate::VERSION,
            model: *self,
        };
        serde_json::to_writer(writer, &envelope)
            .map_err(|e| PipelineError::Serialize(e.to_string()))
    }

    /// Serialize to a file, creating parent directories as needed.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PipelineError::model_io(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| PipelineError::model_io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)?;
        writer.flush().map_err(|e| PipelineError::model_io(path, e))?;
        info!(path = ?path, kind = %self.kind(), "Saved model");
        Ok(())
    }
}

impl Model {
    pub fn kind(&self) -> ModelKind {
        self.as_model_ref().kind()
    }

    pub fn as_model_ref(&self) -> ModelRef<'_> {
        match self {
            Model::Reduction(p) => ModelRef::Reduction(p),
            Model::Classifier(c) => ModelRef::Classifier(c),
        }
    }

    /// Deserialize from any reader.
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        let envelope: OwnedEnvelope = serde_json::from_reader(reader)
            .map_err(|e| PipelineError::Deserialize(e.to_string()))?;
        if envelope.version != crate::VERSION {
            warn!(
                written_by = %envelope.version,
                current = crate::VERSION,
                "Model was written by a different version"
            );
        }
        Ok(envelope.model)
    }

    /// Deserialize from a file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PipelineError::model_io(path, e))?;
        let model = Self::load(BufReader::new(file))?;
        info!(path = ?path, kind = %model.kind(), "Loaded model");
        Ok(model)
    }

    pub fn into_reduction(self) -> Result<Projection> {
        match self {
            Model::Reduction(p) => Ok(p),
            Model::Classifier(_) => Err(PipelineError::ModelKindMismatch {
                expected: "pca/ica".to_string(),
                actual: ModelKind::Svm.to_string(),
            }),
        }
    }

    pub fn into_classifier(self) -> Result<SvmClassifier> {
        match self {
            Model::Classifier(c) => Ok(c),
            Model::Reduction(p) => Err(PipelineError::ModelKindMismatch {
                expected: ModelKind::Svm.to_string(),
                actual: p.kind().to_string(),
            }),
        }
    }
}
