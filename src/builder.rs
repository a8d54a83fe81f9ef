//! Build Orchestrator
//!
//! Sequences the run:
//!
//! `Uninitialized -> DefinitionBuilt -> ClassesEmitted ->
//! StaticArtifactsEmitted -> (TestsEmitted) -> Done`
//!
//! The definition (ingest + resolve) runs exactly once; repeated requests
//! return the memoized frozen graph. Static artifacts read graph data only,
//! never generated files, so their one ordering requirement is "after the
//! graph freezes". Any emission or write failure aborts the run; partially
//! written output is an operator concern, not rolled back.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Config;
use crate::emit::{statics, ArtifactKind, TemplateSet};
use crate::error::{BuildError, ConfigurationError, EmissionError};
use crate::graph::{file_stem_for, resolve, Type, TypeGraph, TypeKind};
use crate::ingest::ingest;
use crate::writer::ArtifactWriter;

/// Orchestrator phase, monotonically advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Uninitialized,
    DefinitionBuilt,
    ClassesEmitted,
    StaticArtifactsEmitted,
    TestsEmitted,
    Done,
}

/// Drives a full generation run against an [`ArtifactWriter`].
pub struct Builder<'a, W: ArtifactWriter> {
    config: &'a Config,
    writer: &'a mut W,
    templates: TemplateSet,
    definition: Option<TypeGraph>,
    state: BuildState,
}

impl<'a, W: ArtifactWriter> Builder<'a, W> {
    /// Validates configuration up front; a bad config never starts ingesting.
    pub fn new(config: &'a Config, writer: &'a mut W) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            config,
            writer,
            templates: TemplateSet::standard(),
            definition: None,
            state: BuildState::Uninitialized,
        })
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// The frozen graph. Built on first request, memoized afterwards.
    pub fn definition(&mut self) -> Result<&TypeGraph, BuildError> {
        if self.definition.is_none() {
            info!("building definition");
            let source = self
                .config
                .source_path()
                .ok_or(ConfigurationError::MissingSourcePath)?;
            let arena = ingest(&source, &self.config.source)?;
            let graph = resolve(arena, &self.config.resolution.cycle_whitelist)?;
            self.definition = Some(graph);
            self.advance(BuildState::DefinitionBuilt);
        }
        Ok(self.definition.as_ref().expect("definition just built"))
    }

    /// Run every phase.
    pub fn build(&mut self) -> Result<(), BuildError> {
        self.build_classes()?;
        self.build_static_artifacts()?;
        if !self.config.tests.skip {
            self.build_tests()?;
        }
        self.advance(BuildState::Done);
        info!("build complete");
        Ok(())
    }

    /// Emit one class file per type, in stable qualified-name order.
    pub fn build_classes(&mut self) -> Result<(), BuildError> {
        self.definition()?;
        let graph = self.definition.as_ref().expect("definition built");

        info!("generating class artifacts");
        for ty in graph.types_sorted() {
            // Primitives live in the static alias module, not per-type files
            if ty.kind == TypeKind::Primitive {
                continue;
            }
            debug!(name = %ty.name, "generating class");
            let mut contents = class_file_header(ty);
            for artifact in [
                ArtifactKind::Class,
                ArtifactKind::XmlCodec,
                ArtifactKind::JsonCodec,
            ] {
                contents.push_str(&self.templates.emit(ty, artifact, graph, self.config)?);
                contents.push('\n');
            }

            let path = substitute_path(&self.config.output.class_path_template, ty);
            self.writer
                .write(&path, contents.as_bytes())
                .map_err(|source| EmissionError::WriteFailed { path, source })?;
        }

        self.advance(BuildState::ClassesEmitted);
        Ok(())
    }

    /// Emit the fixed cross-cutting artifact set.
    pub fn build_static_artifacts(&mut self) -> Result<(), BuildError> {
        self.definition()?;
        let graph = self.definition.as_ref().expect("definition built");

        info!("generating static artifacts");
        for (path, contents) in statics::emit_all(graph, self.config) {
            debug!(path = %path.display(), "writing static artifact");
            self.writer
                .write(&path, contents.as_bytes())
                .map_err(|source| EmissionError::WriteFailed { path, source })?;
        }

        self.advance(BuildState::StaticArtifactsEmitted);
        Ok(())
    }

    /// Emit unit-test scaffolding for every type, and integration tests for
    /// domain resources when an endpoint is configured.
    pub fn build_tests(&mut self) -> Result<(), BuildError> {
        self.definition()?;
        let graph = self.definition.as_ref().expect("definition built");

        info!("generating test artifacts");
        for ty in graph.types_sorted() {
            if ty.kind == TypeKind::Primitive {
                continue;
            }
            let contents = self
                .templates
                .emit(ty, ArtifactKind::UnitTest, graph, self.config)?;
            let path = substitute_path(&self.config.output.test_path_template, ty);
            self.writer
                .write(&path, contents.as_bytes())
                .map_err(|source| EmissionError::WriteFailed { path, source })?;
        }

        if self.config.tests.endpoint.is_some() {
            for ty in graph.types_sorted() {
                if !graph.is_domain_resource(&ty.name) {
                    continue;
                }
                let contents =
                    self.templates
                        .emit(ty, ArtifactKind::IntegrationTest, graph, self.config)?;
                let path =
                    PathBuf::from(format!("tests/integration/{}.rs", file_stem_for(&ty.name)));
                self.writer
                    .write(&path, contents.as_bytes())
                    .map_err(|source| EmissionError::WriteFailed { path, source })?;
            }
        }

        self.advance(BuildState::TestsEmitted);
        Ok(())
    }

    fn advance(&mut self, next: BuildState) {
        if next > self.state {
            self.state = next;
        }
    }
}

fn class_file_header(ty: &Type) -> String {
    let source = ty
        .source_location
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| ty.source_location.display().to_string());
    format!(
        "//! `{}` - generated by fhirgen from {}, DO NOT EDIT\n\n",
        ty.name, source
    )
}

fn substitute_path(template: &str, ty: &Type) -> PathBuf {
    PathBuf::from(
        template
            .replace("{ns}", &ty.namespace)
            .replace("{file}", &file_stem_for(&ty.name)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeKind;

    fn sample_type() -> Type {
        Type {
            name: "Observation.ReferenceRange".to_string(),
            kind: TypeKind::Complex,
            namespace: "backbone".to_string(),
            class_name: "FhirObservationReferenceRange".to_string(),
            base_type: None,
            properties: Vec::new(),
            enum_values: Vec::new(),
            recursive_container: false,
            source_location: PathBuf::from("/schemas/observation.xsd"),
        }
    }

    #[test]
    fn test_substitute_path() {
        let ty = sample_type();
        assert_eq!(
            substitute_path("src/{ns}/{file}.rs", &ty),
            PathBuf::from("src/backbone/observation_reference_range.rs")
        );
    }

    #[test]
    fn test_class_file_header_uses_basename() {
        let header = class_file_header(&sample_type());
        assert!(header.contains("observation.xsd"));
        assert!(!header.contains("/schemas/"));
    }

    #[test]
    fn test_state_ordering() {
        assert!(BuildState::Uninitialized < BuildState::DefinitionBuilt);
        assert!(BuildState::ClassesEmitted < BuildState::StaticArtifactsEmitted);
        assert!(BuildState::TestsEmitted < BuildState::Done);
    }
}
