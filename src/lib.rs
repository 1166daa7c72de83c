pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod visit;
pub mod model;
pub mod typeck;
pub mod semantic;
pub mod config;

use std::path::{Path, PathBuf};

use diagnostics::{AnalysisError, Diagnostic};
use model::Project;
use semantic::ValidationOptions;
use tracing::debug;
use typeck::TypeResolver;

/// One input file. Its index in the slice handed to `parse_sources` is the
/// `file_id` carried by every span of its module.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: Option<PathBuf>,
    pub text: String,
}

impl SourceFile {
    pub fn new(text: impl Into<String>) -> Self {
        Self { path: None, text: text.into() }
    }

    pub fn read(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(format!("could not read source file: {e}"), path.to_path_buf()))?;
        Ok(Self { path: Some(path.to_path_buf()), text })
    }

    /// Name used when rendering reports.
    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<input>".to_string(),
        }
    }
}

/// Parse every file and index the ones that parsed. Files with a syntax error
/// are left out of the project and returned with their index. Module paths
/// are resolved so the package check sees them the way it sees the roots.
pub fn parse_sources(files: &[SourceFile]) -> (Project, Vec<(usize, AnalysisError)>) {
    let mut modules = Vec::new();
    let mut failures = Vec::new();
    for (idx, file) in files.iter().enumerate() {
        let path = file.path.as_deref().map(config::resolve_path);
        match parser::parse_module(&file.text, idx as u32, path) {
            Ok(module) => modules.push(module),
            Err(err) => {
                debug!(file = %file.display_name(), %err, "skipping file with syntax error");
                failures.push((idx, err));
            }
        }
    }
    (Project::new(modules), failures)
}

/// Run every validator over every module of `project`.
pub fn analyze(project: &Project, options: &ValidationOptions) -> Vec<Diagnostic> {
    let mut resolver = TypeResolver::new(project);
    let mut sink: Vec<Diagnostic> = Vec::new();
    for module in 0..project.modules().len() {
        semantic::check_module(&mut resolver, module, options, &mut sink);
    }
    sink
}

/// Parse and check a single source text.
pub fn analyze_source(source: &str, options: &ValidationOptions) -> Result<Vec<Diagnostic>, AnalysisError> {
    let module = parser::parse_module(source, 0, None)?;
    let project = Project::new(vec![module]);
    Ok(analyze(&project, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_keep_other_files() {
        let files = vec![
            SourceFile::new("class A { var x:Int = 1; }"),
            SourceFile::new("class B { var = ; }"),
            SourceFile::new("class C extends A {}"),
        ];
        let (project, failures) = parse_sources(&files);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert!(matches!(failures[0].1, AnalysisError::Syntax { .. }));
        let c = project.class_by_qualified_name("C").unwrap();
        assert_eq!(c.parent_class().map(|p| p.name()), Some("A"));
        assert!(analyze(&project, &ValidationOptions::default()).is_empty());
    }

    #[test]
    fn analyze_single_source() {
        let diags = analyze_source("class A { var n:Int = 'hello'; }", &ValidationOptions::default()).unwrap();
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
    }
}
