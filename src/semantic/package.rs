use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostic, DiagnosticSink, Fix, FixAction};
use crate::parser::ast::Module;
use crate::span::Span;

/// Package segments are lower-case, and the declared package matches the
/// file's directory below its source root. Modules without a path, without a
/// `package` statement, or outside every root only get the segment check.
pub fn check_package(module: &Module, roots: &[PathBuf], sink: &mut dyn DiagnosticSink) {
    let Some(package) = &module.package else {
        return;
    };
    let declared = package.node.path.as_ref().map(|p| p.node.as_str()).unwrap_or("");

    if let Some(path) = &package.node.path {
        let mut offset = path.span.start;
        for segment in path.node.split('.') {
            if segment.starts_with(|c: char| c.is_uppercase()) {
                sink.report(Diagnostic::error(
                    format!("Package name '{segment}' must start with a lower case character"),
                    Span::with_file(offset, offset + segment.len(), path.span.file_id),
                ));
            }
            offset += segment.len() + 1;
        }
    }

    let Some(expected) = module.path.as_deref().and_then(|p| expected_package(p, roots)) else {
        return;
    };
    if declared == expected {
        return;
    }
    let action = match &package.node.path {
        Some(path) => FixAction::ReplaceText { span: path.span, text: expected.clone() },
        None => FixAction::InsertText { offset: package.span.end.saturating_sub(1), text: format!(" {expected}") },
    };
    let span = package.node.path.as_ref().map_or(package.span, |p| p.span);
    sink.report(
        Diagnostic::error(format!("Invalid package name! '{declared}' should be '{expected}'"), span)
            .with_fix(Fix::new("Fix package", action)),
    );
}

/// Dotted package implied by `file`'s directory under the deepest root
/// containing it.
pub fn expected_package(file: &Path, roots: &[PathBuf]) -> Option<String> {
    let dir = file.parent()?;
    let relative = roots
        .iter()
        .filter_map(|root| dir.strip_prefix(root).ok().map(|rel| (root.components().count(), rel)))
        .max_by_key(|(depth, _)| *depth)?
        .1;
    let segments: Vec<String> = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    Some(segments.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn run(src: &str, path: &str, roots: &[&str]) -> Vec<Diagnostic> {
        let module = parse_module(src, 0, Some(PathBuf::from(path))).unwrap();
        let roots: Vec<PathBuf> = roots.iter().map(PathBuf::from).collect();
        let mut sink: Vec<Diagnostic> = Vec::new();
        check_package(&module, &roots, &mut sink);
        sink
    }

    #[test]
    fn deepest_root_wins() {
        let roots = vec![PathBuf::from("/work"), PathBuf::from("/work/src")];
        let file = Path::new("/work/src/game/ui/Button.hx");
        assert_eq!(expected_package(file, &roots).as_deref(), Some("game.ui"));
        assert_eq!(expected_package(Path::new("/other/A.hx"), &roots), None);
        assert_eq!(expected_package(Path::new("/work/src/Main.hx"), &roots).as_deref(), Some(""));
    }

    #[test]
    fn matching_package_is_clean() {
        let diags = run("package game.ui;\nclass Button {}", "/work/src/game/ui/Button.hx", &["/work/src"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn wrong_package_is_replaced() {
        let src = "package game.view;\nclass Button {}";
        let diags = run(src, "/work/src/game/ui/Button.hx", &["/work/src"]);
        assert_eq!(diags.len(), 1);
        insta::assert_snapshot!(&diags[0].message, @"Invalid package name! 'game.view' should be 'game.ui'");
        assert_eq!(diags[0].fixes[0].action, FixAction::ReplaceText { span: Span::new(8, 17), text: "game.ui".into() });
    }

    #[test]
    fn bare_package_gets_an_insertion() {
        let diags = run("package;\nclass Button {}", "/work/src/game/Button.hx", &["/work/src"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].fixes[0].action, FixAction::InsertText { offset: 7, text: " game".into() });
    }

    #[test]
    fn upper_case_segments() {
        let diags = run("package game.Ui;\nclass Button {}", "/work/src/game/Ui/Button.hx", &["/work/src"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Package name 'Ui' must start with a lower case character");
        assert_eq!(diags[0].span, Span::new(13, 15));
    }

    #[test]
    fn outside_every_root() {
        assert!(run("package anything;\nclass A {}", "/tmp/A.hx", &["/work/src"]).is_empty());
    }
}
