#![allow(dead_code)]

use std::process::Command;

use hxsema::diagnostics::Diagnostic;
use hxsema::model::Project;
use hxsema::parser::parse_module;
use hxsema::semantic::ValidationOptions;

pub fn hxsema() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hxsema"))
}

/// Index a single in-memory module.
pub fn project(source: &str) -> Project {
    Project::new(vec![parse_module(source, 0, None).expect("source should parse")])
}

/// Index several in-memory modules; file ids follow the slice order.
pub fn project_of(sources: &[&str]) -> Project {
    let modules = sources
        .iter()
        .enumerate()
        .map(|(i, s)| parse_module(s, i as u32, None).expect("source should parse"))
        .collect();
    Project::new(modules)
}

pub fn check(source: &str) -> Vec<Diagnostic> {
    hxsema::analyze_source(source, &ValidationOptions::default()).expect("source should parse")
}

pub fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message.clone()).collect()
}
