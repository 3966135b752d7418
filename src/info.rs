use std::path::Path;

use serde::Serialize;

use crate::commands;
use crate::config::CONFIG_FILE;
use crate::grammar::RUBY_EXTENSIONS;
use crate::registry::{EntityKind, Origin, Registry as _};

/// Output the comprehensive showsrc reference document.
pub fn run(root: &Path, json: bool) {
    let state = gather_state(root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

#[derive(Default, Serialize)]
struct CurrentState {
    classes: usize,
    config_found: bool,
    docs_url: Option<String>,
    exclude: Vec<String>,
    include: Vec<String>,
    /// Why the project could not be loaded, if it couldn't.
    load_error: Option<String>,
    methods: usize,
    modules: usize,
    native_methods: usize,
    sourced_methods: usize,
    values: usize,
}

fn gather_state(root: &Path) -> CurrentState {
    let mut state = CurrentState {
        config_found: root.join(CONFIG_FILE).exists(),
        ..CurrentState::default()
    };

    let project = match commands::load(root) {
        Ok(project) => project,
        Err(e) => {
            state.load_error = Some(e.to_string());
            return state;
        },
    };

    state.docs_url = Some(project.config.docs_url.clone());
    state.exclude.clone_from(&project.config.exclude);
    state.include.clone_from(&project.config.include);

    for entity in project.index.entities() {
        match entity.kind {
            EntityKind::Class => state.classes = state.classes.saturating_add(1),
            EntityKind::Module => state.modules = state.modules.saturating_add(1),
            EntityKind::Value => state.values = state.values.saturating_add(1),
        }
    }

    for (owner, scope, name) in project.index.methods() {
        state.methods = state.methods.saturating_add(1);
        match project.index.method(owner, scope, name) {
            Some(Origin::Native { .. }) => state.native_methods = state.native_methods.saturating_add(1),
            Some(Origin::Sourced { .. }) => state.sourced_methods = state.sourced_methods.saturating_add(1),
            Some(Origin::Unknown) | None => {},
        }
    }

    state
}

// ── Markdown output ───────────────────────────────────────────────────

fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

fn print_markdown_header(version: &str) {
    let extensions = RUBY_EXTENSIONS
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(" ");
    print!(
        "\
# showsrc {version}

Locate the source definition and documentation page of Ruby constants and
methods from a statically built index of a project.

## Reference Syntax

    Foo::Bar          constant
    ::Foo             constant, absolute
    Foo::Bar#baz      instance method
    Foo::Bar.baz      class method
    #puts             top-level method (owned by Object)
    Foo#baz -s        definition one level up the ancestor chain
    Foo#baz -ss       two levels up

## Commands

    showsrc show <ref>       Docs link plus file, line, and definition
    showsrc doc <ref>        Docs URL only
    showsrc list [--sourced] Every indexed constant and method
    showsrc info [--json]    This document

## Indexed Files

    {extensions}

## Configuration ({CONFIG_FILE})

    include = [\"lib/\"]                  # only index these paths
    exclude = [\"lib/vendor/\"]           # skip these paths
    core = true                         # load built-in core classes
    docs_url = \"https://docs.ruby-lang.org/en/master/\"

    [[native]]                          # natively compiled entities
    name = \"Zlib\"
    kind = \"module\"
    file = \"ext/zlib.so\"
    class_methods = [\"crc32\"]

## Current State

"
    );
}

fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:     {CONFIG_FILE} (found)");
    } else {
        println!("Config:     {CONFIG_FILE} (not found)");
    }

    if let Some(reason) = &state.load_error {
        println!("Index:      not built ({reason})");
        return;
    }

    if let Some(url) = &state.docs_url {
        println!("Docs:       {url}");
    }
    if !state.include.is_empty() {
        println!("Include:    {}", state.include.join(", "));
    }
    if !state.exclude.is_empty() {
        println!("Exclude:    {}", state.exclude.join(", "));
    }
    println!(
        "Constants:  {} classes, {} modules, {} values",
        state.classes, state.modules, state.values
    );
    println!(
        "Methods:    {} ({} sourced, {} native)",
        state.methods, state.sourced_methods, state.native_methods
    );
}

fn print_markdown_exit_codes() {
    print!(
        "\
## Exit Codes

| Code | Meaning |
|------|---------|
| 0    | Source location or docs link found |
| 1    | Neither found |
| 2    | Invalid reference or runtime error |
"
    );
}

// ── JSON output ───────────────────────────────────────────────────────

#[derive(Serialize)]
struct InfoJson<'a> {
    current_state: &'a CurrentState,
    exit_codes: Vec<ExitCodeInfo>,
    indexed_extensions: Vec<String>,
    version: String,
}

#[derive(Serialize)]
struct ExitCodeInfo {
    code: u8,
    meaning: String,
}

fn print_json(state: &CurrentState) {
    let info = InfoJson {
        current_state: state,
        exit_codes: vec![
            ExitCodeInfo { code: 0, meaning: "Source location or docs link found".to_string() },
            ExitCodeInfo { code: 1, meaning: "Neither found".to_string() },
            ExitCodeInfo { code: 2, meaning: "Invalid reference or runtime error".to_string() },
        ],
        indexed_extensions: RUBY_EXTENSIONS.iter().map(|e| format!(".{e}")).collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
