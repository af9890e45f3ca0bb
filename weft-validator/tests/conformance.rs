// End-to-end conformance tests: compact blueprint text and weft document
// text in, validations out, through the same pipeline the CLI drives
// (blueprint compiler -> query graph -> lexer -> context).

use std::rc::Rc;
use weft_model::compact::BlueprintCompiler;
use weft_model::{Interning, Severity};
use weft_syntax::{LexError, Lexer};
use weft_validator::{codes, Context, ContextState, QueryGraph, Validation, ValidationStateType};

fn validate_with(
    blueprint: &str,
    doc: &str,
    discipline: ValidationStateType,
) -> Vec<Validation> {
    let mut compiler = BlueprintCompiler::new();
    let bp = match compiler.compile("main.wbp", blueprint) {
        Ok(bp) => bp,
        Err(err) => {
            compiler.dump_diagnostic(&err);
            panic!("blueprint: {}", err);
        }
    };
    let graph =
        Rc::new(QueryGraph::compile(&bp, discipline).unwrap_or_else(|e| panic!("compile: {}", e)));
    let mut aliases = compiler.into_aliases();

    let mut map = codemap::CodeMap::new();
    let file = map.add_file("doc.wml".to_string(), doc.to_string());
    let mut resolver = Interning(&mut aliases);
    let mut context = Context::new(graph);
    for item in Lexer::new(&file, &mut resolver) {
        match item {
            Ok(event) => context.on_event(event),
            Err(err) => panic!("lexer: {}", err),
        }
    }
    if context.state() == ContextState::Created {
        return Vec::new();
    }
    context.complete();
    context.take_validations()
}

fn error_codes(blueprint: &str, doc: &str, discipline: ValidationStateType) -> Vec<String> {
    validate_with(blueprint, doc, discipline)
        .into_iter()
        .filter(|v| v.severity == Severity::Error)
        .map(|v| v.code)
        .collect()
}

fn assert_valid(blueprint: &str, doc: &str, discipline: ValidationStateType) {
    let errors = error_codes(blueprint, doc, discipline);
    assert!(errors.is_empty(), "expected valid, got {:?}", errors);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Structure acceptance
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn document_matching_its_blueprint_is_silent() {
    let blueprint = "element doc { (space | element para { (word | space)* })* }";
    let doc = "{doc {para hello world} {para again}}";
    assert_valid(blueprint, doc, ValidationStateType::Stack);
    assert_valid(blueprint, doc, ValidationStateType::Many);
}

#[test]
fn braceless_element_admits_any_content() {
    let blueprint = "element doc";
    let doc = "{doc words {a nested {b deeper}} trailing}";
    assert_valid(blueprint, doc, ValidationStateType::Stack);
    assert_valid(blueprint, doc, ValidationStateType::Many);
}

#[test]
fn word_literals_and_regexes_constrain_text() {
    assert_valid(
        "element id { /[a-z]+-[0-9]+/ }",
        "{id abc-42}",
        ValidationStateType::Stack,
    );
    assert_eq!(
        error_codes("element id { /^[a-z]+$/ }", "{id 42}", ValidationStateType::Stack)
            .first()
            .map(String::as_str),
        Some(codes::UNEXPECTED_EVENT)
    );
    assert_valid(
        "element greeting { \"hello\", space, word }",
        "{greeting hello world}",
        ValidationStateType::Stack,
    );
}

#[test]
fn choices_and_repetition_compose() {
    let blueprint = "(space | element a { word } | element b)*";
    assert_valid(blueprint, "{a x} {b whatever {c}} {a y}", ValidationStateType::Stack);
}

#[test]
fn missing_required_content_is_rejected() {
    let errors = error_codes(
        "element doc { \"hello\" }",
        "{doc}",
        ValidationStateType::Stack,
    );
    assert_eq!(errors.first().map(String::as_str), Some(codes::UNEXPECTED_EVENT));
}

#[test]
fn document_without_the_required_element_is_rejected() {
    let errors = error_codes(
        "element doc { word* }",
        "nothing",
        ValidationStateType::Stack,
    );
    assert!(!errors.is_empty());
}

// ═══════════════════════════════════════════════════════════════════════════════
// Disciplines
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn ambiguous_blueprints_need_many() {
    let mut compiler = BlueprintCompiler::new();
    let bp = compiler
        .compile(
            "amb.wbp",
            "(element a { \"x\" }) | (element a { \"y\" })",
        )
        .unwrap();
    assert!(QueryGraph::compile(&bp, ValidationStateType::Stack).is_err());
    assert!(QueryGraph::compile(&bp, ValidationStateType::Many).is_ok());

    let blueprint = "(element a { \"x\" }) | (element a { \"y\" })";
    assert_valid(blueprint, "{a x}", ValidationStateType::Many);
    assert_valid(blueprint, "{a y}", ValidationStateType::Many);
    assert!(!error_codes(blueprint, "{a z}", ValidationStateType::Many).is_empty());
}

#[test]
fn one_error_per_malformed_region() {
    let blueprint = "(space | element item { word })*";
    let doc = "{item ok} {wrong stuff {deep}} {item fine}";
    let errors = error_codes(blueprint, doc, ValidationStateType::Stack);
    assert_eq!(errors, vec![codes::UNEXPECTED_EVENT]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Reporting
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn flagged_patterns_emit_their_report() {
    let blueprint = "element doc { (space | @warn(\"legacy-break\", \"break is obsolete\") element break | element para { word* })* }";
    let out = validate_with(
        blueprint,
        "{doc {para x} {break}}",
        ValidationStateType::Stack,
    );
    let warnings: Vec<&Validation> = out
        .iter()
        .filter(|v| v.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].code, "legacy-break");
    assert!(out.iter().all(|v| v.severity != Severity::Error));
}

#[test]
fn verbose_mode_confirms_success() {
    let mut compiler = BlueprintCompiler::new();
    let bp = compiler.compile("main.wbp", "element doc { word* }").unwrap();
    let graph = Rc::new(QueryGraph::compile(&bp, ValidationStateType::Stack).unwrap());
    let mut aliases = compiler.into_aliases();

    let mut map = codemap::CodeMap::new();
    let file = map.add_file("doc.wml".to_string(), "{doc hi}".to_string());
    let mut resolver = Interning(&mut aliases);
    let mut context = Context::new(graph).with_verbose(true);
    for item in Lexer::new(&file, &mut resolver) {
        context.on_event(item.expect("lex"));
    }
    context.complete();
    let out = context.take_validations();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].severity, Severity::Verbose);
    assert_eq!(out[0].code, codes::BLUEPRINT_SATISFIED);
}

#[test]
fn mismatch_messages_render_the_expected_predicates() {
    let out = validate_with(
        "element doc { \"yes\" }",
        "{doc no}",
        ValidationStateType::Stack,
    );
    let mismatch = out
        .iter()
        .find(|v| v.code == codes::UNEXPECTED_EVENT)
        .expect("mismatch validation");
    assert!(
        mismatch.message.contains("$only(yes)"),
        "message was {:?}",
        mismatch.message
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lexer boundary
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn strict_resolution_surfaces_unknown_tags() {
    let mut compiler = BlueprintCompiler::new();
    compiler.compile("main.wbp", "element doc { word* }").unwrap();
    // strict mode: the alias table itself is the resolver
    let mut aliases = compiler.into_aliases();
    let mut map = codemap::CodeMap::new();
    let file = map.add_file("doc.wml".to_string(), "{doc {stranger}}".to_string());
    let items: Vec<_> = Lexer::new(&file, &mut aliases).collect();
    let last = items.last().expect("at least one item");
    match last {
        Err(LexError::UnknownTag { name, .. }) => assert_eq!(name, "stranger"),
        other => panic!("expected unknown-tag failure, got {:?}", other),
    }
}

#[test]
fn aliases_resolve_consistently_between_blueprint_and_document() {
    // "doc" interned while compiling the blueprint must be the id the
    // lexer produces for the same name
    let mut compiler = BlueprintCompiler::new();
    compiler.compile("main.wbp", "element doc").unwrap();
    let id = compiler.aliases().resolve("doc").expect("declared");
    let mut aliases = compiler.into_aliases();
    let mut map = codemap::CodeMap::new();
    let file = map.add_file("doc.wml".to_string(), "{doc}".to_string());
    let mut resolver = Interning(&mut aliases);
    let first = Lexer::new(&file, &mut resolver)
        .next()
        .expect("one event")
        .expect("no error");
    assert_eq!(first.tag(), Some(id));
}
