use weft_model::compact::BlueprintCompiler;
use weft_model::{Interning, Severity};
use weft_syntax::Lexer;
use weft_validator::{Context, ContextState, QueryGraph, ValidationStateType};

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::exit;
use std::rc::Rc;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
enum Cli {
    Validate {
        /// Position tracking: "stack" (single branch, rejects ambiguous
        /// blueprints) or "many" (simultaneous branches).
        #[structopt(long, default_value = "stack")]
        discipline: String,
        /// Also report successful validation.
        #[structopt(long)]
        verbose: bool,
        blueprint: PathBuf,
        docs: Vec<PathBuf>,
    },
}

fn main() {
    match Cli::from_args() {
        Cli::Validate {
            discipline,
            verbose,
            blueprint,
            docs,
        } => validate(&discipline, verbose, blueprint, docs),
    }
}

fn read(path: &PathBuf, what: &str) -> String {
    let mut f = File::open(path).unwrap_or_else(|e| {
        eprintln!("cannot open {} {:?}: {}", what, path, e);
        exit(1);
    });
    let mut text = String::new();
    f.read_to_string(&mut text).unwrap_or_else(|e| {
        eprintln!("cannot read {} {:?}: {}", what, path, e);
        exit(1);
    });
    text
}

fn validate(discipline: &str, verbose: bool, blueprint: PathBuf, docs: Vec<PathBuf>) {
    let discipline = match discipline {
        "many" => ValidationStateType::Many,
        "stack" => ValidationStateType::Stack,
        other => {
            eprintln!(
                "unknown discipline {:?} (expected \"many\" or \"stack\")",
                other
            );
            exit(1);
        }
    };

    let source = read(&blueprint, "blueprint");
    let mut compiler = BlueprintCompiler::new();
    let pattern = match compiler.compile(&blueprint.to_string_lossy(), &source) {
        Ok(pattern) => pattern,
        Err(err) => {
            compiler.dump_diagnostic(&err);
            exit(1);
        }
    };
    let graph = match QueryGraph::compile(&pattern, discipline) {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    let graph = Rc::new(graph);
    let mut aliases = compiler.into_aliases();

    let mut failed = false;
    for doc in docs {
        let text = read(&doc, "document");
        let mut map = codemap::CodeMap::new();
        let file = map.add_file(doc.to_string_lossy().to_string(), text);
        eprintln!("Validating {:?}", doc);

        let mut context = Context::new(graph.clone()).with_verbose(verbose);
        let mut resolver = Interning(&mut aliases);
        let mut lex_failure = None;
        for item in Lexer::new(&file, &mut resolver) {
            match item {
                Ok(event) => context.on_event(event),
                Err(err) => {
                    lex_failure = Some(err);
                    break;
                }
            }
        }

        let mut emitter = codemap_diagnostic::Emitter::stderr(
            codemap_diagnostic::ColorConfig::Auto,
            Some(&map),
        );
        match lex_failure {
            Some(err) => {
                // the event stream itself is broken: cancel validation and
                // report only the producer's failure
                context.abort();
                emitter.emit(&[codemap_diagnostic::Diagnostic {
                    level: codemap_diagnostic::Level::Error,
                    message: err.to_string(),
                    code: None,
                    spans: vec![codemap_diagnostic::SpanLabel {
                        span: err.span(),
                        label: None,
                        style: codemap_diagnostic::SpanStyle::Primary,
                    }],
                }]);
                failed = true;
            }
            None => {
                if context.state() == ContextState::Created {
                    eprintln!("{:?}: document contains no events", doc);
                    failed = true;
                    continue;
                }
                context.complete();
                for validation in context.take_validations() {
                    if validation.severity == Severity::Error {
                        failed = true;
                    }
                    emitter.emit(&[validation.diagnostic()]);
                }
            }
        }
    }
    if failed {
        exit(2);
    }
}
