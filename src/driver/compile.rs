use std::collections::BTreeMap;
use std::fmt::Display;

use crate::backend;
use crate::backend::glue::analyze_glue;
use crate::context::{CompilerIr, DesugaredContext, ParsedContext};
use crate::defuse;
use crate::desugar::desugar;
use crate::diag::CompileError;
use crate::elaborate::elaborate;
use crate::interp::{self, Value};
use crate::lambda_lift::lift_lambdas;
use crate::lexer::{LexError, Lexer, Token};
use crate::parse::Parser;
use crate::quote_lift::lift_quotes;
use crate::tree::ProgId;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Comma-separated list of representations to print, or `all`.
    pub dump: Option<String>,
}

#[derive(Debug)]
pub struct CompileOutput {
    pub js: String,
    /// GLSL source of every shader program.
    pub shaders: BTreeMap<ProgId, String>,
    pub ir: CompilerIr,
}

#[derive(Debug, Default)]
struct DumpFlags {
    ast: bool,
    types: bool,
    desugared: bool,
    defuse: bool,
    progs: bool,
    procs: bool,
    glue: bool,
}

impl DumpFlags {
    // Parse dump flags from comma-separated list, e.g. --dump ast,types,glue
    fn parse(dump: Option<&str>) -> Self {
        let mut flags = DumpFlags::default();
        let Some(dump) = dump else {
            return flags;
        };
        for item in dump.split(',').map(|s| s.trim().to_lowercase()) {
            match item.as_str() {
                "all" => {
                    flags = DumpFlags {
                        ast: true,
                        types: true,
                        desugared: true,
                        defuse: true,
                        progs: true,
                        procs: true,
                        glue: true,
                    }
                }
                "ast" => flags.ast = true,
                "types" => flags.types = true,
                "desugared" => flags.desugared = true,
                "defuse" => flags.defuse = true,
                "progs" => flags.progs = true,
                "procs" => flags.procs = true,
                "glue" => flags.glue = true,
                "" => {}
                _ => tracing::warn!("unknown dump flag: {item}"),
            }
        }
        flags
    }
}

fn dump(title: &str, body: impl Display) {
    println!("{}:", title);
    println!("--------------------------------");
    println!("{}", body);
    println!("--------------------------------");
}

pub fn parse_source(source: &str) -> Result<ParsedContext, CompileError> {
    let lexer = Lexer::new(source);
    let tokens = lexer
        .tokenize()
        .collect::<Result<Vec<Token>, LexError>>()?;

    let mut parser = Parser::new(&tokens);
    let expr = parser.parse()?;
    Ok(ParsedContext::new(expr, parser.into_id_gen()))
}

/// Parse, elaborate and desugar: the front half shared by both modes.
fn check_source(source: &str, flags: &DumpFlags) -> Result<DesugaredContext, CompileError> {
    let parsed = parse_source(source)?;
    tracing::debug!("parsed {} bytes", source.len());
    if flags.ast {
        dump("Parsed Tree", &parsed.expr);
    }

    let elaborated = elaborate(parsed)?;
    tracing::debug!("elaborated {} nodes", elaborated.type_table.len());
    if flags.types {
        dump("Type Table", &elaborated.type_table);
    }

    let desugared = desugar(elaborated)?;
    tracing::debug!("desugared, {} sugar nodes retired", desugared.retired.len());
    if flags.desugared {
        dump("Desugared Tree", &desugared.expr);
    }

    Ok(desugared)
}

pub fn compile(source: &str, opts: &CompileOptions) -> Result<CompileOutput, CompileError> {
    let flags = DumpFlags::parse(opts.dump.as_deref());
    let desugared = check_source(source, &flags)?;

    let analyzed = defuse::analyze(desugared)?;
    if flags.defuse {
        dump("Def/Use Table", &analyzed.def_use);
    }

    let lifted = lift_quotes(analyzed)?;
    tracing::debug!("lifted {} programs", lifted.progs.len());
    if flags.progs {
        dump("Programs", &lifted.progs);
        dump("Main", &lifted.main);
    }

    let lifted = lift_lambdas(lifted)?;
    tracing::debug!("lifted {} procedures", lifted.procs.len());
    if flags.procs {
        dump("Procedures", &lifted.procs);
    }

    let ir = analyze_glue(lifted)?;
    if flags.glue {
        dump("Glue", &ir.glue);
    }

    let code = backend::generate(&ir)?;
    tracing::debug!(
        "generated {} bytes of JavaScript and {} shaders",
        code.js.len(),
        code.shaders.len()
    );

    Ok(CompileOutput {
        js: code.js,
        shaders: code.shaders,
        ir,
    })
}

pub fn interpret(source: &str, opts: &CompileOptions) -> Result<Value, CompileError> {
    let flags = DumpFlags::parse(opts.dump.as_deref());
    let desugared = check_source(source, &flags)?;

    let value = interp::interpret(&desugared)?;
    tracing::debug!("interpreted to a {} value", value.kind_name());
    Ok(value)
}

#[cfg(test)]
#[path = "../tests/t_compile.rs"]
mod tests;
