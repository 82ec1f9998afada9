//! Compilation pipeline driving all Cyrex compiler stages
//!
//! The binary in `main.rs` is a thin wrapper around [`compile_source`] and
//! [`compile_file`]; keeping the pipeline here lets tests run it without
//! spawning a process.

use anyhow::{bail, Context, Result};
use cyrex_ir::IrGen;
use cyrex_x64::X64Codegen;
use std::fs;
use std::path::Path;

/// Per-invocation pipeline switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Run the machine-code optimizer.
    pub optimized: bool,
    /// Produce the textual IR dump.
    pub ir_dump: bool,
    /// Annotate the IR dump with per-block liveness sets.
    pub liveness: bool,
}

/// Successful compilation of one source file.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub assembly: String,
    /// Empty unless the IR dump was requested.
    pub ir: String,
}

/// Compile a single source text. On failure every accumulated diagnostic
/// is returned, already rendered one message per element.
pub fn compile_source(source: &str, options: &Options) -> Result<Compilation, Vec<String>> {
    let render = |errors: Vec<cyrex_common::CyrexError>| -> Vec<String> {
        errors.into_iter().map(|e| e.to_string()).collect()
    };

    let tokens = cyrex_lexer::tokenize(source).map_err(render)?;
    let program = cyrex_parser::parse(tokens).map_err(render)?;

    let mut ir = IrGen::new();
    ir.generate(&program);
    if ir.has_errors() {
        return Err(ir
            .errors()
            .iter()
            .map(|e| cyrex_common::CyrexError::ir(e.to_string()).to_string())
            .collect());
    }

    let dump = if options.ir_dump {
        cyrex_ir::dump_module(&ir, options.liveness)
    } else {
        String::new()
    };

    let codegen = X64Codegen::new(&ir, options.optimized);
    Ok(Compilation { assembly: codegen.assembly(), ir: dump })
}

/// Compile one `.cyrex` file to `<stem>.S` (and `<stem>.ir` when asked).
/// Diagnostics go to stderr, one per line.
pub fn compile_file(input: &Path, options: &Options) -> Result<()> {
    if input.extension().and_then(|e| e.to_str()) != Some("cyrex") {
        bail!("{} is not a .cyrex source file", input.display());
    }

    let source = fs::read_to_string(input)
        .with_context(|| format!("could not read {}", input.display()))?;

    let compilation = match compile_source(&source, options) {
        Ok(compilation) => compilation,
        Err(messages) => {
            for message in &messages {
                eprintln!("{}", message);
            }
            bail!("{}: {} error(s)", input.display(), messages.len());
        }
    };

    let asm_path = input.with_extension("S");
    fs::write(&asm_path, &compilation.assembly)
        .with_context(|| format!("could not write {}", asm_path.display()))?;
    log::info!("wrote {}", asm_path.display());

    if options.ir_dump {
        let ir_path = input.with_extension("ir");
        fs::write(&ir_path, &compilation.ir)
            .with_context(|| format!("could not write {}", ir_path.display()))?;
        log::info!("wrote {}", ir_path.display());
    }

    Ok(())
}
