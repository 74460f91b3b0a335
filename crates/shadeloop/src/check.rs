use std::fs;

use anyhow::{bail, Context, Result};
use renderer::{compile_stages, header_line_count, wrap_fragment, UniformName};

use crate::cli::CheckArgs;

/// Compiles a fragment shader on the CPU and reports the uniforms it reads.
pub fn check(args: CheckArgs) -> Result<()> {
    let path = &args.shader;
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read shader at {}", path.display()))?;

    if args.wrapped {
        println!("{}", wrap_fragment(&text));
    }

    match compile_stages(&text) {
        Ok(stages) => {
            println!("ok: {}", path.display());
            for (name, binding) in stages.bindings.resolved() {
                println!(
                    "  {:<12} offset {:>3}  size {:>2}",
                    name.glsl_name(),
                    binding.offset,
                    binding.size
                );
            }
            let unused: Vec<&str> = stages
                .bindings
                .unresolved()
                .into_iter()
                .map(UniformName::glsl_name)
                .collect();
            if !unused.is_empty() {
                println!("  unused: {}", unused.join(", "));
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}: {err}", path.display());
            eprintln!(
                "note: wrapped source lines are offset by {} from the file",
                header_line_count()
            );
            bail!("{} failed to compile", path.display());
        }
    }
}
