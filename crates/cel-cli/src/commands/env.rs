//! `celc env`: list the declarations of an environment.

use std::path::Path;

use termcolor::ColorChoice;

use crate::commands::check::load_env;
use crate::output::StyledOutput;

pub fn execute(config: Option<&Path>, filter: Option<&str>, color: ColorChoice) -> anyhow::Result<()> {
    let env = load_env(config)?;
    let mut out = StyledOutput::new(color);

    if filter.is_none() {
        out.bold("Identifiers");
        out.newline();
        for decl in env.idents() {
            out.plain(&format!("  {}", decl.name()));
            out.dim(&format!(": {}", decl.ty()));
            out.newline();
        }
        out.newline();
    }

    out.bold("Functions");
    out.newline();
    for function in env.functions() {
        if let Some(filter) = filter {
            if !function.name().contains(filter) {
                continue;
            }
        }
        out.info(&format!("  {}", function.name()));
        out.newline();
        for overload in function.overload_decls() {
            let disabled = env.is_overload_disabled(overload.id());
            let args: Vec<String> = overload.arg_types().iter().map(ToString::to_string).collect();
            let signature = if overload.is_member_function() {
                match args.split_first() {
                    Some((target, rest)) => format!("{}.({})", target, rest.join(", ")),
                    None => "()".to_string(),
                }
            } else {
                format!("({})", args.join(", "))
            };
            out.plain(&format!("    {} {} -> {}", overload.id(), signature, overload.result_type()));
            if disabled {
                out.warning(" (disabled)");
            }
            out.newline();
        }
    }
    out.flush();
    Ok(())
}
