//! `tabmux flags <program>`

use crate::server::config::AppConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use tabmux_introspect::{CommandFlag, HelpEngine, ParsedHelp, ProcessHelpRunner};

pub async fn run(config: &AppConfig, program: &str, prefix: Option<&str>, json: bool) -> Result<()> {
    let engine = HelpEngine::new(Arc::new(ProcessHelpRunner), config.introspect.clone());
    let mut help = engine
        .get_help(program)
        .await
        .with_context(|| format!("Cannot introspect {program:?}"))?;

    if let Some(prefix) = prefix {
        help.flags.retain(|flag| flag.matches_prefix(prefix));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&help)?);
    } else {
        print!("{}", render(&help));
    }
    Ok(())
}

fn render(help: &ParsedHelp) -> String {
    let mut out = String::new();
    if help.flags.is_empty() {
        let reason = help.diagnostic.as_deref().unwrap_or("no matching flags");
        out.push_str(&format!("{}: {reason}\n", help.program));
        return out;
    }

    let source = match (&help.invocation, help.format) {
        (Some(invocation), Some(format)) => format!(" ({} {invocation}, {format})", help.program),
        _ => String::new(),
    };
    out.push_str(&format!("{}: {} flags{source}\n\n", help.program, help.flags.len()));

    let signatures: Vec<String> = help.flags.iter().map(CommandFlag::signature).collect();
    let width = signatures.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    for (flag, signature) in help.flags.iter().zip(&signatures) {
        let line = format!("  {signature:<width$}  {}", flag.description);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabmux_introspect::HelpFormat;

    fn flag(long: &str, short: Option<&str>, hint: Option<&str>, description: &str) -> CommandFlag {
        CommandFlag {
            long: Some(long.to_string()),
            short: short.map(str::to_string),
            description: description.to_string(),
            takes_value: hint.is_some(),
            value_hint: hint.map(str::to_string),
        }
    }

    #[test]
    fn test_render_aligns_descriptions() {
        let help = ParsedHelp {
            program: "mytool".into(),
            flags: vec![
                flag("--config", Some("-c"), Some("FILE"), "Config file"),
                flag("--quiet", None, None, ""),
            ],
            invocation: Some("--help".into()),
            format: Some(HelpFormat::Clap),
            diagnostic: None,
        };
        assert_eq!(
            render(&help),
            "mytool: 2 flags (mytool --help, clap)\n\n  -c, --config <FILE>  Config file\n  --quiet\n"
        );
    }

    #[test]
    fn test_render_empty_shows_diagnostic() {
        let help = ParsedHelp::empty("plain", "no flags recognized in help output");
        assert_eq!(render(&help), "plain: no flags recognized in help output\n");
    }
}
