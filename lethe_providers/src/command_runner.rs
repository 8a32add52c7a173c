//! Per-platform command lines for the generation CLI.

pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Command that runs `prompt` against `model` through `program run`.
///
/// Unix invokes the program directly, so the prompt travels as a single argv
/// entry. Windows goes through a hidden, non-interactive powershell.
#[must_use]
pub fn generation_command(program: &str, model: &str, prompt: &str) -> CommandSpec {
    if cfg!(target_os = "windows") {
        powershell_command(program, model, prompt)
    } else {
        direct_command(program, model, prompt)
    }
}

#[must_use]
pub fn direct_command(program: &str, model: &str, prompt: &str) -> CommandSpec {
    CommandSpec {
        program: program.to_string(),
        args: vec!["run".to_string(), model.to_string(), prompt.to_string()],
    }
}

#[must_use]
pub fn powershell_command(program: &str, model: &str, prompt: &str) -> CommandSpec {
    let script = format!(
        "& {} run {} {}",
        powershell_quote(program),
        powershell_quote(model),
        powershell_quote(prompt)
    );
    CommandSpec {
        program: "powershell".to_string(),
        args: vec![
            "-NoProfile".to_string(),
            "-NonInteractive".to_string(),
            "-Command".to_string(),
            script,
        ],
    }
}

/// Single-quoted powershell literal; embedded quotes are doubled.
fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[must_use]
pub fn build_command(spec: &CommandSpec) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_command_keeps_prompt_whole() {
        let spec = direct_command("ollama", "llama3.2", "who is 'x'? a b c");
        assert_eq!(spec.program, "ollama");
        assert_eq!(spec.args, vec!["run", "llama3.2", "who is 'x'? a b c"]);
    }

    #[test]
    fn test_powershell_command_escapes_quotes() {
        let spec = powershell_command("ollama", "llama3.2", "it's");
        assert_eq!(spec.program, "powershell");
        assert_eq!(spec.args.last().unwrap(), "& 'ollama' run 'llama3.2' 'it''s'");
    }

    #[test]
    fn test_generation_command_shape() {
        let spec = generation_command("ollama", "m", "p");
        assert!(!spec.program.is_empty());
        assert!(spec.args.len() >= 3);
    }
}
