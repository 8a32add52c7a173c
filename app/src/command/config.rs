use anyhow::{Context, bail};
use lethe_core::PolicyUpdate;

use super::info::print_policy;
use crate::components::Components;

#[derive(Debug, Clone)]
pub enum ConfigInput {
    Show,
    Set(PolicyUpdate),
}

/// Strategy for reading and updating the policy configuration.
///
/// Updates go through the engine so that validation and the
/// persist-then-apply rule are the same as in interactive chat.
#[derive(Debug, Clone, Copy)]
pub struct ConfigStrategy;

impl super::CommandStrategy for ConfigStrategy {
    type Input = ConfigInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let components = Components::load(None)?;
        match input {
            ConfigInput::Show => print_policy(&components.engine.config()),
            ConfigInput::Set(update) => {
                if update.is_empty() {
                    println!("Nothing to update.");
                    print_policy(&components.engine.config());
                    return Ok(());
                }
                let next = components
                    .engine
                    .update_config(&update, components.persist_policy())?;
                println!("Saved to {}", components.config_path.display());
                print_policy(&next);
            }
        }
        Ok(())
    }
}

/// Parse a `field value` pair typed in interactive chat.
pub fn parse_policy_field(field: &str, value: &str) -> anyhow::Result<PolicyUpdate> {
    let mut update = PolicyUpdate::default();
    match field {
        "retain_mode" => update.retain_mode = Some(parse_bool(value)?),
        "check_before_llm" => update.check_before_llm = Some(parse_bool(value)?),
        "use_entities" => update.use_entities = Some(parse_bool(value)?),
        "similarity_threshold" | "threshold" => {
            update.similarity_threshold = Some(
                value
                    .parse()
                    .with_context(|| format!("'{value}' is not a number"))?,
            );
        }
        "model_name" | "model" => update.model_name = Some(value.to_string()),
        other => bail!(
            "unknown field '{other}'; expected retain_mode, check_before_llm, \
             similarity_threshold, use_entities or model_name"
        ),
    }
    Ok(update)
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => bail!("'{value}' is not a boolean"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_fields() {
        let update = parse_policy_field("retain_mode", "on").unwrap();
        assert_eq!(update.retain_mode, Some(true));

        let update = parse_policy_field("threshold", "0.65").unwrap();
        assert!((update.similarity_threshold.unwrap() - 0.65).abs() < f64::EPSILON);

        let update = parse_policy_field("model", "mistral").unwrap();
        assert_eq!(update.model_name.as_deref(), Some("mistral"));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_policy_field("retain_mode", "maybe").is_err());
        assert!(parse_policy_field("threshold", "high").is_err());
        assert!(parse_policy_field("colour", "blue").is_err());
    }
}
