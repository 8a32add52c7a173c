use lethe_config::Config;
use lethe_core::PolicyConfig;

/// Strategy for displaying the effective configuration.
///
/// Prints the policy, provider endpoints, extraction setup and a summary of
/// the entity catalog.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let path = Config::default_path()?;
        let config = Config::load_from(&path)?;

        println!("=== lethe Configuration ===\n");
        println!("File: {}\n", path.display());

        print_policy(&config.policy);
        println!();

        let ollama = &config.providers.ollama;
        println!("Ollama:");
        println!("  Program: {}", ollama.program);
        println!("  Timeout: {}s", ollama.timeout_secs);
        println!("  Embedding URL: {}", ollama.embedding_url);
        println!("  Embedding Model: {}", ollama.embedding_model);
        println!();

        println!("Extraction:");
        println!("  Strategy: {:?}", config.extraction.strategy);
        println!("  Model: {}", config.extraction_model());
        println!("  Static Rules: {}", config.extraction.rules.len());
        for rule in &config.extraction.rules {
            println!("    '{}' -> {}", rule.pattern, rule.aliases.join(", "));
        }
        println!();

        let entities_path = config.entities_path()?;
        println!("Entity Catalog:");
        println!("  Path: {}", entities_path.display());
        match config.entity_catalog() {
            Ok(catalog) if catalog.is_empty() => println!("  Entities: (none)"),
            Ok(catalog) => {
                println!("  Entities: {}", catalog.len());
                for entity in &catalog.entities {
                    println!("    {} ({} aliases)", entity.name, entity.aliases.len());
                }
            }
            Err(e) => println!("  Error: {e}"),
        }
        println!();

        println!("Chat:");
        println!("  History Limit: {}", config.chat.history_limit);

        Ok(())
    }
}

pub fn print_policy(policy: &PolicyConfig) {
    println!("Policy:");
    println!("  Retain Mode: {}", policy.retain_mode);
    println!("  Check Before LLM: {}", policy.check_before_llm);
    println!("  Similarity Threshold: {:.2}", policy.similarity_threshold);
    println!("  Use Entities: {}", policy.use_entities);
    println!("  Model: {}", policy.model_name);
    println!(
        "  Escalation: block > {:.2}, focus > {:.2} with ratio > {:.2}",
        policy.escalation.block_similarity,
        policy.escalation.focus_similarity,
        policy.escalation.focus_ratio
    );
}
