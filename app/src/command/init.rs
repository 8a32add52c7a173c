use lethe_config::Config;

/// Strategy for initializing the configuration.
///
/// Creates `~/lethe/config.json` and an empty `~/lethe/entities.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config()?;
        println!("Created config at: {}", path.display());
        println!("\nNext steps:");
        println!("  1. Start ollama and pull a model: ollama pull llama3.2");
        println!("  2. Pull an embedding model: ollama pull all-minilm");
        println!("  3. Chat: lethe chat --forget notes.txt");
        Ok(())
    }
}
