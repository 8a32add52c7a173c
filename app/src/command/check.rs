use std::path::PathBuf;

use crate::components::Components;
use crate::ingest::{ingest_files, print_reports};

#[derive(Debug, Clone)]
pub struct CheckInput {
    pub text: String,
    pub forget: Vec<PathBuf>,
}

/// Strategy for scoring text against the forgetting set, for threshold tuning.
#[derive(Debug, Clone, Copy)]
pub struct CheckStrategy;

impl super::CommandStrategy for CheckStrategy {
    type Input = CheckInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let components = Components::load(None)?;
        let engine = &components.engine;
        print_reports(&ingest_files(engine, &input.forget).await);

        let snapshot = engine.store().snapshot();
        let result = engine.score(&input.text).await?;
        let threshold = engine.config().similarity_threshold;

        println!("Statements: {}", snapshot.statements().len());
        println!("Score: {:.4}", result.score);
        println!("Threshold: {threshold:.2}");
        println!("Sensitive: {}", result.is_sensitive);
        match snapshot.find_alias(&input.text) {
            Some(alias) => println!("Alias Mentioned: {alias}"),
            None => println!("Alias Mentioned: (none)"),
        }
        Ok(())
    }
}
