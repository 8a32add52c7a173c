//! Policy pipelines. One variant is selected per request from the config
//! snapshot and runs to a terminal [`Decision`].

use lethe_core::util::{GENERATION_FAILED_MESSAGE, PROMPT_BLOCKED_MESSAGE, RESPONSE_BLOCKED_MESSAGE};
use lethe_core::{
    BlockReason, Decision, EmbeddingProvider, EntityCatalog, GenerationProvider, PolicyConfig,
    Result, SensitivityResult, Stage,
};

use crate::context::EntityScan;
use crate::patterns::{InterrogativeDetector, strip_terms};
use crate::rewriter::ResponseRewriter;
use crate::scorer::SensitivityScorer;
use crate::store::StoreSnapshot;
use crate::trace::RequestTrace;

/// Everything a pipeline reads while evaluating one request.
pub struct EvalContext<'a, G: ?Sized, E: ?Sized> {
    pub config: &'a PolicyConfig,
    pub snapshot: &'a StoreSnapshot,
    pub catalog: &'a EntityCatalog,
    pub generator: &'a G,
    pub scorer: &'a SensitivityScorer<E>,
    pub rewriter: &'a ResponseRewriter,
    pub detector: &'a InterrogativeDetector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    /// Block on any sign of forgotten content.
    Standard { check_before_llm: bool },
    /// Prefer rewriting over blocking; block only on escalation.
    Retain { check_before_llm: bool },
    /// Driven by the curated entity catalog instead of the forgetting set.
    EntityMode,
}

impl Pipeline {
    #[must_use]
    pub const fn select(config: &PolicyConfig) -> Self {
        if config.use_entities {
            Self::EntityMode
        } else if config.retain_mode {
            Self::Retain {
                check_before_llm: config.check_before_llm,
            }
        } else {
            Self::Standard {
                check_before_llm: config.check_before_llm,
            }
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "standard",
            Self::Retain { .. } => "retain",
            Self::EntityMode => "entity",
        }
    }

    /// Run `query` through this pipeline. `prompt` is the text actually sent
    /// to the generation backend (query plus any conversation context).
    pub async fn evaluate<G, E>(
        &self,
        ctx: &EvalContext<'_, G, E>,
        query: &str,
        prompt: &str,
        trace: &mut RequestTrace,
    ) -> Decision
    where
        G: GenerationProvider + ?Sized,
        E: EmbeddingProvider + ?Sized,
    {
        trace.info(format!("Pipeline: {}", self.name()));
        let decision = match *self {
            Self::Standard { check_before_llm } => {
                evaluate_forgetting(ctx, query, prompt, false, check_before_llm, trace).await
            }
            Self::Retain { check_before_llm } => {
                evaluate_forgetting(ctx, query, prompt, true, check_before_llm, trace).await
            }
            Self::EntityMode => evaluate_entities(ctx, query, prompt, trace).await,
        };

        match decision.block_reason() {
            Some(reason) => trace.info(format!("Decision: blocked ({reason:?})")),
            None => trace.info(format!("Decision: {:?}", decision.verdict()).to_lowercase()),
        }
        decision
    }
}

async fn score<G, E>(
    ctx: &EvalContext<'_, G, E>,
    text: &str,
    gated: bool,
) -> Result<SensitivityResult>
where
    G: ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let threshold = ctx.config.similarity_threshold;
    if gated {
        ctx.scorer.score_gated(ctx.snapshot, text, threshold).await
    } else {
        ctx.scorer.score(ctx.snapshot, text, threshold).await
    }
}

async fn generate<G, E>(
    ctx: &EvalContext<'_, G, E>,
    prompt: &str,
    trace: &mut RequestTrace,
) -> Option<String>
where
    G: GenerationProvider + ?Sized,
    E: ?Sized,
{
    match ctx.generator.generate(prompt, &ctx.config.model_name).await {
        Ok(text) => {
            trace.enter(Stage::Generated);
            trace.debug(format!("Generated {} chars", text.len()));
            Some(text)
        }
        Err(e) => {
            trace.error(format!("Generation failed: {e:#}"));
            None
        }
    }
}

fn generation_failed() -> Decision {
    Decision::Allowed {
        response: GENERATION_FAILED_MESSAGE.to_string(),
        generation_failed: true,
    }
}

/// Standard and retain pipelines over the forgetting store.
async fn evaluate_forgetting<G, E>(
    ctx: &EvalContext<'_, G, E>,
    query: &str,
    prompt: &str,
    retain: bool,
    check_before_llm: bool,
    trace: &mut RequestTrace,
) -> Decision
where
    G: GenerationProvider + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    if !retain {
        if let Some(alias) = ctx.snapshot.find_alias(query) {
            if let Some(pattern) = ctx.detector.matched(query) {
                trace.warn(format!(
                    "Query asks about forgotten entity '{alias}' (pattern {pattern}); skipping generation"
                ));
                return Decision::blocked(BlockReason::DirectEntity, PROMPT_BLOCKED_MESSAGE);
            }
            trace.debug(format!("Query mentions '{alias}' but is not a question"));
        }
    }

    if check_before_llm {
        match score(ctx, query, retain).await {
            Ok(result) => {
                trace.info(format!(
                    "Prompt similarity {:.3} (threshold {:.2})",
                    result.score, ctx.config.similarity_threshold
                ));
                if result.is_sensitive {
                    if !retain {
                        trace.warn("Prompt is sensitive; blocked before generation");
                        return Decision::blocked(
                            BlockReason::PromptSensitive,
                            PROMPT_BLOCKED_MESSAGE,
                        );
                    }
                    trace.info("Prompt is sensitive; retain mode defers to the response check");
                }
            }
            Err(e) => {
                trace.error(format!("Prompt scoring failed: {e}"));
                return Decision::blocked(BlockReason::ScoringFailed, PROMPT_BLOCKED_MESSAGE);
            }
        }
    } else {
        trace.debug("Pre-generation check disabled");
    }
    trace.enter(Stage::PromptChecked);

    let Some(output) = generate(ctx, prompt, trace).await else {
        return generation_failed();
    };

    let scan = EntityScan::scan(ctx.snapshot, &output);
    let result = match score(ctx, &output, retain).await {
        Ok(result) => result,
        Err(e) => {
            trace.error(format!("Response scoring failed: {e}"));
            return Decision::blocked(BlockReason::ScoringFailed, RESPONSE_BLOCKED_MESSAGE);
        }
    };
    trace.enter(Stage::ResponseChecked);
    trace.info(format!(
        "Response similarity {:.3}, focus ratio {:.2} over {} units",
        result.score,
        scan.focus_ratio(),
        scan.total_units
    ));

    if !scan.has_context() && !result.is_sensitive {
        return Decision::allowed(output);
    }
    if !retain {
        trace.warn(format!(
            "Response references forgotten content (entities: {:?})",
            scan.mentioned()
        ));
        return Decision::blocked(BlockReason::ResponseSensitive, RESPONSE_BLOCKED_MESSAGE);
    }

    retain_post_check(ctx, output, &scan, result, trace).await
}

/// Escalation checks, then rewrite.
async fn retain_post_check<G, E>(
    ctx: &EvalContext<'_, G, E>,
    output: String,
    scan: &EntityScan,
    result: SensitivityResult,
    trace: &mut RequestTrace,
) -> Decision
where
    G: GenerationProvider + ?Sized,
    E: EmbeddingProvider + ?Sized,
{
    let escalation = &ctx.config.escalation;
    if result.score > escalation.block_similarity {
        trace.warn(format!(
            "Similarity {:.3} above escalation bound {:.2}",
            result.score, escalation.block_similarity
        ));
        return Decision::blocked(BlockReason::Escalation, RESPONSE_BLOCKED_MESSAGE);
    }

    let ratio = scan.focus_ratio();
    if result.score > escalation.focus_similarity && ratio > escalation.focus_ratio {
        trace.warn(format!(
            "Response focuses on a forgotten entity (ratio {:.2}, similarity {:.3})",
            ratio, result.score
        ));
        return Decision::blocked(BlockReason::EntityFocus, RESPONSE_BLOCKED_MESSAGE);
    }

    let terms = scan.removal_terms();
    if terms.is_empty() {
        trace.warn("Response is similar to forgotten content but names no known entity; passing through");
        return Decision::allowed(output);
    }

    trace.info(format!("Rewriting to remove {:?}", scan.mentioned()));
    match ctx
        .rewriter
        .rewrite(ctx.generator, &output, &terms, &ctx.config.model_name)
        .await
    {
        Ok(response) => Decision::Rewritten {
            original: output,
            response,
        },
        Err(e) => {
            trace.error(format!("Rewrite failed: {e:#}"));
            Decision::blocked(BlockReason::RewriteFailed, RESPONSE_BLOCKED_MESSAGE)
        }
    }
}

/// Entity mode: block named entities up front, strip survivors afterwards.
async fn evaluate_entities<G, E>(
    ctx: &EvalContext<'_, G, E>,
    query: &str,
    prompt: &str,
    trace: &mut RequestTrace,
) -> Decision
where
    G: GenerationProvider + ?Sized,
    E: ?Sized,
{
    if let Some(entity) = ctx.catalog.find_mention(query) {
        trace.warn(format!("Query names excluded entity '{}'", entity.name));
        return Decision::blocked(BlockReason::EntityMode, PROMPT_BLOCKED_MESSAGE);
    }
    trace.enter(Stage::PromptChecked);

    let full_prompt = exclusion_prompt(ctx.catalog, prompt);
    let Some(output) = generate(ctx, &full_prompt, trace).await else {
        return generation_failed();
    };

    let terms: Vec<String> = ctx
        .catalog
        .entities
        .iter()
        .flat_map(|e| e.terms().map(ToOwned::to_owned))
        .collect();
    let (stripped, removed) = strip_terms(&output, &terms);
    trace.enter(Stage::ResponseChecked);

    if let Some(entity) = ctx.catalog.find_mention(&stripped) {
        trace.warn(format!("Excluded entity '{}' survived filtering", entity.name));
        return Decision::blocked(BlockReason::ResidualEntity, RESPONSE_BLOCKED_MESSAGE);
    }
    if removed > 0 {
        trace.info(format!("Stripped {removed} entity mentions from response"));
        return Decision::Rewritten {
            original: output,
            response: stripped,
        };
    }
    Decision::allowed(output)
}

/// Prefix `prompt` with an instruction to avoid every catalog entity.
#[must_use]
pub fn exclusion_prompt(catalog: &EntityCatalog, prompt: &str) -> String {
    if catalog.is_empty() {
        return prompt.to_string();
    }
    let names = catalog
        .entities
        .iter()
        .map(|e| {
            let aliases: Vec<&str> = e.terms().skip(1).collect();
            if aliases.is_empty() {
                e.name.clone()
            } else {
                format!("{} (also known as {})", e.name, aliases.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "Answer the conversation below without mentioning, naming, or alluding to any of these \
         entities: {names}. If a complete answer would require them, leave that part out.\n\n{prompt}"
    )
}
