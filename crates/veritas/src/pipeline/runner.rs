use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use crate::ai::ChatBackend;
use crate::chain::{abbreviate_address, FetchError, FetchResult, WalletDataSource};

use super::context::PipelineContext;
use super::error::PipelineError;
use super::plans::{AnalysisRequest, StagePlan};
use super::progress::{ProgressEvent, ProgressReporter};
use super::report;
use super::stage::{OutputPolicy, Stage, StageMode};

pub struct Pipeline {
    source: Arc<dyn WalletDataSource>,
    backend: Arc<dyn ChatBackend>,
}

impl Pipeline {
    pub fn new(source: Arc<dyn WalletDataSource>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { source, backend }
    }

    /// Run the analysis for one request.
    /// Returns the final report (or the reason there is none) and the context,
    /// whose transcript covers every stage that started.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        progress: &dyn ProgressReporter,
    ) -> (Result<String, PipelineError>, PipelineContext) {
        let span = info_span!("pipeline", kind = request.kind());
        let mut ctx = PipelineContext::new(request);

        let result = self
            .run_inner(&mut ctx, progress)
            .instrument(span)
            .await;

        if let Err(e) = &result {
            progress.report(ProgressEvent::Failed {
                error: e.to_string(),
            });
        }
        (result, ctx)
    }

    async fn run_inner(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<String, PipelineError> {
        let plan = ctx.request.plan()?;

        progress.report(ProgressEvent::Fetching {
            wallets: ctx.request.addresses().len(),
        });
        self.load_wallet_data(ctx)
            .instrument(info_span!("fetch_wallet_data"))
            .await?;

        self.execute(&plan, ctx, progress).await
    }

    /// Fetches every wallet and stores the summaries as template variables.
    /// Any fetch error aborts before a stage runs.
    async fn load_wallet_data(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        match ctx.request.clone() {
            AnalysisRequest::Single { address } => {
                let summary = self.source.fetch(&address).await.map_err(|e| {
                    let message = match e {
                        FetchError::Malformed(_) => "Could not generate profile due to invalid \
                                                     data format from the source."
                            .to_string(),
                        other => format!("Could not generate profile. Reason: {}", other),
                    };
                    PipelineError::DataUnavailable(message)
                })?;

                ctx.set_variable("wallet_address", address);
                ctx.set_variable("wallet_data", summary.to_prompt_json());
            }
            AnalysisRequest::Duel { first, second } => {
                let (first_result, second_result) =
                    tokio::join!(self.source.fetch(&first), self.source.fetch(&second));

                match (first_result, second_result) {
                    (Ok(first_summary), Ok(second_summary)) => {
                        ctx.set_variable("wallet_address_1", first);
                        ctx.set_variable("wallet_address_2", second);
                        ctx.set_variable("wallet_1_data", first_summary.to_prompt_json());
                        ctx.set_variable("wallet_2_data", second_summary.to_prompt_json());
                    }
                    (first_result, second_result) => {
                        let describe = |r: &FetchResult| match r {
                            Ok(_) => "None".to_string(),
                            Err(e) => e.to_string(),
                        };
                        return Err(PipelineError::DataUnavailable(format!(
                            "Could not generate comparison. Wallet 1 error: {}, Wallet 2 error: {}",
                            describe(&first_result),
                            describe(&second_result)
                        )));
                    }
                }
            }
        }

        debug!(
            wallets = ?ctx
                .request
                .addresses()
                .into_iter()
                .map(abbreviate_address)
                .collect::<Vec<_>>(),
            "Wallet data loaded"
        );
        Ok(())
    }

    async fn execute(
        &self,
        plan: &StagePlan,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<String, PipelineError> {
        if let Some((stage, placeholder)) =
            plan.undefined_placeholder(|name| ctx.variables().contains_key(name))
        {
            return Err(PipelineError::Template {
                stage: stage.to_string(),
                placeholder,
            });
        }

        let total = plan.len();
        for (index, stage) in plan.stages().iter().enumerate() {
            progress.report(ProgressEvent::StageStarted {
                stage: stage.name.to_string(),
                index,
                total,
            });

            let output = self
                .run_stage(stage, ctx)
                .instrument(info_span!("stage", stage = stage.name))
                .await?;
            ctx.record_output(stage.name, output);

            progress.report(ProgressEvent::StageFinished {
                stage: stage.name.to_string(),
            });
        }

        ctx.last_output()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::InvalidPlan("plan has no stages".to_string()))
    }

    async fn run_stage(
        &self,
        stage: &Stage,
        ctx: &mut PipelineContext,
    ) -> Result<String, PipelineError> {
        let rendered =
            stage
                .task
                .render(ctx.variables())
                .map_err(|placeholder| PipelineError::Template {
                    stage: stage.name.to_string(),
                    placeholder,
                })?;

        let mut context = Vec::with_capacity(stage.depends_on.len());
        for dependency in &stage.depends_on {
            let output = ctx
                .output(dependency)
                .ok_or_else(|| PipelineError::MissingDependency {
                    stage: stage.name.to_string(),
                    dependency: dependency.to_string(),
                })?;
            context.push(output.to_string());
        }

        ctx.append_transcript(&format!("# Agent: {}\n## Task: {}\n\n", stage.role, rendered));

        let raw = match stage.mode {
            StageMode::Confirm => format!("Data collection confirmed.\n\n{}", rendered),
            StageMode::Infer => {
                let context: Vec<&str> = context.iter().map(String::as_str).collect();
                let messages = stage.messages(&rendered, &context);
                self.backend
                    .complete(&messages)
                    .await
                    .map_err(|source| PipelineError::Stage {
                        stage: stage.name.to_string(),
                        source,
                    })?
            }
        };

        let output = match &stage.output {
            OutputPolicy::Verbatim => raw.trim().to_string(),
            OutputPolicy::Section { heading } => report::ensure_section(&raw, heading),
            OutputPolicy::AfterDependency {
                dependency,
                heading,
            } => {
                let previous =
                    ctx.output(dependency)
                        .ok_or_else(|| PipelineError::MissingDependency {
                            stage: stage.name.to_string(),
                            dependency: dependency.to_string(),
                        })?;
                report::compose_after(previous, &raw, heading)
            }
        };

        ctx.append_transcript(&format!(
            "# Agent: {}\n## Final Answer:\n{}\n\n",
            stage.role, output
        ));
        info!(chars = output.len(), "Stage output recorded");
        Ok(output)
    }
}
