use crate::infra::load_facts;
use clap::Args;
use facility_intake::config::AppConfig;
use facility_intake::error::AppError;
use facility_intake::workflows::intake::{
    AnalysisDispatcher, AnomalyCheck, CoherenceEngine, CoherencePolicy, ConfirmationRequest,
    FacilityFacts, GateDecision, HttpAnalysisDispatcher, IntakeForm, RiskFlag, RiskFlags,
    SubmissionCoordinator, SubmissionOutcome, Verdict,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct AssessArgs {
    /// Facility facts JSON file
    #[arg(long)]
    pub(crate) facts: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    /// Facility facts JSON file
    #[arg(long)]
    pub(crate) facts: PathBuf,
    /// Accept every confirmation prompt without asking
    #[arg(long)]
    pub(crate) yes: bool,
}

pub(crate) fn run_assess(args: AssessArgs) -> Result<(), AppError> {
    let facts = load_facts(&args.facts)?;
    let assessment = CoherenceEngine::default().assess(&facts);

    println!(
        "{} ({:.0} m², {} floors): {}",
        facts.facility_type,
        facts.floor_area_m2,
        facts.floor_count,
        assessment.verdict.label()
    );
    for violation in &assessment.violations {
        println!("- {}", violation.message);
    }
    if let Some(report) = &assessment.anomalies {
        if assessment.verdict != Verdict::Rejected {
            println!("Requires confirmation:");
        }
        print!("{}", report.message());
    }
    Ok(())
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let facts = load_facts(&args.facts)?;
    let config = AppConfig::load()?;
    let dispatcher = Arc::new(HttpAnalysisDispatcher::new(&config.analysis)?);
    let coordinator = SubmissionCoordinator::new(dispatcher, CoherencePolicy::default());

    let stdin = io::stdin();
    let mut reviewer = Reviewer::new(stdin.lock(), io::stdout(), args.yes);
    let form = reviewer.review_risk_flags(facts)?;
    reviewer.submit(&coordinator, form.snapshot()).await
}

/// Console counterpart of the confirmation dialogs.
pub(crate) struct Reviewer<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl<R: BufRead, W: Write> Reviewer<R, W> {
    pub(crate) fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    /// Replays every declared risk flag through its gate; declined flags stay unset.
    pub(crate) fn review_risk_flags(&mut self, facts: FacilityFacts) -> Result<IntakeForm, AppError> {
        let declared = facts.risk_flags;
        let mut form = IntakeForm::new(FacilityFacts {
            risk_flags: RiskFlags::default(),
            ..facts
        });

        for flag in RiskFlag::ALL.into_iter().filter(|flag| declared.get(*flag)) {
            let decision = form.set_risk_flag(flag, true)?;
            let GateDecision::ConfirmationRequired(request) = decision else {
                continue;
            };
            if self.ask(&request)? {
                form.confirm_risk_flag(flag, request.id)?;
            } else {
                form.cancel_risk_flag(flag, request.id)?;
                writeln!(self.output, "{flag} left unset")?;
            }
        }
        Ok(form)
    }

    pub(crate) async fn submit<D>(
        &mut self,
        coordinator: &SubmissionCoordinator<D>,
        facts: FacilityFacts,
    ) -> Result<(), AppError>
    where
        D: AnalysisDispatcher + ?Sized,
    {
        let outcome = match coordinator.submit(facts, AnomalyCheck::Enforce).await? {
            SubmissionOutcome::AwaitingConfirmation { request, .. } => {
                if !self.ask(&request)? {
                    coordinator.cancel(request.id)?;
                    writeln!(self.output, "Submission cancelled; facts left unchanged")?;
                    return Ok(());
                }
                coordinator.confirm(request.id).await?
            }
            other => other,
        };

        match outcome {
            SubmissionOutcome::Rejected { violations } => {
                writeln!(self.output, "Submission rejected:")?;
                for violation in violations {
                    writeln!(self.output, "- {}", violation.message)?;
                }
            }
            SubmissionOutcome::Submitted { result } => {
                writeln!(
                    self.output,
                    "Analysis received at {}",
                    result.received_at.to_rfc3339()
                )?;
                let rendered =
                    serde_json::to_string_pretty(&result.body).map_err(AppError::Render)?;
                writeln!(self.output, "{rendered}")?;
            }
            SubmissionOutcome::AwaitingConfirmation { request, .. } => {
                writeln!(self.output, "{} still pending", request.id)?;
            }
        }
        Ok(())
    }

    fn ask(&mut self, request: &ConfirmationRequest) -> io::Result<bool> {
        writeln!(self.output, "{}", request.title)?;
        writeln!(self.output, "{}", request.message.trim_end())?;
        if self.assume_yes {
            writeln!(self.output, "Confirmed (--yes)")?;
            return Ok(true);
        }

        write!(self.output, "Proceed? [y/N] ")?;
        self.output.flush()?;
        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }
}
