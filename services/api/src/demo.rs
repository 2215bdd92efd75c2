use crate::infra::{load_pitch_config, StaticIdentityProvider};
use clap::Args;
use guest_portal::config::ScoringConfig;
use guest_portal::error::AppError;
use guest_portal::workflows::leads::{
    LeadAssessment, LeadPipelineService, LeadServiceError, MemoryRecordStore, PermissionRules,
    PitchEngine, RecordStore, Sale,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Guest record JSON file to assess
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Optional weight table (`{"fields": [...]}`); defaults to the canonical weights
    #[arg(long)]
    pub(crate) weights: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Guest name used for the sample intake
    #[arg(long, default_value = "Ana Ruiz")]
    pub(crate) guest_name: String,
    /// Optional weight table (`{"fields": [...]}`); defaults to the canonical weights
    #[arg(long)]
    pub(crate) weights: Option<PathBuf>,
    /// Stop once the proposal is written, before recording a sale
    #[arg(long)]
    pub(crate) skip_sale: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            guest_name: "Ana Ruiz".to_string(),
            weights: None,
            skip_sale: false,
        }
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs { input, weights } = args;

    let config = load_pitch_config(&ScoringConfig {
        weights_path: weights,
    })?;
    let raw: Value = serde_json::from_reader(std::io::BufReader::new(std::fs::File::open(
        &input,
    )?))?;

    let assessment = PitchEngine::new(config).assess(&raw);
    println!("{}", assessment_json(&assessment)?);
    Ok(())
}

fn assessment_json(assessment: &LeadAssessment) -> Result<String, AppError> {
    serde_json::to_string_pretty(assessment).map_err(AppError::encode)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        guest_name,
        weights,
        skip_sale,
    } = args;

    let config = load_pitch_config(&ScoringConfig {
        weights_path: weights,
    })?;
    let store = Arc::new(MemoryRecordStore::new());
    let service = LeadPipelineService::new(
        store.clone(),
        Arc::new(StaticIdentityProvider::demo()),
        config,
        PermissionRules::standard(),
    );

    println!("Guest portal pitch demo");
    let associate = service.authenticate(Some("demo-me"))?;
    let lead = service.submit(
        &associate,
        json!({ "guestName": guest_name, "guestPhone": "515-555-0142" }),
    )?;
    println!("\nIntake submitted as lead {}", lead.id);
    render_assessment(&lead.assessment);

    let watch = service.watch(&lead.id)?;

    store.set(
        &format!("{}/evaluate", lead.id.record_path()),
        json!({
            "currentCarrier": "AT&T",
            "numLines": 3,
            "coverageZip": "50309",
            "dataNeed": "unlimited",
        }),
    )
    .map_err(LeadServiceError::from)?;
    println!("\nQualifying answers captured");
    render_completion(&store, &lead.id.completion_path())?;

    store.set(
        &format!("{}/solution", lead.id.record_path()),
        json!({ "text": "Three lines on unlimited, keep current phones" }),
    )
    .map_err(LeadServiceError::from)?;
    println!("\nProposal written");
    render_completion(&store, &lead.id.completion_path())?;

    service.unwatch(watch)?;

    if !skip_sale {
        let sold = service.record_sale(
            &associate,
            &lead.id,
            Sale {
                sale_id: Some("DEMO-0001".to_string()),
                store_number: Some("1042".to_string()),
                units: Some(3),
                ..Sale::default()
            },
        )?;
        println!("\nSale recorded");
        render_assessment(&sold.assessment);
    }

    let manager = service.authenticate(Some("demo-dm"))?;
    println!("\nPipeline as seen by {}", manager.uid);
    for summary in service.list(&manager)? {
        println!(
            "  - {} | {} | {} | {}% full | {}% of stage",
            summary.id,
            summary.cust_name.as_deref().unwrap_or("(unnamed)"),
            summary.status,
            summary.percent_full,
            summary.percent_stage
        );
    }

    Ok(())
}

fn render_assessment(assessment: &LeadAssessment) {
    println!(
        "  Status {} | {}% full | {}% of {} stage",
        assessment.status,
        assessment.pitch.percent_full,
        assessment.stage.percent,
        assessment.status
    );
    for (step, tally) in &assessment.pitch.per_step {
        println!("    {}: {}/{}", step.label(), tally.earned, tally.max);
    }
    let missing: Vec<&str> = assessment
        .pitch
        .fields
        .iter()
        .filter(|(_, check)| !check.ok && check.weight > 0)
        .map(|(key, _)| key.as_str())
        .collect();
    if missing.is_empty() {
        println!("    Missing: none");
    } else {
        println!("    Missing: {}", missing.join(", "));
    }
}

fn render_completion(store: &MemoryRecordStore, path: &str) -> Result<(), AppError> {
    match store.get(path).map_err(LeadServiceError::from)? {
        Some(completion) => println!(
            "  Watcher wrote completion: status {} | {}% full | {}% of stage",
            completion["status"].as_str().unwrap_or("unknown"),
            completion["percentFull"],
            completion["percentStage"]
        ),
        None => println!("  No completion stored yet"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn demo_walks_the_full_lifecycle() {
        run_demo(DemoArgs::default()).expect("demo completes");
    }

    #[test]
    fn score_reads_a_guest_file() {
        let path = std::env::temp_dir().join(format!(
            "guest-portal-record-{}.json",
            std::process::id()
        ));
        {
            let mut file = std::fs::File::create(&path).expect("create record file");
            write!(file, r#"{{"custName":"Jane Doe","custPhone":"555-0100"}}"#)
                .expect("write record");
        }

        let result = run_score(ScoreArgs {
            input: path.clone(),
            weights: None,
        });
        std::fs::remove_file(&path).ok();
        result.expect("score succeeds");
    }

    #[test]
    fn score_output_is_the_assessment_json() {
        let assessment = PitchEngine::default().assess(&json!({ "custName": "Jane Doe" }));
        let rendered = assessment_json(&assessment).expect("assessment encodes");
        let parsed: Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(parsed["status"], json!("new"));
        assert_eq!(parsed["pitch"]["percentFull"], json!(8));
    }

    #[test]
    fn score_reports_malformed_input_as_input_error() {
        let path = std::env::temp_dir().join(format!(
            "guest-portal-malformed-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, "{ not json").expect("write record");

        let result = run_score(ScoreArgs {
            input: path.clone(),
            weights: None,
        });
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AppError::Input(_))));
    }

    #[test]
    fn score_reports_missing_input() {
        let error = run_score(ScoreArgs {
            input: PathBuf::from("./no-such-guest.json"),
            weights: None,
        })
        .expect_err("missing file");
        assert!(matches!(error, AppError::Io(_)));
    }
}
