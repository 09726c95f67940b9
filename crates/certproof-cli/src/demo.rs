//! # Demo Subcommand
//!
//! Scripted walkthrough of the whole protocol with readable output.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use certproof_core::{HolderId, IssuerId, Score, Timestamp, VerifierId};
use certproof_crypto::field_hasher;
use certproof_protocol::{
    Holder, Issuer, Operation, PerformanceManager, PresentationRequest, ProtocolConfig, Registry,
    VerificationReport, Verifier,
};
use certproof_vc::CredentialAttributes;

/// Arguments for the demo subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Holder identifier.
    #[arg(long, default_value = "holder-ada")]
    pub holder: String,

    /// Overall score on the issued credential.
    #[arg(long, default_value = "8.0")]
    pub overall: Score,

    /// Minimum overall score the verifier requests.
    #[arg(long, default_value = "7.0")]
    pub threshold: Score,

    /// Persist the holder's accumulator after the run.
    #[arg(long)]
    pub save: bool,

    /// State directory; overrides CERTPROOF_STATE_DIR.
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

fn attributes(holder: &str, overall: Score) -> CredentialAttributes {
    let mut scores = BTreeMap::new();
    scores.insert("overall".to_string(), overall);
    scores.insert("listening".to_string(), Score::from_hundredths(750));
    scores.insert("reading".to_string(), Score::from_hundredths(800));
    scores.insert("writing".to_string(), Score::from_hundredths(650));
    scores.insert("speaking".to_string(), Score::from_hundredths(700));
    let certified = Timestamp::now();
    CredentialAttributes {
        holder: Some(HolderId::new(holder)),
        name: Some("Ada Lovelace".to_string()),
        test_name: Some("Academic English".to_string()),
        serial_number: Some("AE-2025-000417".to_string()),
        certification_date: Some(certified),
        expiry_date: Some(certified.plus_days(730)),
        scores: Some(scores),
        ..Default::default()
    }
}

fn print_report(label: &str, report: &VerificationReport) {
    println!("{label}: {}", if report.accepted { "ACCEPTED" } else { "REJECTED" });
    for (name, outcome) in report.checks() {
        let mark = if outcome.passed { "ok  " } else { "FAIL" };
        if outcome.detail.is_empty() {
            println!("  [{mark}] {name:?}");
        } else {
            println!("  [{mark}] {name:?}: {}", outcome.detail);
        }
    }
}

/// Run the walkthrough.
pub async fn run(args: DemoArgs, mut config: ProtocolConfig) -> anyhow::Result<()> {
    if let Some(dir) = args.state_dir {
        config.state_dir = dir;
    }
    let metrics = PerformanceManager::new(config.metrics_enabled);
    let registry = Registry::new();
    let hasher = field_hasher().await;

    let mut issuer = Issuer::new(IssuerId::new("did:example:testing-board"), &config, metrics.clone()).await?;
    let mut holder = Holder::new(HolderId::new(args.holder.as_str()), hasher.clone(), &config, metrics.clone());
    let mut verifier = Verifier::new(VerifierId::new("did:example:university"), hasher, registry.clone(), metrics.clone());

    holder.trust_issuer(issuer.id().clone());
    verifier.trust_issuer(issuer.id().clone());
    issuer.publish_key(holder.key_directory_mut());
    issuer.publish_key(verifier.key_directory_mut());

    println!("== issue");
    let vc = issuer.issue(attributes(&args.holder, args.overall))?;
    issuer.register(&registry, &vc.credential.id)?;
    println!("credential {} for {} (overall {})", vc.credential.id, vc.credential.holder, args.overall);

    println!("== store");
    let wire = serde_json::to_string(&vc)?;
    holder.store(serde_json::from_str(&wire)?)?;
    holder.publish_root(&registry);
    println!("holder accumulator root {} (published)", holder.root());

    println!("== present");
    let request = PresentationRequest::new(verifier.id().clone(), "graduate admission")
        .require("name")
        .require("scores.overall")
        .min_score("overall", args.threshold)
        .with_nonce(format!("demo-{}", Timestamp::now().epoch_secs()));
    let presentation = holder
        .present(&request)
        .with_context(|| format!("holder could not satisfy overall >= {}", args.threshold))?;
    println!(
        "revealed {}",
        serde_json::to_string(&presentation.proof.revealed_attributes)?
    );

    println!("== verify");
    let report = verifier.verify(&presentation, Some(&request));
    print_report("verification", &report);
    holder.record_outcome(&vc.credential.id, report.accepted)?;

    println!("== revoke");
    let revoked = issuer.revoke(&registry, &vc.credential.id);
    println!("revoked: {revoked}");
    let report = verifier.verify(&presentation, Some(&request));
    print_report("re-verification", &report);

    if args.save {
        let start = std::time::Instant::now();
        let saved = holder.accumulator().save(&config.state_dir).await;
        metrics.record(Operation::Persist, start.elapsed(), saved.is_ok());
        saved?;
        println!("holder state saved to {}", config.state_dir.display());
    }

    println!("== metrics");
    for op in metrics.snapshot() {
        if op.count > 0 {
            println!(
                "  {:<8} count={} failures={} mean={}us",
                op.operation.as_str(),
                op.count,
                op.failures,
                op.mean_micros()
            );
        }
    }
    Ok(())
}
