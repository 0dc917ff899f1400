//! vouch — command-line front end for peer-validated verification.
//!
//! Every invocation locks the state file, loads it, runs one command against
//! a [`VerificationOrchestrator`], and writes the state back.

mod config;
mod store;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use config::VouchConfig;
use vouch_attestation::HttpAttestor;
use vouch_types::{Clock, RequestId, SystemClock, UserId};
use vouch_utils::{format_age, init_logging, LogFormat};
use vouch_verification::{
    ConfirmationInput, Decision, EvidenceKind, EvidenceRef, NewRequest, RequestKind,
    VerificationOrchestrator,
};

#[derive(Parser)]
#[command(name = "vouch", about = "Peer-validated contribution verification")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "VOUCH_CONFIG")]
    config: Option<PathBuf>,

    /// State file (overrides `state_file` from the config).
    #[arg(long, env = "VOUCH_STATE_FILE")]
    state_file: Option<PathBuf>,

    /// Attestation service base URL (overrides `attestation.endpoint`).
    #[arg(long, env = "VOUCH_ATTESTATION_ENDPOINT")]
    attestation_endpoint: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VOUCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VOUCH_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open a verification request.
    Submit {
        #[arg(long)]
        requester: UserId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long, value_enum, default_value_t = KindArg::Contribution)]
        kind: KindArg,
        /// Claimed skill (repeatable or comma-separated).
        #[arg(long = "skill", value_delimiter = ',', required = true)]
        skills: Vec<String>,
        /// Chosen validator (repeatable or comma-separated).
        #[arg(long = "validator", value_delimiter = ',', required = true)]
        validators: Vec<UserId>,
        /// Evidence as `KIND=URL[=DESCRIPTION]`, e.g.
        /// `link=https://example.org/pr/12=review thread`. Write any `=` inside
        /// the URL as `%3D`.
        #[arg(long = "evidence")]
        evidence: Vec<String>,
    },
    /// List requests awaiting a validator's decision.
    Pending {
        #[arg(long)]
        validator: UserId,
    },
    /// Record a validator's decision.
    Confirm {
        #[arg(long)]
        request: RequestId,
        #[arg(long)]
        validator: UserId,
        #[arg(long, value_enum)]
        decision: DecisionArg,
        /// 1-5, required when approving.
        #[arg(long)]
        rating: Option<u8>,
        /// Skill being confirmed (repeatable or comma-separated).
        #[arg(long = "skill", value_delimiter = ',')]
        skills: Vec<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Show a request's verification status.
    Status {
        #[arg(long)]
        request: RequestId,
    },
    /// Issue the certificate for a verified request.
    Issue {
        #[arg(long)]
        request: RequestId,
    },
    /// Show a request's certificate.
    Certificate {
        #[arg(long)]
        request: RequestId,
        /// Also ask the attestation service whether the proof is known.
        #[arg(long)]
        verify: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Contribution,
    Skill,
    Project,
}

impl From<KindArg> for RequestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Contribution => RequestKind::Contribution,
            KindArg::Skill => RequestKind::Skill,
            KindArg::Project => RequestKind::Project,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for Decision {
    fn from(decision: DecisionArg) -> Self {
        match decision {
            DecisionArg::Approve => Decision::Approve,
            DecisionArg::Reject => Decision::Reject,
        }
    }
}

fn parse_evidence(raw: &str, clock: &dyn Clock) -> anyhow::Result<EvidenceRef> {
    let mut parts = raw.splitn(3, '=');
    let (kind, url) = match (parts.next(), parts.next()) {
        (Some(kind), Some(url)) => (kind, url),
        _ => anyhow::bail!("evidence {raw:?} must look like KIND=URL[=DESCRIPTION]"),
    };
    let description = parts.next().unwrap_or_default();
    let kind = match kind.trim().to_ascii_lowercase().as_str() {
        "commit" => EvidenceKind::Commit,
        "file" => EvidenceKind::File,
        "link" => EvidenceKind::Link,
        "screenshot" => EvidenceKind::Screenshot,
        other => anyhow::bail!("unknown evidence kind {other:?}"),
    };
    Ok(EvidenceRef::new(kind, url.trim(), description.trim(), clock.now()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<VouchConfig> {
    let mut config = match &cli.config {
        Some(path) => VouchConfig::from_toml_file(path)?,
        None => VouchConfig::default(),
    };
    if let Some(state_file) = &cli.state_file {
        config.state_file = state_file.clone();
    }
    if let Some(endpoint) = &cli.attestation_endpoint {
        config.attestation.endpoint = endpoint.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn attestor(config: &VouchConfig) -> HttpAttestor {
    HttpAttestor::with_timeouts(
        &config.attestation.endpoint,
        Duration::from_millis(config.attestation.timeout_ms),
        Duration::from_millis(config.attestation.connect_timeout_ms),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::debug!("loaded config from {}", path.display());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    // Held until the state is written back.
    let _state_lock = store::lock(&config.state_file)?;
    let snapshot = store::load(&config.state_file)?;
    let orch = VerificationOrchestrator::restore(
        snapshot,
        config.verification_params(),
        config.attestation.retry_policy(),
        Arc::clone(&clock),
    );

    match cli.command {
        Command::Submit {
            requester,
            title,
            description,
            kind,
            skills,
            validators,
            evidence,
        } => {
            let evidence = evidence
                .iter()
                .map(|raw| parse_evidence(raw, clock.as_ref()))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let id = orch.submit_request(NewRequest {
                requester,
                title,
                description,
                kind: kind.into(),
                claimed_skills: skills,
                evidence,
                validators,
            })?;
            println!("{id}");
        }
        Command::Pending { validator } => {
            let now = clock.now();
            for request in orch.list_pending(&validator) {
                println!(
                    "{}\t{}\t{}\t{}",
                    request.id,
                    request.requester,
                    format_age(request.created_at, now),
                    request.title
                );
            }
        }
        Command::Confirm {
            request,
            validator,
            decision,
            rating,
            skills,
            comment,
        } => {
            let status = orch.record_confirmation(ConfirmationInput {
                request_id: request,
                validator,
                decision: decision.into(),
                skills_confirmed: skills,
                rating,
                comment,
            })?;
            print_json(&status)?;
        }
        Command::Status { request } => {
            print_json(&orch.status(request)?)?;
        }
        Command::Issue { request } => {
            let certificate = orch.issue_certificate(request, &attestor(&config)).await?;
            print_json(&certificate)?;
        }
        Command::Certificate { request, verify } => {
            let certificate = orch
                .certificate(request)?
                .with_context(|| format!("no certificate has been issued for {request}"))?;
            print_json(&certificate)?;
            if verify {
                let valid = orch
                    .verify_certificate(&certificate, &attestor(&config))
                    .await?;
                println!("attestation valid: {valid}");
            }
        }
    }

    store::save(&config.state_file, &orch.snapshot())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vouch_types::Timestamp;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            Timestamp::new(42)
        }
    }

    #[test]
    fn parses_evidence_argument() {
        let evidence = parse_evidence("Commit=https://git.example/c/1", &FixedClock).unwrap();
        assert_eq!(evidence.kind(), EvidenceKind::Commit);
        assert_eq!(evidence.url(), "https://git.example/c/1");
        assert_eq!(evidence.timestamp(), Timestamp::new(42));
        assert_eq!(evidence.description(), "");
    }

    #[test]
    fn evidence_argument_carries_a_description() {
        let evidence =
            parse_evidence("link=https://example.org/pr/12=review thread", &FixedClock).unwrap();
        assert_eq!(evidence.kind(), EvidenceKind::Link);
        assert_eq!(evidence.url(), "https://example.org/pr/12");
        assert_eq!(evidence.description(), "review thread");

        let evidence =
            parse_evidence("file=https://files.example/a%3Db.pdf=slides = v2", &FixedClock).unwrap();
        assert_eq!(evidence.url(), "https://files.example/a%3Db.pdf");
        assert_eq!(evidence.description(), "slides = v2");
    }

    #[test]
    fn rejects_malformed_evidence() {
        assert!(parse_evidence("https://no-kind", &FixedClock).is_err());
        assert!(parse_evidence("video=https://x", &FixedClock).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::parse_from([
            "vouch",
            "--state-file",
            "/tmp/other.json",
            "--log-format",
            "json",
            "status",
            "--request",
            "req-1",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.state_file, PathBuf::from("/tmp/other.json"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Command::Status { request } if request == RequestId::new(1)));
    }
}
