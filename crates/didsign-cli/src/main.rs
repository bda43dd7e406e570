// didsign CLI - sign and submit DID-authenticated ledger operations

mod input;
mod logging;
mod transport;

use std::time::Duration;

use anyhow::anyhow;
use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};
use colored::Colorize;
use didsign_crypto::{
    validate_params_with_limits, verify_envelope, BondDoc, BondStatus, Envelope, Msg,
    MsgAddDid, MsgCreateBond, MsgCreateProject, MsgUpdateBondStatus, Operation,
    ParamLimits, PaymentParamsInput, PipelineOptions, SovrinDid, SubmissionPipeline,
};

use crate::input::{read_identity, read_json_arg};
use crate::logging::{init_logging, LogFormat};
use crate::transport::RpcTransport;

/// didsign - Sovrin DID signing tool for ledger operations
#[derive(Parser)]
#[command(name = "didsign")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node RPC endpoint
    #[arg(long, global = true, env = "DIDSIGN_NODE", default_value = "http://localhost:26657")]
    node: String,

    /// Transport timeout in seconds
    #[arg(long, global = true, env = "DIDSIGN_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Log level or filter directives (overridden by RUST_LOG)
    #[arg(long, global = true, env = "DIDSIGN_LOG", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Check that verifyKey and did belong to signKey before signing
    #[arg(long, global = true)]
    strict_keys: bool,

    /// Print the signed envelope instead of broadcasting it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

/// JSON arguments accept inline JSON or @path to a file.
#[derive(Subcommand)]
enum Commands {
    /// Create a bond signed by the bond's own DID
    CreateBond {
        sender_did: String,
        /// Bond document: {"createdOn", "createdBy", "status"}
        bond_json: String,
        /// Sovrin DID document of the bond
        sovrin_did: String,
    },
    /// Change the status of a bond
    UpdateBondStatus {
        sender_did: String,
        /// One of PREISSUANCE, OPEN, SUSPENDED, CLOSED, SETTLEMENT, ENDED
        status: String,
        sovrin_did: String,
    },
    /// Register a Sovrin DID and its verify key on the ledger
    AddDidDoc { sovrin_did: String },
    /// Issue a KYC credential for a DID already on the ledger (checked even with --dry-run)
    AddKycCredential {
        did: String,
        /// Sovrin DID document of the issuer
        signer_did_doc: String,
    },
    /// Create a project signed by the project's own DID
    CreateProject {
        sender_did: String,
        project_json: String,
        sovrin_did: String,
    },
    /// Show the DID document stored on the ledger
    QueryDidDoc { did: String },
    /// Show the project document stored on the ledger
    QueryProjectDoc { did: String },
    /// List the DIDs of every project stored on the ledger
    QueryAllProjectDids,
    /// Check a payments configuration and list every violation
    ValidateParams {
        params_json: String,
        /// Also reject percentages above this value
        #[arg(long)]
        max_percentage: Option<BigDecimal>,
    },
    /// Verify the signatures of a signed envelope offline
    Verify { envelope_json: String },
}

struct Context {
    pipeline: SubmissionPipeline<RpcTransport>,
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let ctx = Context {
        pipeline: SubmissionPipeline::new(
            RpcTransport::new(cli.node, Duration::from_secs(cli.timeout_secs)),
            PipelineOptions {
                strict_keys: cli.strict_keys,
            },
        ),
        dry_run: cli.dry_run,
    };

    let result = match cli.command {
        Commands::CreateBond {
            sender_did,
            bond_json,
            sovrin_did,
        } => handle_create_bond(&ctx, sender_did, &bond_json, &sovrin_did),
        Commands::UpdateBondStatus {
            sender_did,
            status,
            sovrin_did,
        } => handle_update_bond_status(&ctx, sender_did, &status, &sovrin_did),
        Commands::AddDidDoc { sovrin_did } => handle_add_did_doc(&ctx, &sovrin_did),
        Commands::AddKycCredential {
            did,
            signer_did_doc,
        } => handle_add_kyc_credential(&ctx, &did, &signer_did_doc),
        Commands::CreateProject {
            sender_did,
            project_json,
            sovrin_did,
        } => handle_create_project(&ctx, sender_did, &project_json, &sovrin_did),
        Commands::QueryDidDoc { did } => handle_query_did_doc(&ctx, &did),
        Commands::QueryProjectDoc { did } => handle_query_project_doc(&ctx, &did),
        Commands::QueryAllProjectDids => handle_query_all_project_dids(&ctx),
        Commands::ValidateParams {
            params_json,
            max_percentage,
        } => handle_validate_params(&params_json, max_percentage),
        Commands::Verify { envelope_json } => handle_verify(&envelope_json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn handle_create_bond(
    ctx: &Context,
    sender_did: String,
    bond_json: &str,
    sovrin_did: &str,
) -> anyhow::Result<()> {
    let bond_doc: BondDoc = serde_json::from_str(&read_json_arg(bond_json)?)
        .map_err(didsign_crypto::Error::from)?;
    let identity = read_identity(sovrin_did)?;

    sign_and_submit(ctx, MsgCreateBond::new(sender_did, bond_doc, &identity), &identity)
}

fn handle_update_bond_status(
    ctx: &Context,
    sender_did: String,
    status: &str,
    sovrin_did: &str,
) -> anyhow::Result<()> {
    let status: BondStatus = status.parse()?;
    let identity = read_identity(sovrin_did)?;

    sign_and_submit(ctx, MsgUpdateBondStatus::new(sender_did, status, &identity), &identity)
}

fn handle_add_did_doc(ctx: &Context, sovrin_did: &str) -> anyhow::Result<()> {
    let identity = read_identity(sovrin_did)?;
    sign_and_submit(ctx, MsgAddDid::from_identity(&identity), &identity)
}

fn handle_add_kyc_credential(ctx: &Context, did: &str, signer_did_doc: &str) -> anyhow::Result<()> {
    let issuer = read_identity(signer_did_doc)?;

    if ctx.dry_run {
        return print_envelope(&ctx.pipeline.sign_kyc_credential(did, &issuer, chrono::Utc::now())?);
    }

    let result = ctx.pipeline.add_kyc_credential(did, &issuer, chrono::Utc::now())?;
    print_committed(result.height, &result.tx_hash);
    Ok(())
}

fn handle_create_project(
    ctx: &Context,
    sender_did: String,
    project_json: &str,
    sovrin_did: &str,
) -> anyhow::Result<()> {
    let project_json = read_json_arg(project_json)?;
    let identity = read_identity(sovrin_did)?;
    let msg = MsgCreateProject::new(sender_did, &project_json, &identity)?;

    sign_and_submit(ctx, msg, &identity)
}

fn handle_query_did_doc(ctx: &Context, did: &str) -> anyhow::Result<()> {
    let doc = ctx
        .pipeline
        .query_did_doc(did)?
        .ok_or_else(|| didsign_crypto::Error::DidNotFound(did.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn handle_query_project_doc(ctx: &Context, did: &str) -> anyhow::Result<()> {
    let doc = ctx
        .pipeline
        .query_project_doc(did)?
        .ok_or_else(|| anyhow!("No project document stored for '{}'", did))?;

    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn handle_query_all_project_dids(ctx: &Context) -> anyhow::Result<()> {
    let dids = ctx.pipeline.query_all_project_dids()?;
    println!("{}", serde_json::to_string_pretty(&dids)?);
    Ok(())
}

fn handle_validate_params(params_json: &str, max_percentage: Option<BigDecimal>) -> anyhow::Result<()> {
    let params = PaymentParamsInput::from_json(&read_json_arg(params_json)?)?;

    let mut limits = ParamLimits::default();
    let violations = match max_percentage {
        Some(max) => {
            limits.max_percentage = max;
            validate_params_with_limits(&params, &limits)
        }
        None => didsign_crypto::validate_params(&params),
    };

    if violations.is_empty() {
        println!("{} {}", "✓".green().bold(), "Payments configuration is valid".green());
        return Ok(());
    }

    eprintln!("{} {}", "✗".red().bold(), "Payments configuration is invalid".red());
    eprintln!();
    for violation in &violations {
        eprintln!("  - {}", violation);
    }
    Err(anyhow!("{} violation(s) found", violations.len()))
}

fn handle_verify(envelope_json: &str) -> anyhow::Result<()> {
    let json = read_json_arg(envelope_json)?;
    let envelope = Envelope::from_wire_bytes(json.as_bytes())?;

    match verify_envelope(&envelope) {
        Ok(()) => {
            println!("{} {}", "✓".green().bold(), "Signature verified".green());
            println!();
            if let Some(operation) = envelope.operation() {
                println!("  Operation: {}", operation.msg_type());
            }
            for signature in envelope.signatures() {
                println!("  Signer:    {}", signature.signer_did);
                println!("  Created:   {}", signature.created.to_rfc3339());
            }
            println!("  Hash:      {}", envelope.tx_hash()?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), "Signature verification failed".red());
            eprintln!();
            eprintln!("  Error: {}", e);
            Err(e.into())
        }
    }
}

/// Signs `msg` with `identity`, then prints the envelope (dry run) or submits it.
fn sign_and_submit<M>(ctx: &Context, msg: M, identity: &SovrinDid) -> anyhow::Result<()>
where
    M: Msg + Into<Operation>,
{
    if ctx.dry_run {
        return print_envelope(&ctx.pipeline.sign(msg, identity)?);
    }

    let result = ctx.pipeline.submit(msg, identity)?;
    print_committed(result.height, &result.tx_hash);
    Ok(())
}

fn print_envelope(envelope: &Envelope) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    tracing::info!(tx_hash = %envelope.tx_hash()?, "dry run, envelope not broadcast");
    Ok(())
}

fn print_committed(height: i64, tx_hash: &str) {
    println!(
        "{} Committed at block {}. Hash: {}",
        "✓".green().bold(),
        height,
        tx_hash
    );
}
