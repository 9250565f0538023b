#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use launchgate_core::catalog::{ApproverSource, GateCatalog};
use launchgate_core::config::{LaunchgateConfig, DEFAULT_CONFIG_PATH};
use launchgate_core::traits::{Clock, GateStore, HttpFetcher, SystemClock};
use launchgate_core::types::{GateType, VoteState};
use launchgate_engine::approvers::{ApproverResolver, ConfigPermissions, MemoryCache};
use launchgate_engine::fetch::{OfflineFetcher, ReqwestFetcher};
use launchgate_engine::gates::{GateTarget, ReviewerAssigner, VoteCoordinator};
use launchgate_engine::slo::{overdue_gates, DefaultSloRecorder};
use launchgate_engine::state::JsonFileStore;

#[derive(Parser)]
#[command(
    name = "lgate",
    version,
    about = "Launch review gates: votes, approvers, and SLOs. Unix-friendly."
)]
struct Cli {
    /// Path to config JSON.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Path to the store file (overrides config).
    #[arg(long, global = true)]
    store: Option<String>,

    /// Never touch the network; use stored OWNERS data only.
    #[arg(long, global = true)]
    offline: bool,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List the supported gate types.
    Gates {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create a gate for a feature.
    CreateGate {
        feature: u64,

        /// Numeric gate type, e.g. 4 for Intent to Ship.
        gate_type: u32,

        /// Stage the gate belongs to.
        #[arg(long)]
        stage: Option<u64>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Set a reviewer's vote on a gate.
    Vote {
        feature: u64,

        /// Gate id to vote on.
        #[arg(long, conflicts_with = "gate_type", required_unless_present = "gate_type")]
        gate_id: Option<u64>,

        /// Vote on the feature's gate of this type instead.
        #[arg(long)]
        gate_type: Option<u32>,

        /// Vote state name (approved, needs-work, ...) or numeric code.
        #[arg(long)]
        state: String,

        /// Email of the voter.
        #[arg(long)]
        voter: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show who may approve a gate type.
    Approvers {
        gate_type: u32,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show which gate types a user may approve.
    Approvable {
        user: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Assign reviewers to a gate from sibling gates or the team rotation.
    Assign {
        gate_id: u64,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show a feature's gates and votes.
    Status {
        feature: u64,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Recompute stored gate states from their votes.
    Reevaluate {
        /// Only this feature's gates.
        #[arg(long)]
        feature: Option<u64>,
    },

    /// Set the stored approvers and rotation of a gate type.
    GateDef {
        gate_type: u32,

        /// Approver email (repeatable or comma-separated).
        #[arg(long = "approver", value_delimiter = ',')]
        approvers: Vec<String>,

        /// Endpoint returning {"emails": [...]} for the on-call reviewer.
        #[arg(long)]
        rotation_url: Option<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// List open reviews past their SLO.
    Overdue {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Shared collaborators for one invocation.
struct Context {
    config: LaunchgateConfig,
    store: Arc<JsonFileStore>,
    catalog: Arc<GateCatalog>,
    clock: Arc<dyn Clock>,
    fetcher: Arc<dyn HttpFetcher>,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let config = LaunchgateConfig::load(&cli.config)?;
        let store_path = cli.store.clone().unwrap_or_else(|| config.store_path.clone());
        let fetcher: Arc<dyn HttpFetcher> = if cli.offline {
            Arc::new(OfflineFetcher)
        } else {
            Arc::new(ReqwestFetcher::from_config(&config).context("cannot build HTTP client")?)
        };
        Ok(Self {
            store: Arc::new(JsonFileStore::open(&store_path)),
            catalog: Arc::new(GateCatalog::chromium()),
            clock: Arc::new(SystemClock),
            fetcher,
            config,
        })
    }

    fn coordinator(&self) -> VoteCoordinator {
        VoteCoordinator::new(
            self.store.clone(),
            self.catalog.clone(),
            Arc::new(DefaultSloRecorder::new(self.clock.clone())),
            self.clock.clone(),
        )
    }

    fn resolver(&self) -> ApproverResolver {
        ApproverResolver::new(
            self.catalog.clone(),
            self.store.clone(),
            Arc::new(MemoryCache::new(self.clock.clone())),
            self.fetcher.clone(),
            self.clock.clone(),
        )
        .with_config(&self.config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ctx = Context::load(&cli)?;

    match cli.cmd {
        Cmd::Gates { json } => cmd_gates(&ctx, json),

        Cmd::CreateGate {
            feature,
            gate_type,
            stage,
            json,
        } => cmd_create_gate(&ctx, feature, GateType(gate_type), stage, json),

        Cmd::Vote {
            feature,
            gate_id,
            gate_type,
            state,
            voter,
            json,
        } => {
            let target = match (gate_id, gate_type) {
                (Some(id), _) => GateTarget::Id(id),
                (None, Some(t)) => GateTarget::Type(GateType(t)),
                (None, None) => bail!("either --gate-id or --gate-type is required"),
            };
            cmd_vote(&ctx, feature, target, &state, &voter, json)
        }

        Cmd::Approvers { gate_type, json } => cmd_approvers(&ctx, GateType(gate_type), json),

        Cmd::Approvable { user, json } => cmd_approvable(&ctx, &user, json),

        Cmd::Assign { gate_id, json } => cmd_assign(&ctx, gate_id, json),

        Cmd::Status { feature, json } => cmd_status(&ctx, feature, json),

        Cmd::Reevaluate { feature } => cmd_reevaluate(&ctx, feature),

        Cmd::GateDef {
            gate_type,
            approvers,
            rotation_url,
            json,
        } => cmd_gate_def(&ctx, GateType(gate_type), approvers, rotation_url, json),

        Cmd::Overdue { json } => cmd_overdue(&ctx, json),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .init();
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn source_label(source: &ApproverSource) -> String {
    match source {
        ApproverSource::Fixed(emails) => format!("fixed ({} emails)", emails.len()),
        ApproverSource::Stored => "stored".to_string(),
        ApproverSource::OwnersFile(url) => format!("owners file {url}"),
    }
}

fn cmd_gates(ctx: &Context, json_out: bool) -> Result<()> {
    if json_out {
        let gates: Vec<_> = ctx.catalog.iter().collect();
        return print_json(&gates);
    }
    for info in ctx.catalog.iter() {
        println!(
            "{:>3}  {:<40} {:<12} {:<14} {}",
            info.gate_type,
            info.name,
            info.rule,
            info.team_name,
            source_label(&info.approvers)
        );
    }
    Ok(())
}

fn cmd_create_gate(
    ctx: &Context,
    feature: u64,
    gate_type: GateType,
    stage: Option<u64>,
    json_out: bool,
) -> Result<()> {
    let gate = ctx.coordinator().create_gate(feature, gate_type, stage)?;
    if json_out {
        return print_json(&gate);
    }
    println!("{}", gate.id);
    eprintln!("  created gate {} ({gate_type}) for feature {feature}", gate.id);
    Ok(())
}

fn cmd_vote(
    ctx: &Context,
    feature: u64,
    target: GateTarget,
    state: &str,
    voter: &str,
    json_out: bool,
) -> Result<()> {
    let coordinator = ctx.coordinator();
    let (vote_state, result) = match state.trim().parse::<i32>() {
        Ok(code) => {
            let result = coordinator.submit_vote_code(feature, target, code, voter)?;
            (VoteState::try_from(code)?, result)
        }
        Err(_) => {
            let vote_state: VoteState = state.parse()?;
            let result = coordinator.submit_vote(feature, target, vote_state, voter)?;
            (vote_state, result)
        }
    };

    if json_out {
        return print_json(&serde_json::json!({
            "feature_id": feature,
            "voter": voter,
            "vote": vote_state,
            "gate_state": result,
        }));
    }
    match result {
        Some(gate_state) => eprintln!("  {voter} voted {vote_state}; gate is now {gate_state}"),
        None => eprintln!("  {voter} voted {vote_state}; gate unchanged"),
    }
    Ok(())
}

fn cmd_approvers(ctx: &Context, gate_type: GateType, json_out: bool) -> Result<()> {
    let resolver = ctx.resolver();
    if !resolver.is_valid_gate_type(gate_type) {
        eprintln!("  warning: unknown gate type {gate_type}");
    }
    let approvers = resolver.get_approvers(gate_type)?;
    if json_out {
        return print_json(&approvers);
    }
    for email in &approvers {
        println!("{email}");
    }
    Ok(())
}

fn cmd_approvable(ctx: &Context, user: &str, json_out: bool) -> Result<()> {
    let permissions = ConfigPermissions::from_config(&ctx.config);
    let fields = ctx.resolver().fields_approvable_by(user, &permissions)?;
    if json_out {
        return print_json(&fields);
    }
    for gate_type in &fields {
        let name = ctx
            .catalog
            .lookup(*gate_type)
            .map(|g| g.name.as_str())
            .unwrap_or("?");
        println!("{gate_type:>3}  {name}");
    }
    Ok(())
}

fn cmd_assign(ctx: &Context, gate_id: u64, json_out: bool) -> Result<()> {
    let Some(mut gate) = ctx.store.get_gate(gate_id)? else {
        bail!("gate {gate_id} not found");
    };
    let assigner = ReviewerAssigner::new(
        ctx.store.clone(),
        ctx.catalog.clone(),
        ctx.fetcher.clone(),
        ctx.config.max_log_line,
    );
    let assigned = assigner.auto_assign_reviewer(&mut gate)?;
    if json_out {
        return print_json(&serde_json::json!({
            "gate_id": gate_id,
            "assigned": assigned,
            "assignee_emails": gate.assignee_emails,
        }));
    }
    if assigned {
        eprintln!("  assigned {}", gate.assignee_emails.join(", "));
    } else {
        eprintln!("  no reviewer assigned");
    }
    Ok(())
}

fn cmd_status(ctx: &Context, feature: u64, json_out: bool) -> Result<()> {
    let gates = ctx.store.gates_for_feature(feature)?;
    if json_out {
        let mut entries = Vec::new();
        for gate in &gates {
            let mut entry = serde_json::to_value(gate)?;
            entry["votes"] = serde_json::to_value(ctx.store.votes_for_gate(gate.id)?)?;
            entries.push(entry);
        }
        return print_json(&serde_json::json!({
            "feature_id": feature,
            "gates": entries,
        }));
    }

    if gates.is_empty() {
        eprintln!("  feature {feature} has no gates");
        return Ok(());
    }
    for gate in &gates {
        let name = ctx
            .catalog
            .lookup(gate.gate_type)
            .map(|g| g.name.as_str())
            .unwrap_or("(retired gate type)");
        eprintln!("  Gate {:<4} {name}: {}", gate.id, gate.state);
        if !gate.assignee_emails.is_empty() {
            eprintln!("    Assigned: {}", gate.assignee_emails.join(", "));
        }
        for vote in ctx.store.votes_for_gate(gate.id)? {
            eprintln!(
                "    {} {} ({})",
                vote.set_by,
                vote.state,
                vote.set_on.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

fn cmd_reevaluate(ctx: &Context, feature: Option<u64>) -> Result<()> {
    let changed = ctx.coordinator().reevaluate_gates(feature)?;
    eprintln!("  {changed} gate(s) updated");
    Ok(())
}

fn cmd_gate_def(
    ctx: &Context,
    gate_type: GateType,
    approvers: Vec<String>,
    rotation_url: Option<String>,
    json_out: bool,
) -> Result<()> {
    let def = ctx
        .resolver()
        .set_gate_def(gate_type, approvers, rotation_url)?;
    if json_out {
        return print_json(&def);
    }
    eprintln!(
        "  gate type {gate_type}: {} approver(s){}",
        def.approvers.len(),
        def.rotation_url
            .as_deref()
            .map(|u| format!(", rotation {u}"))
            .unwrap_or_default()
    );
    Ok(())
}

fn cmd_overdue(ctx: &Context, json_out: bool) -> Result<()> {
    let report = overdue_gates(ctx.store.as_ref(), &ctx.catalog, ctx.clock.now())?;
    if json_out {
        return print_json(&report);
    }
    if report.is_empty() {
        eprintln!("  no overdue reviews");
        return Ok(());
    }
    for item in &report {
        let kind = match item.kind {
            launchgate_engine::slo::SloKind::InitialResponse => "initial response",
            launchgate_engine::slo::SloKind::Resolve => "resolution",
        };
        println!(
            "gate {} (feature {}, {}): {kind} {} of {} weekdays{}",
            item.gate_id,
            item.feature_id,
            item.gate_name,
            item.weekdays_elapsed,
            item.limit,
            item.escalation_email
                .as_deref()
                .map(|e| format!(", escalate to {e}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
