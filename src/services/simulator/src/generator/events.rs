//! Feature-event stream generation
//!
//! Per (developer, day) the velocity event budget is split across the seven
//! streams: model usage, client version reports, file-extension edits, MCP
//! tool calls, command palette uses, plans and ask-mode questions. Activity
//! level gates the per-developer share; tab-shown model events are followed
//! by a tab-accepted event with probability equal to the developer's
//! acceptance rate.

use chrono::NaiveDate;

use codetel_shared::{
    AskModeEvent, ClientVersionEvent, CommandEvent, DeveloperProfile, EventEnvelope,
    FileExtensionEvent, McpEvent, ModelUsageEvent, PlanEvent, UsageKind,
};

use crate::sampling::{Sampler, EVENT_TYPE_MIX};
use crate::store::CorpusData;

use super::GenCtx;

const MODEL_POOL: [&str; 5] = ["auto", "composer-1", "sonnet-4.5", "gpt-5", "grok-code-fast"];
const CLIENT_VERSIONS: [&str; 4] = ["1.40.2", "1.41.0", "1.42.1", "1.43.0"];
const MCP_SERVERS: [(&str, &[&str]); 4] = [
    ("github", &["search_issues", "create_pr_comment", "get_file"]),
    ("postgres", &["run_query", "describe_table"]),
    ("slack", &["post_message", "list_channels"]),
    ("filesystem", &["read_file", "list_directory"]),
];
const COMMAND_POOL: [&str; 6] = [
    "edit.generate",
    "chat.open",
    "terminal.run",
    "search.codebase",
    "apply.diff",
    "review.diff",
];
const EXTENSION_FALLBACK: [&str; 3] = ["md", "json", "yaml"];

/// Stream shares of the per-developer feature budget
const STREAM_SHARES: [(Stream, f64); 7] = [
    (Stream::ModelUsage, 0.35),
    (Stream::FileExtension, 0.25),
    (Stream::Command, 0.15),
    (Stream::Mcp, 0.12),
    (Stream::AskMode, 0.07),
    (Stream::Plan, 0.05),
    (Stream::ClientVersion, 0.01),
];

#[derive(Clone, Copy)]
enum Stream {
    ModelUsage,
    FileExtension,
    Command,
    Mcp,
    AskMode,
    Plan,
    ClientVersion,
}

fn extensions_for(dev: &DeveloperProfile, ctx: &GenCtx<'_>) -> Vec<&'static str> {
    let mut pool: Vec<&'static str> = ctx
        .seed
        .repos_for_developer(dev)
        .iter()
        .map(|r| match r.primary_language.as_str() {
            "rust" => "rs",
            "typescript" => "tsx",
            "go" => "go",
            "python" => "py",
            "kotlin" => "kt",
            _ => "txt",
        })
        .collect();
    pool.extend(EXTENSION_FALLBACK);
    pool
}

fn envelope(sampler: &mut Sampler, dev: &DeveloperProfile, day: NaiveDate) -> EventEnvelope {
    let ts = sampler.working_timestamp(day, &dev.working_hours);
    EventEnvelope {
        id: sampler.uuid(),
        user_id: dev.user_id.clone(),
        email: dev.email.clone(),
        event_date: day,
        event_timestamp: ts,
    }
}

pub(super) fn generate(ctx: &mut GenCtx<'_>, data: &mut CorpusData) -> usize {
    let mut added = 0;
    let days = ctx.days.clone();

    for dev in ctx.developers.clone() {
        let budget = ctx.feature_rate(dev);
        let extensions = extensions_for(dev, ctx);
        for (day_idx, day) in days.iter().enumerate() {
            let day_weight = Sampler::day_weight(*day);
            // Rollout schedule: the reported client version advances weekly.
            let week_idx = day_idx / 7;
            let version = CLIENT_VERSIONS[week_idx.min(CLIENT_VERSIONS.len() - 1)];

            for (stream, share) in STREAM_SHARES {
                let lambda = budget * share * day_weight;
                let count = ctx.sampler.poisson_count(lambda);
                for _ in 0..count {
                    if !ctx.sampler.accept_day(*day) {
                        continue;
                    }
                    added += emit(ctx, data, dev, *day, stream, version, &extensions);
                }
            }
        }
    }
    added
}

fn emit(
    ctx: &mut GenCtx<'_>,
    data: &mut CorpusData,
    dev: &DeveloperProfile,
    day: NaiveDate,
    stream: Stream,
    version: &str,
    extensions: &[&'static str],
) -> usize {
    match stream {
        Stream::ModelUsage => {
            let usage_kind = *ctx.sampler.weighted_choice(&EVENT_TYPE_MIX);
            let model_name = ctx.sampler.pick(&MODEL_POOL).to_string();
            data.add_model_usage_event(ModelUsageEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                model_name: model_name.clone(),
                usage_kind,
            });
            // A shown tab suggestion converts at the developer's acceptance
            // rate, emitting the paired accepted event.
            if usage_kind == UsageKind::TabShown && ctx.sampler.chance(dev.acceptance_rate) {
                data.add_model_usage_event(ModelUsageEvent {
                    envelope: envelope(&mut ctx.sampler, dev, day),
                    model_name,
                    usage_kind: UsageKind::TabAccepted,
                });
                return 2;
            }
            1
        }
        Stream::FileExtension => {
            let suggested = ctx.sampler.lognormal(24.0, 0.8).round().clamp(1.0, 900.0) as u64;
            let accepted = (suggested as f64 * dev.acceptance_rate).round() as u64;
            data.add_file_extension_event(FileExtensionEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                file_extension: ctx.sampler.pick(extensions).to_string(),
                suggested_lines: suggested,
                accepted_lines: accepted.min(suggested),
            });
            1
        }
        Stream::Command => {
            data.add_command_event(CommandEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                command_name: ctx.sampler.pick(&COMMAND_POOL).to_string(),
            });
            1
        }
        Stream::Mcp => {
            let (server, tools) = *ctx.sampler.pick(&MCP_SERVERS);
            data.add_mcp_event(McpEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                server_name: server.to_string(),
                tool_name: ctx.sampler.pick(tools).to_string(),
            });
            1
        }
        Stream::AskMode => {
            data.add_ask_mode_event(AskModeEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                model_name: ctx.sampler.pick(&MODEL_POOL).to_string(),
            });
            1
        }
        Stream::Plan => {
            data.add_plan_event(PlanEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                plan_steps: ctx.sampler.range_u64(1, 12) as u32,
            });
            1
        }
        Stream::ClientVersion => {
            data.add_client_version_event(ClientVersionEvent {
                envelope: envelope(&mut ctx.sampler, dev, day),
                client_version: version.to_string(),
            });
            1
        }
    }
}
