//! Seed loading, validation and built-in presets
//!
//! Seeds arrive as JSON, YAML, or a zipped CSV bundle. The CSV bundle holds
//! four tables with fixed column orders:
//!
//! - `developers.csv`: user_id, email, name, org, division, team, region,
//!   seniority, activity_level, acceptance_rate, prs_per_week,
//!   avg_pr_size_loc, avg_files_per_pr, coding_speed_mean, coding_speed_std,
//!   chat_vs_code_ratio, start_hour, end_hour, peak_hours (`;`-separated),
//!   timezone_offset_hours
//! - `repositories.csv`: repo_name, primary_language, service_type,
//!   default_branch, owning_teams (`;`-separated), age_days
//! - `correlations.csv`: key, value
//! - `templates.csv`: kind (commit_message | pr_title | review_comment), text
//!
//! Parsing and validation are atomic: a seed that fails any invariant is
//! rejected whole, with every offending field path in the error message.

use once_cell::sync::Lazy;
use std::io::{Cursor, Read};

use codetel_shared::{
    ActivityLevel, CodingSpeed, CorrelationParams, DeveloperProfile, PrBehavior, PresetInfo,
    RepositoryProfile, Seed, SeedFormat, Seniority, TextTemplates, WorkingHours,
};

use crate::error::{Result, SimulatorError};

/// Parse and validate a seed document
pub fn load_from_bytes(format: SeedFormat, bytes: &[u8]) -> Result<Seed> {
    let seed = match format {
        SeedFormat::Json => serde_json::from_slice::<Seed>(bytes)
            .map_err(|e| SimulatorError::invalid_seed(format!("json parse: {}", e)))?,
        SeedFormat::Yaml => serde_yaml::from_slice::<Seed>(bytes)
            .map_err(|e| SimulatorError::invalid_seed(format!("yaml parse: {}", e)))?,
        SeedFormat::Csv => parse_csv_bundle(bytes)?,
    };
    validate(&seed)?;
    Ok(seed)
}

/// Load a seed from disk, picking the format from the file extension
pub fn load_from_path(path: &str) -> Result<Seed> {
    let bytes = std::fs::read(path)
        .map_err(|e| SimulatorError::invalid_seed(format!("read {}: {}", path, e)))?;
    let format = if path.ends_with(".yaml") || path.ends_with(".yml") {
        SeedFormat::Yaml
    } else if path.ends_with(".zip") {
        SeedFormat::Csv
    } else {
        SeedFormat::Json
    };
    load_from_bytes(format, &bytes)
}

/// Run the schema invariants, joining all reasons into one message
pub fn validate(seed: &Seed) -> Result<()> {
    seed.validate()
        .map_err(|reasons| SimulatorError::invalid_seed(reasons.join("; ")))
}

fn parse_csv_bundle(bytes: &[u8]) -> Result<Seed> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| SimulatorError::invalid_seed(format!("zip open: {}", e)))?;

    let developers = parse_developers(&read_entry(&mut archive, "developers.csv")?)?;
    let repositories = parse_repositories(&read_entry(&mut archive, "repositories.csv")?)?;
    let correlations = match read_entry(&mut archive, "correlations.csv") {
        Ok(content) => parse_correlations(&content)?,
        Err(_) => CorrelationParams::default(),
    };
    let templates = match read_entry(&mut archive, "templates.csv") {
        Ok(content) => parse_templates(&content)?,
        Err(_) => TextTemplates::default(),
    };

    Ok(Seed {
        developers,
        repositories,
        correlations,
        templates,
    })
}

fn read_entry(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| SimulatorError::invalid_seed(format!("bundle is missing {}", name)))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| SimulatorError::invalid_seed(format!("{}: {}", name, e)))?;
    Ok(content)
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, table: &str) -> Result<&'a str> {
    record.get(idx).ok_or_else(|| {
        SimulatorError::invalid_seed(format!("{}: row is missing column {}", table, idx))
    })
}

fn parse_num<T: std::str::FromStr>(value: &str, path: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| SimulatorError::invalid_seed(format!("{}: '{}' is not a number", path, value)))
}

fn parse_developers(content: &str) -> Result<Vec<DeveloperProfile>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut developers = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let record = row
            .map_err(|e| SimulatorError::invalid_seed(format!("developers.csv row {}: {}", i, e)))?;
        let table = "developers.csv";
        let seniority = match field(&record, 7, table)? {
            "junior" => Seniority::Junior,
            "mid" => Seniority::Mid,
            "senior" => Seniority::Senior,
            other => {
                return Err(SimulatorError::invalid_seed(format!(
                    "developers[{}].seniority: unknown value '{}'",
                    i, other
                )))
            }
        };
        let activity_level = match field(&record, 8, table)? {
            "low" => ActivityLevel::Low,
            "medium" => ActivityLevel::Medium,
            "high" => ActivityLevel::High,
            other => {
                return Err(SimulatorError::invalid_seed(format!(
                    "developers[{}].activity_level: unknown value '{}'",
                    i, other
                )))
            }
        };
        let peak_hours = field(&record, 18, table)?
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| parse_num::<u8>(s, &format!("developers[{}].peak_hours", i)))
            .collect::<Result<Vec<u8>>>()?;
        developers.push(DeveloperProfile {
            user_id: field(&record, 0, table)?.to_string(),
            email: field(&record, 1, table)?.to_string(),
            name: field(&record, 2, table)?.to_string(),
            org: field(&record, 3, table)?.to_string(),
            division: field(&record, 4, table)?.to_string(),
            team: field(&record, 5, table)?.to_string(),
            region: field(&record, 6, table)?.to_string(),
            seniority,
            activity_level,
            acceptance_rate: parse_num(
                field(&record, 9, table)?,
                &format!("developers[{}].acceptance_rate", i),
            )?,
            pr_behavior: PrBehavior {
                prs_per_week: parse_num(
                    field(&record, 10, table)?,
                    &format!("developers[{}].prs_per_week", i),
                )?,
                avg_pr_size_loc: parse_num(
                    field(&record, 11, table)?,
                    &format!("developers[{}].avg_pr_size_loc", i),
                )?,
                avg_files_per_pr: parse_num(
                    field(&record, 12, table)?,
                    &format!("developers[{}].avg_files_per_pr", i),
                )?,
            },
            coding_speed: CodingSpeed {
                mean: parse_num(
                    field(&record, 13, table)?,
                    &format!("developers[{}].coding_speed.mean", i),
                )?,
                std: parse_num(
                    field(&record, 14, table)?,
                    &format!("developers[{}].coding_speed.std", i),
                )?,
            },
            chat_vs_code_ratio: parse_num(
                field(&record, 15, table)?,
                &format!("developers[{}].chat_vs_code_ratio", i),
            )?,
            working_hours: WorkingHours {
                start_hour: parse_num(
                    field(&record, 16, table)?,
                    &format!("developers[{}].start_hour", i),
                )?,
                end_hour: parse_num(
                    field(&record, 17, table)?,
                    &format!("developers[{}].end_hour", i),
                )?,
                peak_hours,
                timezone_offset_hours: parse_num(
                    field(&record, 19, table)?,
                    &format!("developers[{}].timezone_offset_hours", i),
                )?,
            },
        });
    }
    Ok(developers)
}

fn parse_repositories(content: &str) -> Result<Vec<RepositoryProfile>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut repositories = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let record = row.map_err(|e| {
            SimulatorError::invalid_seed(format!("repositories.csv row {}: {}", i, e))
        })?;
        let table = "repositories.csv";
        let owning_teams: Vec<String> = field(&record, 4, table)?
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        let age_days = {
            let raw = field(&record, 5, table)?.trim();
            if raw.is_empty() {
                None
            } else {
                Some(parse_num(raw, &format!("repositories[{}].age_days", i))?)
            }
        };
        repositories.push(RepositoryProfile {
            repo_name: field(&record, 0, table)?.to_string(),
            primary_language: field(&record, 1, table)?.to_string(),
            service_type: field(&record, 2, table)?.to_string(),
            default_branch: field(&record, 3, table)?.to_string(),
            owning_teams,
            age_days,
        });
    }
    Ok(repositories)
}

fn parse_correlations(content: &str) -> Result<CorrelationParams> {
    let mut params = CorrelationParams::default();
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    for (i, row) in reader.records().enumerate() {
        let record = row.map_err(|e| {
            SimulatorError::invalid_seed(format!("correlations.csv row {}: {}", i, e))
        })?;
        let key = field(&record, 0, "correlations.csv")?;
        let value: f64 = parse_num(
            field(&record, 1, "correlations.csv")?,
            &format!("correlations.{}", key),
        )?;
        match key {
            "seniority_pr_size_gain" => params.seniority_pr_size_gain = value,
            "ai_iteration_gain" => params.ai_iteration_gain = value,
            "ai_review_density_gain" => params.ai_review_density_gain = value,
            "ai_revert_coefficient" => params.ai_revert_coefficient = value,
            "volatility_revert_coefficient" => params.volatility_revert_coefficient = value,
            "seniority_revert_penalty" => params.seniority_revert_penalty = value,
            "size_cycle_time_exponent" => params.size_cycle_time_exponent = value,
            "revert_base_offset" => params.revert_base_offset = value,
            "hotfix_base_offset" => params.hotfix_base_offset = value,
            "issues_per_repo_week" => params.issues_per_repo_week = value,
            other => {
                return Err(SimulatorError::invalid_seed(format!(
                    "correlations.csv: unknown key '{}'",
                    other
                )))
            }
        }
    }
    Ok(params)
}

fn parse_templates(content: &str) -> Result<TextTemplates> {
    let mut templates = TextTemplates {
        commit_messages: Vec::new(),
        pr_titles: Vec::new(),
        review_comments: Vec::new(),
        external_sources: Vec::new(),
    };
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    for (i, row) in reader.records().enumerate() {
        let record =
            row.map_err(|e| SimulatorError::invalid_seed(format!("templates.csv row {}: {}", i, e)))?;
        let kind = field(&record, 0, "templates.csv")?;
        let text = field(&record, 1, "templates.csv")?.to_string();
        match kind {
            "commit_message" => templates.commit_messages.push(text),
            "pr_title" => templates.pr_titles.push(text),
            "review_comment" => templates.review_comments.push(text),
            other => {
                return Err(SimulatorError::invalid_seed(format!(
                    "templates.csv: unknown kind '{}'",
                    other
                )))
            }
        }
    }
    if templates.commit_messages.is_empty() {
        templates.commit_messages = TextTemplates::default().commit_messages;
    }
    if templates.pr_titles.is_empty() {
        templates.pr_titles = TextTemplates::default().pr_titles;
    }
    if templates.review_comments.is_empty() {
        templates.review_comments = TextTemplates::default().review_comments;
    }
    Ok(templates)
}

// ============================================================================
// Presets
// ============================================================================

const TEAM_POOL: [&str; 5] = ["platform", "payments", "web", "mobile", "data"];
const LANGUAGE_POOL: [&str; 5] = ["rust", "typescript", "go", "python", "kotlin"];
const SERVICE_TYPE_POOL: [&str; 4] = ["service", "library", "frontend", "pipeline"];
const FIRST_NAMES: [&str; 10] = [
    "Alice", "Bob", "Carol", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
];
const LAST_NAMES: [&str; 10] = [
    "Chen", "Smith", "Okafor", "Ivanov", "Garcia", "Nguyen", "Hopper", "Tanaka", "Silva", "Weber",
];

struct RegionSpec {
    name: &'static str,
    timezone_offset_hours: i8,
}

const SINGLE_REGION: [RegionSpec; 1] = [RegionSpec {
    name: "amer",
    timezone_offset_hours: -8,
}];

const MULTI_REGION: [RegionSpec; 3] = [
    RegionSpec {
        name: "amer",
        timezone_offset_hours: -8,
    },
    RegionSpec {
        name: "emea",
        timezone_offset_hours: 1,
    },
    RegionSpec {
        name: "apac",
        timezone_offset_hours: 8,
    },
];

/// Deterministically build one of the four named presets
pub fn preset(name: &str) -> Option<Seed> {
    match name {
        "small-team" => Some(build_preset(5, 2, &SINGLE_REGION)),
        "medium-team" => Some(build_preset(25, 8, &SINGLE_REGION)),
        "enterprise" => Some(build_preset(120, 30, &SINGLE_REGION)),
        "multi-region" => Some(build_preset(40, 10, &MULTI_REGION)),
        _ => None,
    }
}

/// Default seed used when no seed path is configured
pub fn builtin_default() -> Seed {
    preset("medium-team").expect("built-in preset")
}

static PRESET_INFOS: Lazy<Vec<PresetInfo>> = Lazy::new(|| {
    [
        ("small-team", "Five developers on two repositories"),
        ("medium-team", "A mid-size org: 25 developers, 8 repositories"),
        ("enterprise", "Large org: 120 developers, 30 repositories"),
        (
            "multi-region",
            "40 developers spread across amer/emea/apac working bands",
        ),
    ]
    .iter()
    .map(|(name, description)| {
        let seed = preset(name).expect("known preset");
        PresetInfo {
            name: name.to_string(),
            description: description.to_string(),
            developers: seed.developers.len(),
            repositories: seed.repositories.len(),
        }
    })
    .collect()
});

pub fn preset_infos() -> Vec<PresetInfo> {
    PRESET_INFOS.clone()
}

fn build_preset(developer_count: usize, repo_count: usize, regions: &[RegionSpec]) -> Seed {
    let seniority_cycle = [
        Seniority::Junior,
        Seniority::Mid,
        Seniority::Mid,
        Seniority::Senior,
    ];
    let activity_cycle = [
        ActivityLevel::Medium,
        ActivityLevel::High,
        ActivityLevel::Medium,
        ActivityLevel::Low,
        ActivityLevel::High,
    ];

    let developers = (0..developer_count)
        .map(|i| {
            let seniority = seniority_cycle[i % seniority_cycle.len()];
            // Acceptance bands rise with seniority so the population-scale
            // correlation holds by construction.
            let (base, span) = match seniority {
                Seniority::Junior => (0.45, 0.12),
                Seniority::Mid => (0.60, 0.12),
                Seniority::Senior => (0.75, 0.14),
            };
            let acceptance_rate = base + span * ((i % 7) as f64 / 6.0);
            let region = &regions[i % regions.len()];
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last = LAST_NAMES[(i / FIRST_NAMES.len() + i) % LAST_NAMES.len()];
            let team = TEAM_POOL[i % TEAM_POOL.len()];
            DeveloperProfile {
                user_id: format!("user_{:03}", i + 1),
                email: format!(
                    "{}.{}{}@codetel.dev",
                    first.to_lowercase(),
                    last.to_lowercase(),
                    i + 1
                ),
                name: format!("{} {}", first, last),
                org: "codetel".to_string(),
                division: "engineering".to_string(),
                team: team.to_string(),
                region: region.name.to_string(),
                seniority,
                activity_level: activity_cycle[i % activity_cycle.len()],
                acceptance_rate,
                pr_behavior: PrBehavior {
                    prs_per_week: 3.0 + (i % 4) as f64,
                    avg_pr_size_loc: 120.0 + 40.0 * seniority.rank() as f64,
                    avg_files_per_pr: 3.0 + (i % 5) as f64,
                },
                coding_speed: CodingSpeed {
                    mean: 30.0 + 12.0 * seniority.rank() as f64,
                    std: 18.0,
                },
                chat_vs_code_ratio: 0.2 + 0.05 * (i % 9) as f64,
                working_hours: WorkingHours {
                    start_hour: 9,
                    end_hour: 18,
                    peak_hours: vec![10, 11, 14, 15],
                    timezone_offset_hours: region.timezone_offset_hours,
                },
            }
        })
        .collect();

    let repositories = (0..repo_count)
        .map(|i| RepositoryProfile {
            repo_name: format!("codetel/{}-{}", SERVICE_TYPE_POOL[i % SERVICE_TYPE_POOL.len()], i + 1),
            primary_language: LANGUAGE_POOL[i % LANGUAGE_POOL.len()].to_string(),
            service_type: SERVICE_TYPE_POOL[i % SERVICE_TYPE_POOL.len()].to_string(),
            default_branch: "main".to_string(),
            owning_teams: vec![TEAM_POOL[i % TEAM_POOL.len()].to_string()],
            age_days: Some(90 + 60 * (i as u32 % 12)),
        })
        .collect();

    Seed {
        developers,
        repositories,
        correlations: CorrelationParams::default(),
        templates: TextTemplates::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    #[test]
    fn presets_validate() {
        for name in ["small-team", "medium-team", "enterprise", "multi-region"] {
            let seed = preset(name).unwrap();
            assert!(validate(&seed).is_ok(), "preset {} failed validation", name);
        }
        assert!(preset("mega-team").is_none());
    }

    #[test]
    fn presets_are_deterministic() {
        assert_eq!(
            preset("medium-team").unwrap().stable_hash(),
            preset("medium-team").unwrap().stable_hash()
        );
    }

    #[test]
    fn multi_region_preset_spans_timezones() {
        let seed = preset("multi-region").unwrap();
        let offsets: std::collections::BTreeSet<i8> = seed
            .developers
            .iter()
            .map(|d| d.working_hours.timezone_offset_hours)
            .collect();
        assert_eq!(offsets.len(), 3);
    }

    #[test]
    fn json_round_trips_through_loader() {
        let seed = preset("small-team").unwrap();
        let bytes = serde_json::to_vec(&seed).unwrap();
        let loaded = load_from_bytes(SeedFormat::Json, &bytes).unwrap();
        assert_eq!(seed, loaded);
    }

    #[test]
    fn yaml_documents_load() {
        let seed = preset("small-team").unwrap();
        let text = serde_yaml::to_string(&seed).unwrap();
        let loaded = load_from_bytes(SeedFormat::Yaml, text.as_bytes()).unwrap();
        assert_eq!(seed, loaded);
    }

    #[test]
    fn malformed_json_reports_parser_detail() {
        let err = load_from_bytes(SeedFormat::Json, b"{not json").unwrap_err();
        assert!(err.to_string().contains("json parse"));
    }

    #[test]
    fn invalid_seed_reports_field_path() {
        let mut seed = preset("small-team").unwrap();
        seed.developers[0].acceptance_rate = 2.0;
        let bytes = serde_json::to_vec(&seed).unwrap();
        let err = load_from_bytes(SeedFormat::Json, &bytes).unwrap_err();
        assert!(err.to_string().contains("acceptance_rate"));
    }

    fn csv_bundle() -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = FileOptions::default();
            writer.start_file("developers.csv", options).unwrap();
            writer
                .write_all(
                    b"user_id,email,name,org,division,team,region,seniority,activity_level,\
acceptance_rate,prs_per_week,avg_pr_size_loc,avg_files_per_pr,coding_speed_mean,\
coding_speed_std,chat_vs_code_ratio,start_hour,end_hour,peak_hours,timezone_offset_hours\n\
user_001,alice@example.com,Alice Chen,acme,eng,payments,amer,senior,high,0.8,4,200,5,45,20,0.3,9,18,10;14,-8\n\
user_002,bob@example.com,Bob Smith,acme,eng,payments,amer,junior,medium,0.5,3,90,3,25,15,0.4,9,17,11,-8\n",
                )
                .unwrap();
            writer.start_file("repositories.csv", options).unwrap();
            writer
                .write_all(
                    b"repo_name,primary_language,service_type,default_branch,owning_teams,age_days\n\
acme/payment-service,rust,service,main,payments,400\n",
                )
                .unwrap();
            writer.start_file("correlations.csv", options).unwrap();
            writer
                .write_all(b"key,value\nai_revert_coefficient,3.0\n")
                .unwrap();
            writer.start_file("templates.csv", options).unwrap();
            writer
                .write_all(b"kind,text\ncommit_message,Fix rounding bug\npr_title,Fix rounding\n")
                .unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn csv_bundle_loads() {
        let seed = load_from_bytes(SeedFormat::Csv, &csv_bundle()).unwrap();
        assert_eq!(seed.developers.len(), 2);
        assert_eq!(seed.developers[0].seniority, Seniority::Senior);
        assert_eq!(seed.developers[0].working_hours.peak_hours, vec![10, 14]);
        assert_eq!(seed.repositories[0].repo_name, "acme/payment-service");
        assert_eq!(seed.correlations.ai_revert_coefficient, 3.0);
        assert_eq!(seed.templates.commit_messages, vec!["Fix rounding bug"]);
        // pools that the bundle left empty fall back to defaults
        assert!(!seed.templates.review_comments.is_empty());
    }

    #[test]
    fn csv_bundle_missing_table_is_rejected() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("developers.csv", FileOptions::default())
                .unwrap();
            writer.write_all(b"user_id\n").unwrap();
            writer.finish().unwrap();
        }
        let err = load_from_bytes(SeedFormat::Csv, &buffer.into_inner()).unwrap_err();
        assert!(err.to_string().contains("repositories.csv"));
    }
}
