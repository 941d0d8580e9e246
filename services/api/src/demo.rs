use crate::infra::seeded_store;
use chrono::{Local, NaiveDate};
use clap::Args;
use dispatch_contracts::config::{AdvisorConfig, AppConfig, SeedConfig};
use dispatch_contracts::error::AppError;
use dispatch_contracts::workflows::assignment::{
    AdvisorPolicy, AssignmentAdvisor, AssignmentSuggestion, ConflictPolicy, SuggestionRequest,
};
use dispatch_contracts::workflows::contracts::{
    EmployeeId, FactoryId, InMemoryDispatchStore, LineId,
};
use dispatch_contracts::workflows::roster::RosterImporter;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct SuggestArgs {
    /// Employee id from the roster
    #[arg(long)]
    pub(crate) employee: u64,
    /// Factory id
    #[arg(long)]
    pub(crate) factory: u64,
    /// Line id within the factory
    #[arg(long)]
    pub(crate) line: u64,
    /// First working day (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start: NaiveDate,
    /// Contract length in months (defaults to the configured duration)
    #[arg(long)]
    pub(crate) months: Option<u32>,
    /// Employee export to load instead of the bundled sample roster
    #[arg(long)]
    pub(crate) employees_csv: Option<PathBuf>,
    /// Factory line export to load instead of the bundled sample roster
    #[arg(long)]
    pub(crate) factories_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterArgs {
    /// Employee export (CSV, English or Japanese headers)
    #[arg(long)]
    pub(crate) employees_csv: PathBuf,
    /// Factory line export, one row per line
    #[arg(long)]
    pub(crate) factories_csv: PathBuf,
    /// Date used for conflict-date headroom (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_suggest(args: SuggestArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let seed = SeedConfig {
        employees_csv: args.employees_csv.or(config.seed.employees_csv),
        factories_csv: args.factories_csv.or(config.seed.factories_csv),
    };
    let (store, _) = seeded_store(&config.advisor, &seed, Local::now().date_naive())?;

    let advisor = AssignmentAdvisor::new(store, AdvisorPolicy::from(&config.advisor));
    let request = SuggestionRequest {
        employee_id: EmployeeId(args.employee),
        factory_id: FactoryId(args.factory),
        factory_line_id: LineId(args.line),
        start_date: args.start,
        duration_months: args.months,
    };
    let suggestion = advisor.suggest(&request)?;
    render_suggestion(&request, &suggestion, &config.advisor);
    Ok(())
}

fn render_suggestion(
    request: &SuggestionRequest,
    suggestion: &AssignmentSuggestion,
    config: &AdvisorConfig,
) {
    println!(
        "Assignment suggestion for employee {} at factory {} line {} from {}",
        request.employee_id, request.factory_id, request.factory_line_id, request.start_date
    );
    println!("- Recommendation: {}", suggestion.recommendation.label());
    println!("- Reason: {}", suggestion.reason);
    println!("- Proposed end: {}", suggestion.proposed_end_date);

    match &suggestion.existing_contract {
        Some(contract) => println!(
            "- Existing contract {} ({}): {} to {}, {} worker(s), rate {}",
            contract.number,
            contract.site_name,
            contract.start_date,
            contract.end_date,
            contract.current_workers,
            yen(contract.hourly_rate)
        ),
        None => println!("- Existing contract: none"),
    }

    println!("- Employee billing rate: {}", yen(suggestion.employee_rate));
    if let Some(pct) = suggestion.rate_difference_pct {
        let flag = if suggestion.rate_warning {
            format!(" (above the {}% threshold)", config.rate_warning_threshold_pct)
        } else {
            String::new()
        };
        println!("- Rate difference: {pct}%{flag}");
    }

    match &suggestion.conflict_date_info {
        Some(info) => println!(
            "- Conflict date {}: {} [{}]",
            info.conflict_date,
            info.message,
            info.warning_level.label()
        ),
        None => println!("- Conflict date: not registered"),
    }
}

pub(crate) fn run_roster(args: RosterArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let employees = RosterImporter::employees_from_path(&args.employees_csv)?;
    let factories = RosterImporter::factories_from_path(&args.factories_csv)?;

    let store = InMemoryDispatchStore::with_prefix(&config.advisor.contract_prefix);
    let summary = RosterImporter::apply(&store, employees, factories.clone())?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let conflict = ConflictPolicy::new(
        config.advisor.conflict_warning_days,
        config.advisor.conflict_danger_days,
    );

    println!("Roster import");
    println!(
        "- Employees: {} inserted, {} updated",
        summary.employees_inserted, summary.employees_updated
    );
    println!(
        "- Factories: {} inserted, {} updated ({} lines)",
        summary.factories_inserted, summary.factories_updated, summary.lines
    );

    println!("\nFactories as of {today}");
    for factory in &factories {
        let headroom = match factory.conflict_date {
            Some(conflict_date) => {
                let info = conflict.classify(conflict_date, today);
                format!(
                    "conflict date {conflict_date}, {} day(s) away [{}]",
                    info.days_remaining,
                    info.warning_level.label()
                )
            }
            None => "no conflict date".to_string(),
        };
        println!(
            "- {} {} (factory {}): {}",
            factory.company_name, factory.plant_name, factory.id, headroom
        );
        for line in &factory.lines {
            println!(
                "    - line {} {}: rate {}, supervisor {}",
                line.id,
                line.name,
                yen(line.default_hourly_rate),
                line.supervisor.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(())
}

fn yen(rate: Option<u32>) -> String {
    rate.map(|rate| format!("¥{rate}"))
        .unwrap_or_else(|| "-".to_string())
}
