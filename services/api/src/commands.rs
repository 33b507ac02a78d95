use crate::infra::{file_store, parse_amount, parse_date};
use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use reward_router::config::AppConfig;
use reward_router::error::AppError;
use reward_router::rewards::{
    format_money, CommitReceipt, JsonFileStore, LedgerStatus, MethodId, MethodRegistry,
    MethodTableCsv, Recommendation, RewardService, RewardServiceError,
};
use reward_router::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct RecommendArgs {
    /// Purchase amount, e.g. 60000 or 1,50,000
    #[arg(long, value_parser = parse_amount)]
    pub(crate) amount: f64,
    /// Brand or merchant shown in the summary
    #[arg(long)]
    pub(crate) brand: Option<String>,
    /// Evaluate as of this date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Record the candidate at this position (1 = best) as used
    #[arg(long = "use", value_name = "RANK")]
    pub(crate) use_rank: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct StatusArgs {
    /// Report as of this date (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum MethodsCommand {
    /// Print the configured routes
    List,
    /// Replace the route table with the rows of a CSV file
    Import { path: PathBuf },
    /// Write the route table as CSV to a file or stdout
    Export { path: Option<PathBuf> },
    /// Include a route in future evaluations
    Enable { id: String },
    /// Exclude a route from future evaluations
    Disable { id: String },
}

fn open_service() -> Result<RewardService<JsonFileStore>, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(RewardService::new(file_store(&config), config.milestone))
}

fn resolve_today(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn run_recommend(args: RecommendArgs) -> Result<(), AppError> {
    let service = open_service()?;
    let today = resolve_today(args.today);
    let recommendation = service.evaluate(args.amount, args.brand.as_deref(), today)?;
    render_recommendation(&recommendation, today);

    if let Some(position) = args.use_rank {
        let rank = position
            .checked_sub(1)
            .ok_or(RewardServiceError::NoSuchCandidate(position))?;
        let receipt = service.commit(rank, today)?;
        render_receipt(&receipt);
    }
    Ok(())
}

pub(crate) fn run_status(args: StatusArgs) -> Result<(), AppError> {
    let service = open_service()?;
    let today = resolve_today(args.today);
    render_status(&service.status(today), today);
    Ok(())
}

pub(crate) fn run_methods(command: MethodsCommand) -> Result<(), AppError> {
    let service = open_service()?;
    match command {
        MethodsCommand::List => {
            for method in service.methods() {
                let cap = if method.is_capped() {
                    format_money(method.monthly_cap)
                } else {
                    "uncapped".to_string()
                };
                println!(
                    "- {} [{}] {} | {} | card {}% + other {}% | cap {}",
                    method.id,
                    if method.active { "on" } else { "off" },
                    method.name,
                    method.kind.label(),
                    method.card_reward_pct,
                    method.non_card_pct(),
                    cap
                );
            }
        }
        MethodsCommand::Import { path } => {
            let registry = MethodTableCsv::from_path(&path)?;
            let count = registry.len();
            service.replace_methods(registry);
            println!("Imported {} routes from {}", count, path.display());
        }
        MethodsCommand::Export { path } => {
            let registry = MethodRegistry::new(service.methods());
            match path {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    MethodTableCsv::write(&registry, file)?;
                    println!("Exported {} routes to {}", registry.len(), path.display());
                }
                None => MethodTableCsv::write(&registry, std::io::stdout().lock())?,
            }
        }
        MethodsCommand::Enable { id } => {
            let method = service.set_method_active(&MethodId::new(id), true)?;
            println!("Enabled {}", method.name);
        }
        MethodsCommand::Disable { id } => {
            let method = service.set_method_active(&MethodId::new(id), false)?;
            println!("Disabled {}", method.name);
        }
    }
    Ok(())
}

fn render_recommendation(recommendation: &Recommendation, today: NaiveDate) {
    println!(
        "{} for {} (evaluated {})",
        recommendation.brand,
        format_money(recommendation.amount),
        today
    );

    if recommendation.is_empty() {
        println!("No active methods with positive reward %. Check your settings.");
        return;
    }

    for view in recommendation.views() {
        println!(
            "\n{}. {}: {}",
            view.rank + 1,
            view.label,
            view.method_name
        );
        println!(
            "   Reward {} on {} ({:.2}% effective)",
            view.reward_display, view.amount_display, view.effective_pct
        );
        let notes = view.notes();
        if !notes.is_empty() {
            println!("   Note: {}", notes.join("; "));
        }
    }
}

fn render_receipt(receipt: &CommitReceipt) {
    println!("\nRecorded {} as used", receipt.method_id);
    if receipt.monthly_cap > 0.0 {
        println!(
            "Cap usage this month: {} of {}",
            format_money(receipt.used_this_cycle),
            format_money(receipt.monthly_cap)
        );
    }
    println!("Milestone spend this year: {}", format_money(receipt.ytd_spend));
}

fn render_status(status: &LedgerStatus, today: NaiveDate) {
    println!("Reward status as of {}", today);
    if let Some(month) = &status.month {
        println!("Cycle: {}", month);
    }

    println!("\nMonthly caps");
    for route in &status.routes {
        let state = if route.active { "" } else { " (disabled)" };
        match route.headroom {
            Some(headroom) => println!(
                "- {}{}: {} used of {}, {} left",
                route.method_name,
                state,
                format_money(route.used_this_cycle),
                format_money(route.monthly_cap),
                format_money(headroom)
            ),
            None => println!("- {}{}: uncapped", route.method_name, state),
        }
    }

    let milestone = &status.milestone;
    println!(
        "\nMilestone year {} -> {}",
        milestone.year_start, milestone.year_end
    );
    println!(
        "Spent {} of {} | {} to go | ideal pace {}",
        format_money(milestone.ytd_spend),
        format_money(milestone.target_annual_spend),
        format_money(milestone.remaining),
        format_money(milestone.ideal_ytd)
    );
}
