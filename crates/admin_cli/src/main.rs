use std::{error::Error, io::Write, path::PathBuf};

use backend::{Persistence, Query, RestPersistence, tables};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use engine::{DateRange, Engine, build_periods_str};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "newsdesk_admin")]
#[command(about = "Operator utilities for the newsdesk finance back-office")]
struct Cli {
    /// Platform base URL (also read from `NEWSDESK_PLATFORM_URL`).
    #[arg(long, env = "NEWSDESK_PLATFORM_URL")]
    platform_url: Option<String>,

    /// Platform service key (also read from `NEWSDESK_PLATFORM_KEY`).
    #[arg(long, env = "NEWSDESK_PLATFORM_KEY", hide_env_values = true)]
    platform_key: Option<String>,

    #[arg(long, default_value = "anexos")]
    storage_bucket: String,

    /// Print JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the months between two dates.
    Periods(PeriodArgs),
    /// Fund summaries.
    Funds,
    /// Project summaries.
    Projects,
    /// Dashboard snapshot for a date range (year to date by default).
    Dashboard(RangeArgs),
    /// Export movements as CSV.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[arg(long)]
    start: String,
    #[arg(long)]
    end: String,
}

#[derive(Args, Debug)]
struct RangeArgs {
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Output file; stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load_engine(cli: &Cli, today: NaiveDate) -> Result<Engine, Box<dyn Error + Send + Sync>> {
    let (Some(url), Some(key)) = (cli.platform_url.as_deref(), cli.platform_key.as_deref()) else {
        return Err("platform url and key are required (NEWSDESK_PLATFORM_URL, NEWSDESK_PLATFORM_KEY)".into());
    };
    let platform = RestPersistence::new(url, key, &cli.storage_bucket)?;

    let funds = platform.select(Query::table(tables::FUNDS)).await?;
    let projects = platform.select(Query::table(tables::PROJECTS)).await?;
    let movements = platform.select(Query::table(tables::MOVEMENTS)).await?;
    let attachments = match platform
        .select(Query::table(tables::MOVEMENT_ATTACHMENTS))
        .await
    {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("warning: attachments not loaded: {err}");
            Vec::new()
        }
    };
    let budget_items = match platform.select(Query::table(tables::BUDGET_ITEMS)).await {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("warning: budget items not loaded: {err}");
            Vec::new()
        }
    };

    Ok(Engine::builder()
        .today(today)
        .funds(funds)
        .projects(projects)
        .movements(movements)
        .attachments(attachments)
        .budget_items(budget_items)
        .build())
}

fn range_of(args: &RangeArgs, today: NaiveDate) -> Result<DateRange, Box<dyn Error + Send + Sync>> {
    Ok(DateRange::resolve(
        args.start.as_deref(),
        args.end.as_deref(),
        today,
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let today = Local::now().date_naive();

    match &cli.command {
        Command::Periods(args) => {
            let periods = build_periods_str(&args.start, &args.end);
            if cli.json {
                print_json(&periods)?;
            } else {
                for period in periods {
                    println!("{period}");
                }
            }
        }
        Command::Funds => {
            let engine = load_engine(&cli, today).await?;
            if cli.json {
                print_json(&engine.funds())?;
            } else {
                for fund in engine.funds() {
                    println!(
                        "{:<12} {:<32} {:>4} budget {:>12} balance {:>12} spent {:>12} {:>6.2}% {}",
                        fund.id,
                        fund.name,
                        fund.year,
                        fund.budgeted_total,
                        fund.current_balance,
                        fund.total_spent,
                        fund.execution_percent,
                        fund.status.as_str()
                    );
                }
            }
        }
        Command::Projects => {
            let engine = load_engine(&cli, today).await?;
            if cli.json {
                print_json(&engine.projects())?;
            } else {
                for project in engine.projects() {
                    println!(
                        "{:<12} {:<32} {:<12} budget {:>12} available {:>12} realized {:>12} {:>6.2}% {}",
                        project.id,
                        project.name,
                        project.fund_id.as_deref().unwrap_or("mixed"),
                        project.budgeted_total,
                        project.available_balance,
                        project.realized_spend,
                        project.execution_percent,
                        project.status.as_str()
                    );
                }
            }
        }
        Command::Dashboard(args) => {
            let range = range_of(args, today)?;
            let engine = load_engine(&cli, today).await?;
            let snapshot = engine.dashboard(range);
            if cli.json {
                print_json(&snapshot)?;
            } else {
                println!("range     {} .. {}", range.start, range.end);
                println!("incoming  {}", snapshot.incoming_total);
                println!("outgoing  {}", snapshot.outgoing_total);
                println!("balance   {}", snapshot.current_balance);
                println!("pending   {}", snapshot.pending_total);
                for point in &snapshot.cash_flow_series {
                    println!("{}  in {:>12}  out {:>12}", point.period, point.incoming, point.outgoing);
                }
                for share in &snapshot.category_distribution {
                    println!("{:<24} {:>12}", share.category, share.amount);
                }
            }
        }
        Command::Export(args) => {
            let range = if args.range.start.is_none() && args.range.end.is_none() {
                None
            } else {
                Some(range_of(&args.range, today)?)
            };
            let engine = load_engine(&cli, today).await?;
            let csv = engine.export_csv(range)?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, &csv)?;
                    eprintln!("exported to {}", path.display());
                }
                None => std::io::stdout().write_all(&csv)?,
            }
        }
    }

    Ok(())
}
