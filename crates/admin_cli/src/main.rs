use std::error::Error;

use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{AllocationFilter, AllocationKind, Engine, Money, Vehicle};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};

#[derive(Parser, Debug)]
#[command(name = "fleet_admin")]
#[command(about = "Admin utilities for the fleet budget ledger (bootstrap accounts/vehicles/allocations)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./fleet_ledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and exit.
    Migrate,
    Account(Account),
    Vehicle(VehicleCmd),
    Allocation(Allocation),
    /// Rebuild the executed amount of every active allocation of a year.
    Recompute(RecomputeArgs),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    code: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
struct VehicleCmd {
    #[command(subcommand)]
    command: VehicleCommand,
}

#[derive(Subcommand, Debug)]
enum VehicleCommand {
    Create(VehicleCreateArgs),
}

#[derive(Args, Debug)]
struct VehicleCreateArgs {
    #[arg(long)]
    plate: String,
    #[arg(long)]
    brand: String,
    #[arg(long)]
    model: String,
    #[arg(long, default_value_t = 0)]
    odometer_km: i64,
    #[arg(long)]
    service_interval_km: Option<i64>,
}

#[derive(Args, Debug)]
struct Allocation {
    #[command(subcommand)]
    command: AllocationCommand,
}

#[derive(Subcommand, Debug)]
enum AllocationCommand {
    Create(AllocationCreateArgs),
    List(AllocationListArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Preventive,
    Operational,
}

impl From<KindArg> for AllocationKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Preventive => AllocationKind::Preventive,
            KindArg::Operational => AllocationKind::Operational,
        }
    }
}

#[derive(Args, Debug)]
struct AllocationCreateArgs {
    #[arg(long)]
    year: i32,
    #[arg(long)]
    account: String,
    /// Omit for the general allocation of the account.
    #[arg(long)]
    vehicle: Option<String>,
    #[arg(long, value_enum, default_value = "operational")]
    kind: KindArg,
    /// Assigned amount, e.g. `1000000.00`.
    #[arg(long, value_parser = parse_money)]
    assigned: Money,
}

#[derive(Args, Debug)]
struct AllocationListArgs {
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    include_disabled: bool,
}

#[derive(Args, Debug)]
struct RecomputeArgs {
    #[arg(long)]
    year: i32,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Migrate => println!("database is up to date"),
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let account = engine
                .create_account(&args.code, &args.name, args.description.as_deref())
                .await?;
            println!("created account: {} ({})", account.code, account.name);
        }
        Command::Account(Account {
            command: AccountCommand::List,
        }) => {
            for account in engine.accounts().await? {
                println!("{}\t{}", account.code, account.name);
            }
        }
        Command::Vehicle(VehicleCmd {
            command: VehicleCommand::Create(args),
        }) => {
            let mut vehicle = Vehicle::new(&args.plate, &args.brand, &args.model, args.odometer_km)?;
            if let Some(km) = args.service_interval_km {
                vehicle = vehicle.with_service_interval(km);
            }
            let vehicle = engine.create_vehicle(vehicle).await?;
            println!("created vehicle: {}", vehicle.plate);
        }
        Command::Allocation(Allocation {
            command: AllocationCommand::Create(args),
        }) => {
            let allocation = engine
                .create_allocation(
                    args.year,
                    &args.account,
                    args.vehicle.as_deref(),
                    args.kind.into(),
                    args.assigned,
                )
                .await?;
            println!(
                "created allocation: {} (executed {}, available {})",
                allocation.id,
                allocation.executed(),
                allocation.available()
            );
        }
        Command::Allocation(Allocation {
            command: AllocationCommand::List(args),
        }) => {
            let mut filter = AllocationFilter::default();
            if let Some(year) = args.year {
                filter = filter.year(year);
            }
            if args.include_disabled {
                filter = filter.include_disabled();
            }
            let report = engine.allocation_report(&filter).await?;
            for allocation in &report.allocations {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    allocation.id,
                    allocation.year,
                    allocation.account_code,
                    allocation.vehicle_plate.as_deref().unwrap_or("general"),
                    allocation.assigned,
                    allocation.executed()
                );
            }
            println!(
                "total assigned {}, executed {}, available {}",
                report.total_assigned, report.total_executed, report.total_available
            );
        }
        Command::Recompute(args) => {
            let recomputed = engine.recompute_year(args.year).await?;
            for entry in &recomputed {
                println!(
                    "{}\texecuted {}\tavailable {}",
                    entry.allocation_id, entry.executed, entry.available
                );
            }
            println!("recomputed {} allocation(s)", recomputed.len());
        }
    }

    Ok(())
}
