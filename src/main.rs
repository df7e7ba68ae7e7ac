use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use carbon_footprint::config::{Config, ConfigOverrides, MassUnit};
use carbon_footprint::factors::EmissionFactors;
use carbon_footprint::footprint::devices::{active_contributions, slugify, Device, DeviceCategory};
use carbon_footprint::footprint::history::{record_from_footprint, summarize_timeline};
use carbon_footprint::footprint::{CarbonFootprint, Category};
use carbon_footprint::output::csv::{footprint_to_csv, recommendations_to_csv};
use carbon_footprint::output::json::{render_json, render_report};
use carbon_footprint::output::table::{
    render_answer_changes, render_devices_table, render_footprint_table, render_history_table,
    render_progress_summary, render_recommendations_table, render_survey_table,
    render_whatif_table,
};
use carbon_footprint::profile::store::ProfileStore;
use carbon_footprint::profile::{record_survey, ProfileSnapshot, SurveyUpdate};
use carbon_footprint::recommend::rules::known_action_ids;
use carbon_footprint::recommend::whatif::simulate_whatif;
use carbon_footprint::recommend::Recommendation;
use carbon_footprint::server::run_server;
use carbon_footprint::survey::{
    DietType, ElectricityUsage, HeatingSource, HomeSize, ShoppingHabits,
    SurveyAnswers, SurveyChange, VehicleType,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "carbon-footprint",
    about = "Household carbon footprint estimates and reduction actions"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Profile database path (overrides [storage] db_path).
    #[arg(long)]
    db: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// kg or tonnes (overrides [display] unit).
    #[arg(short, long)]
    unit: Option<MassUnit>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct AnswerArgs {
    #[arg(long = "home-size")]
    home_size: Option<HomeSize>,
    #[arg(long)]
    occupants: Option<u32>,
    #[arg(long)]
    heating: Option<HeatingSource>,
    #[arg(long)]
    electricity: Option<ElectricityUsage>,
    #[arg(long)]
    vehicle: Option<VehicleType>,
    #[arg(long = "miles-per-week")]
    miles_per_week: Option<f64>,
    #[arg(long)]
    diet: Option<DietType>,
    #[arg(long)]
    shopping: Option<ShoppingHabits>,
    #[arg(long)]
    flights: Option<u32>,
}

impl AnswerArgs {
    fn changes(&self) -> Vec<SurveyChange> {
        let mut changes = Vec::new();
        if let Some(v) = self.home_size {
            changes.push(SurveyChange::HomeSize(v));
        }
        if let Some(v) = self.occupants {
            changes.push(SurveyChange::Occupants(v));
        }
        if let Some(v) = self.heating {
            changes.push(SurveyChange::HeatingSource(v));
        }
        if let Some(v) = self.electricity {
            changes.push(SurveyChange::ElectricityUsage(v));
        }
        if let Some(v) = self.vehicle {
            changes.push(SurveyChange::VehicleType(v));
        }
        if let Some(v) = self.miles_per_week {
            changes.push(SurveyChange::VehicleMilesPerWeek(v));
        }
        if let Some(v) = self.diet {
            changes.push(SurveyChange::DietType(v));
        }
        if let Some(v) = self.shopping {
            changes.push(SurveyChange::ShoppingHabits(v));
        }
        if let Some(v) = self.flights {
            changes.push(SurveyChange::FlightsPerYear(v));
        }
        changes
    }

    /// A first survey must answer every question.
    fn complete_survey(&self) -> Result<SurveyAnswers> {
        let mut missing = Vec::new();
        if self.home_size.is_none() {
            missing.push("--home-size");
        }
        if self.occupants.is_none() {
            missing.push("--occupants");
        }
        if self.heating.is_none() {
            missing.push("--heating");
        }
        if self.electricity.is_none() {
            missing.push("--electricity");
        }
        if self.vehicle.is_none() {
            missing.push("--vehicle");
        }
        if self.diet.is_none() {
            missing.push("--diet");
        }
        if self.shopping.is_none() {
            missing.push("--shopping");
        }
        let (
            Some(home_size),
            Some(occupants),
            Some(heating_source),
            Some(electricity_usage),
            Some(vehicle_type),
            Some(diet_type),
            Some(shopping_habits),
        ) = (
            self.home_size,
            self.occupants,
            self.heating,
            self.electricity,
            self.vehicle,
            self.diet,
            self.shopping,
        )
        else {
            bail!(
                "no survey recorded yet; missing answers: {}",
                missing.join(", ")
            );
        };

        Ok(SurveyAnswers {
            home_size,
            occupants,
            heating_source,
            electricity_usage,
            vehicle_type,
            vehicle_miles_per_week: self.miles_per_week.unwrap_or(0.0),
            diet_type,
            shopping_habits,
            flights_per_year: self.flights.unwrap_or(0),
        })
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Record, show or clear the lifestyle survey.
    Survey {
        #[command(subcommand)]
        action: SurveyCommand,
    },
    /// Annual footprint by category.
    Footprint {
        /// Append the result to footprint history.
        #[arg(long)]
        record: bool,
    },
    /// Ranked reduction actions.
    Recommend {
        #[arg(long)]
        top: Option<usize>,
        /// Include actions already marked complete.
        #[arg(long)]
        all: bool,
        /// Only actions cutting this category (heating, transport, ...).
        #[arg(long)]
        category: Option<Category>,
    },
    /// Compare the footprint before and after changing answers.
    Whatif {
        #[command(flatten)]
        answers: AnswerArgs,
    },
    Actions {
        #[command(subcommand)]
        action: ActionsCommand,
    },
    Devices {
        #[command(subcommand)]
        action: DevicesCommand,
    },
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SurveyCommand {
    /// Answer questions; on a retake only the given answers change.
    Set {
        /// Read the full survey from a JSON file instead of flags.
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        answers: AnswerArgs,
    },
    Show,
    Clear,
}

#[derive(Debug, Subcommand)]
enum ActionsCommand {
    List,
    Complete { id: String },
    Undo { id: String },
}

#[derive(Debug, Subcommand)]
enum DevicesCommand {
    List,
    Add {
        name: String,
        #[arg(long)]
        id: Option<String>,
        #[arg(long, default_value = "electricity")]
        category: DeviceCategory,
        #[arg(long, default_value_t = 1.0)]
        hours: f64,
        #[arg(long = "kg-per-day")]
        kg_per_day: f64,
        #[arg(long)]
        inactive: bool,
    },
    Enable { id: String },
    Disable { id: String },
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config = load_config(&cli)?;

    if let Commands::Config { init, show } = &cli.command {
        if *show || !*init {
            println!("{}", render_json(&config)?);
        }
        return Ok(());
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let factors = config.emission_factors();
    let unit = config.display.unit;
    let store = ProfileStore::open(&config.resolved_db_path())?;
    debug!("using profile database {}", config.resolved_db_path().display());

    match &cli.command {
        Commands::Survey { action } => {
            handle_survey_command(action, &store, &factors, cli.output)?;
        }
        Commands::Footprint { record } => {
            let snapshot = ProfileSnapshot::load(&store)?;
            let evaluation = snapshot.evaluate(&factors)?;
            if *record {
                store.insert_footprint_record(&record_from_footprint(
                    &evaluation.survey,
                    &evaluation.footprint,
                ))?;
                info!("recorded footprint of {:.1} kg", evaluation.footprint.total_kg);
            }
            print_footprint(&evaluation.footprint, cli.output, unit)?;
        }
        Commands::Recommend { top, all, category } => {
            let snapshot = ProfileSnapshot::load(&store)?;
            let evaluation = snapshot.evaluate(&factors)?;
            let show_completed = *all || !config.recommendations.hide_completed;
            let mut items = if show_completed {
                evaluation.recommendations.clone()
            } else {
                evaluation.pending.clone()
            };
            if let Some(category) = category {
                items.retain(|rec| rec.targets(*category));
            }
            items.truncate(top.unwrap_or(config.recommendations.max_items).max(1));
            print_recommendations(&items, cli.output, unit)?;
            if matches!(cli.output, OutputFormat::Table) {
                println!("{}", render_progress_summary(&evaluation.progress, unit));
            }
        }
        Commands::Whatif { answers } => {
            let changes = answers.changes();
            if changes.is_empty() {
                bail!("at least one answer flag (e.g. --diet vegan) is required for whatif");
            }
            let snapshot = ProfileSnapshot::load(&store)?;
            let survey = snapshot
                .survey
                .as_ref()
                .ok_or_else(|| anyhow!("no survey recorded; run `survey set` first"))?;
            let devices = active_contributions(&snapshot.devices);
            let result = simulate_whatif(survey, &factors, &devices, &changes)?;
            match cli.output {
                OutputFormat::Table => println!("{}", render_whatif_table(&result, unit)),
                OutputFormat::Json => println!("{}", render_report(&result)?),
                OutputFormat::Csv => {
                    warn!("CSV output for whatif not implemented, using JSON");
                    println!("{}", render_report(&result)?);
                }
            }
        }
        Commands::Actions { action } => handle_actions_command(action, &store, cli.output)?,
        Commands::Devices { action } => handle_devices_command(action, &store, cli.output, unit)?,
        Commands::History { limit } => {
            let records = store.load_history((*limit).max(1))?;
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_history_table(&records, unit));
                    println!("{}", summarize_timeline(&records));
                }
                OutputFormat::Json => println!("{}", render_report(&records)?),
                OutputFormat::Csv => {
                    warn!("CSV output for history not implemented, using JSON");
                    println!("{}", render_report(&records)?);
                }
            }
        }
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

/// `config --init` rewrites the file before it is parsed, so a broken config
/// can always be replaced.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    if let Commands::Config { init: true, .. } = cli.command {
        Config::write_template(&config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        db_path: cli.db.clone(),
        unit: cli.unit,
    });
    Ok(config)
}

fn handle_survey_command(
    command: &SurveyCommand,
    store: &ProfileStore,
    factors: &EmissionFactors,
    format: OutputFormat,
) -> Result<()> {
    match command {
        SurveyCommand::Set { file, answers } => {
            let previous = store.load_survey()?;
            let survey = match (file, previous) {
                (Some(path), _) => {
                    let data = fs::read_to_string(path)
                        .with_context(|| format!("failed reading survey: {}", path.display()))?;
                    serde_json::from_str::<SurveyAnswers>(&data)
                        .with_context(|| format!("failed parsing survey JSON: {}", path.display()))?
                }
                (None, Some(mut existing)) => {
                    for change in answers.changes() {
                        existing.apply(&change);
                    }
                    existing
                }
                (None, None) => answers.complete_survey()?,
            };
            match record_survey(store, &survey, factors)? {
                SurveyUpdate::Created => println!("Survey saved."),
                SurveyUpdate::Changed(changes) => println!("{}", render_answer_changes(&changes)),
                SurveyUpdate::Unchanged => println!("No answers changed."),
            }
        }
        SurveyCommand::Show => {
            let Some(survey) = store.load_survey()? else {
                println!("No survey recorded.");
                return Ok(());
            };
            match format {
                OutputFormat::Table => println!("{}", render_survey_table(&survey)),
                _ => println!("{}", render_json(&survey)?),
            }
        }
        SurveyCommand::Clear => {
            if store.clear_survey()? {
                println!("Survey cleared; retake it with `survey set`.");
            } else {
                println!("No survey recorded.");
            }
        }
    }
    Ok(())
}

fn handle_actions_command(
    command: &ActionsCommand,
    store: &ProfileStore,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ActionsCommand::List => {
            let ids = store.load_completed_action_ids()?;
            match format {
                OutputFormat::Table => {
                    if ids.is_empty() {
                        println!("No completed actions.");
                    }
                    for id in ids {
                        println!("{id}");
                    }
                }
                _ => println!("{}", render_json(&ids)?),
            }
        }
        ActionsCommand::Complete { id } => {
            if !known_action_ids().iter().any(|known| known == id) {
                bail!(
                    "unknown action id: {id} (known: {})",
                    known_action_ids().join(", ")
                );
            }
            if store.complete_action(id)? {
                println!("Marked {id} complete.");
            } else {
                println!("{id} was already complete.");
            }
        }
        ActionsCommand::Undo { id } => {
            if store.undo_action(id)? {
                println!("Marked {id} as not done.");
            } else {
                println!("{id} was not marked complete.");
            }
        }
    }
    Ok(())
}

fn handle_devices_command(
    command: &DevicesCommand,
    store: &ProfileStore,
    format: OutputFormat,
    unit: MassUnit,
) -> Result<()> {
    match command {
        DevicesCommand::List => {
            let devices = store.load_devices()?;
            match format {
                OutputFormat::Table => println!("{}", render_devices_table(&devices, unit)),
                _ => println!("{}", render_json(&devices)?),
            }
        }
        DevicesCommand::Add {
            name,
            id,
            category,
            hours,
            kg_per_day,
            inactive,
        } => {
            let id = id.clone().unwrap_or_else(|| slugify(name));
            if id.is_empty() {
                bail!("device name {name:?} yields an empty id; pass --id");
            }
            let mut device = Device::new(id, name.clone(), *category, *hours, *kg_per_day);
            device.active = !*inactive;
            device.validate()?;
            store.upsert_device(&device)?;
            println!(
                "Saved device {} ({} {}/year).",
                device.id,
                unit.format(device.annual_kg()),
                unit.label()
            );
        }
        DevicesCommand::Enable { id } => toggle_device(store, id, true)?,
        DevicesCommand::Disable { id } => toggle_device(store, id, false)?,
        DevicesCommand::Remove { id } => {
            if !store.remove_device(id)? {
                bail!("no device with id {id}");
            }
            println!("Removed device {id}.");
        }
    }
    Ok(())
}

fn toggle_device(store: &ProfileStore, id: &str, active: bool) -> Result<()> {
    if !store.set_device_active(id, active)? {
        bail!("no device with id {id}");
    }
    println!(
        "Device {id} is now {}.",
        if active { "active" } else { "inactive" }
    );
    Ok(())
}

fn print_footprint(footprint: &CarbonFootprint, format: OutputFormat, unit: MassUnit) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_footprint_table(footprint, unit)),
        OutputFormat::Json => println!("{}", render_report(footprint)?),
        OutputFormat::Csv => print!("{}", footprint_to_csv(footprint, unit)?),
    }
    Ok(())
}

fn print_recommendations(
    recommendations: &[Recommendation],
    format: OutputFormat,
    unit: MassUnit,
) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_recommendations_table(recommendations, unit)),
        OutputFormat::Json => println!("{}", render_report(recommendations)?),
        OutputFormat::Csv => print!("{}", recommendations_to_csv(recommendations, unit)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_init_replaces_unparseable_file() {
        let path = std::env::temp_dir().join(format!(
            "carbon-footprint-init-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[storage\ndb_path = ").unwrap();
        assert!(Config::load(Some(&path)).is_err());

        let path_arg = path.to_string_lossy().to_string();
        let cli = Cli::try_parse_from([
            "carbon-footprint",
            "--config",
            path_arg.as_str(),
            "--unit",
            "kg",
            "config",
            "--init",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.display.unit, MassUnit::Kg);
        assert!(Config::load(Some(&path)).is_ok());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn answer_flags_become_changes_in_question_order() {
        let cli = Cli::try_parse_from([
            "carbon-footprint",
            "whatif",
            "--diet",
            "vegan",
            "--home-size",
            "large",
        ])
        .unwrap();
        let Commands::Whatif { answers } = cli.command else {
            panic!("expected whatif");
        };
        assert_eq!(
            answers.changes(),
            vec![
                SurveyChange::HomeSize(HomeSize::Large),
                SurveyChange::DietType(DietType::Vegan),
            ]
        );
        assert!(answers.complete_survey().is_err());
    }
}
