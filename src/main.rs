use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trunk_planner::config::Settings;
use trunk_planner::feed::{Parsed, parse_mhz, parse_sites, parse_talkgroups};
use trunk_planner::prompts::{UploadPrompter, confirm_system, select_site};
use trunk_planner::radioreference::RadioReference;
use trunk_planner::recorder_config::TrunkRecorderConfig;
use trunk_planner::uploads::PreviousUploads;
use trunk_planner::{Hz, allocate, analysis, coverage, output, partition};

fn cli() -> Command {
    let budget_args = [
        Arg::new("settings")
            .long("settings")
            .value_name("FILE")
            .help("JSON settings file (bandwidth, budget, source defaults, paths)")
            .value_parser(value_parser!(PathBuf)),
        Arg::new("bandwidth")
            .long("bandwidth")
            .value_name("HZ")
            .help("Receiver bandwidth in Hz")
            .value_parser(value_parser!(u64)),
        Arg::new("budget")
            .long("budget")
            .value_name("N")
            .help("Total digital recorders to spread across receivers")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(i64)),
        Arg::new("min-recorders")
            .long("min-recorders")
            .value_name("N")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(i64)),
        Arg::new("max-recorders")
            .long("max-recorders")
            .value_name("N")
            .allow_negative_numbers(true)
            .value_parser(value_parser!(i64)),
    ];

    Command::new("trunk-planner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Plans RTL-SDR receivers and recorder budgets for trunk-recorder")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (overridden by RUST_LOG)")
                .default_value("info")
                .global(true),
        )
        .subcommand(
            Command::new("generate")
                .about("Fetch a system from RadioReference and generate trunk-recorder files")
                .arg(Arg::new("username").required(true).help("RadioReference.com username"))
                .arg(
                    Arg::new("sid")
                        .required(true)
                        .help("System ID (from URL like /db/sid/12059)")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .help("RadioReference.com password (prompted when omitted)"),
                )
                .arg(Arg::new("shortname").long("shortname").default_value("system").help("Short name for system"))
                .arg(Arg::new("abbrev").long("abbrev").default_value("SYSTEM").help("System abbreviation for categories"))
                .arg(Arg::new("siteid").long("siteid").help("Specific site ID to use (for automated updates)"))
                .arg(
                    Arg::new("update-only")
                        .long("update-only")
                        .action(ArgAction::SetTrue)
                        .help("Only update talkgroups, skip configuration prompts"),
                )
                .arg(
                    Arg::new("capture-siteid")
                        .long("capture-siteid")
                        .action(ArgAction::SetTrue)
                        .help("Save selected siteid to file for future updates"),
                )
                .arg(
                    Arg::new("output-dir")
                        .long("output-dir")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf)),
                )
                .args(budget_args.clone()),
        )
        .subcommand(
            Command::new("analyze")
                .about("Report coverage and recommended recorders for an existing config.json")
                .arg(
                    Arg::new("config")
                        .default_value("config.json")
                        .value_parser(value_parser!(PathBuf)),
                )
                .args(budget_args.clone()),
        )
        .subcommand(
            Command::new("plan")
                .about("Plan receivers offline from a list of frequencies")
                .arg(
                    Arg::new("freq")
                        .long("freq")
                        .value_name("MHZ")
                        .required(true)
                        .num_args(1..)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("control")
                        .long("control")
                        .value_name("MHZ")
                        .num_args(1..)
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print the plan as JSON"))
                .args(budget_args),
        )
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("trunk_planner={level},reqwest=warn")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings file first, then any CLI overrides.
fn load_settings(matches: &ArgMatches) -> Result<Settings> {
    let mut settings = Settings::load(matches.get_one::<PathBuf>("settings").map(PathBuf::as_path))?;
    if let Some(&bandwidth) = matches.get_one::<u64>("bandwidth") {
        settings.bandwidth = bandwidth;
    }
    let budget = &mut settings.budget;
    if let Some(&total) = matches.get_one::<i64>("budget") {
        budget.total = total;
    }
    if let Some(&min) = matches.get_one::<i64>("min-recorders") {
        budget.min_per_device = min;
    }
    if let Some(&max) = matches.get_one::<i64>("max-recorders") {
        budget.max_per_device = max;
    }
    settings.validate().context("Invalid planner settings")?;
    Ok(settings)
}

fn log_rejected<T>(what: &str, parsed: &Parsed<T>) {
    for row in &parsed.rejected {
        warn!("Skipped {} row: {}", what, row);
    }
}

fn parse_mhz_list(matches: &ArgMatches, id: &str) -> Result<Vec<Hz>> {
    matches
        .get_many::<String>(id)
        .into_iter()
        .flatten()
        .map(|text| parse_mhz(text).with_context(|| format!("Invalid --{} value", id)))
        .collect()
}

fn run_plan(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let frequencies = parse_mhz_list(matches, "freq")?;
    let controls: BTreeSet<Hz> = parse_mhz_list(matches, "control")?.into_iter().collect();

    let plan = partition(&frequencies, settings.bandwidth).context("Failed to partition frequencies")?;
    let plan = allocate(plan, &controls, &settings.budget).context("Failed to allocate recorders")?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?);
    } else {
        print!("{}", coverage::render_coverage(&frequencies, &plan));
        for rx in &plan.receivers {
            println!(
                "rtl={} center={} Hz window={}..={} Hz digitalRecorders={}",
                rx.index,
                rx.center,
                rx.lower(),
                rx.upper(),
                rx.recorder_count
            );
        }
        println!("Total digital recorders: {}", plan.total_recorders());
    }
    Ok(())
}

fn run_analyze(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let path = matches
        .get_one::<PathBuf>("config")
        .context("Missing config path")?;
    let config = TrunkRecorderConfig::load(path)?;
    let report = analysis::analyze(&config, &settings.budget).context("Failed to analyze config")?;
    print!("{}", report.render());
    Ok(())
}

async fn run_generate(matches: &ArgMatches) -> Result<()> {
    let settings = load_settings(matches)?;
    let username = matches.get_one::<String>("username").context("Missing username")?;
    let sid = *matches.get_one::<u32>("sid").context("Missing SID")?;
    let short_name = matches.get_one::<String>("shortname").map(String::as_str).unwrap_or("system");
    let abbrev = matches.get_one::<String>("abbrev").map(String::as_str).unwrap_or("SYSTEM");
    let requested_site = matches.get_one::<String>("siteid").map(String::as_str);
    let update_only = matches.get_flag("update-only");
    let output_dir = matches
        .get_one::<PathBuf>("output-dir")
        .map(PathBuf::as_path)
        .unwrap_or(Path::new("."));

    let password = match matches.get_one::<String>("password") {
        Some(p) => p.clone(),
        None => dialoguer::Password::new()
            .with_prompt("RadioReference.com password")
            .interact()
            .context("Failed to read password")?,
    };

    println!("Fetching data for SID {}...", sid);
    let rr = RadioReference::new(&settings.base_url)?;
    rr.login(username, &password).await?;

    let system = rr
        .system_info(sid)
        .await?
        .with_context(|| format!("Could not find system with SID {}", sid))?;

    if update_only {
        println!("\n✓ Updating system: {}", system.name);
    } else if !confirm_system(&system)? {
        println!("Aborted by user");
        return Ok(());
    }

    let talkgroups_raw = rr.talkgroups_csv(sid).await?;
    let talkgroups = parse_talkgroups(&talkgroups_raw);
    log_rejected("talkgroup", &talkgroups);
    if talkgroups.records.is_empty() {
        anyhow::bail!("No talkgroups found for SID {}", sid);
    }

    let sites = parse_sites(&rr.sites_csv(sid).await?);
    log_rejected("site", &sites);
    if sites.records.is_empty() {
        anyhow::bail!("No sites found for SID {}", sid);
    }
    let site = select_site(&sites.records, requested_site)?;

    if !update_only && !site.frequencies.is_empty() {
        println!("\n{}", coverage::requirements(&site.frequencies, settings.bandwidth)?);
    }

    let uploads = if update_only {
        println!("\nSkipping upload service configuration (update-only mode)");
        None
    } else {
        let previous = match TrunkRecorderConfig::load_previous(&settings.previous_config_paths) {
            Some((path, config)) => {
                info!("Using upload defaults from {}", path.display());
                PreviousUploads::from_config(&config)
            }
            None => PreviousUploads::default(),
        };
        Some(UploadPrompter::new(&previous, short_name).prompt()?)
    };

    println!("\nProcessing data for {}...", system.name);
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    output::write_talkgroup_files(&talkgroups_raw, abbrev, output_dir, update_only)?;
    println!("✓ Found {} talkgroups", talkgroups.records.len());

    if matches.get_flag("capture-siteid") {
        output::write_site_id(output_dir, &site.id)?;
        println!("✓ Site ID {} saved for future updates", site.id);
    }

    let site_info = output::SiteInfo::new(&system, site, settings.bandwidth)?;
    match output::write_site_info(&site_info, &settings.siteinfo_paths, output_dir) {
        Ok(path) => println!("✓ Site information saved to {}", path.display()),
        Err(e) => warn!("Error saving site information: {:#}", e),
    }

    let Some(uploads) = uploads else {
        println!("✓ Talkgroup update completed successfully");
        return Ok(());
    };

    let plan = partition(&site.frequencies, settings.bandwidth).context("Failed to partition site frequencies")?;
    let plan = allocate(plan, &site.control_set(), &settings.budget).context("Failed to allocate recorders")?;
    print!("\n{}", coverage::render_coverage(&site.frequencies, &plan));

    let nac = (!site.nac.is_empty()).then_some(site.nac.as_str());
    let mut config =
        TrunkRecorderConfig::from_plan(&plan, &site.control_channels, nac, short_name, &settings);
    config.apply_uploads(&uploads);

    let config_path = output_dir.join("config.json");
    config.save(&config_path)?;

    println!("✓ Found {} control channels", site.control_channels.len());
    println!("✓ Found {} total frequencies", site.frequencies.len());
    println!("✓ Generated {} RTL-SDR sources", plan.len());
    println!("\n✓ Files generated in {}:", output_dir.display());
    println!("  - config.json");
    println!("  - talkgroup.csv (full descriptions)");
    println!("  - talkgroup-openmhz.csv (25-char descriptions)");
    println!("  - talkgroup-rdio.csv (original RadioReference format)");
    println!("  - siteinfo.json (site and frequency information)");

    if uploads.any_enabled() {
        println!("\n✓ Upload services configured successfully!");
    } else {
        println!("\n⚠ No upload services configured - recordings will be local only");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let level = matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("info");
    init_logging(level);

    match matches.subcommand() {
        Some(("generate", sub)) => run_generate(sub).await,
        Some(("analyze", sub)) => run_analyze(sub),
        Some(("plan", sub)) => run_plan(sub),
        _ => unreachable!("subcommand_required"),
    }
}
