use anthro_core::input::{self, Age};
use anthro_core::plausibility::{self, Finding};
use anthro_core::*;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "anthro")]
#[command(about = "Child growth Z-scores, classification and SD curves", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// LMS reference table (CSV); overrides the config file
    #[arg(long, global = true)]
    lms: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute Z-scores, percentiles and nutritional status for one child
    Analyze {
        #[command(flatten)]
        age: AgeArgs,

        /// Sex (m/f, male/female, l/p)
        #[arg(long)]
        sex: Sex,

        /// Weight in kg (comma or dot decimal)
        #[arg(long, value_parser = parse_measure)]
        weight: Option<f64>,

        /// Length/height in cm
        #[arg(long, value_parser = parse_measure)]
        height: Option<f64>,

        /// Head circumference in cm
        #[arg(long, value_parser = parse_measure)]
        head: Option<f64>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print one SD line as CSV (domain,value)
    Curve {
        #[arg(long)]
        sex: Sex,

        /// wfa, hfa, wfl, bfa or hcfa
        #[arg(long)]
        indicator: Indicator,

        /// Target Z-score
        #[arg(long, allow_negative_numbers = true)]
        z: f64,

        /// Fixed age in months (required for weight-for-length)
        #[arg(long, value_parser = parse_measure)]
        age: Option<f64>,

        /// Print JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Median weight, height and head circumference for an age
    Median {
        #[command(flatten)]
        age: AgeArgs,

        #[arg(long)]
        sex: Sex,
    },
}

#[derive(Args)]
struct AgeArgs {
    /// Age in months (clamped to 0-60)
    #[arg(long, value_parser = parse_measure, conflicts_with_all = ["born", "measured"])]
    age_months: Option<f64>,

    /// Birth date (YYYY-MM-DD or DD/MM/YYYY)
    #[arg(long, value_parser = parse_date_arg, requires = "measured")]
    born: Option<NaiveDate>,

    /// Measurement date
    #[arg(long, value_parser = parse_date_arg, requires = "born")]
    measured: Option<NaiveDate>,
}

impl AgeArgs {
    fn resolve(&self) -> Result<Age> {
        let age = match (self.age_months, self.born, self.measured) {
            (Some(months), _, _) => Age::from_months(months),
            (None, Some(born), Some(measured)) => input::age_from_dates(born, measured)?,
            _ => {
                return Err(Error::Input(
                    "give --age-months or both --born and --measured".into(),
                ))
            }
        };
        let months = input::clamp_age(age.months);
        if months != age.months {
            tracing::warn!("Age {:.2} months clamped to {:.2}", age.months, months);
            return Ok(Age::from_months(months));
        }
        Ok(age)
    }
}

fn parse_measure(s: &str) -> std::result::Result<f64, String> {
    input::parse_decimal(s)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "value is empty".to_string())
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    input::parse_date(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    anthro_core::logging::init_with_level(anthro_core::logging::level_for_verbosity(cli.verbose));

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let lms_path = cli
        .lms
        .clone()
        .or_else(|| config.reference.lms_path.clone())
        .ok_or_else(|| {
            Error::Config("no LMS table configured; pass --lms or set reference.lms_path".into())
        })?;
    let provider: Arc<dyn ReferenceProvider> = Arc::new(LmsReference::from_path(&lms_path)?);

    match cli.command {
        Commands::Analyze {
            age,
            sex,
            weight,
            height,
            head,
            json,
        } => {
            let age = age.resolve()?;
            let measurement = Measurement {
                sex,
                age_months: age.months,
                weight_kg: weight,
                height_cm: height,
                head_circumference_cm: head,
            };
            cmd_analyze(provider, &measurement, age, json)
        }
        Commands::Curve {
            sex,
            indicator,
            z,
            age,
            json,
        } => {
            let generator = CurveGenerator::new(provider, config.curves.clone())?;
            cmd_curve(&generator, sex, indicator, z, age, json)
        }
        Commands::Median { age, sex } => {
            let age = age.resolve()?;
            let generator = CurveGenerator::new(provider, config.curves.clone())?;
            let median = generator.median_values(sex, age.months);
            println!("Median values for a {} child at {:.2} months:", sex, age.months);
            println!("  Weight:             {:.2} kg", median.weight_kg);
            println!("  Length/height:      {:.1} cm", median.height_cm);
            println!("  Head circumference: {:.1} cm", median.head_circumference_cm);
            Ok(())
        }
    }
}

fn cmd_analyze(
    provider: Arc<dyn ReferenceProvider>,
    measurement: &Measurement,
    age: Age,
    json: bool,
) -> Result<()> {
    let engine = ZScoreEngine::new(provider);
    let z = engine.compute(measurement);
    let national = classify(&z, RuleSet::National);
    let who = classify(&z, RuleSet::Who);
    let findings = plausibility::assess(measurement, &z);

    if json {
        let percentiles: serde_json::Map<String, serde_json::Value> = z
            .iter()
            .map(|(i, score)| (i.key().to_string(), serde_json::json!(percentile_of(score))))
            .collect();
        let report = serde_json::json!({
            "measurement": measurement,
            "age_days": age.days,
            "z": z,
            "percentiles": percentiles,
            "national": national,
            "who": who,
            "findings": findings,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display_report(measurement, age, &z, &national, &who, &findings);
    Ok(())
}

fn cmd_curve(
    generator: &CurveGenerator,
    sex: Sex,
    indicator: Indicator,
    z: f64,
    age: Option<f64>,
    json: bool,
) -> Result<()> {
    let curve = generator.curve(sex, indicator, z, age)?;

    if json {
        println!("{}", serde_json::to_string(&*curve)?);
        return Ok(());
    }

    let domain = if indicator.is_length_based() {
        "length_cm"
    } else {
        "age_months"
    };
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([domain, "value"])?;
    for (x, v) in curve.points() {
        writer.write_record([format!("{}", x), format!("{:.4}", v)])?;
    }
    writer.flush()?;
    Ok(())
}

fn fmt_z(z: Option<f64>) -> String {
    match z {
        Some(z) if !z.is_nan() => format!("{:.2}", z),
        _ => "—".into(),
    }
}

fn fmt_pct(z: Option<f64>) -> String {
    match percentile_of(z) {
        Some(p) => format!("{:.1}%", p),
        None => "—".into(),
    }
}

fn display_report(
    m: &Measurement,
    age: Age,
    z: &ZScores,
    national: &Classifications,
    who: &Classifications,
    findings: &[Finding],
) {
    println!();
    println!(
        "  {} child, {:.2} months ({} days)",
        m.sex, age.months, age.days
    );
    println!();
    println!(
        "  {:<28} {:>7} {:>8}   {:<22} {}",
        "Indicator", "Z", "Pctl", "National", "WHO"
    );
    for (indicator, score) in z.iter() {
        println!(
            "  {:<28} {:>7} {:>8}   {:<22} {}",
            indicator.name(),
            fmt_z(score),
            fmt_pct(score),
            national.get(indicator).label(),
            who.get(indicator).label()
        );
    }

    if !findings.is_empty() {
        println!();
        for finding in findings {
            println!("  {}", finding);
        }
    }
    println!();
}
