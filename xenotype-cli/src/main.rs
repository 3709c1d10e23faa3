use clap::{Parser, ValueEnum};
use log::warn;
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;

use xenotype_core::{
    generate_seeded, Catalog, Generation, IntRange, Override, Overrides, RandomiserSettings,
    Result,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OverrideArg {
    Inherit,
    Allow,
    Disallow,
}

impl From<OverrideArg> for Override {
    fn from(arg: OverrideArg) -> Self {
        match arg {
            OverrideArg::Inherit => Override::Inherit,
            OverrideArg::Allow => Override::ForceAllow,
            OverrideArg::Disallow => Override::ForceDisallow,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "xenotype-randomiser", version, about = "Random xenotype generator")]
struct Args {
    /// Gene catalog: a JSON document with a `genes` array.
    #[arg(long)]
    catalog: PathBuf,

    /// Settings file. Defaults to the per-user config directory.
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = OverrideArg::Inherit)]
    nonviolent: OverrideArg,

    #[arg(long, value_enum, default_value_t = OverrideArg::Inherit)]
    inbred: OverrideArg,

    /// Number of xenotypes to generate; each uses the next seed.
    #[arg(long, default_value_t = 1)]
    count: u64,

    #[arg(long, default_value_t = false)]
    json: bool,

    /// Negative means no cap.
    #[arg(long, allow_hyphen_values = true)]
    max_complexity: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    min_metabolism: Option<i32>,

    #[arg(long, allow_hyphen_values = true)]
    max_metabolism: Option<i32>,

    #[arg(long, value_name = "GENE")]
    allow: Vec<String>,

    #[arg(long, value_name = "GENE")]
    disallow: Vec<String>,

    #[arg(long, default_value_t = false)]
    allow_all: bool,

    #[arg(long, default_value_t = false)]
    disallow_all: bool,

    #[arg(long, default_value_t = false)]
    disallow_nonviolent: bool,

    /// Write the settings in effect back to the settings file.
    #[arg(long, default_value_t = false)]
    save_settings: bool,
}

#[derive(Debug, Serialize)]
struct GenerationOutput<'a> {
    seed: u64,
    icon: &'static str,
    genes: Vec<&'a str>,
    complexity: u32,
    metabolism: i32,
    warnings: Vec<String>,
}

impl<'a> GenerationOutput<'a> {
    fn new(seed: u64, generation: &Generation<'a>) -> Self {
        Self {
            seed,
            icon: generation.icon,
            genes: generation
                .selection
                .iter()
                .map(|g| g.def_name.as_str())
                .collect(),
            complexity: generation.selection.total_complexity(),
            metabolism: generation.selection.total_metabolism(),
            warnings: generation.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("XenotypeRandomiser");
    base.push("settings.json");
    Some(base)
}

fn apply_setting_flags(args: &Args, settings: &mut RandomiserSettings, catalog: &Catalog) {
    if args.allow_all {
        settings.allow_all();
    }
    if args.disallow_all {
        settings.disallow_all(catalog);
    }
    if args.disallow_nonviolent {
        settings.disallow_nonviolent(catalog);
    }
    for id in &args.allow {
        settings.set_allowed(id, true);
    }
    for id in &args.disallow {
        if !catalog.contains(id) {
            warn!("disallowing '{}', which is not in the catalog", id);
        }
        settings.set_allowed(id, false);
    }
    if let Some(cap) = args.max_complexity {
        settings.max_complexity = Some(cap);
    }
    if args.min_metabolism.is_some() || args.max_metabolism.is_some() {
        settings.metabolism = IntRange::new(
            args.min_metabolism.unwrap_or(settings.metabolism.min),
            args.max_metabolism.unwrap_or(settings.metabolism.max),
        );
    }
}

fn print_generation(output: &GenerationOutput<'_>, generation: &Generation<'_>) {
    println!(
        "seed {}: icon {}, complexity {}, metabolism {:+}",
        output.seed, output.icon, output.complexity, output.metabolism
    );
    for gene in generation.selection.iter() {
        println!("  {} ({})", gene.label(), gene.def_name);
    }
}

fn run(args: Args) -> Result<()> {
    let catalog = Catalog::load(&args.catalog)?;

    let path = args.settings.clone().or_else(settings_path);
    let mut settings = match &path {
        Some(path) => RandomiserSettings::load(path)?,
        None => RandomiserSettings::default(),
    };
    settings.apply_persisted_switches(&catalog);
    apply_setting_flags(&args, &mut settings, &catalog);

    if args.save_settings {
        match &path {
            Some(path) => settings.save(path)?,
            None => warn!("no config directory available, settings not saved"),
        }
    }

    let overrides = Overrides::new(args.nonviolent.into(), args.inbred.into());
    let base_seed = args
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen::<u64>());

    let mut outputs = Vec::new();
    for i in 0..args.count.max(1) {
        let seed = base_seed.wrapping_add(i);
        let generation = generate_seeded(&catalog, &settings, overrides, seed)?;
        let output = GenerationOutput::new(seed, &generation);

        for warning in &output.warnings {
            eprintln!("warning (seed {}): {}", seed, warning);
        }
        if args.json {
            outputs.push(output);
        } else {
            print_generation(&output, &generation);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides_and_negative_bounds() {
        let args = Args::try_parse_from([
            "xenotype-randomiser",
            "--catalog",
            "genes.json",
            "--nonviolent",
            "disallow",
            "--inbred",
            "allow",
            "--min-metabolism",
            "-3",
        ])
        .unwrap();
        assert_eq!(Override::from(args.nonviolent), Override::ForceDisallow);
        assert_eq!(Override::from(args.inbred), Override::ForceAllow);
        assert_eq!(args.min_metabolism, Some(-3));
        assert_eq!(args.count, 1);
    }

    #[test]
    fn flags_adjust_settings() {
        let catalog = Catalog::from_json_str(
            r#"{ "genes": [
                { "def_name": "Nonviolent", "nonviolent": true },
                { "def_name": "Robust" }
            ] }"#,
        )
        .unwrap();
        let args = Args::try_parse_from([
            "xenotype-randomiser",
            "--catalog",
            "genes.json",
            "--allow-all",
            "--disallow-nonviolent",
            "--max-complexity",
            "7",
            "--max-metabolism",
            "2",
        ])
        .unwrap();
        let mut settings = RandomiserSettings::default();
        apply_setting_flags(&args, &mut settings, &catalog);
        assert!(settings.is_disallowed("Nonviolent"));
        assert!(!settings.is_disallowed("Robust"));
        assert!(!settings.is_disallowed("Inbred"));
        assert_eq!(settings.complexity_cap(), Some(7));
        assert_eq!(settings.metabolism, IntRange::new(-5, 2));
    }
}
