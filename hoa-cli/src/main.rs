use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use hoa_core::{
    format_monster_listing, run_with_table, CreatureTable, Disposition, EditMode,
    EditorSettings, LoadMode, OutputEncoding,
};

#[derive(Debug, Parser)]
#[command(
    name = "hoa-editor",
    version,
    about = "List and edit monster stacks in Heroes of Might and Magic III maps"
)]
struct Args {
    /// Map file to read (gzip .h3m, or an already decompressed payload).
    #[arg(long, required_unless_present = "settings")]
    input: Option<PathBuf>,

    /// Where the edited map is written. Defaults to <stem>_edited.<ext>.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Overwrite every monster disposition with this value and save the map.
    #[arg(long, value_name = "DISPOSITION")]
    set_disposition: Option<Disposition>,

    #[arg(long)]
    min_quantity: Option<u16>,

    #[arg(long)]
    max_quantity: Option<u16>,

    /// Also decode and patch the disposition byte of random monsters.
    #[arg(long, default_value_t = false)]
    random_disposition: bool,

    /// Do not fall back to reading the map as raw bytes.
    #[arg(long, default_value_t = false)]
    gzip_only: bool,

    /// Re-compress the edited map instead of writing the raw payload.
    #[arg(long, default_value_t = false)]
    gzip_output: bool,

    /// JSON creature table replacing the built-in one.
    #[arg(long, value_name = "JSON")]
    creatures: Option<PathBuf>,

    /// Load settings from a JSON file; other flags override it.
    #[arg(long, value_name = "JSON")]
    settings: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Args {
    fn into_settings(self) -> hoa_core::Result<EditorSettings> {
        let mut settings = match self.settings.as_ref() {
            Some(path) => EditorSettings::from_json_path(path)?,
            // clap guarantees --input when --settings is absent.
            None => EditorSettings::new(self.input.clone().unwrap_or_default()),
        };

        if let Some(input) = self.input {
            settings.input_path = input;
        }
        if self.output.is_some() {
            settings.output_path = self.output;
        }
        if let Some(disposition) = self.set_disposition {
            settings.mode = EditMode::ForceDisposition;
            settings.policy.force_disposition = disposition;
        }
        if let Some(min) = self.min_quantity {
            settings.policy.min_quantity = min;
        }
        if let Some(max) = self.max_quantity {
            settings.policy.max_quantity = max;
        }
        if self.random_disposition {
            settings.policy.random_disposition = true;
        }
        if self.gzip_only {
            settings.load_mode = LoadMode::GzipOnly;
        }
        if self.gzip_output {
            settings.output_encoding = OutputEncoding::Gzip;
        }
        if self.creatures.is_some() {
            settings.creature_table = self.creatures;
        }
        settings.debug |= self.debug;

        Ok(settings)
    }
}

fn log_directive(debug: bool) -> &'static str {
    if debug {
        "hoa_core=debug"
    } else {
        "hoa_core=info"
    }
}

fn init_logging(debug: bool) {
    let filter = match log_directive(debug).parse() {
        Ok(d) => EnvFilter::from_default_env().add_directive(d),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();

    let settings = match args.into_settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error: failed to load settings: {err}");
            std::process::exit(1);
        }
    };

    // The settings file may turn on debug output, so logging starts here.
    init_logging(settings.debug);

    let table = match settings.creature_table.as_ref() {
        Some(path) => match CreatureTable::from_json_path(path) {
            Ok(table) => table,
            Err(err) => {
                eprintln!("Error: failed to load creature table {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => CreatureTable::builtin(),
    };

    let summary = match run_with_table(&settings, &table) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    if summary.encoding.is_none() {
        warn!("{} is not a readable map container", settings.input_path.display());
    }

    print!("{}", format_monster_listing(&summary.report, &table));

    if let Some(output) = summary.output_path.as_ref() {
        println!(
            "Set {} disposition(s) to {} in {}",
            summary.report.patched,
            settings.policy.force_disposition,
            output.display()
        );
    }
}
