use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod container;
pub mod creatures;
pub mod objects;
pub mod scanner;

pub use container::{ContainerEncoding, LoadMode, MapBuffer, OutputEncoding};
pub use creatures::{Creature, CreatureTable};
pub use objects::{Disposition, ObjectType, RANDOM_MONSTER_TYPES};
pub use scanner::{MonsterKind, MonsterRecord, ScanPolicy, ScanReport, SkipReason};

/// Number of leading payload bytes dumped in debug mode.
const DEBUG_PREVIEW_BYTES: usize = 100;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum EditMode {
    /// Report monsters without writing anything.
    #[default]
    List,
    /// Overwrite every accepted disposition with `ScanPolicy::force_disposition`
    /// and save the payload to the output path.
    ForceDisposition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSettings {
    pub input_path: PathBuf,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub mode: EditMode,
    #[serde(default)]
    pub load_mode: LoadMode,
    #[serde(default)]
    pub policy: ScanPolicy,
    /// JSON creature table replacing the built-in one.
    #[serde(default)]
    pub creature_table: Option<PathBuf>,
    #[serde(default)]
    pub output_encoding: OutputEncoding,
    #[serde(default)]
    pub debug: bool,
}

impl EditorSettings {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            mode: EditMode::default(),
            load_mode: LoadMode::default(),
            policy: ScanPolicy::default(),
            creature_table: None,
            output_encoding: OutputEncoding::default(),
            debug: false,
        }
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn resolved_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input_path))
    }
}

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("decompression failed: {0}")]
    Decompress(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EditorError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

/// `<stem>_edited.<ext>` next to the input map.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map".to_string());
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}_edited.{}", ext.to_string_lossy()),
        None => format!("{stem}_edited"),
    };
    input.with_file_name(file_name)
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// `None` when the container could not be decompressed.
    pub encoding: Option<ContainerEncoding>,
    pub buffer_len: usize,
    pub report: ScanReport,
    /// Set when a map was written.
    pub output_path: Option<PathBuf>,
}

/// Human readable listing of every record in `report`.
pub fn format_monster_listing(report: &ScanReport, table: &CreatureTable) -> String {
    if report.is_empty() {
        return "No monster objects found in the map file.\n".to_string();
    }

    let mut out = format!("Total monster objects found: {}\n\n", report.records.len());
    for (i, record) in report.records.iter().enumerate() {
        let level = match record.level(table) {
            Some(level) => level.to_string(),
            None => "Random".to_string(),
        };
        let disposition = match (record.disposition, record.disposition_kind()) {
            (_, Some(d)) => d.to_string(),
            (Some(code), None) => format!("Unknown ({code})"),
            (None, None) => "Not decoded".to_string(),
        };
        out.push_str(&format!("Monster #{}:\n", i + 1));
        out.push_str(&format!("Name: {}\n", record.name(table)));
        out.push_str(&format!("Level: {level}\n"));
        out.push_str(&format!("Count: {}\n", record.quantity));
        out.push_str(&format!("Disposition: {disposition}\n"));
        out.push_str(&format!("Offset: {:#x}\n\n", record.offset));
    }
    out
}

fn format_scan_log(settings: &EditorSettings, summary: &RunSummary, preview: &str) -> String {
    let mut log = format!("Map: {}\n", settings.input_path.display());
    log.push_str(&format!("Container: {:?}\n", summary.encoding));
    log.push_str(&format!("Payload size: {} bytes\n", summary.buffer_len));
    log.push_str(&format!("Mode: {:?}\n", settings.mode));
    log.push_str(&format!(
        "Quantity range: {}..={}\n",
        settings.policy.min_quantity, settings.policy.max_quantity
    ));
    log.push_str(&format!("First {DEBUG_PREVIEW_BYTES} bytes:\n"));
    log.push_str(preview);
    log.push_str(&format!(
        "Candidates: {}, accepted: {}, patched: {}\n",
        summary.report.candidates(),
        summary.report.records.len(),
        summary.report.patched
    ));
    for record in &summary.report.records {
        log.push_str(&format!(
            "  {:#010x} {:?} quantity={} disposition={:?}\n",
            record.offset, record.kind, record.quantity, record.disposition
        ));
    }
    log.push_str("Skipped:\n");
    for skipped in &summary.report.skipped {
        log.push_str(&format!(
            "  {:#010x} {} {}\n",
            skipped.offset,
            skipped.object.label(),
            skipped.reason
        ));
    }
    log
}

fn load_creature_table(settings: &EditorSettings) -> Result<CreatureTable> {
    match settings.creature_table.as_ref() {
        Some(path) => {
            let table = CreatureTable::from_json_path(path)?;
            info!(path = %path.display(), creatures = table.len(), "loaded creature table");
            Ok(table)
        }
        None => Ok(CreatureTable::builtin()),
    }
}

/// Loads the creature table named by `settings`, then calls [`run_with_table`].
pub fn run(settings: &EditorSettings) -> Result<RunSummary> {
    let table = load_creature_table(settings)?;
    run_with_table(settings, &table)
}

pub fn run_with_table(settings: &EditorSettings, table: &CreatureTable) -> Result<RunSummary> {
    if settings.policy.min_quantity > settings.policy.max_quantity {
        return Err(EditorError::Config(format!(
            "minimum quantity {} exceeds maximum {}",
            settings.policy.min_quantity, settings.policy.max_quantity
        )));
    }

    info!(path = %settings.input_path.display(), "parsing map file");

    let map = match container::load_map(&settings.input_path, settings.load_mode) {
        Ok(map) => map,
        Err(EditorError::Decompress(msg)) => {
            warn!("{msg}; no monsters can be read from this map");
            return Ok(RunSummary {
                encoding: None,
                buffer_len: 0,
                report: ScanReport::default(),
                output_path: None,
            });
        }
        Err(err) => return Err(err),
    };

    let MapBuffer {
        mut bytes,
        encoding,
    } = map;
    debug!(?encoding, len = bytes.len(), "map payload ready");
    let preview = container::hex_preview(&bytes, DEBUG_PREVIEW_BYTES);

    let (report, output_path) = match settings.mode {
        EditMode::List => (scanner::scan(&bytes, table, &settings.policy), None),
        EditMode::ForceDisposition => {
            let report = scanner::scan_and_patch(&mut bytes, table, &settings.policy);
            let output = settings.resolved_output_path();
            container::save_map(
                &settings.input_path,
                &output,
                &bytes,
                settings.output_encoding,
            )?;
            info!(
                path = %output.display(),
                patched = report.patched,
                disposition = %settings.policy.force_disposition,
                "wrote edited map"
            );
            (report, Some(output))
        }
    };

    info!(monsters = report.records.len(), "scan complete");

    let summary = RunSummary {
        encoding: Some(encoding),
        buffer_len: bytes.len(),
        report,
        output_path,
    };

    if settings.debug {
        let log_path = settings.resolved_output_path().with_extension("scan.txt");
        fs::write(&log_path, format_scan_log(settings, &summary, &preview))?;
        debug!(path = %log_path.display(), "wrote scan log");
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_sits_next_to_input() {
        assert_eq!(
            default_output_path(Path::new("maps/Do.h3m")),
            PathBuf::from("maps/Do_edited.h3m")
        );
        assert_eq!(
            default_output_path(Path::new("Do")),
            PathBuf::from("Do_edited")
        );
    }

    #[test]
    fn settings_json_fills_defaults() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{ "input_path": "Do.h3m", "mode": "ForceDisposition" }"#)
                .unwrap();
        assert_eq!(settings.mode, EditMode::ForceDisposition);
        assert_eq!(settings.load_mode, LoadMode::GzipOrRaw);
        assert_eq!(settings.policy, ScanPolicy::default());
        assert_eq!(settings.resolved_output_path(), PathBuf::from("Do_edited.h3m"));
    }

    #[test]
    fn policy_json_accepts_partial_fields() {
        let policy: ScanPolicy =
            serde_json::from_str(r#"{ "min_quantity": 1, "force_disposition": "Hostile" }"#)
                .unwrap();
        assert_eq!(policy.min_quantity, 1);
        assert_eq!(policy.max_quantity, 1000);
        assert_eq!(policy.force_disposition, Disposition::Hostile);
    }

    #[test]
    fn empty_listing_reports_no_monsters() {
        let listing = format_monster_listing(&ScanReport::default(), &CreatureTable::builtin());
        assert_eq!(listing, "No monster objects found in the map file.\n");
    }

    #[test]
    fn listing_shows_name_level_and_disposition() {
        let report = ScanReport {
            records: vec![
                MonsterRecord {
                    offset: 0x40,
                    kind: MonsterKind::Concrete { creature_id: 83 },
                    quantity: 3,
                    disposition: Some(2),
                    patched: true,
                },
                MonsterRecord {
                    offset: 0x80,
                    kind: MonsterKind::Random(ObjectType::RandomMonster),
                    quantity: 12,
                    disposition: None,
                    patched: false,
                },
            ],
            skipped: Vec::new(),
            patched: 1,
        };
        let listing = format_monster_listing(&report, &CreatureTable::builtin());

        assert!(listing.starts_with("Total monster objects found: 2\n"));
        assert!(listing.contains("Name: Black Dragon\nLevel: 7\nCount: 3\nDisposition: Aggressive\n"));
        assert!(listing.contains("Name: Random Monster (type 71)\nLevel: Random\nCount: 12\n"));
        assert!(listing.contains("Disposition: Not decoded\n"));
    }
}
