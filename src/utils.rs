use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chat_text_export::{MatchRule, Profile, Snapshot, profile};
use eyre::{Context, Result, eyre};

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone)]
pub struct ExportConfig {
    pub snapshots: Vec<PathBuf>,
    pub target_dir: PathBuf,
    /// Profile name; auto-detected from each snapshot's location when unset.
    pub profile: Option<String>,
    pub custom_profiles: Vec<Profile>,
    /// Replaces the chosen profile's rules when non-empty.
    pub rules: Vec<MatchRule>,
    pub keep_markdown: bool,
    pub stdout: bool,
    pub quiet: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Created(PathBuf),
    Printed,
    /// Nothing matched; no file was written.
    Empty,
}

impl ExportConfig {
    /// Profile for a snapshot taken at `location`, with CLI overrides applied.
    pub fn resolve_profile(&self, location: &str) -> Result<Profile> {
        let mut chosen = match (&self.profile, self.rules.is_empty()) {
            (Some(name), _) => profile::find(name, &self.custom_profiles)?,
            (None, false) => Profile::new("custom", Vec::new()),
            (None, true) => profile::detect(location, &self.custom_profiles).wrap_err(
                "Could not pick a profile from the snapshot location.\nUse --profile or --rule.",
            )?,
        };
        if !self.rules.is_empty() {
            chosen.rules = self.rules.clone();
        }
        if self.keep_markdown {
            chosen.strip_markdown = false;
        }
        Ok(chosen)
    }
}

pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let json = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read snapshot: {}", path.display()))?;
    Snapshot::from_json(&json)
        .wrap_err_with(|| format!("Failed to parse snapshot: {}", path.display()))
}

/// Write `text` under `target_dir`, never overwriting an existing export.
///
/// Two snapshots exported within the same millisecond get the same suggested
/// name, so the file is claimed with `create_new` and a counter is appended
/// on collision.
pub fn write_export(target_dir: &Path, file_name: &str, text: &str) -> Result<PathBuf> {
    let (stem, ext) = file_name.rsplit_once('.').unwrap_or((file_name, "txt"));

    for attempt in 1..=100 {
        let candidate = if attempt == 1 {
            target_dir.join(file_name)
        } else {
            target_dir.join(format!("{}_{}.{}", stem, attempt, ext))
        };
        match File::options().write(true).create_new(true).open(&candidate) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                writer
                    .write_all(text.as_bytes())
                    .and_then(|()| writer.flush())
                    .wrap_err_with(|| format!("Failed to write: {}", candidate.display()))?;
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("Failed to create: {}", candidate.display()));
            }
        }
    }

    Err(eyre!("No free file name for {} in {}", file_name, target_dir.display()))
}
