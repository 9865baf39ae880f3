//! Change detection between the current analysis and the newest backup.

use crate::{
    analysis::VariantMatch,
    backup::{backup_sort_key, backup_timestamp, write_with_backup},
    database::{Category, VariantDatabase},
    error::Error,
    manifest::{Manifest, ManifestDiff},
    report::{append_entries, Appended},
    Result,
};
use log::{debug, info, warn};
use std::{
    fmt::Write,
    fs,
    path::{Path, PathBuf},
};

const RULE: &str = "============================================================";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Output files of one analysis run
pub struct AnalysisFiles {
    /// `<name>.html`
    pub html: PathBuf,
    /// `<name>_MANIFEST.json`
    pub manifest: PathBuf,
}

impl AnalysisFiles {
    /// Output files named `name` in `dir`
    pub fn new<P: AsRef<Path>>(dir: P, name: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            html: dir.join(format!("{}.html", name)),
            manifest: dir.join(format!("{}_MANIFEST.json", name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A manifest and the file it was read from
pub struct LoadedManifest {
    /// HTML report or JSON file read
    pub source: PathBuf,
    /// Parsed manifest
    pub manifest: Manifest,
}

#[derive(Debug, Clone, PartialEq)]
/// Current manifest compared against the newest backup
pub struct Comparison {
    /// `None` on the first run
    pub previous: Option<LoadedManifest>,
    /// Manifest of the latest run
    pub current: LoadedManifest,
    /// Empty on the first run
    pub diff: ManifestDiff,
}

fn load(path: &Path) -> Result<Option<Manifest>> {
    if !path.exists() {
        return Ok(None);
    }
    if path.extension().map_or(false, |ext| ext == "html") {
        Manifest::read_html(path)
    } else {
        Manifest::read(path).map(Some)
    }
}

/// Manifest of the latest run, embedded HTML manifest first, JSON manifest second
pub fn load_current(files: &AnalysisFiles) -> Result<LoadedManifest> {
    for path in &[&files.html, &files.manifest] {
        if let Some(manifest) = load(path)? {
            return Ok(LoadedManifest {
                source: path.to_path_buf(),
                manifest,
            });
        }
    }
    let dir = files
        .html
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Err(Error::NoManifest(dir))
}

/// Backups of the report and the manifest, newest first. An HTML backup precedes a JSON backup
/// with the same timestamp.
pub fn find_backups(files: &AnalysisFiles) -> Result<Vec<PathBuf>> {
    let dir = match files.html.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => Path::new("."),
    };
    let bases = [&files.html, &files.manifest]
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect::<Vec<_>>();

    let mut backups = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        for (rank, base) in bases.iter().enumerate() {
            if let Some(timestamp) = backup_timestamp(&name, base) {
                let (time, n) = backup_sort_key(timestamp);
                backups.push(((time.to_string(), n), rank, path.clone()));
            }
        }
    }
    backups.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    debug!("Found {} backups in {}", backups.len(), dir.display());
    Ok(backups.into_iter().map(|(_, _, path)| path).collect())
}

/// Newest readable backup manifest, `None` when there are no backups
pub fn load_previous(files: &AnalysisFiles) -> Result<Option<LoadedManifest>> {
    for path in find_backups(files)? {
        match load(&path) {
            Ok(Some(manifest)) => {
                return Ok(Some(LoadedManifest {
                    source: path,
                    manifest,
                }))
            }
            Ok(None) => debug!("{} has no embedded manifest", path.display()),
            Err(e) => warn!("Could not load manifest from {}: {}", path.display(), e),
        }
    }
    Ok(None)
}

/// Compares the latest run in `dir` against its newest backup
pub fn compare<P: AsRef<Path>>(dir: P, name: &str) -> Result<Comparison> {
    let files = AnalysisFiles::new(dir, name);
    let current = load_current(&files)?;
    let previous = load_previous(&files)?;
    let diff = match &previous {
        Some(previous) => ManifestDiff::between(&previous.manifest, &current.manifest),
        None => ManifestDiff::default(),
    };
    Ok(Comparison {
        previous,
        current,
        diff,
    })
}

/// Inserts basic entries for the added rsIDs into a curated report. The report is backed up
/// before it is rewritten and left alone when nothing is inserted.
pub fn append_new_variants(
    comparison: &Comparison,
    db: &VariantDatabase,
    target: &Path,
) -> Result<Appended> {
    if !target.exists() {
        return Err(Error::FileNotFound(target.to_path_buf()));
    }
    let current = &comparison.current.manifest;
    let matches = comparison
        .diff
        .added
        .iter()
        .filter_map(|rsid| {
            let found = current
                .variant_details
                .get(rsid)
                .and_then(|entry| VariantMatch::from_manifest(db, rsid, entry));
            if found.is_none() {
                warn!("{} is not in the variant table, not appending it", rsid);
            }
            found
        })
        .collect::<Vec<_>>();

    let document = fs::read_to_string(target)?;
    let appended = append_entries(&document, &matches)?;
    if appended.inserted.is_empty() {
        info!("Nothing to add to {}", target.display());
    } else {
        write_with_backup(target, &appended.document)?;
        info!(
            "Added {} entries to {}",
            appended.inserted.len(),
            target.display()
        );
    }
    Ok(appended)
}

fn entry_line(manifest: &Manifest, rsid: &str) -> String {
    match manifest.variant_details.get(rsid) {
        Some(entry) => format!("{:15} {:15} ({})", rsid, entry.gene, entry.genotype),
        None => rsid.to_string(),
    }
}

/// Human readable change report
pub fn render_summary(comparison: &Comparison) -> String {
    let current = &comparison.current.manifest;
    let mut out = String::new();

    let previous = match &comparison.previous {
        Some(previous) => previous,
        None => {
            let _ = writeln!(out, "{}", RULE);
            let _ = writeln!(out, "No previous manifest found - this is the first run");
            let _ = writeln!(out, "{}", RULE);
            let _ = writeln!(out, "Total variants found: {}", current.total_variants);
            let _ = writeln!(out, "Generated: {}", current.generated_at);
            for category in Category::ALL.iter() {
                let _ = writeln!(out, "  {:>16}: {}", category.title(), current.count(*category));
            }
            return out;
        }
    };

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Variant change detection");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "Old: {} ({} variants, generated {})",
        previous.source.display(),
        previous.manifest.variant_details.len(),
        previous.manifest.generated_at
    );
    let _ = writeln!(
        out,
        "New: {} ({} variants, generated {})",
        comparison.current.source.display(),
        current.variant_details.len(),
        current.generated_at
    );

    let diff = &comparison.diff;
    if diff.added.is_empty() {
        let _ = writeln!(out, "\nNo new variants detected");
    } else {
        let _ = writeln!(out, "\nNEW VARIANTS DETECTED: {}", diff.added.len());
        for category in Category::ALL.iter() {
            let added = diff
                .added
                .iter()
                .filter(|rsid| {
                    current
                        .variant_details
                        .get(rsid.as_str())
                        .map_or(false, |entry| entry.category == *category)
                })
                .collect::<Vec<_>>();
            if added.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{} ({}):", category.title(), added.len());
            for rsid in added {
                let _ = writeln!(out, "  + {}", entry_line(current, rsid));
            }
        }
    }

    if !diff.removed.is_empty() {
        let _ = writeln!(out, "\nREMOVED VARIANTS: {}", diff.removed.len());
        for rsid in &diff.removed {
            let _ = writeln!(out, "  - {}", entry_line(&previous.manifest, rsid));
        }
        let _ = writeln!(
            out,
            "Removed variants are not deleted from existing reports, remove them manually."
        );
    }
    let _ = writeln!(out, "{}", RULE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{genotype::Zygosity, manifest::ManifestEntry};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn manifest(generated_at: &str, rsids: &[(&str, Category)]) -> Manifest {
        Manifest {
            generated_at: generated_at.to_string(),
            total_variants: rsids.len(),
            variants: BTreeMap::new(),
            variant_details: rsids
                .iter()
                .map(|(rsid, category)| {
                    (
                        rsid.to_string(),
                        ManifestEntry {
                            gene: "GENE".to_string(),
                            category: *category,
                            chromosome: "1".to_string(),
                            position: 1,
                            genotype: "0/1".to_string(),
                            zygosity: Some(Zygosity::Heterozygous),
                        },
                    )
                })
                .collect(),
        }
    }

    fn write(path: &Path, manifest: &Manifest) {
        fs::write(path, manifest.to_json().unwrap()).unwrap();
    }

    #[test]
    fn no_manifest_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            compare(dir.path(), "GENOME_ANALYSIS"),
            Err(Error::NoManifest(_))
        ));
    }

    #[test]
    fn first_run_has_no_previous() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        write(&files.manifest, &manifest("now", &[("rs1", Category::Clinical)]));

        let comparison = compare(dir.path(), "GENOME_ANALYSIS").unwrap();
        assert!(comparison.previous.is_none());
        assert!(comparison.diff.is_empty());
        assert_eq!(comparison.current.source, files.manifest);
        assert!(render_summary(&comparison).contains("first run"));
    }

    #[test]
    fn compares_against_newest_backup() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        write(
            &dir.path().join("GENOME_ANALYSIS_MANIFEST.2024-01-01_00-00-00.json"),
            &manifest("old", &[("rs9", Category::Trait)]),
        );
        write(
            &dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00.json"),
            &manifest("newer", &[("rsx", Category::Clinical), ("rsy", Category::Trait)]),
        );
        write(
            &files.manifest,
            &manifest(
                "now",
                &[("rsy", Category::Trait), ("rsz", Category::Pharmacogenomic)],
            ),
        );

        let comparison = compare(dir.path(), "GENOME_ANALYSIS").unwrap();
        let previous = comparison.previous.as_ref().unwrap();
        assert_eq!(previous.manifest.generated_at, "newer");
        assert_eq!(
            comparison.diff.added.iter().collect::<Vec<_>>(),
            vec!["rsz"]
        );
        assert_eq!(
            comparison.diff.removed.iter().collect::<Vec<_>>(),
            vec!["rsx"]
        );

        let summary = render_summary(&comparison);
        assert!(summary.contains("NEW VARIANTS DETECTED: 1"));
        assert!(summary.contains("Pharmacogenomics (1):"));
        assert!(summary.contains("+ rsz"));
        assert!(summary.contains("REMOVED VARIANTS: 1"));
        assert!(summary.contains("- rsx"));
    }

    #[test]
    fn prefers_html_backup_with_same_timestamp() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        fs::write(
            dir.path().join("GENOME_ANALYSIS.2025-01-01_00-00-00.html"),
            "<html></html>",
        )
        .unwrap();
        fs::write(dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00.json"), "{}").unwrap();
        fs::write(dir.path().join("unrelated.json"), "{}").unwrap();

        let backups = find_backups(&files).unwrap();
        assert_eq!(backups.len(), 2);
        assert!(backups[0].to_string_lossy().ends_with(".html"));
    }

    #[test]
    fn newest_collision_backup_wins() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        write(
            &dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00-9.json"),
            &manifest("ninth", &[]),
        );
        write(
            &dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00-10.json"),
            &manifest("tenth", &[]),
        );
        write(&files.manifest, &manifest("now", &[]));

        let previous = load_previous(&files).unwrap().unwrap();
        assert_eq!(previous.manifest.generated_at, "tenth");
    }

    #[test]
    fn appends_added_variants_to_curated_report() {
        use crate::report::{render, RenderOptions};
        use chrono::Local;

        let db = VariantDatabase::builtin().unwrap();
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");

        let first = vec![VariantMatch {
            definition: db.get("rs4244285").unwrap(),
            chrom: "10".to_string(),
            pos: 94781859,
            genotype: "0/1".to_string(),
            zygosity: Zygosity::Heterozygous,
        }];
        let old = Manifest::from_matches(&first, Local::now());
        let curated = dir.path().join("GENOME_ANALYSIS_COMPREHENSIVE.html");
        let document = render(&first, &old, &RenderOptions::default()).unwrap();
        fs::write(&curated, &document).unwrap();
        write(
            &dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00.json"),
            &old,
        );

        let mut second = first.clone();
        second.push(VariantMatch {
            definition: db.get("rs1801133").unwrap(),
            chrom: "1".to_string(),
            pos: 11796321,
            genotype: "1/1".to_string(),
            zygosity: Zygosity::HomozygousAlternate,
        });
        write(&files.manifest, &Manifest::from_matches(&second, Local::now()));

        let comparison = compare(dir.path(), "GENOME_ANALYSIS").unwrap();
        let appended = append_new_variants(&comparison, &db, &curated).unwrap();
        assert_eq!(appended.inserted, vec!["rs1801133"]);

        let updated = fs::read_to_string(&curated).unwrap();
        assert!(updated.contains("data-rsid=\"rs1801133\""));
        assert_eq!(updated.matches("data-rsid=\"rs4244285\"").count(), 1);
        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                backup_timestamp(&name, "GENOME_ANALYSIS_COMPREHENSIVE.html").is_some()
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn append_target_must_exist() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        write(&files.manifest, &manifest("now", &[]));
        let comparison = compare(dir.path(), "GENOME_ANALYSIS").unwrap();
        let db = VariantDatabase::builtin().unwrap();
        assert!(matches!(
            append_new_variants(&comparison, &db, &dir.path().join("missing.html")),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn unchanged_runs_report_nothing_new() {
        let dir = tempdir().unwrap();
        let files = AnalysisFiles::new(dir.path(), "GENOME_ANALYSIS");
        let m = manifest("t", &[("rs1", Category::Clinical)]);
        write(&dir.path().join("GENOME_ANALYSIS_MANIFEST.2025-01-01_00-00-00.json"), &m);
        write(&files.manifest, &m);

        let comparison = compare(dir.path(), "GENOME_ANALYSIS").unwrap();
        assert!(comparison.diff.is_empty());
        assert!(render_summary(&comparison).contains("No new variants detected"));
    }
}
