//! Record of the variants found by a run, used to detect additions between runs.
//!
//! The manifest is written next to the HTML report and also embedded inside it, so a report
//! is self-describing even when the JSON file is lost.

use crate::{
    analysis::VariantMatch, backup::write_with_backup, database::Category, genotype::Zygosity,
    Result,
};
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

/// `id` of the `<script>` element holding the embedded manifest
pub const MANIFEST_SCRIPT_ID: &str = "genome-manifest";

/// Format of `generated_at`
pub const GENERATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

lazy_static! {
    static ref EMBEDDED_MANIFEST: Regex = Regex::new(
        r#"(?s)<script type="application/json" id="genome-manifest">\s*(.*?)</script>"#
    )
    .expect("valid manifest regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Per variant details of a manifest
pub struct ManifestEntry {
    /// Gene symbol
    pub gene: String,
    /// Report section
    pub category: Category,
    #[serde(alias = "chr")]
    /// Chromosome as written in the input
    pub chromosome: String,
    #[serde(alias = "pos")]
    /// 1-based position
    pub position: u64,
    /// Raw `GT` value
    pub genotype: String,
    /// Missing in manifests written before zygosity was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zygosity: Option<Zygosity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Variants found by one run
pub struct Manifest {
    /// Local time of the run
    #[serde(alias = "generated")]
    pub generated_at: String,
    /// Number of entries in `variant_details`
    pub total_variants: usize,
    /// rsIDs per category, sorted
    #[serde(default)]
    pub variants: BTreeMap<Category, Vec<String>>,
    /// Entry per rsID
    pub variant_details: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Builds the manifest of a run. Keys are sorted so equal inputs give equal JSON apart
    /// from `generated_at`.
    pub fn from_matches(matches: &[VariantMatch<'_>], generated_at: DateTime<Local>) -> Self {
        let mut variants = Category::ALL
            .iter()
            .map(|&category| (category, Vec::new()))
            .collect::<BTreeMap<_, _>>();
        let mut variant_details = BTreeMap::new();

        for m in matches {
            variants
                .entry(m.category())
                .or_insert_with(Vec::new)
                .push(m.rsid().to_string());
            variant_details.insert(
                m.rsid().to_string(),
                ManifestEntry {
                    gene: m.definition.gene.clone(),
                    category: m.category(),
                    chromosome: m.chrom.clone(),
                    position: m.pos,
                    genotype: m.genotype.clone(),
                    zygosity: Some(m.zygosity),
                },
            );
        }
        for rsids in variants.values_mut() {
            rsids.sort();
        }

        Self {
            generated_at: generated_at.format(GENERATED_AT_FORMAT).to_string(),
            total_variants: variant_details.len(),
            variants,
            variant_details,
        }
    }

    /// All rsIDs of the manifest
    pub fn rsids(&self) -> BTreeSet<&str> {
        self.variant_details.keys().map(String::as_str).collect()
    }

    /// Number of entries of a category
    pub fn count(&self, category: Category) -> usize {
        self.variant_details
            .values()
            .filter(|entry| entry.category == category)
            .count()
    }

    /// Pretty printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses manifest JSON, accepting legacy field names
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a manifest file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Writes the JSON to `path`, backing up a previous manifest. Returns the backup path.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<Option<PathBuf>> {
        write_with_backup(path.as_ref(), &self.to_json()?)
    }

    /// Manifest embedded in a rendered report, `None` when the report has none
    pub fn from_html(html: &str) -> Result<Option<Self>> {
        match EMBEDDED_MANIFEST.captures(html) {
            Some(captures) => Ok(Some(Self::from_json(&captures[1])?)),
            None => Ok(None),
        }
    }

    /// Reads the manifest embedded in a report file
    pub fn read_html<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        Self::from_html(&fs::read_to_string(path)?)
    }

    /// JSON safe for inclusion in a `<script>` element
    pub fn to_embedded_json(&self) -> Result<String> {
        Ok(self.to_json()?.replace("</", "<\\/"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// rsIDs gained and lost between two manifests
pub struct ManifestDiff {
    /// In the new manifest only
    pub added: BTreeSet<String>,
    /// In the old manifest only
    pub removed: BTreeSet<String>,
}

impl ManifestDiff {
    /// rsIDs of `new` missing from `old` and vice versa
    pub fn between(old: &Manifest, new: &Manifest) -> Self {
        let old_ids = old.rsids();
        let new_ids = new.rsids();
        Self {
            added: new_ids.difference(&old_ids).map(|s| s.to_string()).collect(),
            removed: old_ids.difference(&new_ids).map(|s| s.to_string()).collect(),
        }
    }

    /// No additions and no removals
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(category: Category, genotype: &str) -> ManifestEntry {
        ManifestEntry {
            gene: "GENE".to_string(),
            category,
            chromosome: "1".to_string(),
            position: 10,
            genotype: genotype.to_string(),
            zygosity: Some(Zygosity::Heterozygous),
        }
    }

    fn manifest(rsids: &[&str]) -> Manifest {
        Manifest {
            generated_at: "2025-01-01T00:00:00+00:00".to_string(),
            total_variants: rsids.len(),
            variants: BTreeMap::new(),
            variant_details: rsids
                .iter()
                .map(|rsid| (rsid.to_string(), entry(Category::Clinical, "0/1")))
                .collect(),
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn json_round_trip() {
        let mut original = manifest(&["rs1", "rs2"]);
        original
            .variant_details
            .insert("rs3".to_string(), entry(Category::Trait, "1|1"));
        original.total_variants = 3;
        let parsed = Manifest::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.rsids(), original.rsids());
    }

    #[test]
    fn diff_against_itself_is_empty() {
        let m = manifest(&["rs1", "rs2"]);
        assert!(ManifestDiff::between(&m, &m).is_empty());
    }

    #[test]
    fn diff_added_and_removed() {
        let old = manifest(&["rsx", "rsy"]);
        let new = manifest(&["rsy", "rsz"]);
        let diff = ManifestDiff::between(&old, &new);
        assert_eq!(diff.added, set(&["rsz"]));
        assert_eq!(diff.removed, set(&["rsx"]));
    }

    #[test]
    fn extracts_embedded_manifest() {
        let m = manifest(&["rs1"]);
        let html = format!(
            "<html><body>\n<script type=\"application/json\" id=\"{}\">\n{}\n</script>\n</body></html>",
            MANIFEST_SCRIPT_ID,
            m.to_embedded_json().unwrap()
        );
        assert_eq!(Manifest::from_html(&html).unwrap(), Some(m));
        assert_eq!(Manifest::from_html("<html></html>").unwrap(), None);
    }

    #[test]
    fn reads_legacy_field_names() {
        let json = r#"{
            "generated": "2025-12-31T10:00:00.123456",
            "total_variants": 1,
            "variants": {"pharmacogenomic": [], "clinical": [], "traits": ["rs12913832"]},
            "variant_details": {
                "rs12913832": {"category": "traits", "gene": "HERC2", "chr": "chr15",
                    "pos": 28120472, "genotype": "0/1", "is_het": true, "is_hom": false}
            }
        }"#;
        let m = Manifest::from_json(json).unwrap();
        assert_eq!(m.generated_at, "2025-12-31T10:00:00.123456");
        let entry = &m.variant_details["rs12913832"];
        assert_eq!(entry.category, Category::Trait);
        assert_eq!(entry.chromosome, "chr15");
        assert_eq!(entry.position, 28120472);
        assert_eq!(entry.zygosity, None);
        assert_eq!(m.variants[&Category::Trait], vec!["rs12913832"]);
    }

    #[test]
    fn timestamp_format() {
        let at = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let m = Manifest::from_matches(&[], at);
        assert!(m.generated_at.starts_with("2025-03-04T05:06:07"));
        assert_eq!(m.total_variants, 0);
        assert_eq!(m.variants.len(), 3);
    }
}
