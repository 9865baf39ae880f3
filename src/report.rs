//! HTML rendering of the matched variants.
//!
//! Every category section is delimited by `<!-- section:<category>:start -->` and
//! `<!-- section:<category>:end -->` markers and every entry carries a `data-rsid`
//! attribute. Incremental updates rely on both: new entries are inserted right before the end
//! marker of their section and entries already present are never touched.

use crate::{
    analysis::VariantMatch,
    database::{Category, Importance},
    error::Error,
    genotype::Zygosity,
    manifest::{Manifest, MANIFEST_SCRIPT_ID},
    Result,
};
use std::{borrow::Cow, collections::BTreeMap};

/// Trait group used for traits without one
pub const DEFAULT_GROUP: &str = "Other";

const STYLE: &str = r#"    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Arial, sans-serif; max-width: 1400px; margin: 20px auto; padding: 20px; background: #f5f7fa; color: #2c3e50; }
        .container { background: white; padding: 40px; border-radius: 15px; box-shadow: 0 4px 20px rgba(0,0,0,0.1); }
        h1 { font-size: 42px; border-bottom: 4px solid #3498db; padding-bottom: 15px; }
        h2 { font-size: 32px; margin-top: 50px; border-bottom: 3px solid #ecf0f1; padding-bottom: 10px; }
        .summary { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; border-radius: 15px; margin: 30px 0; }
        .count { background: rgba(255,255,255,0.2); padding: 10px 20px; border-radius: 25px; display: inline-block; margin: 10px 10px 0 0; font-size: 24px; font-weight: bold; }
        .variant { border: 2px solid #e0e0e0; border-left: 6px solid #3498db; padding: 25px; margin: 25px 0; border-radius: 10px; }
        .critical { border-left-color: #e74c3c; background: #fef5f5; }
        .high { border-left-color: #f39c12; background: #fffbf0; }
        .positive { border-left-color: #27ae60; background: #eafaf1; }
        .reference { border-left-color: #95a5a6; }
        .gene { font-size: 28px; font-weight: bold; }
        .star { font-size: 18px; color: #7f8c8d; margin-left: 10px; }
        .rsid { color: #7f8c8d; font-family: 'Courier New', monospace; font-size: 16px; }
        .genotype { background: #34495e; color: white; padding: 8px 16px; border-radius: 6px; font-family: 'Courier New', monospace; font-size: 20px; display: inline-block; margin: 15px 0; }
        .het { background: #f39c12; }
        .hom { background: #e74c3c; }
        .ref { background: #95a5a6; }
        .meaning { background: #fff9e6; border: 2px solid #ffd700; padding: 20px; margin: 15px 0; border-radius: 8px; font-size: 18px; line-height: 1.8; }
        .action { background: #fff3cd; border: 3px solid #ffc107; padding: 20px; margin: 15px 0; border-radius: 8px; }
        .note { color: #7f8c8d; font-style: italic; margin-top: 12px; }
        .citations { font-size: 14px; color: #7f8c8d; }
        .category-header { background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%); color: white; padding: 15px 25px; border-radius: 10px; display: inline-block; margin: 35px 0 20px 0; font-size: 24px; font-weight: bold; }
        .disclaimer { background: #fff3cd; border: 3px solid #ffc107; padding: 30px; border-radius: 10px; margin: 30px 0; }
        .empty { text-align: center; padding: 40px; color: #7f8c8d; font-size: 18px; }
    </style>
"#;

#[derive(Debug, Clone)]
/// Rendering switches
pub struct RenderOptions {
    /// Embed the manifest as `<script type="application/json">`
    pub embed_manifest: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            embed_manifest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Outcome of an append-only update
pub struct Appended {
    /// The updated document
    pub document: String,
    /// rsIDs newly inserted
    pub inserted: Vec<String>,
    /// rsIDs already present and left untouched
    pub skipped: Vec<String>,
}

/// Escapes text for use in HTML element content and attribute values
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Opening marker of a category section
pub fn section_start(category: Category) -> String {
    format!("<!-- section:{}:start -->", category.as_str())
}

/// Closing marker of a category section
pub fn section_end(category: Category) -> String {
    format!("<!-- section:{}:end -->", category.as_str())
}

fn rsid_attribute(rsid: &str) -> String {
    format!("data-rsid=\"{}\"", escape(rsid))
}

fn empty_placeholder(category: Category) -> String {
    let text = match category {
        Category::Pharmacogenomic => "No pharmacogenomic variants found",
        Category::Clinical => "No clinical variants found",
        Category::Trait => "No trait variants found",
    };
    format!("        <p class=\"empty\">{}</p>\n", text)
}

fn card_class(m: &VariantMatch<'_>) -> &'static str {
    if !m.zygosity.is_carrier() {
        return "reference";
    }
    match m.category() {
        Category::Pharmacogenomic => match m.definition.importance {
            Importance::Critical => "critical",
            Importance::High => "high",
            Importance::Medium => "",
        },
        Category::Clinical if m.definition.is_protective() => "positive",
        Category::Clinical if m.zygosity == Zygosity::HomozygousAlternate => "high",
        _ => "",
    }
}

/// Renders a single entry
pub fn render_card(m: &VariantMatch<'_>) -> String {
    let def = m.definition;
    let mut card = String::new();

    let class = match card_class(m) {
        "" => "variant".to_string(),
        extra => format!("variant {}", extra),
    };
    card.push_str(&format!(
        "        <div class=\"{}\" {}>\n",
        class,
        rsid_attribute(&def.rsid)
    ));

    let star = match &def.star {
        Some(star) => format!("<span class=\"star\">{}</span>", escape(star)),
        None => String::new(),
    };
    card.push_str(&format!(
        "            <div class=\"gene\">{}{}</div>\n",
        escape(&def.gene),
        star
    ));
    card.push_str(&format!(
        "            <div class=\"rsid\">{} | {}:{}</div>\n",
        escape(&def.rsid),
        escape(&m.chrom),
        m.pos
    ));
    card.push_str(&format!(
        "            <div class=\"genotype {}\">YOUR GENOTYPE: {} ({})</div>\n",
        m.zygosity.short(),
        escape(&m.genotype),
        m.zygosity
    ));
    card.push_str(&format!(
        "            <div class=\"subject\"><strong>{}:</strong> {}</div>\n",
        m.category().subject_label(),
        escape(&def.subject)
    ));
    if let Some(variant) = &def.variant {
        card.push_str(&format!(
            "            <div class=\"subject\"><strong>Variant:</strong> {}</div>\n",
            escape(variant)
        ));
    }
    card.push_str(&format!(
        "            <div class=\"meaning\"><div class=\"meaning-title\">What this means for you:</div>{}</div>\n",
        escape(m.interpretation())
    ));
    if m.zygosity.is_carrier() {
        if let Some(action) = &def.action {
            card.push_str(&format!(
                "            <div class=\"action\"><strong>Action:</strong> {}</div>\n",
                escape(action)
            ));
        }
    }
    if let Some(note) = &def.note {
        card.push_str(&format!(
            "            <div class=\"note\">{}</div>\n",
            escape(note)
        ));
    }
    if !def.citations.is_empty() {
        card.push_str("            <ul class=\"citations\">\n");
        for citation in &def.citations {
            let citation = escape(citation);
            card.push_str(&format!(
                "                <li><a href=\"{0}\">{0}</a></li>\n",
                citation
            ));
        }
        card.push_str("            </ul>\n");
    }
    card.push_str("        </div>\n");
    card
}

fn render_section(html: &mut String, category: Category, matches: &[&VariantMatch<'_>]) {
    html.push_str(&format!(
        "\n        <h2 id=\"{}\">{}</h2>\n",
        category.as_str(),
        category.title()
    ));
    html.push_str(&format!("        {}\n", section_start(category)));

    if matches.is_empty() {
        html.push_str(&empty_placeholder(category));
    } else if category == Category::Trait {
        let mut groups = BTreeMap::<&str, Vec<&VariantMatch<'_>>>::new();
        for m in matches {
            let group = m.definition.group.as_deref().unwrap_or(DEFAULT_GROUP);
            groups.entry(group).or_default().push(*m);
        }
        for (group, members) in groups {
            html.push_str(&format!(
                "        <div class=\"category-header\">{}</div>\n",
                escape(group)
            ));
            for m in members {
                html.push_str(&render_card(m));
            }
        }
    } else {
        for m in matches {
            html.push_str(&render_card(m));
        }
    }

    html.push_str(&format!("        {}\n", section_end(category)));
}

/// Renders the full report. Pharmacogenomic entries are ordered by importance, traits are
/// grouped by trait group, everything else keeps input order.
pub fn render(matches: &[VariantMatch<'_>], manifest: &Manifest, options: &RenderOptions) -> Result<String> {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"UTF-8\">\n");
    html.push_str("    <title>Genome Variant Report</title>\n");
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n    <div class=\"container\">\n");
    html.push_str("        <h1>Genome Variant Report</h1>\n");
    html.push_str(
        "        <div class=\"disclaimer\"><strong>Disclaimer:</strong> This report is for \
         educational purposes only and is NOT medical advice. Always consult healthcare \
         providers before making medical decisions.</div>\n",
    );

    let counts = Category::ALL
        .iter()
        .map(|&category| {
            let n = matches.iter().filter(|m| m.category() == category).count();
            (category, n)
        })
        .collect::<Vec<_>>();
    html.push_str("        <div class=\"summary\">\n");
    for (category, n) in &counts {
        html.push_str(&format!(
            "            <div class=\"count\">{} {}</div>\n",
            n,
            category.title()
        ));
    }
    html.push_str("        </div>\n");

    for &category in Category::ALL.iter() {
        let mut members = matches
            .iter()
            .filter(|m| m.category() == category)
            .collect::<Vec<_>>();
        if category == Category::Pharmacogenomic {
            members.sort_by(|a, b| b.definition.importance.cmp(&a.definition.importance));
        }
        render_section(&mut html, category, &members);
    }

    html.push_str("\n        <div class=\"footer\">\n            <ul>\n");
    html.push_str("                <li><strong>0/1</strong> or <strong>1/0</strong> = heterozygous (one copy)</li>\n");
    html.push_str("                <li><strong>1/1</strong> = homozygous alternate (two copies)</li>\n");
    html.push_str("                <li><strong>0/0</strong> = homozygous reference (no copies)</li>\n");
    html.push_str("            </ul>\n");
    html.push_str(&format!(
        "            <p><strong>Generated:</strong> {}<br>\n            <strong>Variants found:</strong> {}</p>\n",
        escape(&manifest.generated_at),
        manifest.total_variants
    ));
    html.push_str("        </div>\n    </div>\n");

    if options.embed_manifest {
        html.push_str(&format!(
            "\n<!-- GENOME ANALYSIS MANIFEST (for incremental updates) -->\n\
             <script type=\"application/json\" id=\"{}\">\n{}\n</script>\n",
            MANIFEST_SCRIPT_ID,
            manifest.to_embedded_json()?
        ));
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

/// Inserts entries whose rsID is not yet in `document` at the end of their category section.
/// Everything already in the document is kept unchanged, apart from the empty-section
/// placeholder of a section that receives its first entry.
pub fn append_entries(document: &str, matches: &[VariantMatch<'_>]) -> Result<Appended> {
    let mut document = document.to_string();
    let mut inserted = Vec::new();
    let mut skipped = Vec::new();

    for m in matches {
        if document.contains(&rsid_attribute(m.rsid())) {
            skipped.push(m.rsid().to_string());
            continue;
        }

        let category = m.category();
        let missing = || Error::MissingSection(category.as_str().to_string());
        let start = document.find(&section_start(category)).ok_or_else(missing)?;
        let end = document[start..]
            .find(&section_end(category))
            .map(|offset| start + offset)
            .ok_or_else(missing)?;

        let placeholder = empty_placeholder(category);
        let end = match document[start..end].find(&placeholder) {
            Some(offset) => {
                let at = start + offset;
                document.replace_range(at..at + placeholder.len(), "");
                end - placeholder.len()
            }
            None => end,
        };

        // own line for the card, before the marker's indentation or right before the marker
        // when it shares its line with other markup
        let line_start = document[..end].rfind('\n').map_or(0, |i| i + 1);
        if document[line_start..end].trim().is_empty() {
            document.insert_str(line_start, &render_card(m));
        } else {
            document.insert_str(end, &format!("\n{}", render_card(m)));
        }
        inserted.push(m.rsid().to_string());
    }

    Ok(Appended {
        document,
        inserted,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{VariantDatabase, VariantDefinition};
    use chrono::Local;

    fn observed<'db>(db: &'db VariantDatabase, rsid: &str, genotype: &str, zygosity: Zygosity) -> VariantMatch<'db> {
        let definition: &VariantDefinition = db.get(rsid).unwrap();
        VariantMatch {
            definition,
            chrom: "chr1".to_string(),
            pos: 100,
            genotype: genotype.to_string(),
            zygosity,
        }
    }

    fn rendered(matches: &[VariantMatch<'_>]) -> String {
        let manifest = Manifest::from_matches(matches, Local::now());
        render(matches, &manifest, &RenderOptions::default()).unwrap()
    }

    #[test]
    fn escapes_html() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("<1% & \"x\" 'y'"), "&lt;1% &amp; &quot;x&quot; &#39;y&#39;");
    }

    #[test]
    fn renders_entries_in_sections() {
        let db = VariantDatabase::builtin().unwrap();
        let matches = vec![
            observed(&db, "rs12248560", "0/1", Zygosity::Heterozygous),
            observed(&db, "rs1800460", "1/1", Zygosity::HomozygousAlternate),
            observed(&db, "rs12913832", "0/1", Zygosity::Heterozygous),
        ];
        let html = rendered(&matches);

        assert_eq!(html.matches("data-rsid=").count(), 3);
        let critical = html.find("data-rsid=\"rs1800460\"").unwrap();
        let medium = html.find("data-rsid=\"rs12248560\"").unwrap();
        assert!(critical < medium);
        assert!(html.contains("class=\"variant critical\""));
        assert!(html.contains(&escape(&db.get("rs1800460").unwrap().if_hom_alt).into_owned()));
        assert!(html.contains("<div class=\"category-header\">Appearance</div>"));
        assert!(html.contains("No clinical variants found"));
        assert!(html.contains(&format!("id=\"{}\"", MANIFEST_SCRIPT_ID)));

        let manifest = Manifest::from_html(&html).unwrap().unwrap();
        assert_eq!(manifest.total_variants, 3);
    }

    #[test]
    fn manifest_can_be_left_out() {
        let manifest = Manifest::from_matches(&[], Local::now());
        let options = RenderOptions {
            embed_manifest: false,
        };
        let html = render(&[], &manifest, &options).unwrap();
        assert_eq!(Manifest::from_html(&html).unwrap(), None);
        for category in Category::ALL.iter() {
            assert!(html.contains(&section_end(*category)));
        }
    }

    #[test]
    fn reference_calls_are_marked() {
        let db = VariantDatabase::builtin().unwrap();
        let m = observed(&db, "rs1801133", "0/0", Zygosity::HomozygousReference);
        let card = render_card(&m);
        assert!(card.contains("class=\"variant reference\""));
        assert!(card.contains("homozygous reference"));
        assert!(!card.contains("class=\"action\""));
    }

    #[test]
    fn append_keeps_existing_entries() {
        let db = VariantDatabase::builtin().unwrap();
        let first = vec![observed(&db, "rs4244285", "0/1", Zygosity::Heterozygous)];
        let mut document = rendered(&first);
        // authored enrichment that must survive the update
        document = document.replacen(
            "What this means for you:",
            "What this means for you (expanded with literature):",
            1,
        );
        let before_end = document.find(&section_end(Category::Pharmacogenomic)).unwrap();
        let existing_block = document[..before_end].to_string();

        let update = vec![
            observed(&db, "rs4244285", "1/1", Zygosity::HomozygousAlternate),
            observed(&db, "rs1801133", "0/1", Zygosity::Heterozygous),
            observed(&db, "rs9923231", "0/1", Zygosity::Heterozygous),
        ];
        let appended = append_entries(&document, &update).unwrap();

        assert_eq!(appended.skipped, vec!["rs4244285"]);
        assert_eq!(appended.inserted, vec!["rs1801133", "rs9923231"]);
        assert!(appended.document.starts_with(existing_block.trim_end_matches(' ')));
        assert!(appended.document.contains("expanded with literature"));
        assert_eq!(appended.document.matches("data-rsid=\"rs4244285\"").count(), 1);
        assert!(!appended.document.contains("No clinical variants found"));

        let clinical_start = appended.document.find(&section_start(Category::Clinical)).unwrap();
        let clinical_end = appended.document.find(&section_end(Category::Clinical)).unwrap();
        let clinical = &appended.document[clinical_start..clinical_end];
        assert!(clinical.contains("data-rsid=\"rs1801133\""));

        let again = append_entries(&appended.document, &update).unwrap();
        assert!(again.inserted.is_empty());
        assert_eq!(again.document, appended.document);
    }

    #[test]
    fn append_after_markup_sharing_the_marker_line() {
        let db = VariantDatabase::builtin().unwrap();
        let document = format!(
            "<div class=\"curated\">\n{}\n<div class=\"note\">kept</div>{}\n</div>\n",
            section_start(Category::Clinical),
            section_end(Category::Clinical)
        );
        let update = vec![observed(&db, "rs1801133", "0/1", Zygosity::Heterozygous)];
        let appended = append_entries(&document, &update).unwrap();

        let kept = "<div class=\"note\">kept</div>\n";
        let note = appended.document.find(kept).unwrap();
        let card = appended.document.find("data-rsid=\"rs1801133\"").unwrap();
        let end = appended.document.find(&section_end(Category::Clinical)).unwrap();
        assert!(note + kept.len() <= card);
        assert!(card < end);
        assert_eq!(
            appended.document.replace(&render_card(&update[0]), ""),
            document.replace(
                &format!("</div>{}", section_end(Category::Clinical)),
                &format!("</div>\n{}", section_end(Category::Clinical))
            )
        );
    }

    #[test]
    fn append_requires_sections() {
        let db = VariantDatabase::builtin().unwrap();
        let update = vec![observed(&db, "rs1801133", "0/1", Zygosity::Heterozygous)];
        assert!(matches!(
            append_entries("<html></html>", &update),
            Err(Error::MissingSection(_))
        ));
    }
}
