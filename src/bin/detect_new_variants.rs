#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]

//! Reports variants added or removed since the previous analysis run.

use genoreport::{cli::DetectNewVariants, detect, Result};
use structopt::StructOpt;

fn main() -> Result<()> {
    let opt = DetectNewVariants::from_args();
    opt.set_logging();

    let comparison = detect::compare(opt.dir(), opt.output_name())?;
    print!("{}", detect::render_summary(&comparison));

    if let Some(target) = &opt.append_to {
        let db = opt.database()?;
        let appended = detect::append_new_variants(&comparison, &db, target)?;
        if !appended.inserted.is_empty() {
            println!(
                "Appended {} entries to {}: {}",
                appended.inserted.len(),
                target.display(),
                appended.inserted.join(", ")
            );
        }
        if !appended.skipped.is_empty() {
            println!(
                "Already present in {}: {}",
                target.display(),
                appended.skipped.join(", ")
            );
        }
    }
    Ok(())
}
