//! Basic example of a genus-level summary.
//!
//! This example shows how to:
//! 1. Build a raw abundance table and metadata in memory
//! 2. Resolve lineages and aggregate at one rank
//! 3. Summarize per treatment group and keep the top taxa
//! 4. Examine the tidy output

use taxon_summary::prelude::*;

fn main() -> Result<()> {
    println!("=== Taxon Summary Example ===\n");

    let (raw, metadata) = create_example_data()?;
    println!("Input:");
    println!("  Lineage rows: {}", raw.n_rows());
    println!("  Samples:      {}", raw.n_samples());
    println!();

    // Resolution on its own
    println!("=== Lineage Resolution (genus) ===\n");
    let resolver = LineageResolver::new(Rank::Genus)?;
    let (labels, serial) = resolver.resolve_all(raw.lineages());
    for (lineage, label) in raw.lineages().zip(&labels) {
        println!("  {:<70} -> {}", lineage.unwrap_or("<none>"), label);
    }
    println!("  {} placeholder(s) issued", serial.issued());
    println!();

    // Full pipeline
    println!("=== Grouped Summary ===\n");
    let output = Pipeline::new()
        .name("example")
        .rank("genus")
        .group_by("Treatment")
        .top_taxa(3)
        .run(&raw, &metadata)?;

    if output.coercion.has_warnings() {
        println!("Note: {}", output.coercion);
        println!();
    }

    let m = &output.collapsed.matrix;
    print!("{:<50}", "Taxon");
    for group in m.groups() {
        print!("{:>12}", group);
    }
    println!();
    for (i, taxon) in m.taxa().iter().enumerate() {
        print!("{:<50}", taxon);
        for value in m.row(i) {
            print!("{:>12.2}", value);
        }
        println!();
    }
    println!();

    println!("Ranking by mean abundance:");
    for (taxon, avg) in &output.collapsed.row_averages {
        println!("  {:<50} {:>8.2}", taxon, avg);
    }
    println!();

    println!("Chart: {}", output.tidy.title);
    println!("  legend: {}", output.tidy.legend_title);
    println!("  x: {}  y: {}", output.tidy.attribute, output.tidy.y_label);
    println!("  {} records", output.tidy.len());

    Ok(())
}

fn create_example_data() -> Result<(RawAbundanceTable, Metadata)> {
    let abundance = "\
#OTU ID\tS1\tS2\tS3\tS4\tS5\tS6
d__Bacteria;p__Firmicutes;c__Bacilli;o__Lactobacillales;f__Lactobacillaceae;g__Lactobacillus\t120\t95\t140\t20\t35\t15
d__Bacteria;p__Bacteroidota;c__Bacteroidia;o__Bacteroidales;f__Bacteroidaceae;g__Bacteroides\t60\t80\t40\t150\t170\t130
d__Bacteria;p__Firmicutes;c__Clostridia;o__Lachnospirales;f__Lachnospiraceae;g__\t30\t25\t35\t40\t30\t45
d__Bacteria;p__Firmicutes;c__Clostridia;o__Oscillospirales;f__Ruminococcaceae;g__Faecalibacterium\t25\t30\t20\t35\t20\t40
d__Bacteria;p__Proteobacteria;c__Gammaproteobacteria\t10\t5\t15\t10\t#VALUE!\t5
Unassigned\t5\t0\t0\t5\t5\t0
";
    let raw = RawAbundanceTable::from_reader(
        abundance.as_bytes(),
        b'\t',
        TableOrientation::TaxaBySamples,
        &[],
    )?;

    let metadata = "\
sample-id\tTreatment\tDay
S1\tControl\t0
S2\tControl\t7
S3\tControl\t14
S4\tAntibiotic\t0
S5\tAntibiotic\t7
S6\tAntibiotic\t14
";
    let metadata = Metadata::from_reader(metadata.as_bytes(), b'\t')?;

    Ok((raw, metadata))
}
