use std::str::FromStr;

use super::*;

fn parse(path: &str) -> ImageMetadata {
    ImageMetadata::from_path(Path::new(path), &Acquisition::default())
}

#[test]
fn test_stitched_image_in_mutant_folder() {
    let meta = parse("istl_mutant_elongation_zone/h2b-istl345_seedling3_elong.tif");

    assert_eq!(meta.region, Region::Elongation);
    assert_eq!(meta.genotype, Genotype::Mutant);
    assert_eq!(meta.seedling, Some(3));
    assert_eq!(meta.zslice, None);
    assert!(meta.is_projection());
    assert_eq!(meta.channel, UNKNOWN_CHANNEL);
}

#[test]
fn test_individual_zslice_with_channel() {
    let meta = parse(
        "Individual images/control_elongation_zone/h2b-istl345_seedling12_elong_z16c1.tif",
    );

    assert_eq!(meta.region, Region::Elongation);
    assert_eq!(meta.genotype, Genotype::Control);
    assert_eq!(meta.seedling, Some(12));
    assert_eq!(meta.zslice, Some(16));
    assert_eq!(meta.channel, "c1");
    assert!(!meta.is_projection());
}

#[test]
fn test_case_insensitive_matching_across_components() {
    let meta = parse("/data/Meristem/Control_Batch2/H2B_Seedling7_Z3C2.TIFF");

    assert_eq!(meta.region, Region::Meristem);
    assert_eq!(meta.genotype, Genotype::Control);
    assert_eq!(meta.seedling, Some(7));
    assert_eq!(meta.zslice, Some(3));
    assert_eq!(meta.channel, "c2");

    let no_underscore = parse("control/seedling7z3.tif");
    assert_eq!(no_underscore.zslice, None, "z-slice needs a leading underscore");
}

#[test]
fn test_preference_order_when_both_keywords_present() {
    // "control" is preferred over "mutant", "meristem" over "elongation"
    let meta = parse("istl_mutant/control_elongation_vs_meristem/seedling1.tif");

    assert_eq!(meta.genotype, Genotype::Control);
    assert_eq!(meta.region, Region::Meristem);
}

#[test]
fn test_missing_fields_degrade_to_unknown() {
    let meta = parse("scans/plate_04.tif");

    assert_eq!(meta.region, Region::Unknown);
    assert_eq!(meta.genotype, Genotype::Unknown);
    assert_eq!(meta.seedling, None);
    assert_eq!(meta.zslice, None);
    assert_eq!(meta.channel, UNKNOWN_CHANNEL);
}

#[test]
fn test_first_digit_run_wins() {
    let meta = parse("mutant/seedling4_seedling9_z02_z07.tif");

    assert_eq!(meta.seedling, Some(4));
    assert_eq!(meta.zslice, Some(2));
}

#[test]
fn test_channel_must_end_the_stem() {
    assert_eq!(parse("a/seedling1_c2_elong.tif").channel, UNKNOWN_CHANNEL);
    assert_eq!(parse("a/seedling1_c2c3.tif").channel, "c3");
    assert_eq!(parse("a/seedling1_c15.tiff").channel, "c15");
}

#[test]
fn test_acquisition_constants_are_copied() {
    let acquisition = Acquisition {
        magnification: "63x".to_string(),
        fluorophore: "GFP".to_string(),
    };
    let meta = ImageMetadata::from_path(Path::new("x.tif"), &acquisition);

    assert_eq!(meta.magnification, "63x");
    assert_eq!(meta.fluorophore, "GFP");

    let default_meta = parse("x.tif");
    assert_eq!(default_meta.magnification, "40x");
    assert_eq!(default_meta.fluorophore, "mCherry-H2B");
}

#[test]
fn test_category_names_round_trip_through_strings() {
    assert_eq!(Region::Elongation.to_string(), "elongation");
    assert_eq!(Genotype::Unknown.as_ref(), "unknown");
    assert_eq!(Region::from_str("Meristem").unwrap(), Region::Meristem);
    assert_eq!(Genotype::from_str("MUTANT").unwrap(), Genotype::Mutant);
    assert!(Genotype::from_str("wildtype").is_err());
}
