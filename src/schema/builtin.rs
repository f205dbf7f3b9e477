//! Built-in BIDS ASL sidecar fields
//!
//! The default registry used when no registry file is configured. Covers the
//! bookkeeping columns produced by ingestion and the ASL sidecar fields a
//! user typically adds or corrects by hand.

use crate::core::GridResult;

use super::registry::{FieldRegistry, ID_FIELD};
use super::types::{EnumOption, FieldDescriptor};

/// Misc field holding the sidecar file path.
pub const FILE_FIELD: &str = "File";

/// Misc field holding the sidecar file basename.
pub const BASENAME_FIELD: &str = "Basename";

fn misc_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::misc(ID_FIELD).described("Row identifier"),
        FieldDescriptor::misc(FILE_FIELD).described("Path of the source sidecar"),
        FieldDescriptor::misc(BASENAME_FIELD).described("Basename of the source sidecar"),
    ]
}

fn text_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::text("Manufacturer", true, ""),
        FieldDescriptor::text("ManufacturersModelName", false, ""),
        FieldDescriptor::text("PulseSequenceDetails", false, ""),
        FieldDescriptor::text("LabelingLocationDescription", false, ""),
    ]
}

fn enum_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::enumeration(
            "ArterialSpinLabelingType",
            vec![
                EnumOption::new("PCASL", "Pseudo-Continuous ASL"),
                EnumOption::new("CASL", "Continuous ASL"),
                EnumOption::new("PASL", "Pulsed ASL"),
            ],
            "PCASL",
        ),
        FieldDescriptor::enumeration(
            "M0Type",
            vec![
                EnumOption::new("Separate", "Separate M0 scan"),
                EnumOption::new("Included", "M0 included in the ASL series"),
                EnumOption::new("Estimate", "Single estimated M0 value"),
                EnumOption::new("Absent", "No M0"),
            ],
            "Separate",
        ),
        FieldDescriptor::enumeration(
            "MRAcquisitionType",
            vec![EnumOption::plain("2D"), EnumOption::plain("3D")],
            "3D",
        ),
        FieldDescriptor::enumeration(
            "PulseSequenceType",
            vec![
                EnumOption::new("2D_EPI", "2D EPI"),
                EnumOption::new("3D_GRASE", "3D GRASE"),
                EnumOption::new("3D_spiral", "3D Spiral"),
            ],
            "3D_spiral",
        ),
    ]
}

fn numerical_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::numerical("MagneticFieldStrength", Some(0.5), Some(14.0), Some(0.5), 3.0),
        FieldDescriptor::numerical("PostLabelingDelay", Some(0.0), Some(10.0), None, 1.8),
        FieldDescriptor::numerical("LabelingDuration", Some(0.0), Some(10.0), None, 1.8),
        FieldDescriptor::numerical("BolusCutOffDelayTime", Some(0.0), Some(10.0), None, 0.0),
        FieldDescriptor::numerical("EchoTime", Some(0.0), Some(1.0), None, 0.01),
        FieldDescriptor::numerical("RepetitionTimePreparation", Some(0.0), Some(30.0), None, 4.0),
        FieldDescriptor::numerical("FlipAngle", Some(0.0), Some(180.0), None, 90.0),
        FieldDescriptor::numerical("M0Estimate", Some(1.0), Some(1.0e10), None, 1.0),
        FieldDescriptor::numerical(
            "BackgroundSuppressionNumberPulses",
            Some(0.0),
            Some(10.0),
            Some(1.0),
            0.0,
        ),
    ]
}

fn boolean_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::boolean("BackgroundSuppression", false),
        FieldDescriptor::boolean("BolusCutOffFlag", false),
        FieldDescriptor::boolean("VascularCrushing", false),
        FieldDescriptor::boolean("SkullStripped", false),
    ]
}

impl FieldRegistry {
    /// The built-in BIDS ASL registry.
    pub fn bids_default() -> GridResult<Self> {
        let mut fields = misc_fields();
        fields.extend(text_fields());
        fields.extend(enum_fields());
        fields.extend(numerical_fields());
        fields.extend(boolean_fields());
        Self::new(fields)
    }
}
