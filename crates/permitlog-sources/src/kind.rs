//! Per-department source definitions.
//!
//! Every source is a static table: which raw columns map to which canonical
//! field names, how the foreign key is derived, which fields are computed, and
//! how the resolver should read the resulting records.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SourceLoadError;

// ─── Source kinds ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
  /// Planning department project tracking.
  Ppts,
  /// Building department permit tracking.
  Pts,
  /// Temporary certificates of occupancy.
  Tco,
  MohcdPipeline,
  MohcdInclusionary,
  /// Affordable rental portfolio.
  Bmr,
  /// One summary record per permit, aggregated from permit addenda rows.
  PermitAddendaSummary,
}

impl SourceKind {
  pub const ALL: [SourceKind; 7] = [
    Self::Ppts,
    Self::Pts,
    Self::Tco,
    Self::MohcdPipeline,
    Self::MohcdInclusionary,
    Self::Bmr,
    Self::PermitAddendaSummary,
  ];

  /// Source tag written to the fact log; also the foreign-key prefix.
  pub fn name(&self) -> &'static str {
    match self {
      Self::Ppts => "ppts",
      Self::Pts => "pts",
      Self::Tco => "tco",
      Self::MohcdPipeline => "mohcd_pipeline",
      Self::MohcdInclusionary => "mohcd_inclusionary",
      Self::Bmr => "bmr",
      Self::PermitAddendaSummary => "permit_addenda_summary",
    }
  }

  pub(crate) fn layout(&self) -> Layout {
    match self {
      Self::Ppts => Layout::Direct(&PPTS),
      Self::Pts => Layout::Direct(&PTS),
      Self::Tco => Layout::Direct(&TCO),
      Self::MohcdPipeline => Layout::Direct(&MOHCD_PIPELINE),
      Self::MohcdInclusionary => Layout::Direct(&MOHCD_INCLUSIONARY),
      Self::Bmr => Layout::Direct(&BMR),
      Self::PermitAddendaSummary => Layout::AddendaSummary,
    }
  }

  /// How the resolver interprets this source's records.
  pub fn profile(&self) -> &'static SourceProfile {
    match self {
      Self::Ppts => &PPTS_PROFILE,
      Self::Pts => &PTS_PROFILE,
      Self::Tco => &TCO_PROFILE,
      Self::MohcdPipeline | Self::MohcdInclusionary => &MOHCD_PROFILE,
      Self::Bmr => &BMR_PROFILE,
      Self::PermitAddendaSummary => &ADDENDA_PROFILE,
    }
  }
}

impl fmt::Display for SourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for SourceKind {
  type Err = SourceLoadError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|k| k.name() == s)
      .ok_or_else(|| SourceLoadError::UnknownSource(s.to_string()))
  }
}

// ─── Adapter layout ──────────────────────────────────────────────────────────

pub(crate) enum Layout {
  /// Each input row is one record; columns map directly to fields.
  Direct(&'static DirectLayout),
  /// Rows are aggregated per permit number.
  AddendaSummary,
}

/// One component of a foreign key.
pub(crate) enum KeyPart {
  /// A canonical field, used verbatim.
  Field(&'static str),
  /// A canonical date field parsed with `format` and rendered as ISO-8601.
  Date {
    field:  &'static str,
    format: &'static str,
  },
}

impl KeyPart {
  pub(crate) fn field(&self) -> &'static str {
    match self {
      Self::Field(f) | Self::Date { field: f, .. } => f,
    }
  }
}

/// A field computed from other canonical fields. Each group is concatenated
/// without separator; groups are joined by single spaces.
pub(crate) struct ComputedField {
  pub name:   &'static str,
  pub groups: &'static [&'static [&'static str]],
}

pub(crate) struct DirectLayout {
  /// Raw column header → canonical field name.
  pub columns:  &'static [(&'static str, &'static str)],
  pub key:      &'static [KeyPart],
  pub computed: &'static [ComputedField],
}

impl DirectLayout {
  /// Raw column name for a canonical field.
  pub(crate) fn raw_column(&self, canonical: &str) -> Option<&'static str> {
    self
      .columns
      .iter()
      .find(|(_, c)| *c == canonical)
      .map(|(raw, _)| *raw)
  }
}

// ─── Resolution profile ──────────────────────────────────────────────────────

/// What a cross-reference field's values name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
  /// The value is the target source's own record id; the foreign key is
  /// `"{source}_{value}"`.
  RecordId(SourceKind),
  /// The value matches `field` of one or more records of the target source.
  FieldValue(SourceKind, &'static str),
}

/// A field whose (comma-separated) values point at records of another
/// source, or of the same one.
#[derive(Debug, Clone, Copy)]
pub struct CrossRef {
  pub field:  &'static str,
  pub target: RefTarget,
}

/// How the resolver reads a source's latest record values.
#[derive(Debug)]
pub struct SourceProfile {
  pub cross_refs:          &'static [CrossRef],
  /// Fields holding project or permit numbers used to corroborate matches.
  pub reference_fields:    &'static [&'static str],
  /// Human project name, if the source has one.
  pub name_field:          Option<&'static str>,
  /// Raw address text for the parcel normalizer.
  pub address_field:       Option<&'static str>,
  /// Assessor block+lot, when the source carries it.
  pub blklot_field:        Option<&'static str>,
  /// Records of this source sharing a parcel and all of these values belong
  /// to one permit group.
  pub permit_group_fields: &'static [&'static str],
}

/// Canonical name of the computed address field.
pub const ADDRESS_FIELD: &str = "address_full";
/// Canonical name of the computed block+lot field.
pub const BLKLOT_FIELD: &str = "blklot";

static PPTS_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[
    CrossRef {
      field:  "parent",
      target: RefTarget::RecordId(SourceKind::Ppts),
    },
    CrossRef {
      field:  "children",
      target: RefTarget::RecordId(SourceKind::Ppts),
    },
    CrossRef {
      field:  "building_permit_number",
      target: RefTarget::FieldValue(SourceKind::Pts, "permit_number"),
    },
  ],
  reference_fields:    &["record_id", "building_permit_number"],
  name_field:          Some("name"),
  address_field:       Some(ADDRESS_FIELD),
  blklot_field:        None,
  permit_group_fields: &[],
};

static PTS_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[],
  reference_fields:    &["permit_number"],
  name_field:          None,
  address_field:       Some(ADDRESS_FIELD),
  blklot_field:        Some(BLKLOT_FIELD),
  permit_group_fields: &["filed_date", "proposed_use"],
};

static TCO_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[CrossRef {
    field:  "building_permit_number",
    target: RefTarget::FieldValue(SourceKind::Pts, "permit_number"),
  }],
  reference_fields:    &["building_permit_number"],
  name_field:          None,
  address_field:       Some(ADDRESS_FIELD),
  blklot_field:        None,
  permit_group_fields: &[],
};

static MOHCD_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[CrossRef {
    field:  "planning_case_number",
    target: RefTarget::RecordId(SourceKind::Ppts),
  }],
  reference_fields:    &["planning_case_number"],
  name_field:          Some("project_name"),
  address_field:       Some(ADDRESS_FIELD),
  blklot_field:        None,
  permit_group_fields: &[],
};

static BMR_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[],
  reference_fields:    &[],
  name_field:          Some("project_name"),
  address_field:       Some(ADDRESS_FIELD),
  blklot_field:        None,
  permit_group_fields: &[],
};

static ADDENDA_PROFILE: SourceProfile = SourceProfile {
  cross_refs:          &[CrossRef {
    field:  "permit_number",
    target: RefTarget::FieldValue(SourceKind::Pts, "permit_number"),
  }],
  reference_fields:    &["permit_number"],
  name_field:          None,
  address_field:       None,
  blklot_field:        None,
  permit_group_fields: &[],
};

// ─── Column maps ─────────────────────────────────────────────────────────────

static PPTS: DirectLayout = DirectLayout {
  columns:  &[
    ("record_id", "record_id"),
    ("record_type", "record_type"),
    ("record_type_category", "record_type_category"),
    ("record_name", "name"),
    ("description", "description"),
    ("parent", "parent"),
    ("children", "children"),
    ("record_status", "status"),
    ("date_opened", "date_opened"),
    ("date_closed", "date_closed"),
    ("address", "address"),
    ("the_geom", "the_geom"),
    ("planner_name", "planner_name"),
    ("planner_email", "planner_email"),
    ("planner_phone", "planner_phone"),
    ("RELATED_BUILDING_PERMIT", "building_permit_number"),
    ("LAND_USE_RESIDENTIAL_EXIST", "residential_sq_ft_existing"),
    ("LAND_USE_RESIDENTIAL_PROP", "residential_sq_ft_proposed"),
    ("LAND_USE_RESIDENTIAL_NET", "residential_sq_ft_net"),
    ("ADU", "is_adu"),
    ("PRJ_FEATURE_AFFORDABLE_EXIST", "affordable_units_existing"),
    ("PRJ_FEATURE_AFFORDABLE_PROP", "affordable_units_proposed"),
    ("PRJ_FEATURE_AFFORDABLE_NET", "affordable_units_net"),
    ("PRJ_FEATURE_MARKET_RATE_EXIST", "market_rate_units_existing"),
    ("PRJ_FEATURE_MARKET_RATE_PROP", "market_rate_units_proposed"),
    ("PRJ_FEATURE_MARKET_RATE_NET", "market_rate_units_net"),
    ("PRJ_FEATURE_PARKING_EXIST", "parking_sq_ft_exist"),
    ("PRJ_FEATURE_PARKING_PROP", "parking_sq_ft_proposed"),
    ("PRJ_FEATURE_PARKING_NET", "parking_sq_ft_net"),
    ("RESIDENTIAL_STUDIO_EXIST", "residential_units_studio_existing"),
    ("RESIDENTIAL_STUDIO_PROP", "residential_units_studio_proposed"),
    ("RESIDENTIAL_STUDIO_NET", "residential_units_studio_net"),
    ("RESIDENTIAL_1BR_EXIST", "residential_units_1br_existing"),
    ("RESIDENTIAL_1BR_PROP", "residential_units_1br_proposed"),
    ("RESIDENTIAL_1BR_NET", "residential_units_1br_net"),
    ("RESIDENTIAL_2BR_EXIST", "residential_units_2br_existing"),
    ("RESIDENTIAL_2BR_PROP", "residential_units_2br_proposed"),
    ("RESIDENTIAL_2BR_NET", "residential_units_2br_net"),
    ("RESIDENTIAL_3BR_EXIST", "residential_units_3br_existing"),
    ("RESIDENTIAL_3BR_PROP", "residential_units_3br_proposed"),
    ("RESIDENTIAL_3BR_NET", "residential_units_3br_net"),
    ("RESIDENTIAL_ADU_STUDIO_EXIST", "residential_units_adu_studio_existing"),
    ("RESIDENTIAL_ADU_STUDIO_PROP", "residential_units_adu_studio_proposed"),
    ("RESIDENTIAL_ADU_STUDIO_NET", "residential_units_adu_studio_net"),
    ("RESIDENTIAL_ADU_STUDIO_AREA", "residential_sq_ft_adu_studio"),
    ("RESIDENTIAL_ADU_1BR_EXIST", "residential_units_adu_1br_existing"),
    ("RESIDENTIAL_ADU_1BR_PROP", "residential_units_adu_1br_proposed"),
    ("RESIDENTIAL_ADU_1BR_NET", "residential_units_adu_1br_net"),
    ("RESIDENTIAL_ADU_1BR_AREA", "residential_sq_ft_adu_1br"),
    ("RESIDENTIAL_ADU_2BR_EXIST", "residential_units_adu_2br_existing"),
    ("RESIDENTIAL_ADU_2BR_PROP", "residential_units_adu_2br_proposed"),
    ("RESIDENTIAL_ADU_2BR_NET", "residential_units_adu_2br_net"),
    ("RESIDENTIAL_ADU_2BR_AREA", "residential_sq_ft_adu_2br"),
    ("RESIDENTIAL_ADU_3BR_EXIST", "residential_units_adu_3br_existing"),
    ("RESIDENTIAL_ADU_3BR_PROP", "residential_units_adu_3br_proposed"),
    ("RESIDENTIAL_ADU_3BR_NET", "residential_units_adu_3br_net"),
    ("RESIDENTIAL_ADU_3BR_AREA", "residential_sq_ft_adu_3br"),
    ("RESIDENTIAL_SRO_EXIST", "residential_units_sro_existing"),
    ("RESIDENTIAL_SRO_PROP", "residential_units_sro_proposed"),
    ("RESIDENTIAL_SRO_NET", "residential_units_sro_net"),
    ("RESIDENTIAL_MICRO_EXIST", "residential_units_micro_existing"),
    ("RESIDENTIAL_MICRO_PROP", "residential_units_micro_proposed"),
    ("RESIDENTIAL_MICRO_NET", "residential_units_micro_net"),
  ],
  key:      &[KeyPart::Field("record_id")],
  computed: &[ComputedField {
    name:   ADDRESS_FIELD,
    groups: &[&["address"]],
  }],
};

static PTS: DirectLayout = DirectLayout {
  columns:  &[
    ("Record ID", "record_id"),
    ("Permit Number", "permit_number"),
    ("Permit Type", "permit_type"),
    ("Permit Type Definition", "permit_type_definition"),
    ("Permit Creation Date", "permit_creation_date"),
    ("Block", "block"),
    ("Lot", "lot"),
    ("Street Number", "street_number"),
    ("Street Number Suffix", "street_number_suffix"),
    ("Street Name", "street_name"),
    ("Street Name Suffix", "street_name_suffix"),
    ("Unit", "unit"),
    ("Unit Suffix", "unit_suffix"),
    ("Zipcode", "zipcode"),
    ("Location", "location"),
    ("Supervisor District", "supervisor_district"),
    ("Current Status", "current_status"),
    ("Current Status Date", "current_status_date"),
    ("Filed Date", "filed_date"),
    ("Issued Date", "issued_date"),
    ("Completed Date", "completed_date"),
    ("First Construction Document Date", "first_construction_document_date"),
    ("Permit Expiration Date", "permit_expiration_date"),
    ("Existing Use", "existing_use"),
    ("Proposed Use", "proposed_use"),
    ("Existing Units", "existing_units"),
    ("Proposed Units", "proposed_units"),
    ("Existing Construction Type", "existing_construction_type"),
    (
      "Existing Construction Type Description",
      "existing_construction_type_description",
    ),
    ("Proposed Construction Type", "proposed_construction_type"),
    (
      "Proposed Construction Type Description",
      "proposed_construction_type_description",
    ),
  ],
  key:      &[KeyPart::Field("record_id")],
  computed: &[
    ComputedField {
      name:   ADDRESS_FIELD,
      groups: &[
        &["street_number", "street_number_suffix"],
        &["street_name"],
        &["street_name_suffix"],
        &["zipcode"],
      ],
    },
    ComputedField {
      name:   BLKLOT_FIELD,
      groups: &[&["block", "lot"]],
    },
  ],
};

static TCO: DirectLayout = DirectLayout {
  columns:  &[
    ("Building Permit Application Number", "building_permit_number"),
    ("Building Address", "address"),
    ("Date Issued", "date_issued"),
    ("Document Type", "building_permit_type"),
    ("Number of Units Certified", "num_units"),
  ],
  key:      &[
    KeyPart::Field("building_permit_number"),
    KeyPart::Date {
      field:  "date_issued",
      format: "%Y/%m/%d",
    },
  ],
  computed: &[ComputedField {
    name:   ADDRESS_FIELD,
    groups: &[&["address"]],
  }],
};

/// Street-address groups shared by the MOHCD-style sources.
const MOHCD_ADDRESS: &[&[&str]] =
  &[&["street_number"], &["street_name"], &["street_type"], &["zip_code"]];

static MOHCD_INCLUSIONARY: DirectLayout = DirectLayout {
  columns:  &[
    ("Project ID", "project_id"),
    ("Project Status", "project_status"),
    ("Project Name", "project_name"),
    ("Street Number", "street_number"),
    ("Street Name", "street_name"),
    ("Street Type", "street_type"),
    ("Zip Code", "zip_code"),
    ("Housing Tenure", "housing_tenure"),
    ("Section 415 Declaration", "section_415_declaration"),
    ("Entitlement Approval Date", "entitlement_approval_date"),
    (
      "Actual/Estimated Completion Date",
      "date_estimated_or_actual_completion",
    ),
    ("Planning Case Number", "planning_case_number"),
    ("Planning Entitlements", "planning_entitlements"),
    ("Project Units", "total_project_units"),
    ("Affordable Units", "total_affordable_units"),
    ("Units Subject to Section 415", "units_subject_to_415_declaration"),
    ("On-Site Affordable Units", "on_site_affordable_units"),
    ("Off-Site Affordable Units", "off_site_affordable_units"),
    (
      "Off-Site Affordable Units at This Site",
      "off_site_affordable_units_at_site",
    ),
    ("SRO Units", "num_sro_units"),
    ("Studio Units", "num_studio_units"),
    ("1bd Units", "num_1bd_units"),
    ("2bd Units", "num_2bd_units"),
    ("3bd Units", "num_3bd_units"),
    ("4bd Units", "num_4bd_units"),
    ("30% AMI", "num_30_percent_ami_units"),
    ("50% AMI", "num_50_percent_ami_units"),
    ("55% AMI", "num_55_percent_ami_units"),
    ("60% AMI", "num_60_percent_ami_units"),
    ("80% AMI", "num_80_percent_ami_units"),
    ("90% AMI", "num_90_percent_ami_units"),
    ("100% AMI", "num_100_percent_ami_units"),
    ("120% AMI", "num_120_percent_ami_units"),
    ("150% AMI", "num_150_percent_ami_units"),
    ("Supervisor District", "supervisor_district"),
    ("Location", "location"),
  ],
  key:      &[KeyPart::Field("project_id")],
  computed: &[ComputedField {
    name:   ADDRESS_FIELD,
    groups: MOHCD_ADDRESS,
  }],
};

static MOHCD_PIPELINE: DirectLayout = DirectLayout {
  columns:  &[
    ("Project ID", "project_id"),
    ("Project Status", "project_status"),
    ("Project Name", "project_name"),
    ("Street Number", "street_number"),
    ("Street Name", "street_name"),
    ("Street Type", "street_type"),
    ("Zip Code", "zip_code"),
    ("Supervisor District", "supervisor_district"),
    ("Location", "location"),
    ("Project Lead Sponsor", "project_lead_sponsor"),
    ("Project Owner", "project_owner"),
    ("Lead Agency", "lead_agency"),
    ("Program Area", "program_area"),
    ("Project Type", "project_type"),
    ("Housing Tenure", "housing_tenure"),
    ("Issuance of Notice to Proceed", "date_issuance_of_notice_to_proceed"),
    ("Issuance of Building Permit", "date_issuance_of_building_permit"),
    (
      "Issuance of First Construction Document",
      "date_issuance_of_first_construction_document",
    ),
    (
      "Estimated/Actual Construction Start Date",
      "date_estimated_or_actual_actual_construction_start",
    ),
    (
      "Estimated Construction Completion",
      "date_estimated_construction_completion",
    ),
    // The published dataset has two spaces in this header.
    ("Planning  Case Number", "planning_case_number"),
    ("Planning Entitlements", "planning_entitlements"),
    ("Section 415 Declaration", "section_415_declaration"),
    ("Project Units", "total_project_units"),
    ("Affordable Units", "total_affordable_units"),
    ("Market Rate Units", "total_market_rate_units"),
    ("% Affordable", "percent_affordable"),
    ("SRO Units", "num_sro_units"),
    ("Studio Units", "num_studio_units"),
    ("1bd Units", "num_1bd_units"),
    ("2bd Units", "num_2bd_units"),
    ("3bd Units", "num_3bd_units"),
    ("4bd Units", "num_4bd_units"),
    ("5+ bd Units", "num_5_plus_bd_units"),
    ("20% AMI", "num_20_percent_ami_units"),
    ("30% AMI", "num_30_percent_ami_units"),
    ("40% AMi", "num_40_percent_ami_units"),
    ("50% AMI", "num_50_percent_ami_units"),
    ("55% AMI", "num_55_percent_ami_units"),
    ("60% AMI", "num_60_percent_ami_units"),
    ("80% AMI", "num_80_percent_ami_units"),
    ("90% AMI", "num_90_percent_ami_units"),
    ("100% AMI", "num_100_percent_ami_units"),
    ("105% AMI", "num_105_percent_ami_units"),
    ("110% AMI", "num_110_percent_ami_units"),
    ("120% AMI", "num_120_percent_ami_units"),
    ("130% AMI", "num_130_percent_ami_units"),
    ("150% AMI", "num_150_percent_ami_units"),
    ("AMI Undeclared", "num_ami_undeclared_units"),
  ],
  key:      &[KeyPart::Field("project_id")],
  computed: &[ComputedField {
    name:   ADDRESS_FIELD,
    groups: MOHCD_ADDRESS,
  }],
};

static BMR: DirectLayout = DirectLayout {
  columns:  &[
    ("Project ID", "project_id"),
    ("Project Name", "project_name"),
    ("Street Number", "street_number"),
    ("Street Name", "street_name"),
    ("Street Type", "street_type"),
    ("Zip Code", "zip_code"),
    ("Location", "location"),
    ("Supervisor District", "supervisor_district"),
    ("Project Sponsor", "project_sponsor"),
    ("Total Units", "total_units"),
    ("Total Beds", "total_beds"),
    ("Affordable Units", "total_affordable_units"),
    ("Affordable Beds", "total_affordable_beds"),
    ("Single Room Occupancy Units", "num_sro_units"),
    ("Studio Units", "num_studio_units"),
    ("1bd Units", "num_1bd_units"),
    ("2bd Units", "num_2bd_units"),
    ("3bd Units", "num_3bd_units"),
    ("4bd Units", "num_4bd_units"),
    ("5+ bd Units", "num_5_plus_bd_units"),
    ("Family Units", "num_family_units"),
    ("Senior Units", "num_senior_units"),
    ("TAY Units", "num_tay_units"),
    ("Homeless Units", "num_homeless_units"),
    ("LOSP Units", "num_losp_units"),
    ("Disabled Units", "num_disabled_units"),
    ("20% AMI", "num_20_percent_ami_units"),
    ("30% AMI", "num_30_percent_ami_units"),
    ("40% AMI", "num_40_percent_ami_units"),
    ("50% AMI", "num_50_percent_ami_units"),
    ("60% AMI", "num_60_percent_ami_units"),
    ("80% AMI", "num_80_percent_ami_units"),
    ("120% AMI", "num_120_percent_ami_units"),
    ("More than 120% AMI", "num_more_than_120_percent_ami_units"),
    ("Year Building Constructed", "year_constructed"),
    ("Year Affordability Began", "year_affordability_began"),
  ],
  key:      &[KeyPart::Field("project_id")],
  computed: &[ComputedField {
    name:   ADDRESS_FIELD,
    groups: MOHCD_ADDRESS,
  }],
};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_round_trip() {
    for kind in SourceKind::ALL {
      assert_eq!(kind.name().parse::<SourceKind>().unwrap(), kind);
    }
    assert!(matches!(
      "planning".parse::<SourceKind>(),
      Err(SourceLoadError::UnknownSource(_))
    ));
  }

  #[test]
  fn key_columns_are_mapped() {
    for kind in SourceKind::ALL {
      if let Layout::Direct(layout) = kind.layout() {
        for part in layout.key {
          assert!(
            layout.raw_column(part.field()).is_some(),
            "{kind}: key field {} has no column",
            part.field()
          );
        }
      }
    }
  }

  #[test]
  fn cross_ref_fields_are_produced() {
    for kind in SourceKind::ALL {
      let Layout::Direct(layout) = kind.layout() else {
        continue;
      };
      for cross in kind.profile().cross_refs {
        assert!(
          layout.raw_column(cross.field).is_some(),
          "{kind}: cross-ref field {} is never produced",
          cross.field
        );
      }
    }
  }
}
