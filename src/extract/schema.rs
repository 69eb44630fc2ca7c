//! Field catalog: which metadata fields to extract for a media type
//!
//! Every page gets the base sections. Known media types add a file-object section and
//! an acquisition section whose fields depend on the type. Unknown media types get the
//! base sections only.

/// A named group of field labels, in page order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

const GENERAL_DETAILS: Section = Section {
    name: "GENERAL DETAILS",
    fields: &[
        "Media ID",
        "Media type",
        "Object element or part",
        "Object represented",
        "Object taxonomy",
        "Object organization",
        "Side",
        "Orientation",
        "Short description",
        "Full description",
        "Creator",
        "Date created",
        "Date uploaded",
    ],
};

const OWNERSHIP_AND_PERMISSIONS: Section = Section {
    name: "OWNERSHIP AND PERMISSIONS",
    fields: &[
        "Data managed by",
        "Data uploaded by",
        "Publication status",
        "Download reviewer",
        "IP holder",
        "Copyright statement",
        "Creative Commons license",
        "Morphosource use agreement type",
        "Permits commercial use",
        "Permits 3D use",
        "Required archival of published derivatives",
        "Funding attribution",
        "Publisher",
        "Cite as",
        "Media preview mode",
        "Additional usage agreement",
    ],
};

const IDENTIFIERS_AND_EXTERNAL_LINKS: Section = Section {
    name: "IDENTIFIERS AND EXTERNAL LINKS",
    fields: &[
        "MorphoSource ARK",
        "MorphoSource DOI",
        "External identifier",
        "External media URL",
    ],
};

const FILE_OBJECT_DETAILS: &str = "FILE OBJECT DETAILS";
const ACQUISITION_AND_PROCESSING: &str = "IMAGE ACQUISITION AND PROCESSING AT A GLANCE";

const VOLUMETRIC_FILE_DETAILS: Section = Section {
    name: FILE_OBJECT_DETAILS,
    fields: &[
        "File name",
        "File format(s)",
        "File size",
        "Image width",
        "Image height",
        "Color space",
        "Color depth",
        "Compression",
        "X pixel spacing",
        "Y pixel spacing",
        "Z pixel spacing",
        "Pixel spacing units",
        "Slice thickness",
        "Number of images in set",
    ],
};

const VOLUMETRIC_ACQUISITION: Section = Section {
    name: ACQUISITION_AND_PROCESSING,
    fields: &[
        "Number of parent media",
        "Number of processing events",
        "Modality",
        "Device",
    ],
};

const MESH_FILE_DETAILS: Section = Section {
    name: FILE_OBJECT_DETAILS,
    fields: &[
        "File name",
        "File format(s)",
        "File size",
        "Points",
        "Polygons",
        "Map type",
        "UV coordinates",
        "Vertex color",
        "Bounding box dimensions",
        "Centroid coordinates",
        "Units of point coordinates",
    ],
};

const MESH_ACQUISITION: Section = Section {
    name: ACQUISITION_AND_PROCESSING,
    fields: &[
        "Number of parent media",
        "Number of processing events",
        "Derived directly from",
        "Modality",
        "Device",
    ],
};

/// Media types with a type-specific field plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownMediaType {
    VolumetricImageSeries,
    Mesh,
}

impl KnownMediaType {
    /// Matches a declared media type, ignoring case and surrounding whitespace
    pub fn from_declared(media_type: &str) -> Option<Self> {
        match media_type.trim().to_lowercase().as_str() {
            "volumetric image series" => Some(Self::VolumetricImageSeries),
            "mesh" => Some(Self::Mesh),
            _ => None,
        }
    }

    fn sections(&self) -> [Section; 2] {
        match self {
            Self::VolumetricImageSeries => [VOLUMETRIC_FILE_DETAILS, VOLUMETRIC_ACQUISITION],
            Self::Mesh => [MESH_FILE_DETAILS, MESH_ACQUISITION],
        }
    }
}

/// Returns the sections to extract for a declared media type, in page order
pub fn fields_for(media_type: &str) -> Vec<Section> {
    let mut sections = vec![
        GENERAL_DETAILS,
        OWNERSHIP_AND_PERMISSIONS,
        IDENTIFIERS_AND_EXTERNAL_LINKS,
    ];

    match KnownMediaType::from_declared(media_type) {
        Some(known) => sections.extend(known.sections()),
        None => tracing::debug!(
            "No type-specific fields for media type '{}', using base sections",
            media_type
        ),
    }

    sections
}

/// Converts a field label into its record key
///
/// Lowercase, spaces to underscores, parentheses stripped:
/// `"File format(s)"` becomes `"file_formats"`.
pub fn normalize_field_name(field: &str) -> String {
    field
        .to_lowercase()
        .replace(' ', "_")
        .replace(['(', ')'], "")
}
