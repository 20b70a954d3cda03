//! Donor candidates and the record shape kept in the realtime store.
//!
//! The store keeps coordinates as decimal strings. [`DonorRecord`] mirrors
//! that shape and [`DonorRecord::into_candidate`] parses it leniently: an
//! absent, unparsable or non-finite value leaves the candidate without a
//! coordinate rather than failing.

use std::str::FromStr;

use crate::{ClusterLabel, Coordinate};

/// Descriptive donor fields carried through matching untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DonorAttributes {
    /// Display name.
    pub name: String,
    /// Blood group as stored, for example `"O+"`.
    pub blood_group: String,
    /// Organ the donor has registered, for example `"kidney"`.
    pub organ: String,
    /// Free-text location label.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub location_label: Option<String>,
    /// Profile image URL.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub image_url: Option<String>,
}

/// A donor being evaluated for a nearby search.
///
/// # Examples
///
/// ```
/// use lifeline_core::{Coordinate, DonorCandidate};
///
/// # fn main() -> Result<(), lifeline_core::CoordinateError> {
/// let donor = DonorCandidate::new("d1").with_coordinate(Coordinate::new(1.0, 2.0)?);
/// assert!(donor.is_locatable());
/// assert!(!DonorCandidate::new("d2").is_locatable());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DonorCandidate {
    /// Store key of the donor.
    pub id: String,
    /// Last shared position, if any.
    pub coordinate: Option<Coordinate>,
    /// Cluster label known for the donor before matching.
    #[cfg_attr(feature = "serde", serde(default))]
    pub cluster_label: ClusterLabel,
    /// Descriptive fields.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: DonorAttributes,
}

impl DonorCandidate {
    /// A candidate with no coordinate, an unknown label and empty attributes.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coordinate: None,
            cluster_label: ClusterLabel::Unknown,
            attributes: DonorAttributes::default(),
        }
    }

    /// Set the coordinate.
    #[must_use]
    pub const fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    /// Replace the attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: DonorAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether the candidate can take part in a nearby search.
    #[must_use]
    pub const fn is_locatable(&self) -> bool {
        self.coordinate.is_some()
    }

    /// Feature vector consumed by the clustering model.
    #[must_use]
    pub fn clustering_features(&self) -> [f32; FEATURE_COUNT] {
        clustering_features(
            &self.attributes.blood_group,
            &self.attributes.organ,
            self.coordinate,
        )
    }
}

/// Donor entry exactly as the realtime store keeps it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct DonorRecord {
    /// Display name.
    pub full_name: String,
    /// Blood group text.
    pub blood_group: String,
    /// Registered organ.
    pub organ_available: String,
    /// Free-text location label.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub location: Option<String>,
    /// Profile image URL. The store uses a capitalised key for this field.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "ProfileImageUrl", skip_serializing_if = "Option::is_none")
    )]
    pub profile_image_url: Option<String>,
    /// Latitude as decimal text.
    #[cfg_attr(
        feature = "serde",
        serde(
            deserialize_with = "lenient_text::deserialize",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub latitude: Option<String>,
    /// Longitude as decimal text.
    #[cfg_attr(
        feature = "serde",
        serde(
            deserialize_with = "lenient_text::deserialize",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub longitude: Option<String>,
}

impl DonorRecord {
    /// Convert the stored record into a matching candidate keyed by `id`.
    ///
    /// ```
    /// use lifeline_core::DonorRecord;
    ///
    /// let record = DonorRecord {
    ///     full_name: "Asha".into(),
    ///     latitude: Some("12.97".into()),
    ///     longitude: Some("not a number".into()),
    ///     ..DonorRecord::default()
    /// };
    /// let candidate = record.into_candidate("d1");
    /// assert_eq!(candidate.attributes.name, "Asha");
    /// assert!(candidate.coordinate.is_none());
    /// ```
    #[must_use]
    pub fn into_candidate(self, id: impl Into<String>) -> DonorCandidate {
        let coordinate =
            Coordinate::from_text_fields(self.latitude.as_deref(), self.longitude.as_deref());
        DonorCandidate {
            id: id.into(),
            coordinate,
            cluster_label: ClusterLabel::Unknown,
            attributes: DonorAttributes {
                name: self.full_name,
                blood_group: self.blood_group,
                organ: self.organ_available,
                location_label: self.location,
                image_url: self.profile_image_url,
            },
        }
    }
}

#[cfg(feature = "serde")]
mod lenient_text {
    //! Accept only string values; anything else counts as absent.

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(text) => Some(text),
            _ => None,
        })
    }
}

/// Blood groups known to the clustering model, in feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BloodGroup {
    /// A positive.
    APositive,
    /// A negative.
    ANegative,
    /// B positive.
    BPositive,
    /// B negative.
    BNegative,
    /// AB positive.
    AbPositive,
    /// AB negative.
    AbNegative,
    /// O positive.
    OPositive,
    /// O negative.
    ONegative,
}

impl BloodGroup {
    /// Every group in feature order.
    pub const ALL: [Self; 8] = [
        Self::APositive,
        Self::ANegative,
        Self::BPositive,
        Self::BNegative,
        Self::AbPositive,
        Self::AbNegative,
        Self::OPositive,
        Self::ONegative,
    ];

    /// Canonical text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

impl FromStr for BloodGroup {
    type Err = String;

    /// Case-insensitive, whitespace-tolerant parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == normalised)
            .ok_or_else(|| format!("unknown blood group: {s}"))
    }
}

/// Organs known to the clustering model, in feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Organ {
    /// Kidney.
    Kidney,
    /// Liver.
    Liver,
    /// Heart.
    Heart,
    /// Lung.
    Lung,
    /// Cornea.
    Cornea,
}

impl Organ {
    /// Every organ in feature order.
    pub const ALL: [Self; 5] = [
        Self::Kidney,
        Self::Liver,
        Self::Heart,
        Self::Lung,
        Self::Cornea,
    ];

    /// Canonical text form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Kidney => "kidney",
            Self::Liver => "liver",
            Self::Heart => "heart",
            Self::Lung => "lung",
            Self::Cornea => "cornea",
        }
    }
}

impl FromStr for Organ {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|organ| organ.as_str() == normalised)
            .ok_or_else(|| format!("unknown organ: {s}"))
    }
}

/// Length of the clustering feature vector.
pub const FEATURE_COUNT: usize = BloodGroup::ALL.len() + Organ::ALL.len() + 2;

/// Encode donor fields for the clustering model.
///
/// Layout: one-hot blood group, one-hot organ, then latitude and longitude.
/// Unknown groups or organs leave their block zeroed and an absent
/// coordinate encodes as `0.0, 0.0`.
///
/// ```
/// use lifeline_core::{FEATURE_COUNT, clustering_features};
///
/// let features = clustering_features(" o- ", "Heart", None);
/// assert_eq!(features.len(), FEATURE_COUNT);
/// assert_eq!(features[7], 1.0);
/// assert_eq!(features[10], 1.0);
/// assert_eq!(features.iter().sum::<f32>(), 2.0);
/// ```
#[must_use]
pub fn clustering_features(
    blood_group: &str,
    organ: &str,
    coordinate: Option<Coordinate>,
) -> [f32; FEATURE_COUNT] {
    let mut features = [0.0_f32; FEATURE_COUNT];
    let blood_slot = blood_group
        .parse::<BloodGroup>()
        .ok()
        .and_then(|group| BloodGroup::ALL.iter().position(|g| *g == group));
    let organ_slot = organ
        .parse::<Organ>()
        .ok()
        .and_then(|found| Organ::ALL.iter().position(|o| *o == found))
        .map(|slot| slot + BloodGroup::ALL.len());

    for slot in [blood_slot, organ_slot].into_iter().flatten() {
        if let Some(value) = features.get_mut(slot) {
            *value = 1.0;
        }
    }

    if let Some(coordinate) = coordinate {
        let tail = FEATURE_COUNT - 2;
        // The model consumes single-precision features.
        let position = [coordinate.latitude() as f32, coordinate.longitude() as f32];
        if let Some(slots) = features.get_mut(tail..) {
            slots.copy_from_slice(&position);
        }
    }
    features
}
