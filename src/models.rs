use serde::{Deserialize, Serialize};

/// A business candidate discovered by search, not yet contact-verified.
///
/// Produced by a search provider and immutable from then on; enrichment
/// happens by building a [`ContactRecord`] from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessLead {
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    /// Upstream reference usable for a details fetch.
    pub source_id: Option<String>,
}

/// A lead enriched with verified contact data, ready for human review.
///
/// The phone is already classified: a mobile number lands in `whatsapp`, a
/// landline in `phone`, an unclassifiable number in neither. Records are never
/// mutated after assembly; corrections happen by re-running collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,
    pub whatsapp: String,
    pub phone: String,
    pub email: Option<String>,
    pub website: String,
    pub city: String,
    pub address: String,
    pub source_id: Option<String>,
    /// True iff the record carries a usable phone or a resolved email.
    pub verified: bool,
}

/// One row of the master dataset. The schema is fixed; merges never add
/// columns beyond these six.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "WhatsApp")]
    pub whatsapp: String,
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "City")]
    pub city: String,
}

impl ContactRecord {
    pub fn has_contact(&self) -> bool {
        !self.whatsapp.trim().is_empty()
            || !self.phone.trim().is_empty()
            || self.email.as_deref().map_or(false, |e| !e.trim().is_empty())
    }
}
