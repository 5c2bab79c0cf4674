use serde::{Deserialize, Serialize};

/// Denormalized projection of a contact record, shipped alongside the map as
/// `contactsById` so clients never need a separate lookup call for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Directory search parameters for the contact picker. All filters are
/// optional substring matches; pagination is 1-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactQuery {
    #[serde(default)]
    pub trade: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub service_area: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub page: Option<u32>,
}

/// One page of directory results. `count` is the number of items in this
/// page, not the total across pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPage {
    pub items: Vec<ContactSummary>,
    pub limit: u32,
    pub page: u32,
    pub count: u32,
}
