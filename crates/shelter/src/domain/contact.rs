use serde::{Deserialize, Serialize};

/// Postal address attached to beneficiaries, housings, and organizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub complement: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    /// Single-line rendering used by list views and CLI output.
    pub fn one_line(&self) -> String {
        let mut parts = Vec::new();
        let street = match self.number.as_deref() {
            Some(number) if !number.is_empty() => format!("{}, {}", self.street, number),
            _ => self.street.clone(),
        };
        for part in [
            Some(street),
            self.district.clone(),
            Some(self.city.clone()),
            Some(self.state.clone()),
        ]
        .into_iter()
        .flatten()
        {
            if !part.trim().is_empty() {
                parts.push(part);
            }
        }
        parts.join(" - ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    NationalId,
    TaxId,
    Passport,
    BirthCertificate,
    WorkPermit,
    #[serde(other)]
    Other,
}

/// Identity document held by a person or organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub number: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub number: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub whatsapp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub phones: Vec<Phone>,
}

/// Health details captured at intake. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalInformation {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub disabilities: Vec<String>,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
