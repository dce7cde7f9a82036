//! Address Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EcommerceError, Result};

/// Postal fields shared by saved addresses and order snapshots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressFields {
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
    pub mobile: String,
}

impl AddressFields {
    /// Trims every field and rejects blanks.
    pub fn normalized(self) -> Result<Self> {
        let fields = Self {
            address_line: self.address_line.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            country: self.country.trim().to_string(),
            mobile: self.mobile.trim().to_string(),
        };
        let missing: Vec<&str> = [
            ("address_line", &fields.address_line),
            ("city", &fields.city),
            ("state", &fields.state),
            ("pincode", &fields.pincode),
            ("country", &fields.country),
            ("mobile", &fields.mobile),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| k)
        .collect();
        if !missing.is_empty() {
            return Err(EcommerceError::validation(format!("missing address fields: {}", missing.join(", "))));
        }
        Ok(fields)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub fields: AddressFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    pub fn create(user_id: Uuid, fields: AddressFields) -> Result<Self> {
        let now = Utc::now();
        Ok(Self { id: Uuid::now_v7(), user_id, fields: fields.normalized()?, created_at: now, updated_at: now })
    }

    pub fn replace(&mut self, fields: AddressFields) -> Result<()> {
        self.fields = fields.normalized()?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool { self.user_id == user_id }
}

#[cfg(test)]
pub(crate) fn sample_fields() -> AddressFields {
    AddressFields {
        address_line: "12 Market Street".into(),
        city: "Pune".into(),
        state: "MH".into(),
        pincode: "411001".into(),
        country: "India".into(),
        mobile: "9000000000".into(),
    }
}
