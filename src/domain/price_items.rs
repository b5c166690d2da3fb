use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Prefix for ids minted locally before the remote catalog assigns one.
pub const LOCAL_ID_PREFIX: &str = "local-";

/// Price item entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl PriceItem {
    /// Build a new item from validated fields with a locally minted id.
    pub fn new_local(valid: ValidPriceItem) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, Uuid::new_v4()),
            name: valid.name,
            price: valid.price,
            category: valid.category,
        }
    }

    /// True until the item has been created on the remote catalog.
    pub fn is_local(&self) -> bool {
        self.id.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn apply(&mut self, valid: ValidPriceItem) {
        self.name = valid.name;
        self.price = valid.price;
        self.category = valid.category;
    }
}

/// Price as typed by a user: either a JSON number or free text such as `"10.50"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PriceField {
    Number(f64),
    Text(String),
}

impl From<f64> for PriceField {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for PriceField {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Request DTO for creating a price item, also used as the edit draft
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<PriceField>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<&PriceItem> for PriceItemInput {
    fn from(item: &PriceItem) -> Self {
        Self {
            name: item.name.clone(),
            price: Some(PriceField::Number(item.price)),
            category: item.category.clone(),
        }
    }
}

/// Partial update applied to an edit draft
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<PriceField>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Fields that passed validation; the only way to mutate a [`PriceItem`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPriceItem {
    pub name: String,
    pub price: f64,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("price is required")]
    MissingPrice,

    #[error("price '{0}' is not a number")]
    NonNumericPrice(String),

    #[error("price must be a finite number")]
    NonFinitePrice,

    #[error("price must not be negative (got {0})")]
    NegativePrice(f64),

    #[error("{0}")]
    Invalid(String),
}

impl PriceItemInput {
    pub fn validate(&self) -> Result<ValidPriceItem, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let price = match &self.price {
            None => return Err(ValidationError::MissingPrice),
            Some(PriceField::Number(v)) => *v,
            Some(PriceField::Text(raw)) => {
                let trimmed = raw.trim();
                trimmed
                    .parse::<f64>()
                    .map_err(|_| ValidationError::NonNumericPrice(trimmed.to_string()))?
            }
        };
        if !price.is_finite() {
            return Err(ValidationError::NonFinitePrice);
        }
        if price < 0.0 {
            return Err(ValidationError::NegativePrice(price));
        }

        let category = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(ValidPriceItem {
            name: name.to_string(),
            price,
            category,
        })
    }

    pub fn apply_patch(&mut self, patch: DraftPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = Some(price);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, price: &str) -> PriceItemInput {
        PriceItemInput {
            name: name.to_string(),
            price: Some(price.into()),
            category: None,
        }
    }

    #[test]
    fn accepts_textual_price() {
        let valid = input("Desk", "10.50").validate().unwrap();
        assert_eq!(valid.name, "Desk");
        assert_eq!(valid.price, 10.5);
    }

    #[test]
    fn rejects_empty_name() {
        assert_eq!(input("", "10").validate(), Err(ValidationError::EmptyName));
        assert_eq!(input("   ", "10").validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn rejects_negative_price() {
        assert_eq!(
            input("Desk", "-1").validate(),
            Err(ValidationError::NegativePrice(-1.0))
        );
    }

    #[test]
    fn rejects_non_numeric_and_non_finite_prices() {
        assert!(matches!(
            input("Desk", "ten").validate(),
            Err(ValidationError::NonNumericPrice(_))
        ));
        assert_eq!(
            input("Desk", "NaN").validate(),
            Err(ValidationError::NonFinitePrice)
        );
        assert_eq!(
            input("Desk", "inf").validate(),
            Err(ValidationError::NonFinitePrice)
        );
    }

    #[test]
    fn trims_name_and_drops_blank_category() {
        let valid = PriceItemInput {
            name: "  Oak Desk ".to_string(),
            price: Some(PriceField::Number(0.0)),
            category: Some("  ".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(valid.name, "Oak Desk");
        assert_eq!(valid.category, None);
    }

    #[test]
    fn price_field_accepts_number_or_text_json() {
        let a: PriceItemInput = serde_json::from_str(r#"{"name":"A","price":3}"#).unwrap();
        let b: PriceItemInput = serde_json::from_str(r#"{"name":"B","price":"3"}"#).unwrap();
        assert_eq!(a.validate().unwrap().price, 3.0);
        assert_eq!(b.validate().unwrap().price, 3.0);
    }

    #[test]
    fn local_ids_are_prefixed() {
        let item = PriceItem::new_local(input("Desk", "1").validate().unwrap());
        assert!(item.is_local());
    }
}
