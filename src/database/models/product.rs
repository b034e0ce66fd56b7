use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TITLE_COLUMN: &str = "Title";
pub const VISIBILITY_COLUMN: &str = "PredictedVisibility";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    High,
    Medium,
    Low,
}

impl Visibility {
    pub const ALL: [Visibility; 3] = [Visibility::High, Visibility::Medium, Visibility::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::High => "High",
            Visibility::Medium => "Medium",
            Visibility::Low => "Low",
        }
    }

    /// List-view selector: `All` (or nothing) means no visibility predicate
    pub fn from_selector(selector: Option<&str>) -> Result<Option<Self>, String> {
        match selector.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Medium
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Visibility::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Must be one of High, Medium, Low (got '{}')", s))
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_flag() -> i64 {
    1
}

fn default_shipping_days() -> i64 {
    3
}

fn default_visibility() -> String {
    Visibility::default().as_str().to_string()
}

/// The add-product form. Missing fields take the form's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "PriceStable", default = "default_flag")]
    pub price_stable: i64,
    #[serde(rename = "InStock", default = "default_flag")]
    pub in_stock: i64,
    #[serde(rename = "SellerPincode", default)]
    pub seller_pincode: String,
    #[serde(rename = "CustomerPincode", default)]
    pub customer_pincode: String,
    #[serde(rename = "ShippingDays", default = "default_shipping_days")]
    pub shipping_days: i64,
    #[serde(rename = "PredictedVisibility", default = "default_visibility")]
    pub predicted_visibility: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            price_stable: default_flag(),
            in_stock: default_flag(),
            seller_pincode: String::new(),
            customer_pincode: String::new(),
            shipping_days: default_shipping_days(),
            predicted_visibility: default_visibility(),
        }
    }
}

impl ProductForm {
    pub fn validate(&self) -> Result<(), HashMap<String, String>> {
        let mut errors = HashMap::new();
        check_flag(&mut errors, "PriceStable", self.price_stable);
        check_flag(&mut errors, "InStock", self.in_stock);
        check_shipping_days(&mut errors, self.shipping_days);
        check_visibility(&mut errors, &self.predicted_visibility);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Column map in form order, visibility normalised to its canonical case
    pub fn into_fields(self) -> Map<String, Value> {
        let visibility = canonical_visibility(self.predicted_visibility);
        let mut fields = Map::new();
        fields.insert(TITLE_COLUMN.to_string(), Value::from(self.title));
        fields.insert("Description".to_string(), Value::from(self.description));
        fields.insert("PriceStable".to_string(), Value::from(self.price_stable));
        fields.insert("InStock".to_string(), Value::from(self.in_stock));
        fields.insert("SellerPincode".to_string(), Value::from(self.seller_pincode));
        fields.insert("CustomerPincode".to_string(), Value::from(self.customer_pincode));
        fields.insert("ShippingDays".to_string(), Value::from(self.shipping_days));
        fields.insert(VISIBILITY_COLUMN.to_string(), Value::from(visibility));
        fields
    }
}

/// The edit form: only the fields that are present are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "PriceStable", default, skip_serializing_if = "Option::is_none")]
    pub price_stable: Option<i64>,
    #[serde(rename = "InStock", default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<i64>,
    #[serde(rename = "SellerPincode", default, skip_serializing_if = "Option::is_none")]
    pub seller_pincode: Option<String>,
    #[serde(rename = "CustomerPincode", default, skip_serializing_if = "Option::is_none")]
    pub customer_pincode: Option<String>,
    #[serde(rename = "ShippingDays", default, skip_serializing_if = "Option::is_none")]
    pub shipping_days: Option<i64>,
    #[serde(rename = "PredictedVisibility", default, skip_serializing_if = "Option::is_none")]
    pub predicted_visibility: Option<String>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), HashMap<String, String>> {
        let mut errors = HashMap::new();
        if let Some(v) = self.price_stable {
            check_flag(&mut errors, "PriceStable", v);
        }
        if let Some(v) = self.in_stock {
            check_flag(&mut errors, "InStock", v);
        }
        if let Some(v) = self.shipping_days {
            check_shipping_days(&mut errors, v);
        }
        if let Some(v) = &self.predicted_visibility {
            check_visibility(&mut errors, v);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ProductPatch::default()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        let mut put = |name: &str, value: Option<Value>| {
            if let Some(value) = value {
                fields.insert(name.to_string(), value);
            }
        };
        put(TITLE_COLUMN, self.title.map(Value::from));
        put("Description", self.description.map(Value::from));
        put("PriceStable", self.price_stable.map(Value::from));
        put("InStock", self.in_stock.map(Value::from));
        put("SellerPincode", self.seller_pincode.map(Value::from));
        put("CustomerPincode", self.customer_pincode.map(Value::from));
        put("ShippingDays", self.shipping_days.map(Value::from));
        put(VISIBILITY_COLUMN, self.predicted_visibility.map(|v| Value::from(canonical_visibility(v))));
        fields
    }
}

/// Checks the product columns present in a free-form field map. Columns the
/// product form does not know about pass through, and NULL is always allowed.
pub fn validate_columns(fields: &Map<String, Value>) -> Result<(), HashMap<String, String>> {
    let mut errors = HashMap::new();
    for flag in ["PriceStable", "InStock"] {
        match fields.get(flag) {
            None | Some(Value::Null) => {}
            Some(value) => match value.as_i64() {
                Some(v) => check_flag(&mut errors, flag, v),
                None => not_an_integer(&mut errors, flag, value),
            },
        }
    }
    match fields.get("ShippingDays") {
        None | Some(Value::Null) => {}
        Some(value) => match value.as_i64() {
            Some(v) => check_shipping_days(&mut errors, v),
            None => not_an_integer(&mut errors, "ShippingDays", value),
        },
    }
    match fields.get(VISIBILITY_COLUMN) {
        None | Some(Value::Null) => {}
        Some(Value::String(v)) => check_visibility(&mut errors, v),
        Some(other) => {
            errors.insert(VISIBILITY_COLUMN.to_string(), format!("Must be one of High, Medium, Low (got {})", other));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn not_an_integer(errors: &mut HashMap<String, String>, field: &str, value: &Value) {
    errors.insert(field.to_string(), format!("Must be an integer (got {})", value));
}

fn check_flag(errors: &mut HashMap<String, String>, field: &str, value: i64) {
    if !(0..=1).contains(&value) {
        errors.insert(field.to_string(), format!("Must be 0 or 1 (got {})", value));
    }
}

fn check_shipping_days(errors: &mut HashMap<String, String>, value: i64) {
    if value < 0 {
        errors.insert("ShippingDays".to_string(), format!("Must not be negative (got {})", value));
    }
}

fn check_visibility(errors: &mut HashMap<String, String>, value: &str) {
    if let Err(message) = value.parse::<Visibility>() {
        errors.insert(VISIBILITY_COLUMN.to_string(), message);
    }
}

fn canonical_visibility(value: String) -> String {
    value.parse::<Visibility>().map(|v| v.as_str().to_string()).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn form_defaults_match_the_add_form() {
        let form: ProductForm = serde_json::from_value(json!({ "Title": "Lamp" })).unwrap();
        assert_eq!(form.price_stable, 1);
        assert_eq!(form.in_stock, 1);
        assert_eq!(form.shipping_days, 3);
        assert_eq!(form.predicted_visibility, "Medium");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn form_reports_every_bad_field() {
        let form = ProductForm {
            price_stable: 2,
            in_stock: -1,
            shipping_days: -4,
            predicted_visibility: "Sky".to_string(),
            ..ProductForm::default()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains_key("PriceStable"));
        assert!(errors.contains_key("InStock"));
        assert!(errors.contains_key("ShippingDays"));
        assert!(errors.contains_key(VISIBILITY_COLUMN));
    }

    #[test]
    fn form_fields_keep_column_order() {
        let form = ProductForm { title: "Lamp".to_string(), predicted_visibility: "high".to_string(), ..ProductForm::default() };
        let fields = form.into_fields();
        let keys: Vec<_> = fields.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Title", "Description", "PriceStable", "InStock", "SellerPincode", "CustomerPincode", "ShippingDays", "PredictedVisibility"]
        );
        assert_eq!(fields[VISIBILITY_COLUMN], json!("High"));
    }

    #[test]
    fn patch_writes_only_present_fields() {
        let patch: ProductPatch = serde_json::from_value(json!({ "InStock": 0 })).unwrap();
        assert!(patch.validate().is_ok());
        let fields = patch.into_fields();
        assert_eq!(Value::Object(fields), json!({ "InStock": 0 }));

        assert!(ProductPatch::default().is_empty());
        let bad = ProductPatch { shipping_days: Some(-1), ..ProductPatch::default() };
        assert!(bad.validate().unwrap_err().contains_key("ShippingDays"));
    }

    #[test]
    fn free_form_columns_checked_when_present() {
        let fields = json!({ "Title": "Lamp", "Colour": "red", "InStock": null });
        assert!(validate_columns(fields.as_object().unwrap()).is_ok());

        let fields = json!({ "PriceStable": 7, "ShippingDays": "soon", "PredictedVisibility": "Sky" });
        let errors = validate_columns(fields.as_object().unwrap()).unwrap_err();
        assert_eq!(errors["PriceStable"], "Must be 0 or 1 (got 7)");
        assert_eq!(errors["ShippingDays"], "Must be an integer (got \"soon\")");
        assert!(errors.contains_key(VISIBILITY_COLUMN));
    }

    #[test]
    fn visibility_selector() {
        assert_eq!(Visibility::from_selector(None), Ok(None));
        assert_eq!(Visibility::from_selector(Some("All")), Ok(None));
        assert_eq!(Visibility::from_selector(Some("low")), Ok(Some(Visibility::Low)));
        assert!(Visibility::from_selector(Some("Extreme")).is_err());
    }
}
