//! Menu domain model.
//!
//! The menu document is read and written wholesale. Field names on the wire
//! are camelCase; the Spanish keys used by earlier `menu.json` files are
//! accepted as aliases so old documents still load.

use super::dishes::{deserialize_dishes, normalize_dishes};
use crate::error::{FonditaError, Result};
use crate::image::is_bare_filename;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use strum::{Display, EnumIter, IntoEnumIterator};
use uuid::Uuid;

/// Upper bound on schedule entries accepted from clients.
pub const MAX_WEEK_DAYS: usize = 7;

/// Weekday labels used for synthesized schedule slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Weekday {
    Lunes,
    Martes,
    #[strum(serialize = "Miércoles")]
    Miercoles,
    Jueves,
    Viernes,
    #[strum(serialize = "Sábado")]
    Sabado,
    Domingo,
}

impl Weekday {
    /// The weekday at `position` (0 = Monday), if any.
    pub fn from_position(position: usize) -> Option<Self> {
        Self::iter().nth(position)
    }
}

/// The whole menu: the featured "carta" item and the weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuDocument {
    /// Featured item. Holds at most one entry.
    #[serde(default)]
    pub carta: Vec<CartaItem>,
    /// One entry per served day
    #[serde(default, alias = "menu_semana", alias = "menuSemana")]
    pub week_schedule: Vec<DayEntry>,
}

/// The featured dish shown in the flip-book "carta".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartaItem {
    #[serde(
        default,
        alias = "tituloCarta",
        alias = "pagina1_titulo",
        deserialize_with = "lenient_string"
    )]
    pub title: String,
    #[serde(default, alias = "nombre", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, alias = "descripcion", deserialize_with = "lenient_string")]
    pub description: String,
    /// Free-form price text ("$50", "50 MXN", ...)
    #[serde(default, alias = "precio", deserialize_with = "lenient_string")]
    pub price: String,
    #[serde(default, alias = "pago", deserialize_with = "lenient_payment")]
    pub payment: PaymentInfo,
    /// Optional closing page of the carta
    #[serde(
        default,
        alias = "pagina4",
        alias = "pagina4_contenido",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    #[serde(default, alias = "mensaje", deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, alias = "banco", deserialize_with = "lenient_string")]
    pub bank: String,
}

/// A single day of the weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    /// Day label, normally one of [`Weekday`] but not enforced
    #[serde(default, alias = "dia", deserialize_with = "lenient_string")]
    pub day: String,
    /// ISO date (`YYYY-MM-DD`)
    #[serde(
        default,
        alias = "fecha",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_string"
    )]
    pub date: Option<String>,
    /// Image filename in the image store, or empty
    #[serde(default, alias = "imagen", deserialize_with = "lenient_string")]
    pub image: String,
    #[serde(
        default,
        rename = "platillos",
        alias = "dishes",
        deserialize_with = "deserialize_dishes"
    )]
    pub dishes: Vec<String>,
}

impl DayEntry {
    /// An empty slot labelled with the weekday for `position`.
    pub fn placeholder(position: usize) -> Self {
        Self {
            day: Weekday::from_position(position)
                .map(|d| d.to_string())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}

impl MenuDocument {
    /// The document used when nothing has been saved yet: one empty carta
    /// entry and no schedule.
    pub fn empty() -> Self {
        Self {
            carta: vec![CartaItem::default()],
            week_schedule: Vec::new(),
        }
    }

    /// Brings the document into canonical shape.
    ///
    /// - exactly one carta entry
    /// - `week_schedule` padded or truncated to `target_days`
    /// - trimmed image names, empty dates dropped, dish lists re-split
    pub fn normalize(&mut self, target_days: usize) {
        if self.carta.is_empty() {
            self.carta.push(CartaItem::default());
        }
        self.carta.truncate(1);

        self.week_schedule.truncate(target_days);
        while self.week_schedule.len() < target_days {
            let position = self.week_schedule.len();
            self.week_schedule.push(DayEntry::placeholder(position));
        }

        for entry in &mut self.week_schedule {
            entry.image = entry.image.trim().to_string();
            entry.date = entry
                .date
                .take()
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
            entry.dishes = normalize_dishes(&entry.dishes);
        }
    }

    /// Rejects documents a client should never send.
    pub fn validate(&self) -> Result<()> {
        if self.carta.len() > 1 {
            return Err(FonditaError::validation(format!(
                "carta holds at most one item, got {}",
                self.carta.len()
            )));
        }
        if self.week_schedule.len() > MAX_WEEK_DAYS {
            return Err(FonditaError::validation(format!(
                "weekSchedule holds at most {} days, got {}",
                MAX_WEEK_DAYS,
                self.week_schedule.len()
            )));
        }
        for (idx, entry) in self.week_schedule.iter().enumerate() {
            let image = entry.image.trim();
            if !image.is_empty() && !is_bare_filename(image) {
                return Err(FonditaError::validation(format!(
                    "weekSchedule[{}].image must be a plain filename",
                    idx
                )));
            }
            let date = entry.date.as_deref().map(str::trim).unwrap_or_default();
            if !date.is_empty() && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(FonditaError::validation(format!(
                    "weekSchedule[{}].date must be YYYY-MM-DD, got '{}'",
                    idx, date
                )));
            }
        }
        Ok(())
    }

    /// Every non-empty image reference in the schedule.
    pub fn referenced_images(&self) -> BTreeSet<String> {
        self.week_schedule
            .iter()
            .filter(|entry| entry.has_image())
            .map(|entry| entry.image.clone())
            .collect()
    }

    /// Clears image references that are not in `existing`.
    ///
    /// Returns the names that were cleared.
    pub fn clear_missing_images(&mut self, existing: &BTreeSet<String>) -> Vec<String> {
        let mut cleared = Vec::new();
        for entry in &mut self.week_schedule {
            if entry.has_image() && !existing.contains(&entry.image) {
                cleared.push(std::mem::take(&mut entry.image));
            }
        }
        cleared
    }

    /// Content-derived version token.
    ///
    /// Equal documents always yield the same token, so it doubles as a
    /// deterministic cache-busting value in generated artifacts.
    pub fn version(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        Uuid::new_v5(&Uuid::NAMESPACE_OID, &canonical).to_string()
    }
}

/// Accepts strings, numbers, booleans and `null` for free-text fields.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected text, got {}",
            other
        ))),
    }
}

fn optional_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_string(deserializer)?;
    Ok(Some(value).filter(|s| !s.trim().is_empty()))
}

fn lenient_payment<'de, D>(deserializer: D) -> std::result::Result<PaymentInfo, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<PaymentInfo>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MenuDocument {
        MenuDocument {
            carta: vec![CartaItem {
                title: "Carta del día".into(),
                name: "Sopa".into(),
                description: "Sopa de tortilla".into(),
                price: "$50".into(),
                payment: PaymentInfo {
                    message: "Transferencia".into(),
                    bank: "BBVA".into(),
                },
                page: Some("¡Gracias por tu preferencia!".into()),
            }],
            week_schedule: vec![DayEntry {
                day: "Lunes".into(),
                date: Some("2026-10-19".into()),
                image: "a.jpg".into(),
                dishes: vec!["Sopa".into(), "Agua".into()],
            }],
        }
    }

    #[test]
    fn test_serializes_camel_case_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("weekSchedule").is_some());
        assert_eq!(json["carta"][0]["name"], "Sopa");
        assert_eq!(json["carta"][0]["payment"]["bank"], "BBVA");
        assert_eq!(json["weekSchedule"][0]["platillos"][1], "Agua");
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample();
        let text = serde_json::to_string_pretty(&doc).unwrap();
        let back: MenuDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_accepts_legacy_spanish_keys() {
        let legacy = r#"{
            "carta": [{
                "tituloCarta": "Carta del día",
                "nombre": "Pozole",
                "descripcion": "Rojo",
                "precio": 85,
                "pago": {"mensaje": "Efectivo", "banco": null},
                "pagina4": "Gracias"
            }],
            "menu_semana": [
                {"dia": "Martes", "fecha": "", "imagen": "x.png", "platillos": ["Pozole", "Tostadas"]}
            ]
        }"#;
        let doc: MenuDocument = serde_json::from_str(legacy).unwrap();
        assert_eq!(doc.carta[0].name, "Pozole");
        assert_eq!(doc.carta[0].price, "85");
        assert_eq!(doc.carta[0].payment.bank, "");
        assert_eq!(doc.carta[0].page.as_deref(), Some("Gracias"));
        assert_eq!(doc.week_schedule[0].day, "Martes");
        assert_eq!(doc.week_schedule[0].date, None);
        assert_eq!(doc.week_schedule[0].image, "x.png");
    }

    #[test]
    fn test_dish_text_is_split_on_deserialize() {
        let doc: MenuDocument = serde_json::from_str(
            r#"{"carta": [{"name": "Sopa", "price": "$50"}],
                "weekSchedule": [{"day": "Lunes", "platillos": "Sopa, Agua"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.week_schedule[0].dishes, vec!["Sopa", "Agua"]);
    }

    #[test]
    fn test_normalize_pads_and_truncates() {
        let mut doc = MenuDocument::default();
        doc.normalize(5);
        assert_eq!(doc.carta.len(), 1);
        let days: Vec<&str> = doc.week_schedule.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(days, vec!["Lunes", "Martes", "Miércoles", "Jueves", "Viernes"]);

        doc.normalize(3);
        assert_eq!(doc.week_schedule.len(), 3);

        doc.normalize(7);
        assert_eq!(doc.week_schedule[5].day, "Sábado");
        assert_eq!(doc.week_schedule[6].day, "Domingo");
    }

    #[test]
    fn test_normalize_keeps_existing_entries() {
        let mut doc = sample();
        doc.week_schedule[0].image = "  a.jpg ".into();
        doc.normalize(5);
        assert_eq!(doc.week_schedule[0].day, "Lunes");
        assert_eq!(doc.week_schedule[0].image, "a.jpg");
        assert_eq!(doc.week_schedule[1].day, "Martes");
        assert!(doc.week_schedule[1].dishes.is_empty());
    }

    #[test]
    fn test_validate_rejects_malformed_documents() {
        let mut doc = sample();
        doc.carta.push(CartaItem::default());
        assert!(matches!(doc.validate(), Err(FonditaError::Validation(_))));

        let mut doc = sample();
        doc.week_schedule[0].image = "../data/menu.json".into();
        assert!(matches!(doc.validate(), Err(FonditaError::Validation(_))));

        let mut doc = sample();
        doc.week_schedule[0].date = Some("19/10/2026".into());
        assert!(matches!(doc.validate(), Err(FonditaError::Validation(_))));

        let mut doc = sample();
        doc.normalize(MAX_WEEK_DAYS);
        doc.week_schedule.push(DayEntry::default());
        assert!(matches!(doc.validate(), Err(FonditaError::Validation(_))));

        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_clear_missing_images() {
        let mut doc = sample();
        doc.week_schedule.push(DayEntry {
            day: "Martes".into(),
            image: "tuesday.jpg".into(),
            ..DayEntry::default()
        });
        let existing: BTreeSet<String> = ["a.jpg".to_string()].into_iter().collect();

        let cleared = doc.clear_missing_images(&existing);

        assert_eq!(cleared, vec!["tuesday.jpg"]);
        assert_eq!(doc.week_schedule[0].image, "a.jpg");
        assert!(doc.week_schedule[1].image.is_empty());
        assert_eq!(doc.referenced_images().len(), 1);
    }

    #[test]
    fn test_version_is_content_derived() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a.version(), b.version());
        b.carta[0].price = "$55".into();
        assert_ne!(a.version(), b.version());
    }
}
