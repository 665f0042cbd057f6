//! Conversion between the admin textarea and the stored dish list.
//!
//! The admin panel edits a day's dishes as one comma-separated string. The
//! document stores them split, trimmed and without empty entries.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Splits a free-text dish list on commas.
///
/// Entries are trimmed and empty entries are dropped, so `" Sopa,, Agua "`
/// becomes `["Sopa", "Agua"]`.
pub fn split_dishes(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|dish| !dish.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins a dish list back into the textarea form.
pub fn join_dishes(dishes: &[String]) -> String {
    dishes.join(", ")
}

/// Re-splits every entry so a list that arrived as an array is in the same
/// form as one that arrived as text.
pub fn normalize_dishes(dishes: &[String]) -> Vec<String> {
    dishes.iter().flat_map(|dish| split_dishes(dish)).collect()
}

/// Accepts `"a, b"`, `["a", "b"]` or `null` for the `platillos` field.
pub(crate) fn deserialize_dishes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(text)) => Ok(split_dishes(&text)),
        Some(Value::Array(items)) => {
            let mut dishes = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(text) => dishes.extend(split_dishes(&text)),
                    Value::Null => {}
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "dish entries must be strings, got {}",
                            other
                        )));
                    }
                }
            }
            Ok(dishes)
        }
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a dish list or comma-separated text, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trims_and_drops_empty_entries() {
        assert_eq!(
            split_dishes("  Sopa de verduras, Pollo asado ,, Arroz blanco,"),
            vec!["Sopa de verduras", "Pollo asado", "Arroz blanco"]
        );
        assert!(split_dishes("").is_empty());
        assert!(split_dishes(" , , ").is_empty());
    }

    #[test]
    fn test_join_then_split_round_trips() {
        let lists: Vec<Vec<String>> = vec![
            vec![],
            vec!["Sopa".into()],
            vec!["Sopa".into(), "Agua de jamaica".into(), "Pollo en mole".into()],
        ];
        for dishes in lists {
            assert_eq!(split_dishes(&join_dishes(&dishes)), dishes);
        }
    }

    #[test]
    fn test_split_then_join_reconstructs_trimmed_entries() {
        let text = "Sopa,Agua ,  Arroz";
        assert_eq!(join_dishes(&split_dishes(text)), "Sopa, Agua, Arroz");
    }

    #[test]
    fn test_normalize_resplits_embedded_commas() {
        let dishes = vec!["Sopa, Agua".to_string(), " Arroz ".to_string()];
        assert_eq!(normalize_dishes(&dishes), vec!["Sopa", "Agua", "Arroz"]);
    }
}
