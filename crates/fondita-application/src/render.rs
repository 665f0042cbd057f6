//! Rendering of the files published to the production site.
//!
//! Rendering is pure: the same document always produces byte-identical
//! artifacts, which is what lets an unchanged menu publish as a no-op.

use fondita_core::error::{FonditaError, Result};
use fondita_core::menu::MenuDocument;
use minijinja::{AutoEscape, Environment, context};

const LA_CARTA_TEMPLATE: &str = include_str!("../templates/la-carta.js.j2");
const MENU_SEMANA_TEMPLATE: &str = include_str!("../templates/menu-semana.js.j2");

const DEFAULT_CARTA_TITLE: &str = "Carta del día";
const DEFAULT_CARTA_PAGE: &str = "Información adicional del restaurante";

/// Day labels rendered as highlighted cards in the weekly schedule.
const SPECIAL_DAY_LABELS: &[&str] = &["Ensaladas", "Promociones de temporada"];

/// A file to be written at `path` in the production tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: Vec<u8>,
}

impl Artifact {
    fn new(path: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.to_string(),
            contents: contents.into(),
        }
    }
}

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    // Output is JavaScript; values are inserted pre-serialized
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template("la-carta.js", LA_CARTA_TEMPLATE)
        .map_err(template_error)?;
    env.add_template("menu-semana.js", MENU_SEMANA_TEMPLATE)
        .map_err(template_error)?;
    Ok(env)
}

fn template_error(err: minijinja::Error) -> FonditaError {
    FonditaError::internal(format!("Template error: {}", err))
}

/// JSON that is safe to paste into a script as a literal.
fn script_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(json.replace("</", "<\\/"))
}

/// Renders every generated artifact for `document`.
///
/// Produces `la-carta.js` and `menu-semana.js` (scripts with the data
/// embedded, so the published site never fetches) plus `menu.json` and
/// `backup-menu.json` snapshots.
pub fn render_artifacts(document: &MenuDocument) -> Result<Vec<Artifact>> {
    let env = environment()?;
    let version = document.version();
    let menu_json = script_json(&serde_json::json!({ "carta": &document.carta }))?;
    let schedule_json = script_json(&document.week_schedule)?;
    let special_days_json = script_json(&SPECIAL_DAY_LABELS)?;

    let la_carta = env
        .get_template("la-carta.js")
        .and_then(|tmpl| {
            tmpl.render(context! {
                version => &version,
                menu_json => &menu_json,
                default_title => DEFAULT_CARTA_TITLE,
                default_page => DEFAULT_CARTA_PAGE,
            })
        })
        .map_err(template_error)?;

    let menu_semana = env
        .get_template("menu-semana.js")
        .and_then(|tmpl| {
            tmpl.render(context! {
                version => &version,
                schedule_json => &schedule_json,
                special_days_json => &special_days_json,
            })
        })
        .map_err(template_error)?;

    let mut snapshot = serde_json::to_string_pretty(document)?;
    snapshot.push('\n');

    Ok(vec![
        Artifact::new("la-carta.js", la_carta),
        Artifact::new("menu-semana.js", menu_semana),
        Artifact::new("menu.json", snapshot.clone()),
        Artifact::new("backup-menu.json", snapshot),
    ])
}

/// Rewrites root-relative image URLs in a static asset to `img/...`.
///
/// The production site may be served from a sub-path, so `/img/x.png`
/// would break there.
pub fn relativize_image_urls(text: &str) -> String {
    text.replace("\"/img/", "\"img/")
        .replace("'/img/", "'img/")
        .replace("(/img/", "(img/")
}

/// Whether an asset is text that may carry image URLs.
pub fn is_rewritable_asset(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".html", ".css", ".js"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fondita_core::menu::{CartaItem, DayEntry};

    fn document() -> MenuDocument {
        MenuDocument {
            carta: vec![CartaItem {
                name: "Sopa".to_string(),
                price: "$50".to_string(),
                ..CartaItem::default()
            }],
            week_schedule: vec![
                DayEntry {
                    day: "Lunes".to_string(),
                    image: "lunes.jpg".to_string(),
                    dishes: vec!["Sopa".to_string(), "Agua".to_string()],
                    ..DayEntry::default()
                },
                DayEntry {
                    day: "Martes".to_string(),
                    ..DayEntry::default()
                },
            ],
        }
    }

    fn artifact<'a>(artifacts: &'a [Artifact], path: &str) -> &'a str {
        let found = artifacts.iter().find(|a| a.path == path).unwrap();
        std::str::from_utf8(&found.contents).unwrap()
    }

    #[test]
    fn test_renders_four_artifacts() {
        let artifacts = render_artifacts(&document()).unwrap();
        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["la-carta.js", "menu-semana.js", "menu.json", "backup-menu.json"]
        );
    }

    #[test]
    fn test_scripts_embed_data_and_version() {
        let doc = document();
        let artifacts = render_artifacts(&doc).unwrap();

        let carta = artifact(&artifacts, "la-carta.js");
        assert!(carta.contains("\"name\": \"Sopa\""));
        assert!(carta.contains(&doc.version()));
        assert!(!carta.contains("fetch("));

        let semana = artifact(&artifacts, "menu-semana.js");
        assert!(semana.contains("\"image\": \"lunes.jpg\""));
        assert!(semana.contains("\"Agua\""));

        let snapshot: MenuDocument =
            serde_json::from_str(artifact(&artifacts, "menu.json")).unwrap();
        assert_eq!(snapshot, doc);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        assert_eq!(
            render_artifacts(&document()).unwrap(),
            render_artifacts(&document()).unwrap()
        );
    }

    #[test]
    fn test_script_breakout_is_neutralized() {
        let mut doc = document();
        doc.carta[0].description = "</script><script>alert(1)</script>".to_string();
        let artifacts = render_artifacts(&doc).unwrap();
        assert!(!artifact(&artifacts, "la-carta.js").contains("</script>"));
    }

    #[test]
    fn test_seven_day_week_highlights_special_cards() {
        let mut doc = document();
        doc.week_schedule.extend([
            DayEntry {
                day: "Ensaladas".to_string(),
                dishes: vec!["César".to_string()],
                ..DayEntry::default()
            },
            DayEntry {
                day: "Promociones de temporada".to_string(),
                ..DayEntry::default()
            },
        ]);
        let artifacts = render_artifacts(&doc).unwrap();
        let semana = artifact(&artifacts, "menu-semana.js");

        assert!(semana.contains("\"card card-especial\""));
        assert!(semana.contains("badge-especial"));
        assert!(semana.contains("\"Ensaladas\",\n  \"Promociones de temporada\""));
        assert!(semana.contains("\"day\": \"Promociones de temporada\""));
    }

    #[test]
    fn test_relativize_image_urls() {
        let html = r#"<img src="/img/logo.png"><div style="background:url(/img/p.avif)">'/img/x.jpg'"#;
        assert_eq!(
            relativize_image_urls(html),
            r#"<img src="img/logo.png"><div style="background:url(img/p.avif)">'img/x.jpg'"#
        );
        assert!(is_rewritable_asset("index.HTML"));
        assert!(!is_rewritable_asset("logo.png"));
    }
}
