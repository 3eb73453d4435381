//! Note types created in Anki on first sync.

use mdcards_core::{CardKind, SOURCE_FIELD};
use serde::Serialize;

const CSS: &str = ".card {\n  font-family: arial;\n  font-size: 20px;\n  text-align: center;\n  color: black;\n  background-color: white;\n}\n.source {\n  font-size: 12px;\n  color: grey;\n}\n";

const SOURCE_FOOTER: &str = "<div class=\"source\">{{Source}}</div>";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModel {
    pub model_name: &'static str,
    pub in_order_fields: Vec<&'static str>,
    pub css: &'static str,
    pub is_cloze: bool,
    pub card_templates: Vec<CardTemplate>,
}

#[derive(Debug, Serialize)]
pub struct CardTemplate {
    #[serde(rename = "Name")]
    pub name: &'static str,
    #[serde(rename = "Front")]
    pub front: String,
    #[serde(rename = "Back")]
    pub back: String,
}

fn answer_side(answer: &str) -> String {
    format!(
        "{{{{FrontSide}}}}\n\n<hr id=answer>\n\n{{{{{}}}}}\n\n{}",
        answer, SOURCE_FOOTER
    )
}

/// `createModel` parameters for a card kind.
pub fn model_for(kind: CardKind) -> CreateModel {
    let [first, second] = kind.field_names();
    let card_templates = match kind {
        CardKind::Basic => vec![CardTemplate {
            name: "Card 1",
            front: format!("{{{{{}}}}}", first),
            back: answer_side(second),
        }],
        CardKind::Reversed => vec![
            CardTemplate {
                name: "Card 1",
                front: format!("{{{{{}}}}}", first),
                back: answer_side(second),
            },
            CardTemplate {
                name: "Card 2",
                front: format!("{{{{{}}}}}", second),
                back: answer_side(first),
            },
        ],
        CardKind::Cloze => vec![CardTemplate {
            name: "Cloze",
            front: format!("{{{{cloze:{}}}}}", first),
            back: format!(
                "{{{{cloze:{}}}}}<br>\n{{{{{}}}}}\n\n{}",
                first, second, SOURCE_FOOTER
            ),
        }],
    };

    CreateModel {
        model_name: kind.template_name(),
        in_order_fields: vec![first, second, SOURCE_FIELD],
        css: CSS,
        is_cloze: kind == CardKind::Cloze,
        card_templates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_model() {
        let model = model_for(CardKind::Basic);
        assert_eq!(model.model_name, "mdcards Basic");
        assert_eq!(model.in_order_fields, vec!["Front", "Back", "Source"]);
        assert_eq!(model.card_templates[0].front, "{{Front}}");
        assert!(model.card_templates[0].back.starts_with("{{FrontSide}}"));
        assert!(model.card_templates[0].back.contains("{{Back}}"));
        assert!(!model.is_cloze);
    }

    #[test]
    fn test_reversed_model_has_two_cards() {
        let model = model_for(CardKind::Reversed);
        assert_eq!(model.card_templates.len(), 2);
        assert_eq!(model.card_templates[1].front, "{{Back}}");
        assert!(model.card_templates[1].back.contains("{{Front}}"));
    }

    #[test]
    fn test_cloze_model() {
        let model = model_for(CardKind::Cloze);
        assert!(model.is_cloze);
        assert_eq!(model.in_order_fields, vec!["Text", "Back Extra", "Source"]);
        assert_eq!(model.card_templates[0].front, "{{cloze:Text}}");
        assert!(model.card_templates[0].back.contains("{{Back Extra}}"));

        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["modelName"], "mdcards Cloze");
        assert_eq!(json["isCloze"], true);
        assert_eq!(json["cardTemplates"][0]["Name"], "Cloze");
    }
}
