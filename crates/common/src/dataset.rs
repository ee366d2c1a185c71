//! Corpus and query data model
//!
//! Records arrive from upstream collaborators (cleaned RecipeNLG dumps,
//! Spoonacular scrapes) in slightly different shapes. Each legacy shape is
//! resolved here, once, into the canonical [`Recipe`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::error::ReciperankError;
use crate::Result;

/// Identifier that may be written as a JSON string or integer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum JsonId {
    Text(String),
    Number(i64),
}

impl From<JsonId> for String {
    fn from(id: JsonId) -> Self {
        match id {
            JsonId::Text(s) => s,
            JsonId::Number(n) => n.to_string(),
        }
    }
}

/// Cooking instructions: free text or ordered steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Instructions {
    Text(String),
    Steps(Vec<String>),
}

impl Instructions {
    /// Instructions as a single string, steps joined with a space
    pub fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Steps(steps) => steps.join(" "),
        }
    }
}

/// Canonical corpus record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Instructions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Upstream fields the core does not interpret (`source`, `ner`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// On-disk record shape before legacy fields are resolved
#[derive(Debug, Deserialize)]
struct RawRecipe {
    id: Option<JsonId>,
    title: Option<String>,
    ingredients: Option<Vec<String>>,
    instructions: Option<Instructions>,
    directions: Option<Vec<String>>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RawRecipe {
    fn resolve(self, subject: &str) -> Result<Recipe> {
        let id: String = self
            .id
            .map(String::from)
            .ok_or_else(|| ReciperankError::schema(subject, "missing field `id`"))?;
        if id.trim().is_empty() {
            return Err(ReciperankError::schema(subject, "empty `id`"));
        }
        let subject = format!("record {}", id);

        let title = self
            .title
            .ok_or_else(|| ReciperankError::schema(&subject, "missing field `title`"))?;
        let ingredients = self
            .ingredients
            .ok_or_else(|| ReciperankError::schema(&subject, "missing field `ingredients`"))?;

        // A non-empty `directions` array wins over `instructions`
        let instructions = match (self.directions, self.instructions) {
            (Some(steps), _) if !steps.is_empty() => Instructions::Steps(steps),
            (_, Some(instructions)) => instructions,
            (Some(steps), None) => Instructions::Steps(steps),
            (None, None) => {
                return Err(ReciperankError::schema(
                    &subject,
                    "missing field `instructions` or `directions`",
                ))
            }
        };

        Ok(Recipe {
            id,
            title,
            ingredients,
            instructions,
            tags: self.tags,
            extra: self.extra,
        })
    }
}

/// Natural-language query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    pub id: String,
    #[serde(rename = "query")]
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawQuery {
    id: Option<JsonId>,
    query: Option<String>,
}

/// Human-readable subject for an array element, preferring its `id`
fn subject_for(kind: &str, position: usize, value: &Value) -> String {
    match value.get("id") {
        Some(Value::String(id)) => format!("{} {}", kind, id),
        Some(Value::Number(id)) => format!("{} {}", kind, id),
        _ => format!("{} #{}", kind, position),
    }
}

/// Parse a JSON document that must be a top-level array
pub fn parse_array(data: &str, what: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(data)? {
        Value::Array(items) => Ok(items),
        _ => Err(ReciperankError::schema(what, "expected a JSON array")),
    }
}

/// Parse corpus records, rejecting malformed entries and duplicate ids
pub fn parse_corpus(data: &str) -> Result<Vec<Recipe>> {
    let items = parse_array(data, "corpus")?;
    let mut seen = HashSet::with_capacity(items.len());
    let mut recipes = Vec::with_capacity(items.len());

    for (position, value) in items.into_iter().enumerate() {
        let subject = subject_for("record", position, &value);
        let raw: RawRecipe = serde_json::from_value(value)
            .map_err(|e| ReciperankError::schema(&subject, e.to_string()))?;
        let recipe = raw.resolve(&subject)?;

        if !seen.insert(recipe.id.clone()) {
            return Err(ReciperankError::schema(
                format!("record {}", recipe.id),
                "duplicate record id",
            ));
        }
        recipes.push(recipe);
    }

    Ok(recipes)
}

/// Parse queries, rejecting malformed entries and duplicate ids
pub fn parse_queries(data: &str) -> Result<Vec<Query>> {
    let items = parse_array(data, "queries")?;
    let mut seen = HashSet::with_capacity(items.len());
    let mut queries = Vec::with_capacity(items.len());

    for (position, value) in items.into_iter().enumerate() {
        let subject = subject_for("query", position, &value);
        let raw: RawQuery = serde_json::from_value(value)
            .map_err(|e| ReciperankError::schema(&subject, e.to_string()))?;

        let id: String = raw
            .id
            .map(String::from)
            .ok_or_else(|| ReciperankError::schema(&subject, "missing field `id`"))?;
        let text = raw
            .query
            .ok_or_else(|| ReciperankError::schema(format!("query {}", id), "missing field `query`"))?;

        if !seen.insert(id.clone()) {
            return Err(ReciperankError::schema(format!("query {}", id), "duplicate query id"));
        }
        queries.push(Query { id, text });
    }

    Ok(queries)
}

/// Load corpus file
pub fn load_corpus(path: &Path) -> Result<Vec<Recipe>> {
    let data = std::fs::read_to_string(path)?;
    let recipes = parse_corpus(&data)?;
    info!("Loaded {} recipes from {}", recipes.len(), path.display());
    Ok(recipes)
}

/// Load queries file
pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let data = std::fs::read_to_string(path)?;
    let queries = parse_queries(&data)?;
    info!("Loaded {} queries from {}", queries.len(), path.display());
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipenlg_and_spoonacular_shapes() {
        let data = r#"[
            {"id": "recnlg_1", "title": "Pancakes", "ingredients": ["flour", "egg"],
             "instructions": ["mix", "fry"], "ner": ["flour"], "source": "RecipeNLG"},
            {"id": 715538, "title": "Tofu Soup", "ingredients": ["tofu"],
             "instructions": "Simmer everything.", "source": "Spoonacular"}
        ]"#;

        let recipes = parse_corpus(data).unwrap();
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].instructions.joined(), "mix fry");
        assert_eq!(recipes[0].extra["source"], "RecipeNLG");
        assert_eq!(recipes[1].id, "715538");
        assert_eq!(recipes[1].instructions.joined(), "Simmer everything.");
    }

    #[test]
    fn test_directions_take_precedence() {
        let data = r#"[{"id": "a", "title": "t", "ingredients": [],
                        "directions": ["boil", "serve"], "instructions": "ignored"}]"#;
        let recipes = parse_corpus(data).unwrap();
        assert_eq!(
            recipes[0].instructions,
            Instructions::Steps(vec!["boil".into(), "serve".into()])
        );
    }

    #[test]
    fn test_empty_directions_fall_back_to_instructions() {
        let data = r#"[{"id": "a", "title": "t", "ingredients": [],
                        "directions": [], "instructions": "stir"}]"#;
        let recipes = parse_corpus(data).unwrap();
        assert_eq!(recipes[0].instructions, Instructions::Text("stir".into()));
    }

    #[test]
    fn test_missing_field_names_record() {
        let data = r#"[{"id": "recnlg_9", "title": "No ingredients", "instructions": "x"}]"#;
        match parse_corpus(data) {
            Err(ReciperankError::Schema { subject, message }) => {
                assert_eq!(subject, "record recnlg_9");
                assert!(message.contains("ingredients"));
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_instructions_is_schema_error() {
        let data = r#"[{"id": "r", "title": "t", "ingredients": ["a"]}]"#;
        assert!(matches!(
            parse_corpus(data),
            Err(ReciperankError::Schema { .. })
        ));
    }

    #[test]
    fn test_missing_id_uses_position() {
        let data = r#"[{"title": "t", "ingredients": [], "instructions": ""}]"#;
        match parse_corpus(data) {
            Err(ReciperankError::Schema { subject, .. }) => assert_eq!(subject, "record #0"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_record_ids_rejected() {
        let data = r#"[
            {"id": "x", "title": "a", "ingredients": [], "instructions": ""},
            {"id": "x", "title": "b", "ingredients": [], "instructions": ""}
        ]"#;
        assert!(parse_corpus(data).is_err());
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let data = r#"[{"id": "a", "title": "t", "ingredients": ["salt"],
                        "instructions": "x", "source": "Spoonacular"}]"#;
        let recipes = parse_corpus(data).unwrap();
        let value = serde_json::to_value(&recipes[0]).unwrap();
        assert_eq!(value["source"], "Spoonacular");
        assert_eq!(value["instructions"], "x");
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn test_parse_queries() {
        let data = r#"[{"id": 1, "query": "vegan soup"}, {"id": "q2", "query": "egg breakfast"}]"#;
        let queries = parse_queries(data).unwrap();
        assert_eq!(queries[0].id, "1");
        assert_eq!(queries[1].text, "egg breakfast");
    }

    #[test]
    fn test_query_without_text_is_schema_error() {
        let data = r#"[{"id": 3}]"#;
        match parse_queries(data) {
            Err(ReciperankError::Schema { subject, .. }) => assert_eq!(subject, "query 3"),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_array_document_rejected() {
        assert!(matches!(
            parse_queries(r#"{"id": 1}"#),
            Err(ReciperankError::Schema { .. })
        ));
    }

    #[test]
    fn test_load_corpus_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "title": "t", "ingredients": [], "instructions": "x"}]"#,
        )
        .unwrap();

        assert_eq!(load_corpus(&path).unwrap().len(), 1);
    }
}
