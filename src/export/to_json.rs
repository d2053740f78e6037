use std::error::Error;

use crate::model::SchemaExport;

/// Pretty-printed JSON envelope for file export.
pub fn render(schema: &SchemaExport) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(schema)?)
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::shop_schema;
    use super::*;

    #[test]
    fn envelope_uses_camel_case_keys() {
        let json = render(&shop_schema()).expect("schema to serialize");
        assert!(json.contains("\"exportedAt\""));
        assert!(json.contains("\"isPrimaryKey\""));
        assert!(json.contains("\"orderIndex\""));
        assert!(json.contains("\"onDelete\": \"CASCADE\""));
    }
}
