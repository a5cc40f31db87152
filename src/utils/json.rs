use bson::{Bson, Document as BsonDocument};
use serde_json::{Map, Number, Value};

use crate::errors::DbError;

/// Convert a JSON value into BSON. Integers that fit stay `Int32`, wider
/// ones become `Int64`, everything else with a fractional part `Double`.
#[must_use]
pub fn json_to_bson(v: &Value) -> Bson {
    match v {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Bson::Int32(small)
                } else {
                    Bson::Int64(i)
                }
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(a) => Bson::Array(a.iter().map(json_to_bson).collect()),
        Value::Object(m) => {
            let mut doc = BsonDocument::new();
            for (k, v) in m {
                doc.insert(k.clone(), json_to_bson(v));
            }
            Bson::Document(doc)
        }
    }
}

/// Parse a JSON string that must be a top-level object into a
/// `bson::Document`.
pub fn parse_json_document(json: &str) -> Result<BsonDocument, DbError> {
    let v: Value = serde_json::from_str(json)?;
    match json_to_bson(&v) {
        Bson::Document(d) => Ok(d),
        _ => Err(DbError::Bson("expected a JSON object".into())),
    }
}

/// Convert BSON back to plain JSON for CLI output. Special types render
/// as strings (datetimes as RFC 3339).
#[must_use]
pub fn bson_to_json(v: &Bson) -> Value {
    match v {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Number((*i).into()),
        Bson::Int64(i) => Value::Number((*i).into()),
        Bson::Double(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s.clone()),
        Bson::Array(a) => Value::Array(a.iter().map(bson_to_json).collect()),
        Bson::Document(d) => Value::Object(doc_to_json_map(d)),
        Bson::DateTime(dt) => Value::String(
            dt.try_to_rfc3339_string().unwrap_or_else(|_| dt.timestamp_millis().to_string()),
        ),
        other => Value::String(other.to_string()),
    }
}

#[must_use]
pub fn doc_to_json_map(doc: &BsonDocument) -> Map<String, Value> {
    let mut out = Map::new();
    for (k, v) in doc {
        out.insert(k.clone(), bson_to_json(v));
    }
    out
}

#[must_use]
pub fn doc_to_json(doc: &BsonDocument) -> Value {
    Value::Object(doc_to_json_map(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn json_roundtrips_basic_types() {
        let d = parse_json_document(r#"{"a": 1, "b": 2.5, "c": "x", "d": true, "e": null}"#)
            .unwrap();
        assert_eq!(d.get_i32("a").unwrap(), 1);
        assert_eq!(d.get_f64("b").unwrap(), 2.5);
        assert_eq!(d.get_str("c").unwrap(), "x");
        assert!(d.get_bool("d").unwrap());
        let back = doc_to_json(&d);
        assert_eq!(back["a"], 1);
        assert_eq!(back["b"], 2.5);
    }

    #[test]
    fn arrays_are_rejected_as_documents() {
        assert!(parse_json_document("[1,2,3]").is_err());
    }

    #[test]
    fn wide_integers_become_int64() {
        let d = parse_json_document(r#"{"n": 9999999999}"#).unwrap();
        assert_eq!(d.get_i64("n").unwrap(), 9_999_999_999);
    }

    #[test]
    fn nested_documents_convert_both_ways() {
        let d = parse_json_document(r#"{"meta": {"tags": ["a", "b"]}}"#).unwrap();
        let tags = d.get_document("meta").unwrap().get_array("tags").unwrap();
        assert_eq!(tags.len(), 2);
        let v = doc_to_json(&doc! {"meta": {"tags": ["a", "b"]}});
        assert_eq!(v["meta"]["tags"][0], "a");
    }
}
