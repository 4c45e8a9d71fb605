/// Arrow schema of the on-disk vector index artifact.
pub mod index {
    use arrow::datatypes::{DataType, Field, Schema};
    use std::collections::HashMap;
    use std::sync::Arc;

    pub const ID_COLUMN: &str = "id";
    pub const EMBEDDING_COLUMN: &str = "embedding";
    /// Schema metadata key naming the model that produced the vectors.
    pub const MODEL_METADATA_KEY: &str = "embedding_model";

    /// One row per corpus record, in corpus order.
    pub fn embedding_index_schema(dim: i32, model: &str) -> Schema {
        let metadata = HashMap::from([(MODEL_METADATA_KEY.to_string(), model.to_string())]);
        Schema::new(vec![
            Field::new(ID_COLUMN, DataType::Int64, false),
            Field::new(
                EMBEDDING_COLUMN,
                DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
                false,
            ),
        ])
        .with_metadata(metadata)
    }
}

/// Field-level description of the model's JSON verdict and the validator that
/// turns a loosely typed `serde_json::Value` into a [`RiskAssessment`].
///
/// [`RiskAssessment`]: crate::RiskAssessment
pub mod response {
    use std::collections::HashMap;

    use serde_json::Value;
    use thiserror::Error;
    use tracing::warn;

    use crate::clause::{RiskAssessment, RiskLevel};

    /// Expected JSON type of a field plus the coercion applied to it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FieldKind {
        /// JSON string, taken as-is.
        Text,
        /// Integer, finite float (truncated) or numeric string. Booleans are rejected.
        Integer,
        /// Array whose items are all strings.
        TextList,
        /// String naming a [`RiskLevel`], case-insensitive.
        RiskLevel,
    }

    impl FieldKind {
        fn expected(&self) -> &'static str {
            match self {
                Self::Text => "a string",
                Self::Integer => "an integer",
                Self::TextList => "a list of strings",
                Self::RiskLevel => "one of \"Low\", \"Medium\", \"High\"",
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub struct FieldSpec {
        pub name: &'static str,
        pub kind: FieldKind,
        pub required: bool,
    }

    /// The verdict keys the prompt asks for. All required.
    pub const ASSESSMENT_FIELDS: [FieldSpec; 5] = [
        FieldSpec {
            name: "clause_type",
            kind: FieldKind::Text,
            required: true,
        },
        FieldSpec {
            name: "risk_level",
            kind: FieldKind::RiskLevel,
            required: true,
        },
        FieldSpec {
            name: "risk_score",
            kind: FieldKind::Integer,
            required: true,
        },
        FieldSpec {
            name: "reasons",
            kind: FieldKind::TextList,
            required: true,
        },
        FieldSpec {
            name: "safer_rewrite",
            kind: FieldKind::Text,
            required: true,
        },
    ];

    /// Expected range of `risk_score`. Outside values are logged, not rejected.
    pub const RISK_SCORE_RANGE: std::ops::RangeInclusive<i64> = 0..=10;

    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum SchemaError {
        #[error("expected a JSON object, got {found}")]
        NotAnObject { found: String },

        #[error("missing required field `{field}`")]
        Missing { field: &'static str },

        #[error("field `{field}` must be {expected}, got {found}")]
        InvalidType {
            field: &'static str,
            expected: &'static str,
            found: String,
        },
    }

    impl SchemaError {
        /// Name of the offending field, if the error concerns one.
        pub fn field(&self) -> Option<&'static str> {
            match self {
                Self::NotAnObject { .. } => None,
                Self::Missing { field } | Self::InvalidType { field, .. } => Some(*field),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum FieldValue {
        Text(String),
        Integer(i64),
        TextList(Vec<String>),
        RiskLevel(RiskLevel),
    }

    /// Coerced values keyed by field name. Unknown keys in the input are dropped.
    #[derive(Debug, Default)]
    pub struct ValidatedObject {
        values: HashMap<&'static str, FieldValue>,
    }

    impl ValidatedObject {
        pub fn len(&self) -> usize {
            self.values.len()
        }

        pub fn is_empty(&self) -> bool {
            self.values.is_empty()
        }

        pub fn take_text(&mut self, field: &'static str) -> Result<String, SchemaError> {
            match self.values.remove(field) {
                Some(FieldValue::Text(s)) => Ok(s),
                other => Err(mismatch(field, FieldKind::Text, other)),
            }
        }

        pub fn take_integer(&mut self, field: &'static str) -> Result<i64, SchemaError> {
            match self.values.remove(field) {
                Some(FieldValue::Integer(n)) => Ok(n),
                other => Err(mismatch(field, FieldKind::Integer, other)),
            }
        }

        pub fn take_text_list(&mut self, field: &'static str) -> Result<Vec<String>, SchemaError> {
            match self.values.remove(field) {
                Some(FieldValue::TextList(v)) => Ok(v),
                other => Err(mismatch(field, FieldKind::TextList, other)),
            }
        }

        pub fn take_risk_level(&mut self, field: &'static str) -> Result<RiskLevel, SchemaError> {
            match self.values.remove(field) {
                Some(FieldValue::RiskLevel(level)) => Ok(level),
                other => Err(mismatch(field, FieldKind::RiskLevel, other)),
            }
        }
    }

    fn mismatch(field: &'static str, kind: FieldKind, found: Option<FieldValue>) -> SchemaError {
        match found {
            None => SchemaError::Missing { field },
            Some(v) => SchemaError::InvalidType {
                field,
                expected: kind.expected(),
                found: format!("{v:?}"),
            },
        }
    }

    /// Check `value` against `fields`, coercing each present field to its kind.
    ///
    /// Fails on the first missing required field or non-coercible value, in
    /// `fields` order. Nothing is defaulted.
    pub fn validate(value: &Value, fields: &[FieldSpec]) -> Result<ValidatedObject, SchemaError> {
        let obj = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
            found: describe(value),
        })?;

        let mut out = ValidatedObject::default();
        for spec in fields {
            let Some(raw) = obj.get(spec.name) else {
                if spec.required {
                    return Err(SchemaError::Missing { field: spec.name });
                }
                continue;
            };
            let coerced = coerce(raw, spec.kind).ok_or_else(|| SchemaError::InvalidType {
                field: spec.name,
                expected: spec.kind.expected(),
                found: describe(raw),
            })?;
            out.values.insert(spec.name, coerced);
        }
        Ok(out)
    }

    /// Validate a parsed verdict against [`ASSESSMENT_FIELDS`].
    pub fn validate_assessment(value: &Value) -> Result<RiskAssessment, SchemaError> {
        let mut fields = validate(value, &ASSESSMENT_FIELDS)?;
        let assessment = RiskAssessment {
            clause_type: fields.take_text("clause_type")?,
            risk_level: fields.take_risk_level("risk_level")?,
            risk_score: fields.take_integer("risk_score")?,
            reasons: fields.take_text_list("reasons")?,
            safer_rewrite: fields.take_text("safer_rewrite")?,
        };
        if !RISK_SCORE_RANGE.contains(&assessment.risk_score) {
            warn!(
                risk_score = assessment.risk_score,
                "risk_score outside expected 0-10 range"
            );
        }
        Ok(assessment)
    }

    fn coerce(raw: &Value, kind: FieldKind) -> Option<FieldValue> {
        match kind {
            FieldKind::Text => raw.as_str().map(|s| FieldValue::Text(s.to_string())),
            FieldKind::Integer => coerce_integer(raw).map(FieldValue::Integer),
            FieldKind::TextList => {
                let items = raw.as_array()?;
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                    .map(FieldValue::TextList)
            }
            FieldKind::RiskLevel => raw
                .as_str()
                .and_then(|s| s.parse().ok())
                .map(FieldValue::RiskLevel),
        }
    }

    fn coerce_integer(raw: &Value) -> Option<i64> {
        match raw {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Some(i);
                }
                if n.is_u64() {
                    return None;
                }
                let f = n.as_f64()?;
                (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
            }
            // Integer text only; "7.5" is not a score.
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Short rendering of a JSON value for error messages.
    fn describe(value: &Value) -> String {
        match value {
            Value::Null => "null".into(),
            Value::Bool(b) => format!("boolean {b}"),
            Value::Number(n) => format!("number {n}"),
            Value::String(s) => {
                let prefix: String = s.chars().take(40).collect();
                if prefix.len() < s.len() {
                    format!("string \"{prefix}...\"")
                } else {
                    format!("string \"{prefix}\"")
                }
            }
            Value::Array(a) => format!("array of {} items", a.len()),
            Value::Object(_) => "object".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::index;
    use super::response::*;
    use crate::RiskLevel;
    use serde_json::json;

    fn verdict() -> serde_json::Value {
        json!({
            "clause_type": "Renewal Term",
            "risk_level": "Medium",
            "risk_score": 5,
            "reasons": ["Auto-renewal with short notice window (E1)"],
            "safer_rewrite": "Either party may terminate with 90 days notice."
        })
    }

    #[test]
    fn index_schema_has_expected_fields() {
        let schema = index::embedding_index_schema(384, "all-MiniLM-L6-v2");
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.field_with_name(index::ID_COLUMN).is_ok());
        assert!(schema.field_with_name(index::EMBEDDING_COLUMN).is_ok());
        assert_eq!(
            schema.metadata().get(index::MODEL_METADATA_KEY).map(String::as_str),
            Some("all-MiniLM-L6-v2")
        );
    }

    #[test]
    fn valid_verdict() {
        let a = validate_assessment(&verdict()).unwrap();
        assert_eq!(a.clause_type, "Renewal Term");
        assert_eq!(a.risk_level, RiskLevel::Medium);
        assert_eq!(a.risk_score, 5);
        assert_eq!(a.reasons.len(), 1);
    }

    #[test]
    fn numeric_string_score_coerced() {
        let mut v = verdict();
        v["risk_score"] = json!("7");
        assert_eq!(validate_assessment(&v).unwrap().risk_score, 7);

        v["risk_score"] = json!(" 3 ");
        assert_eq!(validate_assessment(&v).unwrap().risk_score, 3);

        v["risk_score"] = json!("NaN");
        assert!(validate_assessment(&v).is_err());
    }

    #[test]
    fn fractional_score_text_rejected() {
        let mut v = verdict();
        for text in ["7.5", "9.99", "1e1"] {
            v["risk_score"] = json!(text);
            let err = validate_assessment(&v).unwrap_err();
            assert!(
                matches!(err, SchemaError::InvalidType { field: "risk_score", .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn float_score_truncated() {
        let mut v = verdict();
        v["risk_score"] = json!(6.8);
        assert_eq!(validate_assessment(&v).unwrap().risk_score, 6);
    }

    #[test]
    fn missing_score_names_field() {
        let mut v = verdict();
        v.as_object_mut().unwrap().remove("risk_score");
        let err = validate_assessment(&v).unwrap_err();
        assert_eq!(err, SchemaError::Missing { field: "risk_score" });
        assert_eq!(err.field(), Some("risk_score"));
        assert!(err.to_string().contains("risk_score"));
    }

    #[test]
    fn non_numeric_score_rejected() {
        let mut v = verdict();
        v["risk_score"] = json!("high");
        let err = validate_assessment(&v).unwrap_err();
        assert_eq!(err.field(), Some("risk_score"));
        assert!(matches!(err, SchemaError::InvalidType { .. }));
    }

    #[test]
    fn boolean_score_rejected() {
        let mut v = verdict();
        v["risk_score"] = json!(true);
        assert!(validate_assessment(&v).is_err());
    }

    #[test]
    fn out_of_range_score_kept() {
        let mut v = verdict();
        v["risk_score"] = json!(12);
        assert_eq!(validate_assessment(&v).unwrap().risk_score, 12);
    }

    #[test]
    fn reasons_must_be_strings() {
        let mut v = verdict();
        v["reasons"] = json!(["ok", 3]);
        let err = validate_assessment(&v).unwrap_err();
        assert_eq!(err.field(), Some("reasons"));

        v["reasons"] = json!("single reason");
        assert!(validate_assessment(&v).is_err());
    }

    #[test]
    fn risk_level_normalised() {
        let mut v = verdict();
        v["risk_level"] = json!("high");
        assert_eq!(validate_assessment(&v).unwrap().risk_level, RiskLevel::High);
    }

    #[test]
    fn unknown_risk_level_rejected() {
        let mut v = verdict();
        v["risk_level"] = json!("Critical");
        let err = validate_assessment(&v).unwrap_err();
        assert_eq!(err.field(), Some("risk_level"));
        assert!(err.to_string().contains("Critical"), "{err}");
    }

    #[test]
    fn extra_keys_ignored() {
        let mut v = verdict();
        v["confidence"] = json!(0.9);
        assert!(validate_assessment(&v).is_ok());
    }

    #[test]
    fn non_object_rejected() {
        let err = validate_assessment(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, SchemaError::NotAnObject { .. }));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn optional_field_may_be_absent() {
        let fields = [FieldSpec {
            name: "note",
            kind: FieldKind::Text,
            required: false,
        }];
        let validated = validate(&json!({}), &fields).unwrap();
        assert!(validated.is_empty());
    }

    #[test]
    fn wrong_accessor_reports_type() {
        let fields = [FieldSpec {
            name: "n",
            kind: FieldKind::Integer,
            required: true,
        }];
        let mut validated = validate(&json!({"n": 1}), &fields).unwrap();
        assert_eq!(validated.len(), 1);
        let err = validated.take_text("n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidType { field: "n", .. }));
    }
}
