use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    DailyAlmanac,
    BirthChart,
    Numerology,
    ZodiacPrediction,
    TopicalPost,
    DilemmaResolution,
}

impl ContentKind {
    pub const ALL: [ContentKind; 6] = [
        Self::DailyAlmanac,
        Self::BirthChart,
        Self::Numerology,
        Self::ZodiacPrediction,
        Self::TopicalPost,
        Self::DilemmaResolution,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DailyAlmanac => "daily-almanac",
            Self::BirthChart => "birth-chart",
            Self::Numerology => "numerology",
            Self::ZodiacPrediction => "zodiac-prediction",
            Self::TopicalPost => "topical-post",
            Self::DilemmaResolution => "dilemma-resolution",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }

    pub fn descriptor(self) -> &'static SchemaDescriptor {
        match self {
            Self::DailyAlmanac => &DAILY_ALMANAC,
            Self::BirthChart => &BIRTH_CHART,
            Self::Numerology => &NUMEROLOGY,
            Self::ZodiacPrediction => &ZODIAC_PREDICTION,
            Self::TopicalPost => &TOPICAL_POST,
            Self::DilemmaResolution => &DILEMMA_RESOLUTION,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
}

impl FieldType {
    /// Whether `value` has this declared type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
        }
    }

    const fn json_schema_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
        }
    }

    const fn provider_type(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::String,
            required: true,
        }
    }

    pub const fn number(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Number,
            required: true,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            required: false,
            ..self
        }
    }
}

/// Declared shape of one kind of generation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl SchemaDescriptor {
    pub const fn new(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self { name, fields }
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        self.fields.iter().filter(|field| field.required)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Schema in the shape the generative endpoint accepts as `responseSchema`.
    pub fn response_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            properties.insert(
                field.name.to_string(),
                json!({ "type": field.field_type.provider_type() }),
            );
        }

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": self.required_names(),
            "propertyOrdering": self.fields.iter().map(|field| field.name).collect::<Vec<_>>(),
        })
    }

    /// Standard JSON Schema document used to validate parsed payloads.
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            properties.insert(
                field.name.to_string(),
                json!({ "type": field.field_type.json_schema_type() }),
            );
        }

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        })
    }

    fn required_names(&self) -> Vec<&'static str> {
        self.required_fields().map(|field| field.name).collect()
    }
}

pub static DAILY_ALMANAC: SchemaDescriptor = SchemaDescriptor::new(
    "daily_almanac",
    &[
        FieldSpec::string("date"),
        FieldSpec::string("weekday"),
        FieldSpec::string("tithi"),
        FieldSpec::string("nakshatra"),
        FieldSpec::string("yoga"),
        FieldSpec::string("karana"),
        FieldSpec::string("sunrise"),
        FieldSpec::string("sunset"),
        FieldSpec::string("auspicious_period"),
        FieldSpec::string("inauspicious_period"),
        FieldSpec::string("insight"),
        FieldSpec::string("verse").optional(),
        FieldSpec::string("verse_meaning").optional(),
    ],
);

pub static BIRTH_CHART: SchemaDescriptor = SchemaDescriptor::new(
    "birth_chart",
    &[
        FieldSpec::string("name"),
        FieldSpec::string("ascendant"),
        FieldSpec::string("moon_sign"),
        FieldSpec::string("sun_sign"),
        FieldSpec::string("birth_star"),
        FieldSpec::string("summary"),
        FieldSpec::string("strengths"),
        FieldSpec::string("challenges"),
        FieldSpec::string("remedy"),
        FieldSpec::string("verse").optional(),
    ],
);

pub static NUMEROLOGY: SchemaDescriptor = SchemaDescriptor::new(
    "numerology",
    &[
        FieldSpec::string("name"),
        FieldSpec::number("life_path_number"),
        FieldSpec::number("destiny_number"),
        FieldSpec::number("soul_urge_number").optional(),
        FieldSpec::string("personality"),
        FieldSpec::string("lucky_color"),
        FieldSpec::string("lucky_day"),
        FieldSpec::string("guidance"),
    ],
);

pub static ZODIAC_PREDICTION: SchemaDescriptor = SchemaDescriptor::new(
    "zodiac_prediction",
    &[
        FieldSpec::string("sign"),
        FieldSpec::string("period"),
        FieldSpec::string("title"),
        FieldSpec::string("prediction"),
        FieldSpec::number("lucky_number"),
        FieldSpec::string("lucky_color"),
        FieldSpec::string("advice"),
    ],
);

pub static TOPICAL_POST: SchemaDescriptor = SchemaDescriptor::new(
    "topical_post",
    &[
        FieldSpec::string("title"),
        FieldSpec::string("explanation"),
        FieldSpec::string("insight"),
        FieldSpec::string("verse").optional(),
        FieldSpec::string("verse_source").optional(),
        FieldSpec::string("verse_meaning").optional(),
        FieldSpec::string("hashtags").optional(),
    ],
);

pub static DILEMMA_RESOLUTION: SchemaDescriptor = SchemaDescriptor::new(
    "dilemma_resolution",
    &[
        FieldSpec::string("question_summary"),
        FieldSpec::string("perspective"),
        FieldSpec::string("guidance"),
        FieldSpec::string("action_step"),
        FieldSpec::string("verse").optional(),
        FieldSpec::string("verse_source").optional(),
    ],
);

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ContentKind, FieldSpec, FieldType, NUMEROLOGY, SchemaDescriptor};

    #[test]
    fn every_kind_has_a_descriptor_with_required_fields() {
        for kind in ContentKind::ALL {
            let descriptor = kind.descriptor();
            assert!(
                descriptor.required_fields().count() > 0,
                "{kind} should declare at least one required field"
            );
        }
    }

    #[test]
    fn parse_accepts_labels_with_either_separator() {
        assert_eq!(
            ContentKind::parse("daily_almanac"),
            Some(ContentKind::DailyAlmanac)
        );
        assert_eq!(
            ContentKind::parse(" Zodiac-Prediction "),
            Some(ContentKind::ZodiacPrediction)
        );
        assert_eq!(ContentKind::parse("horoscope"), None);
    }

    #[test]
    fn response_schema_lists_only_required_fields_as_required() {
        static DESCRIPTOR: SchemaDescriptor = SchemaDescriptor::new(
            "mixed_fields",
            &[FieldSpec::string("a"), FieldSpec::number("b").optional()],
        );

        let schema = DESCRIPTOR.response_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["a"]["type"], "STRING");
        assert_eq!(schema["properties"]["b"]["type"], "NUMBER");
        assert_eq!(schema["required"], json!(["a"]));

        let json_schema = DESCRIPTOR.json_schema();
        assert_eq!(json_schema["type"], "object");
        assert_eq!(json_schema["properties"]["b"]["type"], "number");
    }

    #[test]
    fn field_lookup_reports_declared_type() {
        let life_path = NUMEROLOGY
            .field("life_path_number")
            .expect("numerology declares a life path number");
        assert_eq!(life_path.field_type, FieldType::Number);
        assert!(life_path.field_type.accepts(&json!(7)));
        assert!(!life_path.field_type.accepts(&json!("seven")));
        assert!(NUMEROLOGY.field("horoscope").is_none());
    }
}
