use std::sync::LazyLock;

use jsonschema::JSONSchema;
use serde_json::{Map, Value};
use thiserror::Error;

use super::contracts::{ContentKind, SchemaDescriptor};

#[derive(Debug, Error)]
pub enum OutputValidationError {
    #[error("model output is not valid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("model output for {descriptor} is not a json object")]
    NotAnObject { descriptor: &'static str },
    #[error("model output for {descriptor} is missing required field `{field}`")]
    MissingField {
        descriptor: &'static str,
        field: &'static str,
    },
    #[error("schema for {descriptor} failed to compile: {message}")]
    SchemaCompile {
        descriptor: &'static str,
        message: String,
    },
    #[error("model output failed schema validation for {descriptor}: {errors:?}")]
    SchemaViolation {
        descriptor: &'static str,
        errors: Vec<String>,
    },
}

fn compile_for(kind: ContentKind) -> Result<JSONSchema, String> {
    JSONSchema::compile(&kind.descriptor().json_schema()).map_err(|err| err.to_string())
}

static DAILY_ALMANAC_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::DailyAlmanac));

static BIRTH_CHART_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::BirthChart));

static NUMEROLOGY_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::Numerology));

static ZODIAC_PREDICTION_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::ZodiacPrediction));

static TOPICAL_POST_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::TopicalPost));

static DILEMMA_RESOLUTION_VALIDATOR: LazyLock<Result<JSONSchema, String>> =
    LazyLock::new(|| compile_for(ContentKind::DilemmaResolution));

/// Precompiled validator when `descriptor` is one of the built-in content kinds.
fn cached_validator(
    descriptor: &SchemaDescriptor,
) -> Option<&'static Result<JSONSchema, String>> {
    let kind = ContentKind::ALL
        .into_iter()
        .find(|kind| kind.descriptor() == descriptor)?;

    Some(match kind {
        ContentKind::DailyAlmanac => &*DAILY_ALMANAC_VALIDATOR,
        ContentKind::BirthChart => &*BIRTH_CHART_VALIDATOR,
        ContentKind::Numerology => &*NUMEROLOGY_VALIDATOR,
        ContentKind::ZodiacPrediction => &*ZODIAC_PREDICTION_VALIDATOR,
        ContentKind::TopicalPost => &*TOPICAL_POST_VALIDATOR,
        ContentKind::DilemmaResolution => &*DILEMMA_RESOLUTION_VALIDATOR,
    })
}

pub fn validate_output_json(
    descriptor: &SchemaDescriptor,
    raw_json: &str,
) -> Result<Map<String, Value>, OutputValidationError> {
    let payload: Value = serde_json::from_str(raw_json)?;
    validate_output_value(descriptor, payload)
}

/// Checks that `payload` is an object carrying every required field with its declared type.
///
/// Optional fields sent as `null` are dropped, as if the model had left them out.
pub fn validate_output_value(
    descriptor: &SchemaDescriptor,
    payload: Value,
) -> Result<Map<String, Value>, OutputValidationError> {
    let Value::Object(mut fields) = payload else {
        return Err(OutputValidationError::NotAnObject {
            descriptor: descriptor.name,
        });
    };

    fields.retain(|name, value| {
        !(value.is_null() && descriptor.field(name).is_some_and(|field| !field.required))
    });

    if let Some(missing) = descriptor
        .required_fields()
        .find(|field| !fields.contains_key(field.name))
    {
        return Err(OutputValidationError::MissingField {
            descriptor: descriptor.name,
            field: missing.name,
        });
    }

    let schema_compile = |message: String| OutputValidationError::SchemaCompile {
        descriptor: descriptor.name,
        message,
    };
    let compiled;
    let validator = match cached_validator(descriptor) {
        Some(cached) => cached.as_ref().map_err(|message| schema_compile(message.clone()))?,
        None => {
            compiled = JSONSchema::compile(&descriptor.json_schema())
                .map_err(|err| schema_compile(err.to_string()))?;
            &compiled
        }
    };

    let instance = Value::Object(fields);
    let errors = match validator.validate(&instance) {
        Ok(()) => Vec::new(),
        Err(validation_errors) => validation_errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>(),
    };
    if !errors.is_empty() {
        return Err(OutputValidationError::SchemaViolation {
            descriptor: descriptor.name,
            errors,
        });
    }

    match instance {
        Value::Object(fields) => Ok(fields),
        _ => Err(OutputValidationError::NotAnObject {
            descriptor: descriptor.name,
        }),
    }
}
