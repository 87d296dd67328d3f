use chrono::{Local, NaiveDate};
use studio_core::llm::{BirthDetails, ContentKind, ContentLength, GenerationRequest};
use thiserror::Error;

use crate::cli::GenerateArgs;

const DEFAULT_TOPICAL_CATEGORY: &str = "Spiritual Wisdom";
const DEFAULT_PREDICTION_PERIOD: &str = "today";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("--{argument} is required for {kind}")]
    MissingArgument {
        argument: &'static str,
        kind: ContentKind,
    },
}

pub fn build_request(args: &GenerateArgs) -> Result<GenerationRequest, RequestError> {
    build_request_on(args, Local::now().date_naive())
}

fn build_request_on(
    args: &GenerateArgs,
    today: NaiveDate,
) -> Result<GenerationRequest, RequestError> {
    let kind = args.kind;
    let mut request = match kind {
        ContentKind::DailyAlmanac => {
            GenerationRequest::daily_almanac(args.date.unwrap_or(today), args.place.as_deref())
        }
        ContentKind::BirthChart => GenerationRequest::birth_chart(&BirthDetails {
            name: required(args.name.as_deref(), "name", kind)?,
            date: args.date.ok_or(RequestError::MissingArgument {
                argument: "date",
                kind,
            })?,
            time: args.time,
            place: required(args.place.as_deref(), "place", kind)?,
        }),
        ContentKind::Numerology => GenerationRequest::numerology(
            required(args.name.as_deref(), "name", kind)?,
            args.date.ok_or(RequestError::MissingArgument {
                argument: "date",
                kind,
            })?,
        ),
        ContentKind::ZodiacPrediction => GenerationRequest::zodiac_prediction(
            required(args.sign.as_deref(), "sign", kind)?,
            args.period
                .clone()
                .unwrap_or_else(|| DEFAULT_PREDICTION_PERIOD.to_string()),
        ),
        ContentKind::TopicalPost => GenerationRequest::topical_post(
            args.topic.clone(),
            args.category
                .clone()
                .unwrap_or_else(|| DEFAULT_TOPICAL_CATEGORY.to_string()),
        ),
        ContentKind::DilemmaResolution => {
            GenerationRequest::dilemma(required(Some(&args.topic), "topic", kind)?)
        }
    };

    if kind != ContentKind::TopicalPost
        && let Some(category) = args.category.as_deref()
    {
        request.category = category.to_string();
    }

    request = request
        .with_verse(args.verse)
        .with_length(if args.long {
            ContentLength::Long
        } else {
            ContentLength::Short
        });
    if let Some(locale) = args.locale.as_deref() {
        request = request.with_locale_instructions(locale);
    }
    for (label, value) in &args.details {
        request = request.with_detail(label.clone(), value.clone());
    }

    Ok(request)
}

fn required(
    value: Option<&str>,
    argument: &'static str,
    kind: ContentKind,
) -> Result<String, RequestError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .ok_or(RequestError::MissingArgument { argument, kind })
}
