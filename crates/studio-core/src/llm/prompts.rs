use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::contracts::ContentKind;

const PERSONA_DIRECTIVE: &str = "You are a learned scholar of Vedic tradition, astrology and \
scripture writing for a devotional content studio. Write in a respectful, scholarly register. \
Never give generic dictionary definitions. Every answer must surface at least one specific, \
lesser-known insight drawn from scripture, tradition or the stated context. Return only the \
requested JSON object.";

/// Persona instruction sent as the system prompt of every generation call.
pub fn system_instruction(target_language: &str) -> String {
    format!(
        "{PERSONA_DIRECTIVE} Respond only in {language}; keep Sanskrit verses in Devanagari \
         and explain them in {language}.",
        language = target_language.trim()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentLength {
    #[default]
    Short,
    Long,
}

impl ContentLength {
    const fn instruction(self) -> &'static str {
        match self {
            Self::Short => "Keep every field brief: one or two sentences, suitable for a story card.",
            Self::Long => {
                "Write in long form: develop each field over a full paragraph, suitable for a poster \
                 caption or article."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDetail {
    pub label: String,
    pub value: String,
}

/// Caller-assembled input for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub kind: ContentKind,
    pub topic: String,
    pub category: String,
    #[serde(default)]
    pub include_verse: bool,
    #[serde(default)]
    pub length: ContentLength,
    #[serde(default)]
    pub locale_instructions: Option<String>,
    #[serde(default)]
    pub details: Vec<RequestDetail>,
}

impl GenerationRequest {
    pub fn new(kind: ContentKind, topic: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            kind,
            topic: topic.into(),
            category: category.into(),
            include_verse: false,
            length: ContentLength::Short,
            locale_instructions: None,
            details: Vec::new(),
        }
    }

    pub fn topical_post(topic: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(ContentKind::TopicalPost, topic, category)
    }

    pub fn daily_almanac(date: NaiveDate, place: Option<&str>) -> Self {
        let mut request = Self::new(ContentKind::DailyAlmanac, "", "Daily Almanac")
            .with_detail("Date", date.format("%Y-%m-%d").to_string())
            .with_detail("Weekday", date.format("%A").to_string());
        if let Some(place) = place {
            request = request.with_detail("Place", place);
        }
        request
    }

    pub fn birth_chart(birth: &BirthDetails) -> Self {
        let mut request = Self::new(ContentKind::BirthChart, birth.name.clone(), "Birth Chart")
            .with_detail("Name", birth.name.clone())
            .with_detail("Birth date", birth.date.format("%Y-%m-%d").to_string())
            .with_detail("Birth place", birth.place.clone());
        if let Some(time) = birth.time {
            request = request.with_detail("Birth time", time.format("%H:%M").to_string());
        }
        request
    }

    pub fn numerology(name: impl Into<String>, date_of_birth: NaiveDate) -> Self {
        let name = name.into();
        Self::new(ContentKind::Numerology, name.clone(), "Numerology")
            .with_detail("Full name", name)
            .with_detail("Date of birth", date_of_birth.format("%Y-%m-%d").to_string())
    }

    pub fn zodiac_prediction(sign: impl Into<String>, period: impl Into<String>) -> Self {
        let sign = sign.into();
        Self::new(ContentKind::ZodiacPrediction, sign.clone(), "Zodiac Prediction")
            .with_detail("Sign", sign)
            .with_detail("Period", period)
    }

    pub fn dilemma(question: impl Into<String>) -> Self {
        Self::new(ContentKind::DilemmaResolution, question, "Spiritual Guidance")
    }

    pub fn with_verse(mut self, include_verse: bool) -> Self {
        self.include_verse = include_verse;
        self
    }

    pub fn with_length(mut self, length: ContentLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_locale_instructions(mut self, instructions: impl AsRef<str>) -> Self {
        let trimmed = instructions.as_ref().trim();
        if !trimmed.is_empty() {
            self.locale_instructions = Some(trimmed.to_string());
        }
        self
    }

    pub fn with_detail(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push(RequestDetail {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    /// Renders the user prompt. The category is always present, even for a blank topic.
    pub fn compose_prompt(&self) -> String {
        let mut lines = vec![
            kind_instruction(self.kind).to_string(),
            format!("Category: {}", self.category.trim()),
        ];

        let topic = self.topic.trim();
        if topic.is_empty() {
            lines.push("Topic: choose the most fitting subject for this category.".to_string());
        } else {
            lines.push(format!("Topic: {topic}"));
        }

        for detail in &self.details {
            let value = detail.value.trim();
            if !value.is_empty() {
                lines.push(format!("{}: {value}", detail.label.trim()));
            }
        }

        if self.include_verse {
            lines.push(
                "Include one authentic Sanskrit verse with its source and meaning in the verse fields."
                    .to_string(),
            );
        } else {
            lines.push("Do not include a verse; leave the verse fields out.".to_string());
        }

        lines.push(self.length.instruction().to_string());

        if let Some(locale) = self.locale_instructions.as_deref() {
            lines.push(format!("Style: {locale}"));
        }

        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDetails {
    pub name: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub place: String,
}

fn kind_instruction(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::DailyAlmanac => {
            "Prepare the traditional daily almanac (panchang) for the given date with one practical insight."
        }
        ContentKind::BirthChart => {
            "Interpret the birth chart for the person below and suggest one remedy."
        }
        ContentKind::Numerology => {
            "Prepare a numerology reading from the name and date of birth below."
        }
        ContentKind::ZodiacPrediction => {
            "Write the zodiac prediction for the sign and period below."
        }
        ContentKind::TopicalPost => "Write a shareable post on the topic below.",
        ContentKind::DilemmaResolution => {
            "Resolve the seeker's question below with guidance grounded in scripture and one concrete action."
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::{BirthDetails, ContentLength, GenerationRequest, system_instruction};
    use crate::llm::contracts::ContentKind;

    #[test]
    fn empty_topic_still_carries_category() {
        let prompt = GenerationRequest::new(ContentKind::DailyAlmanac, "  ", "DailyAlmanac")
            .compose_prompt();

        assert!(prompt.contains("Category: DailyAlmanac"));
        assert!(prompt.contains("Topic: choose the most fitting subject"));
    }

    #[test]
    fn style_flags_shape_the_prompt() {
        let prompt = GenerationRequest::topical_post("Karma Yoga", "Gita Wisdom")
            .with_verse(true)
            .with_length(ContentLength::Long)
            .with_locale_instructions(" Use simple words for young readers ")
            .compose_prompt();

        assert!(prompt.contains("Topic: Karma Yoga"));
        assert!(prompt.contains("Include one authentic Sanskrit verse"));
        assert!(prompt.contains("Write in long form"));
        assert!(prompt.ends_with("Style: Use simple words for young readers"));
    }

    #[test]
    fn blank_locale_instructions_are_ignored() {
        let request = GenerationRequest::dilemma("Should I change careers?")
            .with_locale_instructions("   ");
        assert_eq!(request.locale_instructions, None);
    }

    #[test]
    fn birth_chart_request_lists_birth_details() {
        let birth = BirthDetails {
            name: "Meera".to_string(),
            date: NaiveDate::from_ymd_opt(1994, 8, 17).expect("valid date"),
            time: NaiveTime::from_hms_opt(5, 45, 0),
            place: "Varanasi".to_string(),
        };

        let prompt = GenerationRequest::birth_chart(&birth).compose_prompt();
        assert!(prompt.contains("Birth date: 1994-08-17"));
        assert!(prompt.contains("Birth time: 05:45"));
        assert!(prompt.contains("Birth place: Varanasi"));
    }

    #[test]
    fn daily_almanac_request_names_the_weekday() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
        let prompt = GenerationRequest::daily_almanac(date, None).compose_prompt();
        assert!(prompt.contains("Date: 2024-01-01"));
        assert!(prompt.contains("Weekday: Monday"));
    }

    #[test]
    fn system_instruction_names_target_language() {
        let instruction = system_instruction(" Marathi ");
        assert!(instruction.contains("Respond only in Marathi"));
        assert!(instruction.contains("Never give generic dictionary definitions"));
    }
}
