//! Normalization of raw scraped courses into structured [`CourseRecord`]s.
//!
//! This stage is a pure function: the same raw input always produces the
//! same record, byte for byte. Field extraction is best-effort, so a
//! missing course number or credits annotation is not an error.

use regex::Regex;

use crate::types::{CourseRecord, RawCourse};

/// Replace non-breaking spaces with plain spaces and trim.
pub fn clean_text(text: &str) -> String {
    text.replace('\u{a0}', " ").trim().to_string()
}

/// Extracts structured fields from raw catalog text.
pub struct Normalizer {
    number_re: Regex,
    credits_re: Regex,
    prefix_re: Regex,
}

impl Normalizer {
    pub fn new() -> Self {
        Normalizer {
            // Leading "LETTERS digits" course code, e.g. "DS 5110"
            number_re: Regex::new(r"^([A-Z]+\s*\d+)").unwrap(),
            // "(4 Hours)" credits annotation
            credits_re: Regex::new(r"\((\d+)\s*Hours\)").unwrap(),
            // "DS 5110. " prefix stripped when deriving the title
            prefix_re: Regex::new(r"^[A-Z]+\s*\d+\.\s*").unwrap(),
        }
    }

    /// Normalize one raw course. Deterministic and side-effect-free.
    pub fn normalize(&self, raw: &RawCourse) -> CourseRecord {
        let raw_text = clean_text(&raw.text);
        let description = clean_text(&raw.description);

        let course_number = self
            .number_re
            .captures(&raw_text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let credits = self
            .credits_re
            .captures(&raw_text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        let without_prefix = self.prefix_re.replace(&raw_text, "");
        let without_credits = self.credits_re.replace_all(&without_prefix, "");
        let title = clean_text(&without_credits)
            .trim_matches(|c| c == ' ' || c == '.')
            .to_string();

        let document = Self::build_document(&course_number, &title, credits, &description);

        CourseRecord {
            course_number,
            title,
            credits,
            url: raw.url.clone(),
            description,
            document,
        }
    }

    /// Fixed template for the text that gets embedded.
    fn build_document(
        course_number: &str,
        title: &str,
        credits: Option<u32>,
        description: &str,
    ) -> String {
        let credits_str = match credits {
            Some(c) => c.to_string(),
            None => "unknown".to_string(),
        };
        format!("Course {course_number} - {title} ({credits_str} credits). {description}")
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
