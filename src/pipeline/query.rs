use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::llm::ChatMessage;
use crate::profiles::UserProfile;

/// Lay terms expanded with medical synonyms to broaden retrieval recall.
/// Expansion is additive and order-preserving, never destructive.
const MEDICAL_TERM_EXPANSIONS: &[(&str, &[&str])] = &[
    ("heart attack", &["myocardial infarction", "cardiac arrest"]),
    ("high blood pressure", &["hypertension"]),
    ("sugar", &["diabetes", "glucose"]),
    ("stroke", &["cerebrovascular accident", "CVA"]),
    (
        "heart burn",
        &["acid reflux", "GERD", "gastroesophageal reflux disease"],
    ),
    ("shot", &["vaccine", "vaccination", "immunization"]),
    ("checkup", &["screening", "examination", "health assessment"]),
    (
        "pap smear",
        &["cervical screening", "cervical cancer screening"],
    ),
    ("mammogram", &["breast cancer screening", "breast imaging"]),
];

const PREVENTIVE_CATEGORIES: &[&str] = &[
    "screening",
    "immunization",
    "vaccination",
    "lifestyle",
    "nutrition",
    "exercise",
    "prevention",
    "check-up",
    "risk factor",
    "monitoring",
];

const PREVENTIVE_TERMS: &[&str] = &[
    "vaccine",
    "screening",
    "test",
    "check-up",
    "checkup",
    "mammogram",
    "colonoscopy",
    "pap smear",
    "blood pressure",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Information,
    Recommendation,
    SymptomCheck,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Question => "question",
            Intent::Information => "information",
            Intent::Recommendation => "recommendation",
            Intent::SymptomCheck => "symptom_check",
            Intent::General => "general",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Demographics {
    pub age: Option<u32>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedInfo {
    pub demographics: Demographics,
    pub preventive_measures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedQuery {
    pub original: String,
    pub processed: String,
    pub extracted_info: ExtractedInfo,
    pub personalized_context: String,
    pub categories: Vec<String>,
    pub intent: Intent,
}

/// Pure, side-effect-free query transform: cleaning, medical-term
/// expansion, demographic extraction, categorization and intent detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryProcessor;

impl QueryProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(
        &self,
        query: &str,
        profile: Option<&UserProfile>,
        _history: Option<&[ChatMessage]>,
    ) -> ProcessedQuery {
        let cleaned = clean_query(query);
        let processed = expand_medical_terms(&cleaned);
        let extracted_info = extract_key_information(&cleaned);
        let personalized_context = personalization_context(profile);
        let categories = categorize_query(&cleaned);
        let intent = detect_intent(&cleaned);

        let result = ProcessedQuery {
            original: query.to_string(),
            processed,
            extracted_info,
            personalized_context,
            categories,
            intent,
        };

        tracing::debug!("Processed query: {:?}", result);
        result
    }
}

/// Lowercase, collapse whitespace and strip characters outside
/// alphanumeric/space/basic punctuation.
fn clean_query(query: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("hardcoded regex"));
    let disallowed =
        DISALLOWED.get_or_init(|| Regex::new(r"[^\w\s.,?!-]").expect("hardcoded regex"));

    let text = query.to_lowercase();
    let text = whitespace.replace_all(&text, " ");
    let text = text.trim();
    disallowed.replace_all(text, "").to_string()
}

fn expand_medical_terms(query: &str) -> String {
    let mut expanded = query.to_string();
    for (common_term, medical_terms) in MEDICAL_TERM_EXPANSIONS {
        if query.contains(common_term) {
            expanded.push(' ');
            expanded.push_str(&medical_terms.join(" "));
        }
    }
    expanded
}

fn extract_key_information(query: &str) -> ExtractedInfo {
    static AGE: OnceLock<Regex> = OnceLock::new();
    static MALE: OnceLock<Regex> = OnceLock::new();
    static FEMALE: OnceLock<Regex> = OnceLock::new();

    let age_re = AGE.get_or_init(|| {
        Regex::new(r"\b(\d+)\s*(?:years|year|yr|y)(?:\s*old)?\b").expect("hardcoded regex")
    });
    // The self-report may carry an age phrase ("i am a 45 year old male").
    let male_re = MALE.get_or_init(|| {
        Regex::new(r"\b(?:i am|i'?m)\s+(?:a\s+)?(?:\d+\s*(?:years?|yr|y)\s*old\s+)?(?:male|man|boy)\b")
            .expect("hardcoded regex")
    });
    let female_re = FEMALE.get_or_init(|| {
        Regex::new(
            r"\b(?:i am|i'?m)\s+(?:a\s+)?(?:\d+\s*(?:years?|yr|y)\s*old\s+)?(?:female|woman|girl)\b",
        )
        .expect("hardcoded regex")
    });

    let mut info = ExtractedInfo::default();

    if let Some(captures) = age_re.captures(query) {
        info.demographics.age = captures.get(1).and_then(|m| m.as_str().parse().ok());
    }

    if male_re.is_match(query) {
        info.demographics.gender = Some("male".to_string());
    } else if female_re.is_match(query) {
        info.demographics.gender = Some("female".to_string());
    }

    for term in PREVENTIVE_TERMS {
        if query.contains(term) {
            info.preventive_measures.push((*term).to_string());
        }
    }

    info
}

/// Summary of the profile usable as retrieval/prompt context; empty when no
/// profile is available.
fn personalization_context(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    let mut parts = Vec::new();

    if let (Some(age), Some(gender)) = (profile.age, profile.gender.as_deref()) {
        parts.push(format!("{} year old {}", age, gender));
    }

    if !profile.health_conditions.is_empty() {
        parts.push(format!(
            "with history of {}",
            profile.health_conditions.join(", ")
        ));
    }

    if !profile.risk_factors.is_empty() {
        parts.push(format!(
            "with risk factors: {}",
            profile.risk_factors.join(", ")
        ));
    }

    parts.join(" ")
}

fn categorize_query(query: &str) -> Vec<String> {
    static IMMUNIZATION: OnceLock<Regex> = OnceLock::new();
    static SCREENING: OnceLock<Regex> = OnceLock::new();
    static EXERCISE: OnceLock<Regex> = OnceLock::new();
    static NUTRITION: OnceLock<Regex> = OnceLock::new();

    let immunization = IMMUNIZATION.get_or_init(|| {
        Regex::new(r"\b(?:vaccine|vaccination|immunization|shot|booster)\b")
            .expect("hardcoded regex")
    });
    let screening = SCREENING.get_or_init(|| {
        Regex::new(r"\b(?:screening|check(?:-?up)?|test|exam|mammogram|colonoscopy|pap)\b")
            .expect("hardcoded regex")
    });
    let exercise = EXERCISE.get_or_init(|| {
        Regex::new(r"\b(?:exercise|workout|fitness|physical activity)\b").expect("hardcoded regex")
    });
    let nutrition = NUTRITION.get_or_init(|| {
        Regex::new(r"\b(?:diet|nutrition|food|eating|meal)\b").expect("hardcoded regex")
    });

    let mut categories = BTreeSet::new();

    for category in PREVENTIVE_CATEGORIES {
        if query.contains(category) {
            categories.insert((*category).to_string());
        }
    }

    if immunization.is_match(query) {
        categories.insert("immunization".to_string());
    }
    if screening.is_match(query) {
        categories.insert("screening".to_string());
    }
    if exercise.is_match(query) {
        categories.insert("exercise".to_string());
    }
    if nutrition.is_match(query) {
        categories.insert("nutrition".to_string());
    }

    categories.into_iter().collect()
}

/// First-match-wins cascade: question → information → recommendation →
/// symptom_check → general.
fn detect_intent(query: &str) -> Intent {
    static QUESTION: OnceLock<Regex> = OnceLock::new();
    static INFORMATION: OnceLock<Regex> = OnceLock::new();
    static RECOMMENDATION: OnceLock<Regex> = OnceLock::new();
    static SYMPTOM: OnceLock<Regex> = OnceLock::new();

    let question = QUESTION.get_or_init(|| {
        Regex::new(r"^(?:what|how|when|where|why|who|can|should|is|are|do|does|did|will)\b")
            .expect("hardcoded regex")
    });
    let information = INFORMATION.get_or_init(|| {
        Regex::new(r"\b(?:tell|explain|describe|information|know|learn|understand)\b")
            .expect("hardcoded regex")
    });
    let recommendation = RECOMMENDATION.get_or_init(|| {
        Regex::new(r"\b(?:schedule|appointment|recommend|suggest|advice|advise|should i)\b")
            .expect("hardcoded regex")
    });
    let symptom = SYMPTOM.get_or_init(|| {
        Regex::new(r"\b(?:symptom|feel|feeling|pain|ache|hurt|suffering)\b")
            .expect("hardcoded regex")
    });

    if question.is_match(query) || query.contains('?') {
        return Intent::Question;
    }
    if information.is_match(query) {
        return Intent::Information;
    }
    if recommendation.is_match(query) {
        return Intent::Recommendation;
    }
    if symptom.is_match(query) {
        return Intent::SymptomCheck;
    }
    Intent::General
}
